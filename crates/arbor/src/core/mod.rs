//! Core types: canvases, the canvas cache, sizing, input, and the loops
//! that drive a widget tree.

/// Display backends.
pub mod backend;
/// The canvas cache.
pub mod cache;
/// Canvases and canvas composition.
pub mod canvas;
/// Key to command bindings.
pub mod command_map;
/// Core error types.
pub mod error;
/// Input event types.
pub mod event;
/// The event loop.
pub mod event_loop;
/// Identity and slot key types.
pub mod id;
/// The main loop.
pub mod main_loop;
/// Typed signals.
pub mod signals;
/// The sizing protocol.
pub mod sizing;
/// Colors, styles and palettes.
pub mod style;
/// Testing utilities.
pub mod testing;
/// Text layout.
pub mod text;
