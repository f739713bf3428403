//! Arbor: a terminal UI toolkit core.
//!
//! Widgets negotiate their size through the box/flow/fixed protocol,
//! render into immutable canvases, and have those canvases cached by the
//! render call that produced them. Containers combine child canvases by
//! reference, so an unchanged subtree costs a cache hit.
//!
//! # Module Organization
//!
//! - [`widget`] - The widget contract and the caching wrapper
//! - [`widgets`] - Built-in widgets, containers and the list box
//! - [`canvas`] and [`cache`] - Rendered output and its cache
//! - [`main_loop`] - Running a widget tree against a display

// Internal core module - re-export specific items below
mod core;

pub use geom;

/// The widget contract.
pub mod widget;
/// Built-in widgets.
pub mod widgets;

pub use core::{
    backend, cache, canvas, command_map, error, event, event_loop, id, main_loop, signals, sizing,
    style, testing, text,
};

pub use widget::{Widget, WidgetRef};
