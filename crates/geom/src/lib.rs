//! Geometry primitives used across arbor.

/// Error types for geometry operations.
mod error;
/// Width/height size type.
mod expanse;
/// Point helpers.
mod point;
/// Rectangle operations.
mod rect;

pub use error::{Error, Result};
pub use expanse::Expanse;
pub use point::Point;
pub use rect::Rect;
