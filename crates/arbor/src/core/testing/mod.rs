//! Test support: canvas assertions and a scripted display.

/// Canvas assertions.
pub mod buf;
/// In-memory display.
pub mod display;

pub use buf::CanvasTest;
pub use display::TestDisplay;

use crate::{canvas::CanvasRef, error::Result, sizing::RenderSize, widget::WidgetRef};

/// Render a widget and return the canvas.
pub fn render(w: &WidgetRef, size: RenderSize, focus: bool) -> Result<CanvasRef> {
    w.borrow_mut().render(size, focus)
}

/// Render a widget and return its rows as text.
pub fn render_lines(w: &WidgetRef, size: RenderSize, focus: bool) -> Result<Vec<String>> {
    Ok(render(w, size, focus)?.text_lines())
}
