//! Input events delivered by the display to the main loop.

/// Keyboard input.
pub mod key;
/// Mouse input.
pub mod mouse;

use crate::geom::Expanse;

/// An input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A keystroke.
    Key(key::Key),
    /// A mouse action.
    Mouse(mouse::MouseEvent),
    /// The terminal was resized.
    Resize(Expanse),
    /// The terminal gained focus.
    FocusGained,
    /// The terminal lost focus.
    FocusLost,
    /// Pasted text.
    Paste(String),
}

impl From<key::Key> for Event {
    fn from(k: key::Key) -> Self {
        Self::Key(k)
    }
}

impl From<mouse::MouseEvent> for Event {
    fn from(m: mouse::MouseEvent) -> Self {
        Self::Mouse(m)
    }
}
