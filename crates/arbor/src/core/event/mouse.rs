//! Mouse input primitives.
use crate::{event::key, geom::Point};

/// Mouse button codes.
#[derive(Debug, PartialOrd, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Button {
    /// Left mouse button.
    Left,
    /// Right mouse button.
    Right,
    /// Middle mouse button.
    Middle,
    /// No button (for move/scroll).
    None,
}

/// Mouse action kinds.
#[derive(Debug, PartialOrd, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Action {
    /// Button press.
    Down,
    /// Button release.
    Up,
    /// Mouse drag with button held.
    Drag,
    /// Mouse moved without button.
    Moved,
    /// Scroll wheel down.
    ScrollDown,
    /// Scroll wheel up.
    ScrollUp,
    /// Horizontal scroll left.
    ScrollLeft,
    /// Horizontal scroll right.
    ScrollRight,
}

impl Action {
    /// Is this a button-driven action?
    pub fn is_button(&self) -> bool {
        matches!(self, Self::Down | Self::Up | Self::Drag)
    }
}

/// A mouse input event. The location is relative to the widget receiving
/// the event; containers translate it as they route the event inward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    /// Mouse action type.
    pub action: Action,
    /// Mouse button.
    pub button: Button,
    /// Keyboard modifiers.
    pub modifiers: key::Mods,
    /// Event location.
    pub location: Point,
}

impl MouseEvent {
    /// A button press with no modifiers.
    pub fn press(button: Button, location: Point) -> Self {
        Self {
            action: Action::Down,
            button,
            modifiers: key::Empty,
            location,
        }
    }

    /// A scroll wheel movement.
    pub fn scroll(action: Action, location: Point) -> Self {
        Self {
            action,
            button: Button::None,
            modifiers: key::Empty,
            location,
        }
    }

    /// The same event at a different location.
    pub fn at(self, location: Point) -> Self {
        Self { location, ..self }
    }

    /// Translate into the coordinates of a child whose origin is at
    /// `origin`. Returns `None` if the event lies above or left of it.
    pub fn relative_to(self, origin: Point) -> Option<Self> {
        let x = self.location.x.checked_sub(origin.x)?;
        let y = self.location.y.checked_sub(origin.y)?;
        Some(self.at(Point::new(x, y)))
    }

    /// Is this a button press?
    pub fn is_press(&self) -> bool {
        self.action == Action::Down
    }
}
