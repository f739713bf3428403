//! Maps keys to the abstract commands widgets act on, so navigation keys
//! can be rebound without touching widget code.
use std::{cell::RefCell, collections::HashMap, fmt};

use crate::event::key::{Key, KeyCode};

/// An abstract widget command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Move up one row.
    CursorUp,
    /// Move down one row.
    CursorDown,
    /// Move left one column.
    CursorLeft,
    /// Move right one column.
    CursorRight,
    /// Move up one page.
    CursorPageUp,
    /// Move down one page.
    CursorPageDown,
    /// Move to the start of the line or list.
    CursorMaxLeft,
    /// Move to the end of the line or list.
    CursorMaxRight,
    /// Activate the focused widget.
    Activate,
    /// Force a full redraw.
    RedrawScreen,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CursorUp => "cursor up",
            Self::CursorDown => "cursor down",
            Self::CursorLeft => "cursor left",
            Self::CursorRight => "cursor right",
            Self::CursorPageUp => "cursor page up",
            Self::CursorPageDown => "cursor page down",
            Self::CursorMaxLeft => "cursor max left",
            Self::CursorMaxRight => "cursor max right",
            Self::Activate => "activate",
            Self::RedrawScreen => "redraw screen",
        };
        f.write_str(s)
    }
}

/// Key to command bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMap {
    /// Bindings, keyed by normalized key.
    bindings: HashMap<Key, Command>,
}

impl Default for CommandMap {
    fn default() -> Self {
        let mut m = Self {
            bindings: HashMap::new(),
        };
        m.bind(KeyCode::Up, Command::CursorUp);
        m.bind(KeyCode::Down, Command::CursorDown);
        m.bind(KeyCode::Left, Command::CursorLeft);
        m.bind(KeyCode::Right, Command::CursorRight);
        m.bind(KeyCode::PageUp, Command::CursorPageUp);
        m.bind(KeyCode::PageDown, Command::CursorPageDown);
        m.bind(KeyCode::Home, Command::CursorMaxLeft);
        m.bind(KeyCode::End, Command::CursorMaxRight);
        m.bind(' ', Command::Activate);
        m.bind(KeyCode::Enter, Command::Activate);
        m.bind(crate::event::key::Ctrl + 'l', Command::RedrawScreen);
        m
    }
}

impl CommandMap {
    /// A map with no bindings.
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Bind a key, replacing any previous binding.
    pub fn bind(&mut self, key: impl Into<Key>, cmd: Command) {
        self.bindings.insert(key.into().normalize(), cmd);
    }

    /// Remove a binding.
    pub fn unbind(&mut self, key: impl Into<Key>) -> Option<Command> {
        self.bindings.remove(&key.into().normalize())
    }

    /// The command bound to a key.
    pub fn get(&self, key: &Key) -> Option<Command> {
        self.bindings.get(&key.normalize()).copied()
    }
}

thread_local! {
    /// The command map widgets consult by default.
    static DEFAULT: RefCell<CommandMap> = RefCell::new(CommandMap::default());
}

/// Look a key up in the default command map.
pub fn lookup(key: &Key) -> Option<Command> {
    DEFAULT.with(|m| m.borrow().get(key))
}

/// Modify the default command map.
pub fn configure(f: impl FnOnce(&mut CommandMap)) {
    DEFAULT.with(|m| f(&mut m.borrow_mut()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::key::{Ctrl, Shift};

    #[test]
    fn defaults_and_rebind() {
        assert_eq!(lookup(&KeyCode::Up.into()), Some(Command::CursorUp));
        assert_eq!(lookup(&(Ctrl + 'l')), Some(Command::RedrawScreen));
        assert_eq!(lookup(&'x'.into()), None);

        configure(|m| {
            m.bind('k', Command::CursorUp);
            m.unbind(KeyCode::Up);
        });
        assert_eq!(lookup(&'k'.into()), Some(Command::CursorUp));
        assert_eq!(lookup(&KeyCode::Up.into()), None);

        let mut m = CommandMap::empty();
        m.bind('J', Command::CursorDown);
        assert_eq!(m.get(&(Shift + 'j')), Some(Command::CursorDown));
    }
}
