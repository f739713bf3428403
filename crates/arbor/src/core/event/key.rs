//! Keyboard input primitives.
use std::{fmt, ops::Add};

/// Modifier key state.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Mods {
    /// Shift is active.
    pub shift: bool,
    /// Control is active.
    pub ctrl: bool,
    /// Alt is active.
    pub alt: bool,
}

impl Add<KeyCode> for Mods {
    type Output = Key;

    fn add(self, key: KeyCode) -> Self::Output {
        Key { mods: self, key }
    }
}

impl Add<char> for Mods {
    type Output = Key;

    fn add(self, other: char) -> Self::Output {
        Key {
            mods: self,
            key: other.into(),
        }
    }
}

impl Add<Self> for Mods {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self {
            shift: self.shift || other.shift,
            ctrl: self.ctrl || other.ctrl,
            alt: self.alt || other.alt,
        }
    }
}

/// No modifiers.
#[allow(non_upper_case_globals)]
pub const Empty: Mods = Mods {
    shift: false,
    ctrl: false,
    alt: false,
};

/// Shift only.
#[allow(non_upper_case_globals)]
pub const Shift: Mods = Mods {
    shift: true,
    ctrl: false,
    alt: false,
};

/// Control only.
#[allow(non_upper_case_globals)]
pub const Ctrl: Mods = Mods {
    shift: false,
    ctrl: true,
    alt: false,
};

/// Alt only.
#[allow(non_upper_case_globals)]
pub const Alt: Mods = Mods {
    shift: false,
    ctrl: false,
    alt: true,
};

/// Logical key codes.
#[derive(Debug, PartialOrd, PartialEq, Hash, Eq, Clone, Copy)]
pub enum KeyCode {
    /// Backspace.
    Backspace,
    /// Enter.
    Enter,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Home.
    Home,
    /// End.
    End,
    /// Page up.
    PageUp,
    /// Page down.
    PageDown,
    /// Tab.
    Tab,
    /// Shift + Tab.
    BackTab,
    /// Delete.
    Delete,
    /// Insert.
    Insert,
    /// Escape.
    Esc,
    /// Function key; `F(1)` is F1.
    F(u8),
    /// A character.
    Char(char),
    /// Anything the backend can't name.
    Null,
}

impl From<char> for KeyCode {
    fn from(c: char) -> Self {
        Self::Char(c)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backspace => f.write_str("backspace"),
            Self::Enter => f.write_str("enter"),
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
            Self::Home => f.write_str("home"),
            Self::End => f.write_str("end"),
            Self::PageUp => f.write_str("page up"),
            Self::PageDown => f.write_str("page down"),
            Self::Tab => f.write_str("tab"),
            Self::BackTab => f.write_str("shift tab"),
            Self::Delete => f.write_str("delete"),
            Self::Insert => f.write_str("insert"),
            Self::Esc => f.write_str("esc"),
            Self::F(n) => write!(f, "f{n}"),
            Self::Char(' ') => f.write_str("space"),
            Self::Char(c) => write!(f, "{c}"),
            Self::Null => f.write_str("null"),
        }
    }
}

/// Keys where shift is meaningful even after normalization.
const LEAVE_INTACT: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];

/// A keystroke along with modifiers.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Key {
    /// Modifier state.
    pub mods: Mods,
    /// Key code.
    pub key: KeyCode,
}

impl Key {
    /// Normalize shift for binding lookups. Terminals report both the shift
    /// modifier and the shifted character, but bindings are written against
    /// the character alone:
    ///
    /// | input             | normalization    |
    /// |-------------------|------------------|
    /// | shift + a         | A                |
    /// | shift + )         | )                |
    /// | shift + enter     | shift + enter    |
    /// | shift + ctrl + A  | ctrl + A         |
    pub fn normalize(&self) -> Self {
        let KeyCode::Char(c) = self.key else {
            return *self;
        };
        if !self.mods.shift || LEAVE_INTACT.contains(&self.key) {
            return *self;
        }
        let key = if c.is_ascii_lowercase() {
            KeyCode::Char(c.to_ascii_uppercase())
        } else {
            self.key
        };
        Self {
            mods: Mods {
                shift: false,
                ..self.mods
            },
            key,
        }
    }

    /// The character typed, if this is an unmodified printable key.
    pub fn printable(&self) -> Option<char> {
        match self.normalize() {
            Self {
                mods,
                key: KeyCode::Char(c),
            } if mods == Empty && !c.is_control() => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mods.ctrl {
            f.write_str("ctrl ")?;
        }
        if self.mods.alt {
            f.write_str("meta ")?;
        }
        if self.mods.shift && self.key != KeyCode::BackTab {
            f.write_str("shift ")?;
        }
        write!(f, "{}", self.key)
    }
}

impl PartialEq<KeyCode> for Key {
    fn eq(&self, c: &KeyCode) -> bool {
        self.mods == Empty && *c == self.key
    }
}

impl PartialEq<char> for Key {
    fn eq(&self, c: &char) -> bool {
        *self == KeyCode::Char(*c)
    }
}

impl PartialEq<Key> for char {
    fn eq(&self, k: &Key) -> bool {
        *k == KeyCode::Char(*self)
    }
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        Self {
            mods: Empty,
            key: KeyCode::Char(c),
        }
    }
}

impl From<KeyCode> for Key {
    fn from(c: KeyCode) -> Self {
        Self {
            mods: Empty,
            key: c,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize() {
        assert_eq!((Shift + 'A').normalize(), 'A');
        assert_eq!((Shift + 'a').normalize(), 'A');
        assert_eq!((Shift + ')').normalize(), ')');
        assert_eq!((Shift + ' ').normalize(), Shift + ' ');
        assert_eq!((Shift + KeyCode::Enter).normalize(), Shift + KeyCode::Enter);
        assert_eq!((Shift + Alt + 'A').normalize(), Alt + 'A');
    }

    #[test]
    fn names() {
        assert_eq!(Key::from(KeyCode::PageDown).to_string(), "page down");
        assert_eq!((Ctrl + 'x').to_string(), "ctrl x");
        assert_eq!((Alt + KeyCode::Up).to_string(), "meta up");
        assert_eq!((Shift + KeyCode::BackTab).to_string(), "shift tab");
        assert_eq!(Key::from('a').printable(), Some('a'));
        assert_eq!((Shift + 'a').printable(), Some('A'));
        assert_eq!((Ctrl + 'a').printable(), None);
    }

    #[test]
    fn printable_needs_no_modifiers() {
        assert_eq!(Key::from(' ').printable(), Some(' '));
        assert_eq!(Key::from('\t').printable(), None);
        assert_eq!((Alt + 'a').printable(), None);
        assert_eq!((Ctrl + Shift + 'a').printable(), None);
        assert_eq!(Key::from(KeyCode::Enter).printable(), None);
    }
}
