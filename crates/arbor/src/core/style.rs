//! Terminal colors and styles, and the palette that maps attribute tokens
//! to them.
use std::{collections::HashMap, fmt, fs, path::Path, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A terminal color value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    /// The terminal's own default color.
    #[default]
    Reset,
    /// Black.
    Black,
    /// Dark grey.
    DarkGrey,
    /// Red.
    Red,
    /// Dark red.
    DarkRed,
    /// Green.
    Green,
    /// Dark green.
    DarkGreen,
    /// Yellow.
    Yellow,
    /// Dark yellow.
    DarkYellow,
    /// Blue.
    Blue,
    /// Dark blue.
    DarkBlue,
    /// Magenta.
    Magenta,
    /// Dark magenta.
    DarkMagenta,
    /// Cyan.
    Cyan,
    /// Dark cyan.
    DarkCyan,
    /// White.
    White,
    /// Grey.
    Grey,
    /// RGB color.
    Rgb {
        /// Red channel.
        r: u8,
        /// Green channel.
        g: u8,
        /// Blue channel.
        b: u8,
    },
    /// A 256-color palette index.
    AnsiValue(u8),
}

/// A set of active text attributes.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AttrSet {
    /// Bold flag.
    pub bold: bool,
    /// Dim flag.
    pub dim: bool,
    /// Italic flag.
    pub italic: bool,
    /// Underline flag.
    pub underline: bool,
    /// Reverse video flag.
    pub reverse: bool,
    /// Crossed out flag.
    pub crossedout: bool,
}

/// A fully specified terminal style.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    /// Foreground color.
    pub fg: Color,
    /// Background color.
    pub bg: Color,
    /// Text attributes.
    pub attrs: AttrSet,
}

impl Style {
    /// A style with the given colors and no attributes.
    pub fn new(fg: Color, bg: Color) -> Self {
        Self {
            fg,
            bg,
            attrs: AttrSet::default(),
        }
    }

    /// Builder: turn on bold.
    pub fn bold(mut self) -> Self {
        self.attrs.bold = true;
        self
    }

    /// Builder: turn on reverse video.
    pub fn reverse(mut self) -> Self {
        self.attrs.reverse = true;
        self
    }

    /// Builder: turn on underline.
    pub fn underline(mut self) -> Self {
        self.attrs.underline = true;
        self
    }
}

/// An opaque display attribute token carried by canvas cells. Only the
/// display backend gives it meaning, by looking it up in a [`Palette`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Attr(Rc<str>);

impl Attr {
    /// Construct an attribute token.
    pub fn new(name: &str) -> Self {
        Self(Rc::from(name))
    }

    /// The token's name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attr({})", self.0)
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Attr {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A substitution table for attribute tokens. The `None` key stands for
/// cells that carry no attribute at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrMapping {
    /// Substitutions.
    map: HashMap<Option<Attr>, Option<Attr>>,
}

impl AttrMapping {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mapping that only paints unattributed cells.
    pub fn fill(attr: &str) -> Self {
        Self::new().with(None, Some(attr))
    }

    /// Builder: add a substitution.
    pub fn with(mut self, from: Option<&str>, to: Option<&str>) -> Self {
        self.map.insert(from.map(Attr::new), to.map(Attr::new));
        self
    }

    /// Map an attribute, passing unknown attributes through unchanged.
    pub fn apply(&self, attr: &Option<Attr>) -> Option<Attr> {
        match self.map.get(attr) {
            Some(to) => to.clone(),
            None => attr.clone(),
        }
    }

    /// Is the mapping empty?
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Maps attribute names to styles. Unknown attributes and the `None`
/// attribute resolve to the default style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    /// Style used for cells with no attribute or an unknown one.
    #[serde(default)]
    pub default: Style,
    /// Named entries.
    #[serde(default)]
    pub entries: HashMap<String, Style>,
}

impl Palette {
    /// An empty palette.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add or replace an entry.
    pub fn with(mut self, name: &str, style: Style) -> Self {
        self.entries.insert(name.to_string(), style);
        self
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, name: &str, style: Style) {
        self.entries.insert(name.to_string(), style);
    }

    /// Resolve an attribute to a style.
    pub fn resolve(&self, attr: Option<&Attr>) -> Style {
        attr.and_then(|a| self.entries.get(a.name()))
            .copied()
            .unwrap_or(self.default)
    }

    /// Parse a palette from JSON.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a palette from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        Self::from_json(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping() {
        let m = AttrMapping::fill("body").with(Some("a"), Some("b"));
        assert_eq!(m.apply(&None), Some(Attr::new("body")));
        assert_eq!(m.apply(&Some(Attr::new("a"))), Some(Attr::new("b")));
        assert_eq!(m.apply(&Some(Attr::new("c"))), Some(Attr::new("c")));
    }

    #[test]
    fn palette_json() -> Result<()> {
        let p = Palette::from_json(
            r#"{
                "default": {"fg": "white", "bg": "black"},
                "entries": {
                    "focus": {"fg": "black", "bg": "yellow", "attrs": {"bold": true}},
                    "rgb": {"fg": {"rgb": {"r": 1, "g": 2, "b": 3}}}
                }
            }"#,
        )?;
        assert_eq!(p.resolve(None), Style::new(Color::White, Color::Black));
        assert_eq!(
            p.resolve(Some(&Attr::new("focus"))),
            Style::new(Color::Black, Color::Yellow).bold()
        );
        assert_eq!(
            p.resolve(Some(&Attr::new("rgb"))).fg,
            Color::Rgb { r: 1, g: 2, b: 3 }
        );
        assert_eq!(p.resolve(Some(&Attr::new("missing"))), p.default);
        assert!(Palette::from_json("{").is_err());
        Ok(())
    }
}
