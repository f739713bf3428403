//! Assertions over rendered canvases.
use crate::{canvas::Canvas, style::Attr};

/// Build the expected-lines slice for canvas assertions.
#[macro_export]
macro_rules! buf {
    ($($line:literal)*) => {
        &[$($line),*]
    };
}

/// Matches a canvas against expected text lines. Trailing whitespace is
/// ignored on both sides.
pub struct CanvasTest {
    /// Materialized rows.
    lines: Vec<String>,
    /// Attribute runs per row.
    runs: Vec<Vec<(Option<Attr>, String)>>,
    /// Optional wildcard character.
    any_char: Option<char>,
}

impl CanvasTest {
    /// Materialize a canvas for testing.
    pub fn new(canvas: &Canvas) -> Self {
        Self {
            lines: canvas.text_lines(),
            runs: canvas.attr_runs(),
            any_char: None,
        }
    }

    /// Set a character that matches any character in the canvas.
    pub fn with_any(mut self, any_char: char) -> Self {
        self.any_char = Some(any_char);
        self
    }

    /// The canvas rows as strings.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns true if the canvas matches the expected lines.
    pub fn matches(&self, expected: &[&str]) -> bool {
        if expected.len() != self.lines.len() {
            return false;
        }
        expected.iter().zip(&self.lines).all(|(e, a)| {
            let e = e.trim_end();
            let a = a.trim_end();
            e.chars().count() == a.chars().count()
                && e.chars()
                    .zip(a.chars())
                    .all(|(ec, ac)| Some(ec) == self.any_char || ec == ac)
        })
    }

    /// Assert that the canvas matches, printing both side by side on failure.
    pub fn assert_matches(&self, expected: &[&str]) {
        if self.matches(expected) {
            return;
        }
        let width = expected
            .iter()
            .map(|l| l.chars().count())
            .chain(self.lines.iter().map(|l| l.chars().count()))
            .max()
            .unwrap_or(10)
            .max(10);
        println!("\nExpected:");
        Self::boxed(expected.iter().copied(), width);
        println!("\nActual:");
        Self::boxed(self.lines.iter().map(String::as_str), width);
        panic!("canvas contents did not match expected pattern");
    }

    /// Print lines in a box.
    fn boxed<'a>(lines: impl Iterator<Item = &'a str>, width: usize) {
        println!("┌{}┐", "─".repeat(width));
        for line in lines {
            println!("│{line:width$}│");
        }
        println!("└{}┘", "─".repeat(width));
    }

    /// Does any row contain `txt`?
    pub fn contains_text(&self, txt: &str) -> bool {
        self.lines.iter().any(|l| l.contains(txt))
    }

    /// Does any row contain `txt` inside a single run carrying `attr`?
    pub fn contains_text_attr(&self, txt: &str, attr: Option<&str>) -> bool {
        let attr = attr.map(Attr::new);
        self.runs
            .iter()
            .flatten()
            .any(|(a, s)| *a == attr && s.contains(txt))
    }

    /// Print the canvas with rulers, for debugging.
    pub fn dump(&self) {
        let width = self.lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        println!("┌{}┐", "─".repeat(width));
        for (y, line) in self.lines.iter().enumerate() {
            println!("│{line:width$}│{}", y % 10);
        }
        println!("└{}┘", "─".repeat(width));
    }
}
