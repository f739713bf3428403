//! Text layout: a pure mapping from text and a width to line segments.
use std::iter::repeat_n;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Horizontal alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    /// Flush left.
    #[default]
    Left,
    /// Centered, rounding left.
    Center,
    /// Flush right.
    Right,
    /// A percentage of the free space to the left.
    Relative(u32),
}

impl Align {
    /// The leading offset for content of width `used` in `width` columns.
    pub fn offset(&self, width: u32, used: u32) -> u32 {
        let free = width.saturating_sub(used);
        match self {
            Self::Left => 0,
            Self::Center => free / 2,
            Self::Right => free,
            Self::Relative(p) => free * (*p).min(100) / 100,
        }
    }
}

/// How lines wider than the available width are broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Wrap {
    /// Break between words, splitting words only when they don't fit.
    #[default]
    Space,
    /// Break anywhere.
    Any,
    /// Never break; overflow is clipped.
    Clip,
    /// Never break; overflow is replaced with an ellipsis.
    Ellipsis,
}

/// One laid-out line: a byte range of the source text, placed at a column
/// offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineLayout {
    /// Start byte.
    pub start: usize,
    /// End byte (exclusive).
    pub end: usize,
    /// Leading blank columns.
    pub offset: u32,
    /// Display width of the segment, excluding the offset.
    pub width: u32,
    /// The segment was cut short and should be followed by an ellipsis.
    pub ellipsis: bool,
}

/// Display width of a grapheme cluster, clamped to terminal cell widths.
pub fn grapheme_width(grapheme: &str) -> usize {
    if grapheme.is_empty() {
        return 0;
    }
    UnicodeWidthStr::width(grapheme).clamp(1, 2)
}

/// Display width of a string in terminal cells.
pub fn display_width(s: &str) -> u32 {
    s.graphemes(true).map(grapheme_width).sum::<usize>() as u32
}

/// The byte length of the longest prefix of `s` fitting in `max` columns,
/// and its width.
pub fn prefix_by_width(s: &str, max: u32) -> (usize, u32) {
    let mut used = 0;
    for (idx, g) in s.grapheme_indices(true) {
        let w = grapheme_width(g) as u32;
        if used + w > max {
            return (idx, used);
        }
        used += w;
    }
    (s.len(), used)
}

/// Expand tabs into spaces using the given tab stop.
pub fn expand_tabs(s: &str, tab_stop: usize) -> String {
    let tab_stop = tab_stop.max(1);
    let mut out = String::new();
    let mut col = 0usize;
    for grapheme in s.graphemes(true) {
        match grapheme {
            "\t" => {
                let width = tab_stop - col % tab_stop;
                out.extend(repeat_n(' ', width));
                col += width;
            }
            "\n" | "\r\n" => {
                out.push('\n');
                col = 0;
            }
            g => {
                out.push_str(g);
                col += grapheme_width(g);
            }
        }
    }
    out
}

/// Break one source line (no newlines) into `(start, end)` byte ranges.
fn break_line(line: &str, width: u32, wrap: Wrap) -> Vec<(usize, usize)> {
    if line.is_empty() {
        return vec![(0, 0)];
    }
    match wrap {
        Wrap::Clip | Wrap::Ellipsis => vec![(0, line.len())],
        Wrap::Any => {
            let width = width.max(1);
            let mut out = vec![];
            let mut start = 0;
            let mut used = 0;
            for (idx, g) in line.grapheme_indices(true) {
                let w = grapheme_width(g) as u32;
                if used + w > width && idx > start {
                    out.push((start, idx));
                    start = idx;
                    used = 0;
                }
                used += w;
            }
            out.push((start, line.len()));
            out
        }
        Wrap::Space => {
            let mut out = vec![];
            let mut cursor = 0;
            for piece in textwrap::wrap(line, width.max(1) as usize) {
                let start = line[cursor..]
                    .find(piece.as_ref())
                    .map_or(cursor, |i| cursor + i);
                let end = start + piece.len();
                out.push((start, end));
                cursor = end;
            }
            if out.is_empty() {
                out.push((0, 0));
            }
            out
        }
    }
}

/// Lay out `text` in `width` columns. Explicit newlines always break.
/// Every returned segment fits in `width` except under [`Wrap::Clip`].
pub fn layout(text: &str, width: u32, align: Align, wrap: Wrap) -> Vec<LineLayout> {
    let mut out = vec![];
    let mut base = 0;
    for line in text.split('\n') {
        for (s, e) in break_line(line, width, wrap) {
            let mut seg = LineLayout {
                start: base + s,
                end: base + e,
                offset: 0,
                width: display_width(&line[s..e]),
                ellipsis: false,
            };
            if wrap == Wrap::Ellipsis && seg.width > width {
                let (len, w) = prefix_by_width(&line[s..e], width.saturating_sub(1));
                seg.end = seg.start + len;
                seg.width = w;
                seg.ellipsis = width > 0;
            }
            let shown = seg.width + u32::from(seg.ellipsis);
            seg.offset = align.offset(width, shown);
            out.push(seg);
        }
        base += line.len() + 1;
    }
    out
}

/// The width of the widest line when no wrapping is applied.
pub fn natural_width(text: &str) -> u32 {
    text.split('\n').map(display_width).max().unwrap_or(0)
}

/// Map a byte position to `(x, y)` screen coordinates within a layout.
/// Positions inside whitespace dropped by wrapping map to the end of the
/// preceding line.
pub fn pos_to_coords(text: &str, layout: &[LineLayout], pos: usize) -> (u32, u32) {
    let mut best = (0, 0);
    for (y, seg) in layout.iter().enumerate() {
        if pos < seg.start {
            break;
        }
        let upto = pos.min(seg.end);
        best = (seg.offset + display_width(&text[seg.start..upto]), y as u32);
        if pos < seg.end {
            break;
        }
    }
    best
}

/// Map screen coordinates to the nearest byte position within a layout.
pub fn coords_to_pos(text: &str, layout: &[LineLayout], x: u32, y: u32) -> usize {
    let Some(seg) = layout.get(y as usize).or(layout.last()) else {
        return 0;
    };
    let target = x.saturating_sub(seg.offset);
    let (len, _) = prefix_by_width(&text[seg.start..seg.end], target);
    seg.start + len
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines<'a>(text: &'a str, l: &[LineLayout]) -> Vec<&'a str> {
        l.iter().map(|s| &text[s.start..s.end]).collect()
    }

    #[test]
    fn wrap_modes() {
        let t = "hello big world";
        assert_eq!(
            lines(t, &layout(t, 9, Align::Left, Wrap::Space)),
            vec!["hello big", "world"]
        );
        assert_eq!(
            lines(t, &layout(t, 6, Align::Left, Wrap::Any)),
            vec!["hello ", "big wo", "rld"]
        );
        assert_eq!(lines(t, &layout(t, 6, Align::Left, Wrap::Clip)), vec![t]);
        let e = layout(t, 6, Align::Left, Wrap::Ellipsis);
        assert_eq!(lines(t, &e), vec!["hello"]);
        assert!(e[0].ellipsis);
        assert_eq!(
            lines("a\n\nb", &layout("a\n\nb", 5, Align::Left, Wrap::Space)),
            vec!["a", "", "b"]
        );
    }

    #[test]
    fn alignment() {
        let l = layout("ab", 6, Align::Center, Wrap::Space);
        assert_eq!(l[0].offset, 2);
        let l = layout("ab", 6, Align::Right, Wrap::Space);
        assert_eq!(l[0].offset, 4);
        let l = layout("ab", 6, Align::Relative(50), Wrap::Space);
        assert_eq!(l[0].offset, 2);
    }

    #[test]
    fn wide_and_tabs() {
        assert_eq!(display_width("a界b"), 4);
        let t = "界界界";
        assert_eq!(lines(t, &layout(t, 3, Align::Left, Wrap::Any)), vec!["界", "界", "界"]);
        assert_eq!(expand_tabs("a\tb", 4), "a   b");
        assert_eq!(expand_tabs("界\tb", 4), "界  b");
    }

    #[test]
    fn coordinates() {
        let t = "abcdefgh";
        let l = layout(t, 3, Align::Left, Wrap::Any);
        assert_eq!(pos_to_coords(t, &l, 0), (0, 0));
        assert_eq!(pos_to_coords(t, &l, 4), (1, 1));
        assert_eq!(pos_to_coords(t, &l, 8), (2, 2));
        assert_eq!(coords_to_pos(t, &l, 1, 1), 4);
        assert_eq!(coords_to_pos(t, &l, 9, 2), 8);
        assert_eq!(coords_to_pos(t, &l, 0, 7), 6);
    }
}
