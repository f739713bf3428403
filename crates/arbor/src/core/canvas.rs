//! Canvases are immutable grids of rendered cells.
//!
//! A plain canvas owns its content: text rows with run-length attribute
//! spans, or a single fill glyph. A composite canvas owns nothing but an
//! ordered list of placements, each referencing a child canvas, a location
//! and the visible region of the child. Building a composite is
//! proportional to the number of children, not the number of cells;
//! content is only materialized when someone asks for it, usually the
//! display backend.
//!
//! Once a widget has rendered a canvas, [`finalize`] stamps it with its
//! owner. An owned canvas is never modified again: operations that need a
//! different canvas build a new composite that references the old one.
use std::{
    cell::{Cell as StdCell, OnceCell},
    fmt,
    rc::Rc,
};

use unicode_segmentation::UnicodeSegmentation;

use crate::{
    cache,
    error::{Error, Result},
    geom::{Expanse, Point, Rect},
    id::{EntryKey, WidgetId},
    sizing::RenderSize,
    style::{Attr, AttrMapping},
    text::{display_width, grapheme_width},
};

/// Shared handle to a canvas.
pub type CanvasRef = Rc<Canvas>;

/// A materialized terminal cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Base glyph character.
    pub ch: char,
    /// Additional grapheme characters stored with the base glyph.
    pub suffix: String,
    /// Display attribute.
    pub attr: Option<Attr>,
    /// True when this cell holds the left half of a double-width glyph.
    pub wide: bool,
    /// True when this cell continues a wide glyph from the previous column.
    pub continuation: bool,
}

impl Cell {
    /// A single-width cell.
    pub fn new(ch: char, attr: Option<Attr>) -> Self {
        Self {
            ch,
            suffix: String::new(),
            attr,
            wide: false,
            continuation: false,
        }
    }

    /// A space.
    pub fn blank(attr: Option<Attr>) -> Self {
        Self::new(' ', attr)
    }

    /// Continuation of a wide glyph.
    fn continuation(attr: Option<Attr>) -> Self {
        Self {
            ch: ' ',
            suffix: String::new(),
            attr,
            wide: false,
            continuation: true,
        }
    }

    /// Append this cell's renderable text to the output buffer.
    pub fn push_text(&self, out: &mut String) {
        if self.continuation {
            return;
        }
        out.push(self.ch);
        out.push_str(&self.suffix);
    }
}

/// Break a grapheme cluster into a cell, returning it with its width.
fn grapheme_cell(g: &str, attr: Option<Attr>) -> (Cell, usize) {
    let mut chars = g.chars();
    let ch = chars.next().unwrap_or(' ');
    let width = grapheme_width(g);
    let cell = Cell {
        ch,
        suffix: chars.collect(),
        attr,
        wide: width >= 2,
        continuation: false,
    };
    (cell, width)
}

/// Replace wide glyphs that have been split by a clip edge with spaces.
fn fix_wide(row: &mut [Cell]) {
    for x in 0..row.len() {
        if row[x].continuation {
            let led = x > 0 && row[x - 1].wide && !row[x - 1].continuation;
            if !led {
                row[x] = Cell::blank(row[x].attr.clone());
            }
        } else if row[x].wide {
            let followed = x + 1 < row.len() && row[x + 1].continuation;
            if !followed {
                row[x] = Cell::blank(row[x].attr.clone());
            }
        }
    }
}

/// One row of a text canvas: the text plus run-length attribute spans
/// measured in columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextRow {
    /// Row text.
    text: String,
    /// `(attribute, column count)` runs, left to right.
    spans: Vec<(Option<Attr>, u32)>,
}

impl TextRow {
    /// A row with a single attribute across its whole width.
    pub fn new(text: &str, attr: Option<Attr>) -> Self {
        let w = display_width(text);
        Self {
            text: text.to_string(),
            spans: vec![(attr, w)],
        }
    }

    /// A row with explicit attribute runs. Columns past the last run have
    /// no attribute.
    pub fn with_spans(text: &str, spans: Vec<(Option<Attr>, u32)>) -> Self {
        Self {
            text: text.to_string(),
            spans,
        }
    }

    /// Display width of the row text.
    pub fn width(&self) -> u32 {
        display_width(&self.text)
    }

    /// The attribute covering column `x`.
    fn attr_at(&self, x: u32) -> Option<Attr> {
        let mut end = 0;
        for (attr, n) in &self.spans {
            end += n;
            if x < end {
                return attr.clone();
            }
        }
        None
    }

    /// Materialize into exactly `width` cells, padding with blanks.
    fn cells(&self, width: u32) -> Vec<Cell> {
        let mut out = Vec::with_capacity(width as usize);
        for g in self.text.graphemes(true) {
            let x = out.len() as u32;
            if x >= width {
                break;
            }
            let (cell, w) = grapheme_cell(g, self.attr_at(x));
            let attr = cell.attr.clone();
            out.push(cell);
            for _ in 1..w {
                out.push(Cell::continuation(attr.clone()));
            }
        }
        while (out.len() as u32) < width {
            let x = out.len() as u32;
            out.push(Cell::blank(self.attr_at(x)));
        }
        out.truncate(width as usize);
        fix_wide(&mut out);
        out
    }
}

/// A child canvas placed inside a composite.
#[derive(Clone, Debug)]
pub struct Placement {
    /// The child canvas.
    pub canvas: CanvasRef,
    /// Where the visible region lands in the parent.
    pub at: Point,
    /// The visible region, in child coordinates.
    pub view: Rect,
    /// Attribute substitutions applied to the child's cells.
    pub mapping: Option<Rc<AttrMapping>>,
}

impl Placement {
    /// Place the whole of `canvas` at `at`.
    pub fn whole(canvas: CanvasRef, at: Point) -> Self {
        let view = canvas.size().rect();
        Self {
            canvas,
            at,
            view,
            mapping: None,
        }
    }
}

/// The widget render call that produced a canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Owner {
    /// The rendering widget.
    pub widget: WidgetId,
    /// The size argument passed to render.
    pub size: RenderSize,
    /// The focus argument passed to render.
    pub focus: bool,
}

/// Canvas content.
#[derive(Debug)]
enum Body {
    /// Text rows.
    Text(Vec<TextRow>),
    /// A single repeated glyph.
    Solid {
        /// Fill glyph.
        ch: char,
        /// Fill attribute.
        attr: Option<Attr>,
    },
    /// References to other canvases.
    Composite(Vec<Placement>),
}

/// A rectangular grid of cells with an optional cursor.
pub struct Canvas {
    /// Declared size.
    size: Expanse,
    /// Cursor location, always inside `size`.
    cursor: Option<Point>,
    /// Content.
    body: Body,
    /// Set once by [`finalize`].
    owner: OnceCell<Owner>,
    /// Cache slot currently pointing at this canvas.
    slot: StdCell<Option<EntryKey>>,
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.body {
            Body::Text(_) => "text",
            Body::Solid { .. } => "solid",
            Body::Composite(_) => "composite",
        };
        f.debug_struct("Canvas")
            .field("kind", &kind)
            .field("size", &self.size)
            .field("cursor", &self.cursor)
            .field("owner", &self.owner.get())
            .finish()
    }
}

impl Drop for Canvas {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.get() {
            cache::release(slot);
        }
    }
}

impl Canvas {
    /// Internal constructor.
    fn build(size: Expanse, cursor: Option<Point>, body: Body) -> Result<CanvasRef> {
        if let Some(c) = cursor
            && !size.contains_point(c)
        {
            return Err(Error::Canvas(format!(
                "cursor {},{} outside {}x{} canvas",
                c.x, c.y, size.w, size.h
            )));
        }
        Ok(Rc::new(Self {
            size,
            cursor,
            body,
            owner: OnceCell::new(),
            slot: StdCell::new(None),
        }))
    }

    /// A text canvas. The width is that of the widest row unless `width`
    /// is given; shorter rows are padded with blanks.
    pub fn text(rows: Vec<TextRow>, width: Option<u32>, cursor: Option<Point>) -> Result<CanvasRef> {
        let natural = rows.iter().map(TextRow::width).max().unwrap_or(0);
        let w = width.unwrap_or(natural);
        let size = Expanse::new(w, rows.len() as u32);
        Self::build(size, cursor, Body::Text(rows))
    }

    /// A canvas filled with one glyph.
    pub fn solid(ch: char, attr: Option<Attr>, size: Expanse) -> CanvasRef {
        Rc::new(Self {
            size,
            cursor: None,
            body: Body::Solid { ch, attr },
            owner: OnceCell::new(),
            slot: StdCell::new(None),
        })
    }

    /// A canvas of spaces.
    pub fn blank(size: Expanse) -> CanvasRef {
        Self::solid(' ', None, size)
    }

    /// A composite canvas. Placements must lie within `size`.
    pub fn composite(
        size: Expanse,
        placements: Vec<Placement>,
        cursor: Option<Point>,
    ) -> Result<CanvasRef> {
        let bounds = size.rect();
        for p in &placements {
            let target = Rect::new(p.at.x, p.at.y, p.view.w, p.view.h);
            if !bounds.contains_rect(&target) || !p.canvas.size().rect().contains_rect(&p.view) {
                return Err(Error::Canvas(format!(
                    "placement {target:?} of {:?} escapes {}x{}",
                    p.view, size.w, size.h
                )));
            }
        }
        Self::build(size, cursor, Body::Composite(placements))
    }

    /// Declared size.
    pub fn size(&self) -> Expanse {
        self.size
    }

    /// Width in columns.
    pub fn cols(&self) -> u32 {
        self.size.w
    }

    /// Height in rows.
    pub fn rows(&self) -> u32 {
        self.size.h
    }

    /// The cursor, if any.
    pub fn cursor(&self) -> Option<Point> {
        self.cursor
    }

    /// The render call that produced this canvas, once finalized.
    pub fn owner(&self) -> Option<&Owner> {
        self.owner.get()
    }

    /// Placements of a composite canvas; empty for plain canvases.
    pub fn placements(&self) -> &[Placement] {
        match &self.body {
            Body::Composite(p) => p,
            _ => &[],
        }
    }

    /// Is this a composite canvas?
    pub fn is_composite(&self) -> bool {
        matches!(self.body, Body::Composite(_))
    }

    /// Record the cache slot that refers to this canvas.
    pub(crate) fn set_slot(&self, slot: Option<EntryKey>) {
        self.slot.set(slot);
    }

    /// The widgets whose canvases this one is built from. Owned children
    /// contribute their owner; unowned composites are walked through.
    pub fn depends(&self) -> Vec<WidgetId> {
        let mut out = vec![];
        for p in self.placements() {
            match p.canvas.owner() {
                Some(o) => out.push(o.widget),
                None => out.extend(p.canvas.depends()),
            }
        }
        out
    }

    /// Materialize the content as rows of cells.
    pub fn content(&self) -> Vec<Vec<Cell>> {
        let w = self.size.w as usize;
        let h = self.size.h as usize;
        match &self.body {
            Body::Text(rows) => {
                let mut out: Vec<Vec<Cell>> = rows.iter().map(|r| r.cells(self.size.w)).collect();
                out.resize(h, vec![Cell::blank(None); w]);
                out
            }
            Body::Solid { ch, attr } => {
                let mut s = String::new();
                while (display_width(&s) as usize) < w {
                    s.push(*ch);
                }
                let row = TextRow::new(&s, attr.clone()).cells(self.size.w);
                vec![row; h]
            }
            Body::Composite(placements) => {
                let mut grid = vec![vec![Cell::blank(None); w]; h];
                for p in placements {
                    let src = p.canvas.content();
                    for dy in 0..p.view.h {
                        let sy = (p.view.tl.y + dy) as usize;
                        let ty = (p.at.y + dy) as usize;
                        let (Some(srow), Some(trow)) = (src.get(sy), grid.get_mut(ty)) else {
                            continue;
                        };
                        for dx in 0..p.view.w {
                            let sx = (p.view.tl.x + dx) as usize;
                            let tx = (p.at.x + dx) as usize;
                            let (Some(cell), Some(target)) = (srow.get(sx), trow.get_mut(tx))
                            else {
                                continue;
                            };
                            let mut cell = cell.clone();
                            if let Some(m) = &p.mapping {
                                cell.attr = m.apply(&cell.attr);
                            }
                            *target = cell;
                        }
                    }
                }
                for row in grid.iter_mut() {
                    fix_wide(row);
                }
                grid
            }
        }
    }

    /// The content as plain text, one string per row.
    pub fn text_lines(&self) -> Vec<String> {
        self.content()
            .iter()
            .map(|row| {
                let mut s = String::new();
                for c in row {
                    c.push_text(&mut s);
                }
                s
            })
            .collect()
    }

    /// The content as runs of equally attributed text, one list per row.
    pub fn attr_runs(&self) -> Vec<Vec<(Option<Attr>, String)>> {
        self.content()
            .iter()
            .map(|row| {
                let mut runs: Vec<(Option<Attr>, String)> = vec![];
                for c in row {
                    match runs.last_mut() {
                        Some((a, s)) if *a == c.attr => c.push_text(s),
                        _ => {
                            let mut s = String::new();
                            c.push_text(&mut s);
                            runs.push((c.attr.clone(), s));
                        }
                    }
                }
                runs
            })
            .collect()
    }
}

/// Stamp a canvas with the render call that produced it. A canvas that
/// already has an owner is wrapped first, so owned canvases are never
/// changed.
pub fn finalize(canvas: CanvasRef, owner: Owner) -> CanvasRef {
    let canvas = if canvas.owner().is_some() {
        let size = canvas.size();
        let cursor = canvas.cursor();
        Rc::new(Canvas {
            size,
            cursor,
            body: Body::Composite(vec![Placement::whole(canvas, Point::zero())]),
            owner: OnceCell::new(),
            slot: StdCell::new(None),
        })
    } else {
        canvas
    };
    // Freshly built or freshly wrapped, so the cell is empty.
    let _ = canvas.owner.set(owner);
    canvas
}

/// Stack canvases top to bottom. The result is as wide as the widest
/// input. The cursor comes from the input marked as focus, or failing that
/// from the last input that has one.
pub fn combine(items: Vec<(CanvasRef, bool)>) -> Result<CanvasRef> {
    let w = items.iter().map(|(c, _)| c.cols()).max().unwrap_or(0);
    let mut y = 0;
    let mut cursor = None;
    let mut focus_cursor = None;
    let mut placements = Vec::with_capacity(items.len());
    for (c, focus) in items {
        if let Some(p) = c.cursor() {
            let p = Point::new(p.x, p.y + y);
            cursor = Some(p);
            if focus {
                focus_cursor = Some(p);
            }
        }
        let h = c.rows();
        placements.push(Placement::whole(c, Point::new(0, y)));
        y += h;
    }
    Canvas::composite(Expanse::new(w, y), placements, focus_cursor.or(cursor))
}

/// Place canvases left to right. Each item carries the number of columns
/// it occupies, which may exceed the canvas width to leave blank space
/// after it. The result is as tall as the tallest input.
pub fn join(items: Vec<(CanvasRef, bool, u32)>) -> Result<CanvasRef> {
    let h = items.iter().map(|(c, _, _)| c.rows()).max().unwrap_or(0);
    let mut x = 0;
    let mut cursor = None;
    let mut focus_cursor = None;
    let mut placements = Vec::with_capacity(items.len());
    for (c, focus, cols) in items {
        let view = Rect::new(0, 0, c.cols().min(cols), c.rows());
        if let Some(p) = c.cursor()
            && p.x < view.w
        {
            let p = Point::new(p.x + x, p.y);
            cursor = Some(p);
            if focus {
                focus_cursor = Some(p);
            }
        }
        placements.push(Placement {
            canvas: c,
            at: Point::new(x, 0),
            view,
            mapping: None,
        });
        x += cols;
    }
    Canvas::composite(Expanse::new(x, h), placements, focus_cursor.or(cursor))
}

/// Place `top` over `bottom` with its top-left corner at `(left, top_row)`.
/// Parts of `top` that fall outside `bottom` are clipped. The cursor is
/// always taken from `top`.
pub fn overlay(top: CanvasRef, bottom: CanvasRef, left: u32, top_row: u32) -> Result<CanvasRef> {
    let size = bottom.size();
    let view = Rect::new(
        0,
        0,
        top.cols().min(size.w.saturating_sub(left)),
        top.rows().min(size.h.saturating_sub(top_row)),
    );
    let cursor = top
        .cursor()
        .filter(|c| view.contains_point(*c))
        .map(|c| Point::new(c.x + left, c.y + top_row));
    let placements = vec![
        Placement::whole(bottom, Point::zero()),
        Placement {
            canvas: top,
            at: Point::new(left, top_row),
            view,
            mapping: None,
        },
    ];
    Canvas::composite(size, placements, cursor)
}

/// Shift a cursor by an offset, dropping it if it leaves `size`.
fn shift_cursor(cursor: Option<Point>, dx: i32, dy: i32, size: Expanse) -> Option<Point> {
    cursor
        .and_then(|c| c.offset(dx, dy))
        .filter(|c| size.contains_point(*c))
}

/// Pad (positive) or trim (negative) columns on the left and right.
pub fn pad_trim_left_right(canvas: CanvasRef, left: i32, right: i32) -> Result<CanvasRef> {
    let w = i64::from(canvas.cols()) + i64::from(left) + i64::from(right);
    if w < 0 {
        return Err(Error::Canvas(format!(
            "cannot trim {} columns from a {} column canvas",
            -(i64::from(left.min(0)) + i64::from(right.min(0))),
            canvas.cols()
        )));
    }
    let cut_left = left.min(0).unsigned_abs();
    let cut_right = right.min(0).unsigned_abs();
    let view_w = canvas.cols().saturating_sub(cut_left + cut_right);
    let size = Expanse::new(w as u32, canvas.rows());
    let cursor = shift_cursor(canvas.cursor(), left, 0, size);
    let view = canvas
        .size()
        .rect()
        .subrect(cut_left.min(canvas.cols()), 0, view_w, canvas.rows())?;
    let at = Point::new(left.max(0) as u32, 0);
    Canvas::composite(
        size,
        vec![Placement {
            canvas,
            at,
            view,
            mapping: None,
        }],
        cursor,
    )
}

/// Pad (positive) or trim (negative) rows on the top and bottom.
pub fn pad_trim_top_bottom(canvas: CanvasRef, top: i32, bottom: i32) -> Result<CanvasRef> {
    let h = i64::from(canvas.rows()) + i64::from(top) + i64::from(bottom);
    if h < 0 {
        return Err(Error::Canvas(format!(
            "cannot trim {} rows from a {} row canvas",
            -(i64::from(top.min(0)) + i64::from(bottom.min(0))),
            canvas.rows()
        )));
    }
    let cut_top = top.min(0).unsigned_abs();
    let cut_bottom = bottom.min(0).unsigned_abs();
    let view_h = canvas.rows().saturating_sub(cut_top + cut_bottom);
    let size = Expanse::new(canvas.cols(), h as u32);
    let cursor = shift_cursor(canvas.cursor(), 0, top, size);
    let view = canvas
        .size()
        .rect()
        .subrect(0, cut_top.min(canvas.rows()), canvas.cols(), view_h)?;
    let at = Point::new(0, top.max(0) as u32);
    Canvas::composite(
        size,
        vec![Placement {
            canvas,
            at,
            view,
            mapping: None,
        }],
        cursor,
    )
}

/// Keep `count` rows starting at row `top`, or every row from `top` on.
pub fn trim(canvas: CanvasRef, top: u32, count: Option<u32>) -> Result<CanvasRef> {
    let rows = canvas.rows();
    if top > rows {
        return Err(Error::Canvas(format!("cannot trim {top} rows from {rows}")));
    }
    let count = count.unwrap_or(rows - top).min(rows - top);
    let bottom = rows - top - count;
    pad_trim_top_bottom(canvas, -(top as i32), -(bottom as i32))
}

/// Drop `n` rows from the bottom.
pub fn trim_end(canvas: CanvasRef, n: u32) -> Result<CanvasRef> {
    pad_trim_top_bottom(canvas, 0, -(n as i32))
}

/// A copy of `canvas` with a different cursor.
pub fn with_cursor(canvas: CanvasRef, cursor: Option<Point>) -> Result<CanvasRef> {
    let size = canvas.size();
    Canvas::composite(size, vec![Placement::whole(canvas, Point::zero())], cursor)
}

/// A copy of `canvas` with attribute substitutions applied.
pub fn attr_map(canvas: CanvasRef, mapping: Rc<AttrMapping>) -> Result<CanvasRef> {
    let size = canvas.size();
    let cursor = canvas.cursor();
    let view = size.rect();
    Canvas::composite(
        size,
        vec![Placement {
            canvas,
            at: Point::zero(),
            view,
            mapping: Some(mapping),
        }],
        cursor,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{buf, testing::CanvasTest};

    fn text(lines: &[&str]) -> Result<CanvasRef> {
        Canvas::text(lines.iter().map(|l| TextRow::new(l, None)).collect(), None, None)
    }

    #[test]
    fn plain() -> Result<()> {
        let c = text(&["ab", "cdef"])?;
        assert_eq!(c.size(), Expanse::new(4, 2));
        CanvasTest::new(&c).assert_matches(buf!["ab  " "cdef"]);
        assert!(Canvas::text(vec![TextRow::new("ab", None)], None, Some(Point::new(2, 0))).is_err());

        let s = Canvas::solid('#', None, Expanse::new(3, 2));
        CanvasTest::new(&s).assert_matches(buf!["###" "###"]);
        Ok(())
    }

    #[test]
    fn combine_bounds() -> Result<()> {
        let a = text(&["a"])?;
        let b = Canvas::text(
            vec![TextRow::new("bbb", None), TextRow::new("b", None)],
            None,
            Some(Point::new(1, 1)),
        )?;
        let c = combine(vec![(a, false), (b, true)])?;
        assert_eq!(c.size(), Expanse::new(3, 3));
        assert_eq!(c.cursor(), Some(Point::new(1, 2)));
        assert!(c.is_composite());
        assert_eq!(c.placements().len(), 2);
        CanvasTest::new(&c).assert_matches(buf!["a  " "bbb" "b  "]);
        Ok(())
    }

    #[test]
    fn join_columns() -> Result<()> {
        let a = text(&["aa", "aa"])?;
        let b = Canvas::text(vec![TextRow::new("b", None)], None, Some(Point::new(0, 0)))?;
        let c = join(vec![(a, false, 3), (b, true, 1)])?;
        assert_eq!(c.size(), Expanse::new(4, 2));
        assert_eq!(c.cursor(), Some(Point::new(3, 0)));
        CanvasTest::new(&c).assert_matches(buf!["aa b" "aa  "]);
        Ok(())
    }

    #[test]
    fn overlay_cursor() -> Result<()> {
        let bottom = Canvas::solid('.', None, Expanse::new(5, 3));
        let top = Canvas::text(vec![TextRow::new("xyz", None)], None, Some(Point::new(2, 0)))?;
        let c = overlay(top.clone(), bottom.clone(), 1, 1)?;
        CanvasTest::new(&c).assert_matches(buf!["....." ".xyz." "....."]);
        assert_eq!(c.cursor(), Some(Point::new(3, 1)));

        // Clipped at the right edge, cursor with it.
        let c = overlay(top, bottom, 3, 2)?;
        CanvasTest::new(&c).assert_matches(buf!["....." "....." "...xy"]);
        assert_eq!(c.cursor(), None);
        Ok(())
    }

    #[test]
    fn pad_and_trim() -> Result<()> {
        let c = text(&["abcd", "efgh", "ijkl"])?;
        let t = trim(c.clone(), 1, Some(1))?;
        CanvasTest::new(&t).assert_matches(buf!["efgh"]);
        let t = trim_end(c.clone(), 2)?;
        CanvasTest::new(&t).assert_matches(buf!["abcd"]);
        let t = pad_trim_left_right(c.clone(), -1, 2)?;
        assert_eq!(t.size(), Expanse::new(5, 3));
        CanvasTest::new(&t).assert_matches(buf!["bcd  " "fgh  " "jkl  "]);
        let t = pad_trim_top_bottom(c.clone(), 1, -2)?;
        CanvasTest::new(&t).assert_matches(buf!["    " "abcd"]);
        assert!(pad_trim_left_right(c, -3, -2).is_err());
        Ok(())
    }

    #[test]
    fn wide_glyphs() -> Result<()> {
        let c = text(&["a世b"])?;
        assert_eq!(c.cols(), 4);
        // Splitting the wide glyph leaves a space behind.
        let t = pad_trim_left_right(c.clone(), -2, 0)?;
        assert_eq!(t.text_lines(), vec![" b".to_string()]);
        let t = pad_trim_left_right(c, 0, -2)?;
        assert_eq!(t.text_lines(), vec!["a ".to_string()]);
        Ok(())
    }

    #[test]
    fn attr_mapping() -> Result<()> {
        let c = Canvas::text(
            vec![TextRow::with_spans("ab", vec![(None, 1), (Some(Attr::new("x")), 1)])],
            None,
            None,
        )?;
        let m = attr_map(c, Rc::new(AttrMapping::fill("body").with(Some("x"), Some("y"))))?;
        let runs = m.attr_runs();
        assert_eq!(
            runs[0],
            vec![
                (Some(Attr::new("body")), "a".to_string()),
                (Some(Attr::new("y")), "b".to_string())
            ]
        );
        Ok(())
    }

    #[test]
    fn finalize_copy_on_write() -> Result<()> {
        let c = text(&["a"])?;
        let owner = Owner {
            widget: WidgetId::new(),
            size: RenderSize::Flow(1),
            focus: false,
        };
        let f = finalize(c.clone(), owner);
        assert!(Rc::ptr_eq(&c, &f));
        let other = Owner {
            widget: WidgetId::new(),
            ..owner
        };
        let g = finalize(f.clone(), other);
        assert!(!Rc::ptr_eq(&f, &g));
        assert_eq!(f.owner(), Some(&owner));
        assert_eq!(g.owner(), Some(&other));
        assert_eq!(g.depends(), vec![owner.widget]);

        // Unowned composites are walked through.
        let outer = combine(vec![(pad_trim_left_right(g.clone(), 0, 1)?, false)])?;
        assert_eq!(outer.depends(), vec![other.widget]);
        Ok(())
    }
}
