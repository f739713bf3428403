use crate::{
    canvas::{self, Canvas, CanvasRef},
    command_map::{self, Command},
    error::{Error, Result},
    event::{
        key::Key,
        mouse::{Button, MouseEvent},
    },
    geom::{Expanse, Point},
    id::WidgetId,
    sizing::{RenderSize, Sizing},
    widget::{PrefCol, Widget, WidgetRef},
    widgets::{
        container::{Container, Contents},
        pile::Extent,
    },
};

/// Per-column options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnOptions {
    /// Width of the column.
    pub extent: Extent,
    /// Render the column as a box as tall as the other columns, when the
    /// row of columns is itself a flow widget.
    pub box_column: bool,
}

impl ColumnOptions {
    /// Options for a flow column.
    pub fn new(extent: Extent) -> Self {
        Self {
            extent,
            box_column: false,
        }
    }

    /// Options for a box column.
    pub fn boxed(extent: Extent) -> Self {
        Self {
            extent,
            box_column: true,
        }
    }
}

/// Places children side by side.
pub struct Columns {
    /// Identity.
    id: WidgetId,
    /// Children and their options.
    contents: Contents<ColumnOptions>,
    /// Blank columns between children.
    dividechars: u32,
    /// Narrowest a weighted column may be.
    min_width: u32,
    /// Column to aim for when an enclosing container moves focus onto us.
    pref_col: Option<PrefCol>,
}

impl Columns {
    /// Columns of children, focused on the first selectable one.
    pub fn new(items: Vec<(WidgetRef, ColumnOptions)>) -> Self {
        let id = WidgetId::new();
        let contents = Contents::first_selectable(id, items);
        Self {
            id,
            contents,
            dividechars: 0,
            min_width: 1,
            pref_col: None,
        }
    }

    /// Equally weighted flow columns.
    pub fn from_widgets(widgets: Vec<WidgetRef>) -> Self {
        Self::new(
            widgets
                .into_iter()
                .map(|w| (w, ColumnOptions::new(Extent::Weight(1))))
                .collect(),
        )
    }

    /// Set the gap between columns.
    pub fn with_dividechars(mut self, dividechars: u32) -> Self {
        self.dividechars = dividechars;
        self
    }

    /// Set the minimum weighted column width.
    pub fn with_min_width(mut self, min_width: u32) -> Self {
        self.min_width = min_width;
        self
    }

    /// The children.
    pub fn contents(&self) -> &Contents<ColumnOptions> {
        &self.contents
    }

    /// The children, for modification.
    pub fn contents_mut(&mut self) -> &mut Contents<ColumnOptions> {
        &mut self.contents
    }

    /// Width of each column at `maxcol`. Columns past the end of the list
    /// or with width zero are hidden.
    pub fn column_widths(&self, maxcol: u32, focus: bool) -> Result<Vec<u32>> {
        let fi = self.contents.focus().unwrap_or(0);
        let div = i64::from(self.dividechars);
        let mut widths: Vec<u32> = vec![];
        let mut weighted: Vec<(u32, usize)> = vec![];
        let mut shared = i64::from(maxcol) + div;
        for (i, (w, opts)) in self.contents.iter().enumerate() {
            let static_w = match opts.extent {
                Extent::Given(n) => n,
                Extent::Pack => w.borrow_mut().pack(RenderSize::Flow(maxcol), focus && i == fi)?.0,
                Extent::Weight(_) => self.min_width,
            };
            if shared < i64::from(static_w) + div && i > fi {
                break;
            }
            widths.push(static_w);
            shared -= i64::from(static_w) + div;
            if let Extent::Weight(n) = opts.extent {
                weighted.push((n, i));
            }
        }
        // Hide leading columns until the rest fit.
        for i in 0..widths.len() {
            if shared >= 0 {
                break;
            }
            shared += i64::from(widths[i]) + div;
            widths[i] = 0;
            if weighted.first().is_some_and(|(_, j)| *j == i) {
                weighted.remove(0);
            }
        }
        if shared > 0 {
            weighted.sort();
            let mut wtotal: i64 = weighted.iter().map(|(n, _)| i64::from(*n)).sum();
            let mut grow = shared + weighted.len() as i64 * i64::from(self.min_width);
            for (weight, i) in weighted {
                if wtotal == 0 {
                    break;
                }
                let weight = i64::from(weight);
                let width = ((grow * weight * 2 + wtotal) / (wtotal * 2)).max(i64::from(self.min_width));
                widths[i] = width as u32;
                grow -= width;
                wtotal -= weight;
            }
        }
        Ok(widths)
    }

    /// Rows taken by the non-box columns in a flow row of columns.
    fn flow_rows(&self, widths: &[u32], focus: bool) -> Result<u32> {
        let fi = self.contents.focus();
        let mut rows = 1;
        for (i, (mc, (w, opts))) in widths.iter().zip(self.contents.iter()).enumerate() {
            if opts.box_column {
                continue;
            }
            rows = rows.max(w.borrow_mut().rows(*mc, focus && fi == Some(i))?);
        }
        Ok(rows)
    }

    /// The size column `i` is rendered at.
    fn column_size(&self, size: RenderSize, i: usize, width: u32, box_rows: u32) -> RenderSize {
        let boxed = self.contents.options(i).is_some_and(|o| o.box_column);
        match size {
            RenderSize::Flow(_) if boxed => RenderSize::boxed(width, box_rows),
            s => s.with_cols(width),
        }
    }

    /// Rows given to box columns, computed only when needed.
    fn box_rows(&self, size: RenderSize, widths: &[u32], focus: bool) -> Result<u32> {
        match size {
            RenderSize::Flow(_) if self.contents.iter().any(|(_, o)| o.box_column) => {
                self.flow_rows(widths, focus)
            }
            _ => Ok(size.rows().unwrap_or(1)),
        }
    }
}

impl Container for Columns {
    type Position = usize;

    fn focus(&self) -> Option<WidgetRef> {
        self.contents.focus().and_then(|i| self.contents.widget(i))
    }

    fn focus_position(&self) -> Result<usize> {
        self.contents
            .focus()
            .ok_or_else(|| Error::OutOfRange("columns is empty".into()))
    }

    fn set_focus_position(&mut self, position: usize) -> Result<()> {
        self.contents.set_focus(position)
    }
}

impl Widget for Columns {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn name(&self) -> &'static str {
        "columns"
    }

    fn sizing(&self) -> Sizing {
        Sizing::BOX | Sizing::FLOW
    }

    fn selectable(&self) -> bool {
        self.focus().is_some_and(|w| w.borrow().selectable())
    }

    fn rows(&mut self, cols: u32, focus: bool) -> Result<u32> {
        let widths = self.column_widths(cols, focus)?;
        self.flow_rows(&widths, focus)
    }

    fn render(&mut self, size: RenderSize, focus: bool) -> Result<CanvasRef> {
        let maxcol = size.cols().unwrap_or(0);
        let widths = self.column_widths(maxcol, focus)?;
        let box_rows = self.box_rows(size, &widths, focus)?;
        let fi = self.contents.focus();
        let mut parts = vec![];
        for (i, (mc, (w, _))) in widths.iter().zip(self.contents.iter()).enumerate() {
            if *mc == 0 {
                continue;
            }
            let s = self.column_size(size, i, *mc, box_rows);
            let item_focus = fi == Some(i);
            let c = w.borrow_mut().render(s, focus && item_focus)?;
            let span = if i + 1 < widths.len() { mc + self.dividechars } else { *mc };
            parts.push((c, item_focus, span));
        }
        if parts.is_empty() {
            return Ok(Canvas::blank(Expanse::new(maxcol, size.rows().unwrap_or(1))));
        }
        let out = canvas::join(parts)?;
        if out.cols() < maxcol {
            let pad = maxcol - out.cols();
            return canvas::pad_trim_left_right(out, 0, pad as i32);
        }
        Ok(out)
    }

    fn keypress(&mut self, size: RenderSize, key: Key) -> Result<Option<Key>> {
        let Some(i) = self.contents.focus() else {
            return Ok(Some(key));
        };
        let widths = self.column_widths(size.cols().unwrap_or(0), true)?;
        let Some(mc) = widths.get(i).copied() else {
            return Ok(Some(key));
        };
        if !matches!(
            command_map::lookup(&key),
            Some(
                Command::CursorUp
                    | Command::CursorDown
                    | Command::CursorPageUp
                    | Command::CursorPageDown
            )
        ) {
            self.pref_col = None;
        }
        let mut key = key;
        if let Some(w) = self.focus()
            && w.borrow().selectable()
        {
            let box_rows = self.box_rows(size, &widths, true)?;
            let s = self.column_size(size, i, mc, box_rows);
            match w.borrow_mut().keypress(s, key)? {
                None => return Ok(None),
                Some(k) => key = k,
            }
        }
        let candidates: Vec<usize> = match command_map::lookup(&key) {
            Some(Command::CursorLeft) => (0..i).rev().collect(),
            Some(Command::CursorRight) => (i + 1..self.contents.len()).collect(),
            _ => return Ok(Some(key)),
        };
        for j in candidates {
            if self.contents.widget(j).is_some_and(|w| w.borrow().selectable()) {
                self.contents.set_focus(j)?;
                return Ok(None);
            }
        }
        Ok(Some(key))
    }

    fn mouse_event(&mut self, size: RenderSize, event: MouseEvent, focus: bool) -> Result<bool> {
        let widths = self.column_widths(size.cols().unwrap_or(0), focus)?;
        let col = event.location.x;
        let mut x = 0;
        for (i, width) in widths.iter().enumerate() {
            if col < x {
                return Ok(false);
            }
            let end = x + width;
            if col >= end {
                x = end + self.dividechars;
                continue;
            }
            let Some(w) = self.contents.widget(i) else {
                return Ok(false);
            };
            let item_focus = focus && self.contents.focus() == Some(i);
            if event.is_press() && event.button == Button::Left && w.borrow().selectable() {
                self.contents.set_focus(i)?;
            }
            let box_rows = self.box_rows(size, &widths, focus)?;
            let s = self.column_size(size, i, *width, box_rows);
            let Some(ev) = event.relative_to(Point::new(x, 0)) else {
                return Ok(false);
            };
            return w.borrow_mut().mouse_event(s, ev, item_focus);
        }
        Ok(false)
    }

    fn cursor_coords(&mut self, size: RenderSize) -> Result<Option<Point>> {
        let Some(i) = self.contents.focus() else {
            return Ok(None);
        };
        let Some(w) = self.focus() else {
            return Ok(None);
        };
        if !w.borrow().selectable() {
            return Ok(None);
        }
        let widths = self.column_widths(size.cols().unwrap_or(0), true)?;
        let Some(colw) = widths.get(i).copied() else {
            return Ok(None);
        };
        let box_rows = self.box_rows(size, &widths, true)?;
        let s = self.column_size(size, i, colw, box_rows);
        let Some(p) = w.borrow_mut().cursor_coords(s)? else {
            return Ok(None);
        };
        let before: u32 = widths[..i]
            .iter()
            .filter(|wc| **wc > 0)
            .map(|wc| wc + self.dividechars)
            .sum();
        Ok(Some(Point::new(p.x + before, p.y)))
    }

    fn pref_col(&mut self, size: RenderSize) -> Result<Option<PrefCol>> {
        let Some(i) = self.contents.focus() else {
            return Ok(None);
        };
        let widths = self.column_widths(size.cols().unwrap_or(0), true)?;
        let Some(cwidth) = widths.get(i).copied() else {
            return Ok(Some(PrefCol::Col(0)));
        };
        let Some(w) = self.focus() else {
            return Ok(None);
        };
        let offset = i as u32 * self.dividechars + widths[..i].iter().sum::<u32>();
        let box_rows = self.box_rows(size, &widths, true)?;
        let s = self.column_size(size, i, cwidth, box_rows);
        let col = match w.borrow_mut().pref_col(s)? {
            Some(PrefCol::Col(c)) => Some(PrefCol::Col(c + offset)),
            other => other,
        };
        if col.is_some() {
            return Ok(col);
        }
        if self.pref_col.is_some() {
            return Ok(self.pref_col);
        }
        if w.borrow().selectable() {
            return Ok(Some(PrefCol::Col(cwidth / 2 + offset)));
        }
        Ok(None)
    }

    fn move_cursor_to_coords(&mut self, size: RenderSize, col: PrefCol, row: u32) -> Result<bool> {
        let widths = self.column_widths(size.cols().unwrap_or(0), true)?;
        let mut best: Option<(usize, u32, u32)> = None;
        let mut x = 0;
        for (i, width) in widths.iter().enumerate() {
            let end = x + width;
            if self.contents.widget(i).is_some_and(|w| w.borrow().selectable()) {
                match col {
                    PrefCol::Left => {
                        best = Some((i, x, end));
                        break;
                    }
                    PrefCol::Right => best = Some((i, x, end)),
                    PrefCol::Col(c) => {
                        match best {
                            None if x > c => {
                                best = Some((i, x, end));
                                break;
                            }
                            Some((_, _, bend)) if x > c && c.saturating_sub(bend) < x - c => break,
                            _ => {}
                        }
                        best = Some((i, x, end));
                        if c < end {
                            break;
                        }
                    }
                }
            }
            x = end + self.dividechars;
        }
        let Some((i, x, end)) = best else {
            return Ok(false);
        };
        let move_x = match col {
            PrefCol::Col(c) => PrefCol::Col(c.saturating_sub(x).min((end - x).saturating_sub(1))),
            other => other,
        };
        let box_rows = self.box_rows(size, &widths, true)?;
        let s = self.column_size(size, i, end - x, box_rows);
        if let Some(w) = self.contents.widget(i)
            && !w.borrow_mut().move_cursor_to_coords(s, move_x, row)?
        {
            return Ok(false);
        }
        self.contents.set_focus(i)?;
        self.pref_col = Some(col);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        buf,
        event::key::KeyCode,
        testing::{CanvasTest, render},
        widget::{boxed, cached, erase},
        widgets::{edit::Edit, solid_fill::SolidFill, text::Text},
    };

    fn weighted(n: u32) -> ColumnOptions {
        ColumnOptions::new(Extent::Weight(n))
    }

    #[test]
    fn widths() -> Result<()> {
        let c = Columns::new(vec![
            (boxed(Text::new("ab")), ColumnOptions::new(Extent::Pack)),
            (boxed(Text::new("x")), weighted(1)),
            (boxed(Text::new("y")), ColumnOptions::new(Extent::Given(3))),
            (boxed(Text::new("z")), weighted(2)),
        ])
        .with_dividechars(1);
        // 20 - 2 - 3 - 3 dividers = 12 shared: 4 and 8.
        assert_eq!(c.column_widths(20, false)?, vec![2, 4, 3, 8]);
        Ok(())
    }

    #[test]
    fn packed_column_leaves_room() -> Result<()> {
        let w = boxed(Columns::new(vec![
            (boxed(Text::new("ab")), ColumnOptions::new(Extent::Pack)),
            (boxed(Text::new("x")), weighted(1)),
        ]));
        let r = render(&w, RenderSize::Flow(6), false)?;
        CanvasTest::new(&r).assert_matches(buf!["abx   "]);
        Ok(())
    }

    #[test]
    fn narrow_hides_trailing() -> Result<()> {
        let c = Columns::new(vec![
            (boxed(Text::new("a")), ColumnOptions::new(Extent::Given(4))),
            (boxed(Text::new("b")), ColumnOptions::new(Extent::Given(4))),
        ]);
        assert_eq!(c.column_widths(6, false)?, vec![4]);
        let w = boxed(c);
        let r = render(&w, RenderSize::Flow(6), false)?;
        CanvasTest::new(&r).assert_matches(buf!["a"]);
        Ok(())
    }

    #[test]
    fn flow_render_with_box_column() -> Result<()> {
        let w = boxed(Columns::new(vec![
            (boxed(Text::new("one two")), weighted(1)),
            (boxed(SolidFill::new('|')), ColumnOptions::boxed(Extent::Given(1))),
            (boxed(Text::new("x")), weighted(1)),
        ]));
        assert_eq!(w.borrow_mut().rows(9, false)?, 2);
        let c = render(&w, RenderSize::Flow(9), false)?;
        CanvasTest::new(&c).assert_matches(buf!["one |x" "two |"]);
        Ok(())
    }

    #[test]
    fn left_right_focus() -> Result<()> {
        let a = boxed(Edit::new("", "aa"));
        let b = boxed(Edit::new("", "bb"));
        let w = cached(Columns::new(vec![
            (a, weighted(1)),
            (boxed(Text::new("--")), weighted(1)),
            (b, weighted(1)),
        ]));
        let size = RenderSize::Flow(9);
        assert_eq!(w.borrow().focus_position()?, 0);
        // The edit's cursor is at its end, so right moves focus.
        assert_eq!(w.borrow_mut().keypress(size, KeyCode::Right.into())?, None);
        assert_eq!(w.borrow().focus_position()?, 2);
        assert_eq!(w.borrow_mut().cursor_coords(size)?, Some(Point::new(8, 0)));
        assert_eq!(
            w.borrow_mut().keypress(size, KeyCode::Right.into())?,
            Some(KeyCode::Right.into())
        );
        Ok(())
    }

    #[test]
    fn coords_pick_nearest_selectable() -> Result<()> {
        let a = cached(Edit::new("", "aaa"));
        let b = cached(Edit::new("", "bbb"));
        let w = cached(Columns::new(vec![
            (erase(&a), weighted(1)),
            (boxed(Text::new("")), weighted(1)),
            (erase(&b), weighted(1)),
        ]));
        let size = RenderSize::Flow(9);
        assert!(w.borrow_mut().move_cursor_to_coords(size, PrefCol::Col(7), 0)?);
        assert_eq!(w.borrow().focus_position()?, 2);
        assert_eq!(b.borrow().edit_pos(), 1);
        assert!(w.borrow_mut().move_cursor_to_coords(size, PrefCol::Left, 0)?);
        assert_eq!(w.borrow().focus_position()?, 0);
        w.borrow_mut()
            .mouse_event(size, MouseEvent::press(Button::Left, Point::new(6, 0)), true)?;
        assert_eq!(w.borrow().focus_position()?, 2);
        assert_eq!(b.borrow().edit_pos(), 0);
        Ok(())
    }
}
