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
    widgets::container::{Container, Contents},
};

/// How much of its container's space a child takes along the container's
/// axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    /// A share of whatever is left once the other children are placed.
    Weight(u32),
    /// An exact number of rows or columns.
    Given(u32),
    /// The child's own size: rows for flow children in a pile, natural
    /// width in columns.
    Pack,
}

/// Share `remaining` among weights, rounding each share half up against
/// the weight still unallocated.
pub(crate) fn share_by_weight(mut remaining: u64, weights: &[u32]) -> Vec<u32> {
    let mut wtotal: u64 = weights.iter().map(|w| u64::from(*w)).sum();
    weights
        .iter()
        .map(|w| {
            let w = u64::from(*w);
            if wtotal == 0 {
                return 0;
            }
            let n = (remaining * w * 2 + wtotal) / (wtotal * 2);
            remaining = remaining.saturating_sub(n);
            wtotal -= w;
            n as u32
        })
        .collect()
}

/// Stacks children vertically.
///
/// As a flow widget every child is a flow widget, except `Given` children
/// which get a box of that many rows. As a box widget, `Pack` children take
/// their flow rows and `Weight` children share the rest.
pub struct Pile {
    /// Identity.
    id: WidgetId,
    /// Children and their extents.
    contents: Contents<Extent>,
    /// Column to aim for when focus moves between children.
    pref_col: PrefCol,
}

impl Pile {
    /// A pile of children, focused on the first selectable one.
    pub fn new(items: Vec<(WidgetRef, Extent)>) -> Self {
        let id = WidgetId::new();
        let contents = Contents::first_selectable(id, items);
        Self {
            id,
            contents,
            pref_col: PrefCol::Left,
        }
    }

    /// A pile of equally weighted children.
    pub fn from_widgets(widgets: Vec<WidgetRef>) -> Self {
        Self::new(widgets.into_iter().map(|w| (w, Extent::Weight(1))).collect())
    }

    /// The children.
    pub fn contents(&self) -> &Contents<Extent> {
        &self.contents
    }

    /// The children, for modification.
    pub fn contents_mut(&mut self) -> &mut Contents<Extent> {
        &mut self.contents
    }

    /// Rows taken by each child at `size`.
    pub fn item_rows(&self, size: RenderSize, focus: bool) -> Result<Vec<u32>> {
        let cols = size.cols().unwrap_or(0);
        let fi = self.contents.focus();
        let Some(maxrow) = size.rows() else {
            return self
                .contents
                .iter()
                .enumerate()
                .map(|(i, (w, ext))| match ext {
                    Extent::Given(n) => Ok(*n),
                    _ => w.borrow_mut().rows(cols, focus && fi == Some(i)),
                })
                .collect();
        };
        let mut remaining = i64::from(maxrow);
        let mut fixed = Vec::with_capacity(self.contents.len());
        let mut weights = vec![];
        for (i, (w, ext)) in self.contents.iter().enumerate() {
            match ext {
                Extent::Pack => {
                    let r = w.borrow_mut().rows(cols, focus && fi == Some(i))?;
                    remaining -= i64::from(r);
                    fixed.push(Some(r));
                }
                Extent::Given(n) => {
                    remaining -= i64::from(*n);
                    fixed.push(Some(*n));
                }
                Extent::Weight(0) => fixed.push(Some(0)),
                Extent::Weight(n) => {
                    weights.push(*n);
                    fixed.push(None);
                }
            }
        }
        if weights.is_empty() {
            return Err(Error::Sizing("no weighted widgets in a box pile".into()));
        }
        let mut shares = share_by_weight(remaining.max(0) as u64, &weights).into_iter();
        Ok(fixed
            .into_iter()
            .map(|r| r.unwrap_or_else(|| shares.next().unwrap_or(0)))
            .collect())
    }

    /// The size each child is rendered at.
    fn item_sizes(&self, size: RenderSize, rows: &[u32]) -> Vec<RenderSize> {
        let cols = size.cols().unwrap_or(0);
        self.contents
            .iter()
            .zip(rows)
            .map(|((_, ext), r)| match (ext, size) {
                (Extent::Given(n), _) => RenderSize::boxed(cols, *n),
                (Extent::Weight(_), RenderSize::Box(_)) => RenderSize::boxed(cols, *r),
                _ => RenderSize::Flow(cols),
            })
            .collect()
    }

    /// Child rows and sizes together.
    fn rows_sizes(&self, size: RenderSize, focus: bool) -> Result<(Vec<u32>, Vec<RenderSize>)> {
        let rows = self.item_rows(size, focus)?;
        let sizes = self.item_sizes(size, &rows);
        Ok((rows, sizes))
    }

    /// Remember the focus child's preferred column.
    fn update_pref_col_from_focus(&mut self, size: RenderSize) -> Result<()> {
        if let Some(w) = self.focus()
            && let Some(p) = w.borrow_mut().pref_col(size)?
        {
            self.pref_col = p;
        }
        Ok(())
    }
}

impl Container for Pile {
    type Position = usize;

    fn focus(&self) -> Option<WidgetRef> {
        self.contents.focus().and_then(|i| self.contents.widget(i))
    }

    fn focus_position(&self) -> Result<usize> {
        self.contents
            .focus()
            .ok_or_else(|| Error::OutOfRange("pile is empty".into()))
    }

    fn set_focus_position(&mut self, position: usize) -> Result<()> {
        self.contents.set_focus(position)
    }
}

impl Widget for Pile {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn name(&self) -> &'static str {
        "pile"
    }

    fn sizing(&self) -> Sizing {
        Sizing::BOX | Sizing::FLOW
    }

    fn selectable(&self) -> bool {
        self.focus().is_some_and(|w| w.borrow().selectable())
    }

    fn rows(&mut self, cols: u32, focus: bool) -> Result<u32> {
        Ok(self.item_rows(RenderSize::Flow(cols), focus)?.iter().sum())
    }

    fn render(&mut self, size: RenderSize, focus: bool) -> Result<CanvasRef> {
        let (rows, sizes) = self.rows_sizes(size, focus)?;
        let fi = self.contents.focus();
        let mut parts = vec![];
        for (i, ((w, _), (r, s))) in self.contents.iter().zip(rows.iter().zip(sizes)).enumerate() {
            if *r == 0 {
                continue;
            }
            let item_focus = fi == Some(i);
            let c = w.borrow_mut().render(s, focus && item_focus)?;
            parts.push((c, item_focus));
        }
        let cols = size.cols().unwrap_or(0);
        if parts.is_empty() {
            return Ok(Canvas::blank(Expanse::new(cols, size.rows().unwrap_or(0))));
        }
        let out = canvas::combine(parts)?;
        match size.rows() {
            Some(maxrow) if maxrow != out.rows() => {
                let diff = i64::from(maxrow) - i64::from(out.rows());
                canvas::pad_trim_top_bottom(out, 0, diff as i32)
            }
            _ => Ok(out),
        }
    }

    fn keypress(&mut self, size: RenderSize, key: Key) -> Result<Option<Key>> {
        let Some(i) = self.contents.focus() else {
            return Ok(Some(key));
        };
        let selectable = self.selectable();
        let (rows, sizes) = self.rows_sizes(size, selectable)?;
        let mut key = key;
        if selectable {
            let w = self.focus();
            let unhandled = match w {
                Some(w) => w.borrow_mut().keypress(sizes[i], key)?,
                None => Some(key),
            };
            match unhandled {
                None => return Ok(None),
                Some(k) => key = k,
            }
        }
        let cmd = command_map::lookup(&key);
        let candidates: Vec<usize> = match cmd {
            Some(Command::CursorUp) => (0..i).rev().collect(),
            Some(Command::CursorDown) => (i + 1..self.contents.len()).collect(),
            _ => return Ok(Some(key)),
        };
        for j in candidates {
            let Some(w) = self.contents.widget(j) else {
                continue;
            };
            if !w.borrow().selectable() {
                continue;
            }
            self.update_pref_col_from_focus(sizes[i])?;
            self.contents.set_focus(j)?;
            let rowlist: Vec<u32> = if cmd == Some(Command::CursorUp) {
                (0..rows[j]).rev().collect()
            } else {
                (0..rows[j]).collect()
            };
            for row in rowlist {
                if w.borrow_mut().move_cursor_to_coords(sizes[j], self.pref_col, row)? {
                    break;
                }
            }
            return Ok(None);
        }
        Ok(Some(key))
    }

    fn mouse_event(&mut self, size: RenderSize, event: MouseEvent, focus: bool) -> Result<bool> {
        let (rows, sizes) = self.rows_sizes(size, focus)?;
        let mut wrow = 0;
        for (i, (r, s)) in rows.iter().zip(sizes).enumerate() {
            if wrow + r > event.location.y {
                let Some(w) = self.contents.widget(i) else {
                    return Ok(false);
                };
                if event.is_press() && event.button == Button::Left && w.borrow().selectable() {
                    self.contents.set_focus(i)?;
                }
                let Some(ev) = event.relative_to(Point::new(0, wrow)) else {
                    return Ok(false);
                };
                let item_focus = focus && self.contents.focus() == Some(i);
                return w.borrow_mut().mouse_event(s, ev, item_focus);
            }
            wrow += r;
        }
        Ok(false)
    }

    fn cursor_coords(&mut self, size: RenderSize) -> Result<Option<Point>> {
        if !self.selectable() {
            return Ok(None);
        }
        let Some(i) = self.contents.focus() else {
            return Ok(None);
        };
        let (rows, sizes) = self.rows_sizes(size, true)?;
        let Some(w) = self.focus() else {
            return Ok(None);
        };
        let Some(p) = w.borrow_mut().cursor_coords(sizes[i])? else {
            return Ok(None);
        };
        let above: u32 = rows[..i].iter().sum();
        Ok(Some(Point::new(p.x, p.y + above)))
    }

    fn pref_col(&mut self, size: RenderSize) -> Result<Option<PrefCol>> {
        if !self.selectable() {
            return Ok(None);
        }
        let Some(i) = self.contents.focus() else {
            return Ok(None);
        };
        let (_, sizes) = self.rows_sizes(size, true)?;
        self.update_pref_col_from_focus(sizes[i])?;
        Ok(Some(self.pref_col))
    }

    fn move_cursor_to_coords(&mut self, size: RenderSize, col: PrefCol, row: u32) -> Result<bool> {
        self.pref_col = col;
        let (rows, sizes) = self.rows_sizes(size, true)?;
        let mut wrow = 0;
        for (i, (r, s)) in rows.iter().zip(sizes).enumerate() {
            if wrow + r > row {
                let Some(w) = self.contents.widget(i) else {
                    return Ok(false);
                };
                if !w.borrow().selectable() {
                    return Ok(false);
                }
                if !w.borrow_mut().move_cursor_to_coords(s, col, row - wrow)? {
                    return Ok(false);
                }
                self.contents.set_focus(i)?;
                return Ok(true);
            }
            wrow += r;
        }
        Ok(false)
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

    #[test]
    fn weights() {
        assert_eq!(share_by_weight(10, &[1, 1, 1]), vec![3, 4, 3]);
        assert_eq!(share_by_weight(5, &[2, 3]), vec![2, 3]);
        assert_eq!(share_by_weight(0, &[1]), vec![0]);
    }

    #[test]
    fn flow_pile() -> Result<()> {
        let w = boxed(Pile::new(vec![
            (boxed(Text::new("one")), Extent::Weight(1)),
            (boxed(SolidFill::new('-')), Extent::Given(1)),
            (boxed(Text::new("two")), Extent::Pack),
        ]));
        assert_eq!(w.borrow_mut().rows(3, false)?, 3);
        let c = render(&w, RenderSize::Flow(3), false)?;
        CanvasTest::new(&c).assert_matches(buf!["one" "---" "two"]);
        Ok(())
    }

    #[test]
    fn box_pile() -> Result<()> {
        let p = Pile::new(vec![
            (boxed(Text::new("head")), Extent::Pack),
            (boxed(SolidFill::new('a')), Extent::Weight(1)),
            (boxed(SolidFill::new('b')), Extent::Weight(2)),
        ]);
        assert_eq!(p.item_rows(RenderSize::boxed(4, 7), false)?, vec![1, 2, 4]);
        let w = boxed(p);
        let c = render(&w, RenderSize::boxed(4, 4), false)?;
        CanvasTest::new(&c).assert_matches(buf!["head" "aaaa" "bbbb" "bbbb"]);
        Ok(())
    }

    #[test]
    fn box_pile_needs_weights() {
        let p = Pile::new(vec![(boxed(Text::new("x")), Extent::Pack)]);
        assert!(matches!(
            p.item_rows(RenderSize::boxed(2, 2), false),
            Err(Error::Sizing(_))
        ));
    }

    #[test]
    fn overflow_is_trimmed() -> Result<()> {
        let w = boxed(Pile::new(vec![
            (boxed(Text::new("a b c")), Extent::Pack),
            (boxed(SolidFill::new('x')), Extent::Weight(1)),
        ]));
        let c = render(&w, RenderSize::boxed(1, 2), false)?;
        CanvasTest::new(&c).assert_matches(buf!["a" "b"]);
        Ok(())
    }

    #[test]
    fn focus_skips_unselectable() -> Result<()> {
        let e1 = cached(Edit::new("", "abcdef"));
        let e2 = cached(Edit::new("", "xy"));
        let p = Pile::new(vec![
            (boxed(Text::new("title")), Extent::Pack),
            (erase(&e1), Extent::Pack),
            (boxed(Text::new("sep")), Extent::Pack),
            (erase(&e2), Extent::Pack),
        ]);
        assert_eq!(p.focus_position()?, 1);
        let w = cached(p);
        let size = RenderSize::Flow(10);
        e1.borrow_mut().set_edit_pos(1);
        assert_eq!(w.borrow_mut().keypress(size, KeyCode::Down.into())?, None);
        assert_eq!(w.borrow().focus_position()?, 3);
        // The column carries over, clamped to the shorter text.
        assert_eq!(e2.borrow().edit_pos(), 1);
        assert_eq!(w.borrow_mut().keypress(size, KeyCode::Up.into())?, None);
        assert_eq!(w.borrow().focus_position()?, 1);
        // Nothing selectable above.
        assert_eq!(
            w.borrow_mut().keypress(size, KeyCode::Up.into())?,
            Some(KeyCode::Up.into())
        );
        Ok(())
    }

    #[test]
    fn mouse_focuses() -> Result<()> {
        let e1 = boxed(Edit::new("", "a"));
        let e2 = boxed(Edit::new("", "b"));
        let w = cached(Pile::new(vec![(e1, Extent::Pack), (e2, Extent::Pack)]));
        let size = RenderSize::Flow(4);
        w.borrow_mut()
            .mouse_event(size, MouseEvent::press(Button::Left, Point::new(0, 1)), true)?;
        assert_eq!(w.borrow().focus_position()?, 1);
        assert_eq!(w.borrow_mut().cursor_coords(size)?, Some(Point::new(0, 1)));
        assert!(w.borrow_mut().set_focus_position(5).is_err());
        Ok(())
    }
}
