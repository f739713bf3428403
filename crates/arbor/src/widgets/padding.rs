//! Horizontal decoration.
use crate::{
    cache,
    canvas::{self, CanvasRef},
    error::Result,
    event::{key::Key, mouse::MouseEvent},
    geom::Point,
    id::WidgetId,
    sizing::{Dimension, RenderSize, Sizing, calculate_left_right_padding},
    text::Align,
    widget::{PrefCol, Widget, WidgetRef},
};

/// Places a widget horizontally, with blank columns to its left and right.
///
/// A `Clip` width renders a fixed widget at its natural width inside a flow
/// widget, cutting off whatever doesn't fit.
pub struct Padding {
    /// Identity.
    id: WidgetId,
    /// The decorated widget.
    body: WidgetRef,
    /// Horizontal alignment.
    align: Align,
    /// Body width.
    width: Dimension,
    /// Lower bound for relative widths.
    min_width: Option<u32>,
    /// Blank columns always left on the left.
    left: u32,
    /// Blank columns always left on the right.
    right: u32,
}

impl Padding {
    /// Pad `body` to the full width, left aligned.
    pub fn new(body: WidgetRef) -> Self {
        Self {
            id: WidgetId::new(),
            body,
            align: Align::Left,
            width: Dimension::Relative(100),
            min_width: None,
            left: 0,
            right: 0,
        }
    }

    /// Set the alignment.
    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// Set the body width.
    pub fn with_width(mut self, width: Dimension) -> Self {
        self.width = width;
        self
    }

    /// Set the minimum relative width.
    pub fn with_min_width(mut self, min_width: u32) -> Self {
        self.min_width = Some(min_width);
        self
    }

    /// Set the fixed margins.
    pub fn with_margins(mut self, left: u32, right: u32) -> Self {
        self.left = left;
        self.right = right;
        self
    }

    /// The decorated widget.
    pub fn body(&self) -> WidgetRef {
        self.body.clone()
    }

    /// Change the alignment.
    pub fn set_align(&mut self, align: Align) {
        self.align = align;
        cache::invalidate(self.id);
    }

    /// Change the width.
    pub fn set_width(&mut self, width: Dimension) {
        self.width = width;
        cache::invalidate(self.id);
    }

    /// Columns left and right of the body at `maxcol`. Negative values are
    /// clipped body columns.
    pub fn padding_values(&self, maxcol: u32, focus: bool) -> Result<(i32, i32)> {
        let natural = match self.width {
            Dimension::Clip => self.body.borrow_mut().pack(RenderSize::Fixed, focus)?.0,
            Dimension::Pack => {
                let avail = maxcol
                    .saturating_sub(self.left + self.right)
                    .max(self.min_width.unwrap_or(0));
                self.body.borrow_mut().pack(RenderSize::Flow(avail), focus)?.0
            }
            _ => 0,
        };
        Ok(calculate_left_right_padding(
            maxcol,
            self.align,
            self.width,
            natural,
            self.min_width,
            self.left,
            self.right,
        ))
    }

    /// The size the body is rendered at, given the padding.
    fn body_size(&self, size: RenderSize, left: i32, right: i32) -> RenderSize {
        if self.width == Dimension::Clip {
            return RenderSize::Fixed;
        }
        let cols = i64::from(size.cols().unwrap_or(0)) - i64::from(left) - i64::from(right);
        size.with_cols(cols.max(0) as u32)
    }
}

impl Widget for Padding {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn name(&self) -> &'static str {
        "padding"
    }

    fn sizing(&self) -> Sizing {
        if self.width == Dimension::Clip {
            return Sizing::FLOW;
        }
        let inner = self.body.borrow().sizing();
        let mut s = Sizing::empty();
        for mode in [Sizing::BOX, Sizing::FLOW] {
            if inner.contains(mode) {
                s = s | mode;
            }
        }
        s
    }

    fn selectable(&self) -> bool {
        self.body.borrow().selectable()
    }

    fn rows(&mut self, cols: u32, focus: bool) -> Result<u32> {
        match self.width {
            Dimension::Clip => Ok(self.body.borrow_mut().pack(RenderSize::Fixed, focus)?.1),
            _ => {
                let (l, r) = self.padding_values(cols, focus)?;
                let inner = (i64::from(cols) - i64::from(l) - i64::from(r)).max(0) as u32;
                self.body.borrow_mut().rows(inner, focus)
            }
        }
    }

    fn render(&mut self, size: RenderSize, focus: bool) -> Result<CanvasRef> {
        let maxcol = size.cols().unwrap_or(0);
        let (l, r) = self.padding_values(maxcol, focus)?;
        let c = self.body.borrow_mut().render(self.body_size(size, l, r), focus)?;
        if l == 0 && r == 0 {
            return Ok(c);
        }
        canvas::pad_trim_left_right(c, l, r)
    }

    fn keypress(&mut self, size: RenderSize, key: Key) -> Result<Option<Key>> {
        let (l, r) = self.padding_values(size.cols().unwrap_or(0), true)?;
        let bs = self.body_size(size, l, r);
        self.body.borrow_mut().keypress(bs, key)
    }

    fn mouse_event(&mut self, size: RenderSize, event: MouseEvent, focus: bool) -> Result<bool> {
        let maxcol = size.cols().unwrap_or(0);
        let (l, r) = self.padding_values(maxcol, focus)?;
        let x = i64::from(event.location.x);
        if x < i64::from(l) || x >= i64::from(maxcol) - i64::from(r) {
            return Ok(false);
        }
        let bs = self.body_size(size, l, r);
        let ev = event.at(Point::new((x - i64::from(l)) as u32, event.location.y));
        self.body.borrow_mut().mouse_event(bs, ev, focus)
    }

    fn cursor_coords(&mut self, size: RenderSize) -> Result<Option<Point>> {
        let maxcol = size.cols().unwrap_or(0);
        let (l, r) = self.padding_values(maxcol, true)?;
        let bs = self.body_size(size, l, r);
        if bs.cols() == Some(0) {
            return Ok(None);
        }
        let Some(p) = self.body.borrow_mut().cursor_coords(bs)? else {
            return Ok(None);
        };
        let x = i64::from(p.x) + i64::from(l);
        if x < 0 || x >= i64::from(maxcol) {
            return Ok(None);
        }
        Ok(Some(Point::new(x as u32, p.y)))
    }

    fn pref_col(&mut self, size: RenderSize) -> Result<Option<PrefCol>> {
        let (l, r) = self.padding_values(size.cols().unwrap_or(0), true)?;
        let bs = self.body_size(size, l, r);
        Ok(self.body.borrow_mut().pref_col(bs)?.map(|p| match p {
            PrefCol::Col(c) => PrefCol::Col((i64::from(c) + i64::from(l)).max(0) as u32),
            other => other,
        }))
    }

    fn move_cursor_to_coords(&mut self, size: RenderSize, col: PrefCol, row: u32) -> Result<bool> {
        let maxcol = size.cols().unwrap_or(0);
        let (l, r) = self.padding_values(maxcol, true)?;
        let bs = self.body_size(size, l, r);
        let col = match col {
            PrefCol::Col(c) => {
                let lo = i64::from(l);
                let hi = (i64::from(maxcol) - i64::from(r) - 1).max(lo);
                PrefCol::Col((i64::from(c).clamp(lo, hi) - lo).max(0) as u32)
            }
            other => other,
        };
        self.body.borrow_mut().move_cursor_to_coords(bs, col, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        buf,
        event::mouse::Button,
        testing::{CanvasTest, render},
        widget::{boxed, cached, erase},
        widgets::{edit::Edit, text::Text},
    };

    #[test]
    fn centered_given_width() -> Result<()> {
        let w = boxed(
            Padding::new(boxed(Text::new("ab cd")))
                .with_width(Dimension::Given(2))
                .with_align(Align::Center),
        );
        assert_eq!(w.borrow_mut().rows(6, false)?, 2);
        let c = render(&w, RenderSize::Flow(6), false)?;
        CanvasTest::new(&c).assert_matches(buf!["  ab" "  cd"]);
        Ok(())
    }

    #[test]
    fn margins() -> Result<()> {
        let w = boxed(Padding::new(boxed(Text::new("xyz"))).with_margins(1, 1));
        let c = render(&w, RenderSize::Flow(5), false)?;
        CanvasTest::new(&c).assert_matches(buf![" xyz "]);
        Ok(())
    }

    #[test]
    fn clip_fixed_body() -> Result<()> {
        let w = boxed(
            Padding::new(boxed(Text::new("abcdef")))
                .with_width(Dimension::Clip)
                .with_align(Align::Right),
        );
        assert_eq!(w.borrow().sizing(), Sizing::FLOW);
        assert_eq!(w.borrow_mut().rows(4, false)?, 1);
        let c = render(&w, RenderSize::Flow(4), false)?;
        CanvasTest::new(&c).assert_matches(buf!["cdef"]);
        Ok(())
    }

    #[test]
    fn pack_width() -> Result<()> {
        let w = boxed(
            Padding::new(boxed(Text::new("hi")))
                .with_width(Dimension::Pack)
                .with_align(Align::Right),
        );
        let c = render(&w, RenderSize::Flow(5), false)?;
        CanvasTest::new(&c).assert_matches(buf!["   hi"]);
        Ok(())
    }

    #[test]
    fn cursor_and_mouse() -> Result<()> {
        let e = cached(Edit::new("", "abc"));
        let w = boxed(Padding::new(erase(&e)).with_margins(2, 0));
        let size = RenderSize::Flow(8);
        assert_eq!(w.borrow_mut().cursor_coords(size)?, Some(Point::new(5, 0)));
        assert!(!w.borrow_mut().mouse_event(
            size,
            MouseEvent::press(Button::Left, Point::new(1, 0)),
            true
        )?);
        assert!(w.borrow_mut().mouse_event(
            size,
            MouseEvent::press(Button::Left, Point::new(3, 0)),
            true
        )?);
        assert_eq!(e.borrow().edit_pos(), 1);
        assert_eq!(w.borrow_mut().pref_col(size)?, Some(PrefCol::Col(3)));
        Ok(())
    }
}
