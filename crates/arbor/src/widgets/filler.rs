//! Vertical decorations: [`Filler`] makes any widget a box widget, and
//! [`BoxAdapter`] makes a box widget a flow widget.
use crate::{
    cache,
    canvas::{self, CanvasRef},
    error::{Error, Result},
    event::{key::Key, mouse::MouseEvent},
    geom::{Expanse, Point},
    id::WidgetId,
    sizing::{Dimension, RenderSize, Sizing, Valign, calculate_top_bottom_filler},
    widget::{PrefCol, Widget, WidgetRef},
};

/// Places a widget vertically inside a box, with blank rows above and
/// below.
///
/// With a `Pack` height the body is rendered as a flow widget and takes
/// the rows it asks for. `Given` and `Relative` heights render the body as
/// a box.
pub struct Filler {
    /// Identity.
    id: WidgetId,
    /// The decorated widget.
    body: WidgetRef,
    /// Vertical alignment.
    valign: Valign,
    /// Body height.
    height: Dimension,
    /// Lower bound for relative heights.
    min_height: Option<u32>,
    /// Blank rows always left above.
    top: u32,
    /// Blank rows always left below.
    bottom: u32,
}

impl Filler {
    /// Center `body`. Flow widgets are packed, box widgets fill the space.
    pub fn new(body: WidgetRef) -> Self {
        let height = if body.borrow().sizing().contains(Sizing::FLOW) {
            Dimension::Pack
        } else {
            Dimension::Relative(100)
        };
        Self {
            id: WidgetId::new(),
            body,
            valign: Valign::Middle,
            height,
            min_height: None,
            top: 0,
            bottom: 0,
        }
    }

    /// Set the alignment.
    pub fn with_valign(mut self, valign: Valign) -> Self {
        self.valign = valign;
        self
    }

    /// Set the body height. `Clip` is treated as `Pack`.
    pub fn with_height(mut self, height: Dimension) -> Self {
        self.height = match height {
            Dimension::Clip => Dimension::Pack,
            h => h,
        };
        self
    }

    /// Set the minimum relative height.
    pub fn with_min_height(mut self, min_height: u32) -> Self {
        self.min_height = Some(min_height);
        self
    }

    /// Set the fixed margins.
    pub fn with_margins(mut self, top: u32, bottom: u32) -> Self {
        self.top = top;
        self.bottom = bottom;
        self
    }

    /// The decorated widget.
    pub fn body(&self) -> WidgetRef {
        self.body.clone()
    }

    /// Replace the decorated widget.
    pub fn set_body(&mut self, body: WidgetRef) {
        self.body = body;
        cache::invalidate(self.id);
    }

    /// Change the alignment.
    pub fn set_valign(&mut self, valign: Valign) {
        self.valign = valign;
        cache::invalidate(self.id);
    }

    /// Blank rows above and below the body at `(maxcol, maxrow)`.
    pub fn filler_values(&self, size: Expanse, focus: bool) -> Result<(u32, u32)> {
        let natural = match self.height {
            Dimension::Pack => self.body.borrow_mut().rows(size.w, focus)?,
            _ => 0,
        };
        Ok(calculate_top_bottom_filler(
            size.h,
            self.valign,
            self.height,
            natural,
            self.min_height,
            self.top,
            self.bottom,
        ))
    }

    /// The size the body is rendered at.
    fn body_size(&self, size: Expanse, top: u32, bottom: u32) -> RenderSize {
        match self.height {
            Dimension::Pack => RenderSize::Flow(size.w),
            _ => RenderSize::boxed(size.w, size.h.saturating_sub(top + bottom)),
        }
    }

    /// Unpack a box size.
    fn expect_box(&self, size: RenderSize) -> Result<Expanse> {
        match size {
            RenderSize::Box(e) => Ok(e),
            other => Err(Error::Sizing(format!("filler rendered at {other}"))),
        }
    }
}

impl Widget for Filler {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn name(&self) -> &'static str {
        "filler"
    }

    fn sizing(&self) -> Sizing {
        Sizing::BOX
    }

    fn selectable(&self) -> bool {
        self.body.borrow().selectable()
    }

    fn render(&mut self, size: RenderSize, focus: bool) -> Result<CanvasRef> {
        let e = self.expect_box(size)?;
        let (top, bottom) = self.filler_values(e, focus)?;
        let mut c = self.body.borrow_mut().render(self.body_size(e, top, bottom), focus)?;
        if e.h > 0
            && c.rows() > e.h
            && let Some(cur) = c.cursor()
            && cur.y >= e.h
        {
            // Keep the cursor row on screen.
            c = canvas::trim(c, cur.y - e.h + 1, Some(e.h.saturating_sub(top + bottom)))?;
        }
        if c.rows() > e.h {
            return canvas::trim(c, 0, Some(e.h));
        }
        if top == 0 && bottom == 0 && c.rows() == e.h {
            return Ok(c);
        }
        canvas::pad_trim_top_bottom(c, top as i32, bottom as i32)
    }

    fn keypress(&mut self, size: RenderSize, key: Key) -> Result<Option<Key>> {
        let e = self.expect_box(size)?;
        let (top, bottom) = self.filler_values(e, true)?;
        let bs = self.body_size(e, top, bottom);
        self.body.borrow_mut().keypress(bs, key)
    }

    fn mouse_event(&mut self, size: RenderSize, event: MouseEvent, focus: bool) -> Result<bool> {
        let e = self.expect_box(size)?;
        let (top, bottom) = self.filler_values(e, focus)?;
        let y = event.location.y;
        if y < top || y >= e.h.saturating_sub(bottom) {
            return Ok(false);
        }
        let bs = self.body_size(e, top, bottom);
        match event.relative_to(Point::new(0, top)) {
            Some(ev) => self.body.borrow_mut().mouse_event(bs, ev, focus),
            None => Ok(false),
        }
    }

    fn cursor_coords(&mut self, size: RenderSize) -> Result<Option<Point>> {
        let e = self.expect_box(size)?;
        let (top, bottom) = self.filler_values(e, true)?;
        let bs = self.body_size(e, top, bottom);
        let Some(p) = self.body.borrow_mut().cursor_coords(bs)? else {
            return Ok(None);
        };
        let y = p.y.min(e.h.saturating_sub(1));
        Ok(Some(Point::new(p.x, y + top)))
    }

    fn pref_col(&mut self, size: RenderSize) -> Result<Option<PrefCol>> {
        let e = self.expect_box(size)?;
        let (top, bottom) = self.filler_values(e, true)?;
        let bs = self.body_size(e, top, bottom);
        self.body.borrow_mut().pref_col(bs)
    }

    fn move_cursor_to_coords(&mut self, size: RenderSize, col: PrefCol, row: u32) -> Result<bool> {
        let e = self.expect_box(size)?;
        let (top, bottom) = self.filler_values(e, true)?;
        if row < top || row >= e.h.saturating_sub(bottom) {
            return Ok(false);
        }
        let bs = self.body_size(e, top, bottom);
        self.body.borrow_mut().move_cursor_to_coords(bs, col, row - top)
    }
}

/// Gives a box widget a fixed height so it can sit where flow widgets are
/// expected, such as inside a ListBox.
pub struct BoxAdapter {
    /// Identity.
    id: WidgetId,
    /// The adapted box widget.
    body: WidgetRef,
    /// Rows given to the body.
    height: u32,
}

impl BoxAdapter {
    /// Adapt `body` to `height` rows.
    pub fn new(body: WidgetRef, height: u32) -> Self {
        Self {
            id: WidgetId::new(),
            body,
            height,
        }
    }

    /// The adapted widget.
    pub fn body(&self) -> WidgetRef {
        self.body.clone()
    }

    /// Change the height.
    pub fn set_height(&mut self, height: u32) {
        self.height = height;
        cache::invalidate(self.id);
    }

    /// The box size for the body at `size`.
    fn body_size(&self, size: RenderSize) -> RenderSize {
        RenderSize::boxed(size.cols().unwrap_or(0), self.height)
    }
}

impl Widget for BoxAdapter {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn name(&self) -> &'static str {
        "box_adapter"
    }

    fn sizing(&self) -> Sizing {
        Sizing::FLOW
    }

    fn selectable(&self) -> bool {
        self.body.borrow().selectable()
    }

    fn rows(&mut self, _cols: u32, _focus: bool) -> Result<u32> {
        Ok(self.height)
    }

    fn render(&mut self, size: RenderSize, focus: bool) -> Result<CanvasRef> {
        self.body.borrow_mut().render(self.body_size(size), focus)
    }

    fn keypress(&mut self, size: RenderSize, key: Key) -> Result<Option<Key>> {
        let bs = self.body_size(size);
        self.body.borrow_mut().keypress(bs, key)
    }

    fn mouse_event(&mut self, size: RenderSize, event: MouseEvent, focus: bool) -> Result<bool> {
        let bs = self.body_size(size);
        self.body.borrow_mut().mouse_event(bs, event, focus)
    }

    fn cursor_coords(&mut self, size: RenderSize) -> Result<Option<Point>> {
        let bs = self.body_size(size);
        self.body.borrow_mut().cursor_coords(bs)
    }

    fn pref_col(&mut self, size: RenderSize) -> Result<Option<PrefCol>> {
        let bs = self.body_size(size);
        self.body.borrow_mut().pref_col(bs)
    }

    fn move_cursor_to_coords(&mut self, size: RenderSize, col: PrefCol, row: u32) -> Result<bool> {
        let bs = self.body_size(size);
        self.body.borrow_mut().move_cursor_to_coords(bs, col, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        buf,
        testing::{CanvasTest, render},
        widget::boxed,
        widgets::{edit::Edit, solid_fill::SolidFill, text::Text},
    };

    #[test]
    fn centers_flow_body() -> Result<()> {
        let w = boxed(Filler::new(boxed(Text::new("mid"))));
        let c = render(&w, RenderSize::boxed(3, 3), false)?;
        CanvasTest::new(&c).assert_matches(buf!["" "mid" ""]);
        Ok(())
    }

    #[test]
    fn margins_and_valign() -> Result<()> {
        let w = boxed(
            Filler::new(boxed(Text::new("x")))
                .with_valign(Valign::Bottom)
                .with_margins(0, 1),
        );
        let c = render(&w, RenderSize::boxed(1, 4), false)?;
        CanvasTest::new(&c).assert_matches(buf!["" "" "x" ""]);
        Ok(())
    }

    #[test]
    fn relative_box_body() -> Result<()> {
        let w = boxed(
            Filler::new(boxed(SolidFill::new('#')))
                .with_height(Dimension::Relative(50))
                .with_valign(Valign::Top),
        );
        let c = render(&w, RenderSize::boxed(2, 4), false)?;
        CanvasTest::new(&c).assert_matches(buf!["##" "##" "" ""]);
        Ok(())
    }

    #[test]
    fn tall_body_keeps_cursor() -> Result<()> {
        let e = boxed(Edit::new("", "a b c d").multiline());
        e.borrow_mut().keypress(RenderSize::Flow(2), Key::from('x'))?;
        let w = boxed(Filler::new(e).with_valign(Valign::Top));
        let c = render(&w, RenderSize::boxed(2, 2), true)?;
        assert_eq!(c.rows(), 2);
        let cur = c.cursor();
        assert!(cur.is_some_and(|p| p.y < 2));
        Ok(())
    }

    #[test]
    fn routes_mouse_and_cursor() -> Result<()> {
        let e = boxed(Edit::new("", "abc"));
        let w = boxed(Filler::new(e.clone()));
        let size = RenderSize::boxed(5, 3);
        assert!(!w.borrow_mut().mouse_event(
            size,
            MouseEvent::press(crate::event::mouse::Button::Left, Point::new(1, 0)),
            true
        )?);
        assert!(w.borrow_mut().mouse_event(
            size,
            MouseEvent::press(crate::event::mouse::Button::Left, Point::new(1, 1)),
            true
        )?);
        assert_eq!(w.borrow_mut().cursor_coords(size)?, Some(Point::new(1, 1)));
        Ok(())
    }

    #[test]
    fn box_adapter() -> Result<()> {
        let w = boxed(BoxAdapter::new(boxed(SolidFill::new('.')), 2));
        assert_eq!(w.borrow().sizing(), Sizing::FLOW);
        assert_eq!(w.borrow_mut().rows(3, false)?, 2);
        let c = render(&w, RenderSize::Flow(3), false)?;
        CanvasTest::new(&c).assert_matches(buf!["..." "..."]);
        Ok(())
    }
}
