use crate::{
    cache,
    canvas::{self, CanvasRef},
    error::{Error, Result},
    event::{key::Key, mouse::MouseEvent},
    geom::{Expanse, Point},
    id::WidgetId,
    sizing::{
        Dimension, RenderSize, Sizing, Valign, calculate_left_right_padding,
        calculate_top_bottom_filler,
    },
    text::Align,
    widget::{Widget, WidgetRef},
    widgets::container::Container,
};

/// Placement of the top widget of an [`Overlay`].
///
/// A `Pack` (or `Clip`) width treats the top widget as fixed, sized by its
/// natural size. Otherwise a `Pack` height treats it as a flow widget, and
/// anything else renders it as a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayOptions {
    /// Horizontal alignment.
    pub align: Align,
    /// Width.
    pub width: Dimension,
    /// Lower bound for relative widths.
    pub min_width: Option<u32>,
    /// Fixed left margin.
    pub left: u32,
    /// Fixed right margin.
    pub right: u32,
    /// Vertical alignment.
    pub valign: Valign,
    /// Height.
    pub height: Dimension,
    /// Lower bound for relative heights.
    pub min_height: Option<u32>,
    /// Fixed top margin.
    pub top: u32,
    /// Fixed bottom margin.
    pub bottom: u32,
}

impl OverlayOptions {
    /// Centered at the given width and height.
    pub fn centered(width: Dimension, height: Dimension) -> Self {
        Self {
            align: Align::Center,
            width,
            min_width: None,
            left: 0,
            right: 0,
            valign: Valign::Middle,
            height,
            min_height: None,
            top: 0,
            bottom: 0,
        }
    }

    /// Is the top widget treated as fixed?
    fn fixed(&self) -> bool {
        matches!(self.width, Dimension::Pack | Dimension::Clip)
    }
}

/// Draws one widget over another. The top widget always has focus and
/// receives all input.
pub struct Overlay {
    /// Identity.
    id: WidgetId,
    /// The widget drawn on top.
    top_w: WidgetRef,
    /// The widget underneath, covering the whole area.
    bottom_w: WidgetRef,
    /// Placement of the top widget.
    options: OverlayOptions,
}

impl Overlay {
    /// Place `top_w` over `bottom_w`.
    pub fn new(top_w: WidgetRef, bottom_w: WidgetRef, options: OverlayOptions) -> Self {
        Self {
            id: WidgetId::new(),
            top_w,
            bottom_w,
            options,
        }
    }

    /// The top widget.
    pub fn top_w(&self) -> WidgetRef {
        self.top_w.clone()
    }

    /// The bottom widget.
    pub fn bottom_w(&self) -> WidgetRef {
        self.bottom_w.clone()
    }

    /// Top widget placement.
    pub fn options(&self) -> OverlayOptions {
        self.options
    }

    /// Replace the top widget.
    pub fn set_top_w(&mut self, w: WidgetRef) {
        self.top_w = w;
        cache::invalidate(self.id);
    }

    /// Replace the bottom widget.
    pub fn set_bottom_w(&mut self, w: WidgetRef) {
        self.bottom_w = w;
        cache::invalidate(self.id);
    }

    /// Change the top widget placement.
    pub fn set_options(&mut self, options: OverlayOptions) {
        self.options = options;
        cache::invalidate(self.id);
    }

    /// Padding `(left, right, top, bottom)` around the top widget. Negative
    /// values are rows or columns of the top widget that don't fit.
    pub fn calculate_padding_filler(&self, size: Expanse, focus: bool) -> Result<(i32, i32, i32, i32)> {
        let o = &self.options;
        if o.fixed() {
            let (w, h) = self.top_w.borrow_mut().pack(RenderSize::Fixed, focus)?;
            if h == 0 {
                return Err(Error::Sizing("fixed overlay widget must have a height".into()));
            }
            let (l, r) =
                calculate_left_right_padding(size.w, o.align, Dimension::Clip, w, None, o.left, o.right);
            let (t, b) = calculate_top_bottom_filler(
                size.h,
                o.valign,
                Dimension::Given(h),
                0,
                None,
                o.top,
                o.bottom,
            );
            let (t, mut b) = (t as i32, b as i32);
            if (size.h as i32) - t - b < h as i32 {
                b = size.h as i32 - t - h as i32;
            }
            return Ok((l, r, t, b));
        }
        let (l, r) =
            calculate_left_right_padding(size.w, o.align, o.width, 0, o.min_width, o.left, o.right);
        if o.height == Dimension::Pack {
            let inner = (size.w as i32 - l - r).max(0) as u32;
            let h = self.top_w.borrow_mut().rows(inner, focus)?;
            let (t, b) =
                calculate_top_bottom_filler(size.h, o.valign, Dimension::Given(h), 0, None, o.top, o.bottom);
            let mut b = b as i32;
            if h > size.h {
                b = size.h as i32 - h as i32;
            }
            return Ok((l, r, t as i32, b));
        }
        let (t, b) =
            calculate_top_bottom_filler(size.h, o.valign, o.height, 0, o.min_height, o.top, o.bottom);
        Ok((l, r, t as i32, b as i32))
    }

    /// The size the top widget is rendered at.
    fn top_w_size(&self, size: Expanse, (l, r, t, b): (i32, i32, i32, i32)) -> RenderSize {
        if self.options.fixed() {
            return RenderSize::Fixed;
        }
        let cols = (size.w as i32 - l - r).max(0) as u32;
        if self.options.height == Dimension::Pack {
            return RenderSize::Flow(cols);
        }
        RenderSize::boxed(cols, (size.h as i32 - t - b).max(0) as u32)
    }

    /// Unpack a box size.
    fn expect_box(&self, size: RenderSize) -> Result<Expanse> {
        match size {
            RenderSize::Box(e) => Ok(e),
            other => Err(Error::Sizing(format!("overlay rendered at {other}"))),
        }
    }
}

impl Container for Overlay {
    type Position = usize;

    fn focus(&self) -> Option<WidgetRef> {
        Some(self.top_w.clone())
    }

    /// Always 1, the top widget.
    fn focus_position(&self) -> Result<usize> {
        Ok(1)
    }

    fn set_focus_position(&mut self, position: usize) -> Result<()> {
        if position != 1 {
            return Err(Error::OutOfRange(format!(
                "overlay focus must be 1 (the top widget), not {position}"
            )));
        }
        Ok(())
    }
}

impl Widget for Overlay {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn name(&self) -> &'static str {
        "overlay"
    }

    fn sizing(&self) -> Sizing {
        Sizing::BOX
    }

    fn selectable(&self) -> bool {
        self.top_w.borrow().selectable()
    }

    fn render(&mut self, size: RenderSize, focus: bool) -> Result<CanvasRef> {
        let e = self.expect_box(size)?;
        let pad = self.calculate_padding_filler(e, focus)?;
        let bottom_c = self.bottom_w.borrow_mut().render(size, false)?;
        if bottom_c.cols() == 0 || bottom_c.rows() == 0 {
            return Ok(bottom_c);
        }
        let (l, r, t, b) = pad;
        let mut top_c = self.top_w.borrow_mut().render(self.top_w_size(e, pad), focus)?;
        if l < 0 || r < 0 {
            top_c = canvas::pad_trim_left_right(top_c, l.min(0), r.min(0))?;
        }
        if t < 0 || b < 0 {
            top_c = canvas::pad_trim_top_bottom(top_c, t.min(0), b.min(0))?;
        }
        canvas::overlay(top_c, bottom_c, l.max(0) as u32, t.max(0) as u32)
    }

    fn keypress(&mut self, size: RenderSize, key: Key) -> Result<Option<Key>> {
        let e = self.expect_box(size)?;
        let pad = self.calculate_padding_filler(e, true)?;
        let ts = self.top_w_size(e, pad);
        self.top_w.borrow_mut().keypress(ts, key)
    }

    fn mouse_event(&mut self, size: RenderSize, event: MouseEvent, focus: bool) -> Result<bool> {
        let e = self.expect_box(size)?;
        let pad = self.calculate_padding_filler(e, focus)?;
        let (l, r, t, b) = pad;
        let (x, y) = (event.location.x as i32, event.location.y as i32);
        if x < l || x >= e.w as i32 - r || y < t || y >= e.h as i32 - b {
            return Ok(false);
        }
        let ts = self.top_w_size(e, pad);
        let ev = event.at(Point::new((x - l) as u32, (y - t) as u32));
        self.top_w.borrow_mut().mouse_event(ts, ev, focus)
    }

    fn cursor_coords(&mut self, size: RenderSize) -> Result<Option<Point>> {
        let e = self.expect_box(size)?;
        let pad = self.calculate_padding_filler(e, true)?;
        let ts = self.top_w_size(e, pad);
        let Some(p) = self.top_w.borrow_mut().cursor_coords(ts)? else {
            return Ok(None);
        };
        let (l, _, t, _) = pad;
        let y = p.y.min(e.h.saturating_sub(1)) as i32;
        let (x, y) = (p.x as i32 + l, y + t);
        if x < 0 || y < 0 || x >= e.w as i32 || y >= e.h as i32 {
            return Ok(None);
        }
        Ok(Some(Point::new(x as u32, y as u32)))
    }
}
