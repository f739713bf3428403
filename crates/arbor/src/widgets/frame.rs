use std::fmt;

use crate::{
    cache,
    canvas::{self, CanvasRef},
    error::{Error, Result},
    event::{
        key::Key,
        mouse::{Button, MouseEvent},
    },
    geom::{Expanse, Point},
    id::WidgetId,
    sizing::{RenderSize, Sizing, Valign},
    widget::{Widget, WidgetRef, uncached},
    widgets::{container::Container, filler::Filler},
};

/// A part of a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramePart {
    /// The flow widget above the body.
    Header,
    /// The box widget in the middle.
    Body,
    /// The flow widget below the body.
    Footer,
}

impl fmt::Display for FramePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Header => "header",
            Self::Body => "body",
            Self::Footer => "footer",
        })
    }
}

/// A box widget with an optional flow header and footer around a box body.
///
/// When space runs short the part without focus gives up rows first; the
/// body keeps at least one row while it has focus.
pub struct Frame {
    /// Identity.
    id: WidgetId,
    /// Optional header.
    header: Option<WidgetRef>,
    /// The body.
    body: WidgetRef,
    /// Optional footer.
    footer: Option<WidgetRef>,
    /// The part with focus.
    focus_part: FramePart,
}

impl Frame {
    /// A frame around `body`, focused on the body.
    pub fn new(body: WidgetRef) -> Self {
        Self {
            id: WidgetId::new(),
            header: None,
            body,
            footer: None,
            focus_part: FramePart::Body,
        }
    }

    /// Set the header.
    pub fn with_header(mut self, header: WidgetRef) -> Self {
        self.header = Some(header);
        self
    }

    /// Set the footer.
    pub fn with_footer(mut self, footer: WidgetRef) -> Self {
        self.footer = Some(footer);
        self
    }

    /// The header.
    pub fn header(&self) -> Option<WidgetRef> {
        self.header.clone()
    }

    /// The body.
    pub fn body(&self) -> WidgetRef {
        self.body.clone()
    }

    /// The footer.
    pub fn footer(&self) -> Option<WidgetRef> {
        self.footer.clone()
    }

    /// Replace the header. Removing a focused header moves focus to the
    /// body.
    pub fn set_header(&mut self, header: Option<WidgetRef>) {
        if header.is_none() && self.focus_part == FramePart::Header {
            self.focus_part = FramePart::Body;
        }
        self.header = header;
        cache::invalidate(self.id);
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: WidgetRef) {
        self.body = body;
        cache::invalidate(self.id);
    }

    /// Replace the footer. Removing a focused footer moves focus to the
    /// body.
    pub fn set_footer(&mut self, footer: Option<WidgetRef>) {
        if footer.is_none() && self.focus_part == FramePart::Footer {
            self.focus_part = FramePart::Body;
        }
        self.footer = footer;
        cache::invalidate(self.id);
    }

    /// The widget for a part, if present.
    fn part(&self, part: FramePart) -> Option<WidgetRef> {
        match part {
            FramePart::Header => self.header.clone(),
            FramePart::Body => Some(self.body.clone()),
            FramePart::Footer => self.footer.clone(),
        }
    }

    /// Header and footer rows at `size`: first as trimmed to fit, then as
    /// requested.
    pub fn frame_top_bottom(&self, size: Expanse, focus: bool) -> Result<((u32, u32), (u32, u32))> {
        let (maxcol, maxrow) = (size.w, size.h);
        let hrows = match &self.header {
            Some(h) => h
                .borrow_mut()
                .rows(maxcol, focus && self.focus_part == FramePart::Header)?,
            None => 0,
        };
        let frows = match &self.footer {
            Some(f) => f
                .borrow_mut()
                .rows(maxcol, focus && self.focus_part == FramePart::Footer)?,
            None => 0,
        };
        let orig = (hrows, frows);
        let mut remaining = maxrow;
        match self.focus_part {
            FramePart::Footer => {
                if frows >= remaining {
                    return Ok(((0, remaining), orig));
                }
                remaining -= frows;
                if hrows >= remaining {
                    return Ok(((remaining, frows), orig));
                }
            }
            FramePart::Header => {
                if hrows >= maxrow {
                    return Ok(((remaining, 0), orig));
                }
                remaining -= hrows;
                if frows >= remaining {
                    return Ok(((hrows, remaining), orig));
                }
            }
            FramePart::Body if hrows + frows >= remaining => {
                // The body keeps one row.
                let rless1 = remaining.saturating_sub(1);
                if frows >= rless1 {
                    return Ok(((0, rless1), orig));
                }
                remaining -= frows;
                return Ok(((remaining.saturating_sub(1), frows), orig));
            }
            FramePart::Body => {}
        }
        Ok(((hrows, frows), orig))
    }

    /// Render a header or footer into `rows`, trimming it from the far end
    /// when it doesn't fit.
    fn render_edge(
        w: &WidgetRef,
        maxcol: u32,
        rows: u32,
        natural: u32,
        valign: Valign,
        focus: bool,
    ) -> Result<CanvasRef> {
        if rows < natural {
            let f = uncached(Filler::new(w.clone()).with_valign(valign));
            return f.borrow_mut().render(RenderSize::boxed(maxcol, rows), focus);
        }
        let c = w.borrow_mut().render(RenderSize::Flow(maxcol), focus)?;
        if c.rows() != natural {
            return Err(Error::Sizing(format!(
                "frame part rendered {} rows but asked for {natural}",
                c.rows()
            )));
        }
        Ok(c)
    }

    /// Unpack a box size.
    fn expect_box(&self, size: RenderSize) -> Result<Expanse> {
        match size {
            RenderSize::Box(e) => Ok(e),
            other => Err(Error::Sizing(format!("frame rendered at {other}"))),
        }
    }
}

impl Container for Frame {
    type Position = FramePart;

    fn focus(&self) -> Option<WidgetRef> {
        self.part(self.focus_part)
    }

    fn focus_position(&self) -> Result<FramePart> {
        Ok(self.focus_part)
    }

    fn set_focus_position(&mut self, position: FramePart) -> Result<()> {
        if self.part(position).is_none() {
            return Err(Error::OutOfRange(format!("frame has no {position}")));
        }
        if position != self.focus_part {
            self.focus_part = position;
            cache::invalidate(self.id);
        }
        Ok(())
    }
}

impl Widget for Frame {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn name(&self) -> &'static str {
        "frame"
    }

    fn sizing(&self) -> Sizing {
        Sizing::BOX
    }

    fn selectable(&self) -> bool {
        self.focus().is_some_and(|w| w.borrow().selectable())
    }

    fn render(&mut self, size: RenderSize, focus: bool) -> Result<CanvasRef> {
        let e = self.expect_box(size)?;
        let ((htrim, ftrim), (hrows, frows)) = self.frame_top_bottom(e, focus)?;
        let mut parts = vec![];
        if let Some(h) = &self.header
            && htrim > 0
        {
            let hf = self.focus_part == FramePart::Header;
            let c = Self::render_edge(h, e.w, htrim, hrows, Valign::Top, focus && hf)?;
            parts.push((c, hf));
        }
        if htrim + ftrim < e.h {
            let bf = self.focus_part == FramePart::Body;
            let c = self
                .body
                .borrow_mut()
                .render(RenderSize::boxed(e.w, e.h - htrim - ftrim), focus && bf)?;
            parts.push((c, bf));
        }
        if let Some(f) = &self.footer
            && ftrim > 0
        {
            let ff = self.focus_part == FramePart::Footer;
            let c = Self::render_edge(f, e.w, ftrim, frows, Valign::Bottom, focus && ff)?;
            parts.push((c, ff));
        }
        if parts.is_empty() {
            return Ok(canvas::Canvas::blank(e));
        }
        canvas::combine(parts)
    }

    fn keypress(&mut self, size: RenderSize, key: Key) -> Result<Option<Key>> {
        let e = self.expect_box(size)?;
        match self.focus_part {
            FramePart::Header | FramePart::Footer => {
                let Some(w) = self.focus() else {
                    return Ok(Some(key));
                };
                if !w.borrow().selectable() {
                    return Ok(Some(key));
                }
                w.borrow_mut().keypress(RenderSize::Flow(e.w), key)
            }
            FramePart::Body => {
                let mut remaining = i64::from(e.h);
                for w in self.header.iter().chain(self.footer.iter()) {
                    remaining -= i64::from(w.borrow_mut().rows(e.w, false)?);
                }
                if remaining <= 0 || !self.body.borrow().selectable() {
                    return Ok(Some(key));
                }
                self.body
                    .borrow_mut()
                    .keypress(RenderSize::boxed(e.w, remaining as u32), key)
            }
        }
    }

    fn mouse_event(&mut self, size: RenderSize, event: MouseEvent, focus: bool) -> Result<bool> {
        let e = self.expect_box(size)?;
        let ((htrim, ftrim), _) = self.frame_top_bottom(e, focus)?;
        let row = event.location.y;
        let (part, size, origin) = if row < htrim {
            (FramePart::Header, RenderSize::Flow(e.w), 0)
        } else if row >= e.h.saturating_sub(ftrim) {
            (FramePart::Footer, RenderSize::Flow(e.w), e.h - ftrim)
        } else {
            (
                FramePart::Body,
                RenderSize::boxed(e.w, e.h.saturating_sub(htrim + ftrim)),
                htrim,
            )
        };
        let Some(w) = self.part(part) else {
            return Ok(false);
        };
        let part_focus = focus && self.focus_part == part;
        if event.is_press() && event.button == Button::Left && w.borrow().selectable() {
            self.set_focus_position(part)?;
        }
        let Some(ev) = event.relative_to(Point::new(0, origin)) else {
            return Ok(false);
        };
        w.borrow_mut().mouse_event(size, ev, part_focus)
    }

    fn cursor_coords(&mut self, size: RenderSize) -> Result<Option<Point>> {
        let e = self.expect_box(size)?;
        let Some(w) = self.focus() else {
            return Ok(None);
        };
        if !w.borrow().selectable() {
            return Ok(None);
        }
        let ((hrows, frows), _) = self.frame_top_bottom(e, true)?;
        let (size, row_adjust) = match self.focus_part {
            FramePart::Header => (RenderSize::Flow(e.w), 0),
            FramePart::Body => (
                RenderSize::boxed(e.w, e.h.saturating_sub(hrows + frows)),
                hrows,
            ),
            FramePart::Footer => (RenderSize::Flow(e.w), e.h.saturating_sub(frows)),
        };
        Ok(w
            .borrow_mut()
            .cursor_coords(size)?
            .map(|p| Point::new(p.x, p.y + row_adjust)))
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

    fn frame(header: &str, footer: &str) -> Frame {
        Frame::new(boxed(SolidFill::new('.')))
            .with_header(boxed(Text::new(header)))
            .with_footer(boxed(Text::new(footer)))
    }

    #[test]
    fn layout() -> Result<()> {
        let w = boxed(frame("head", "foot"));
        let c = render(&w, RenderSize::boxed(4, 4), false)?;
        CanvasTest::new(&c).assert_matches(buf!["head" "...." "...." "foot"]);
        Ok(())
    }

    #[test]
    fn short_space_keeps_body_row() -> Result<()> {
        let f = frame("a b c", "x y");
        // Header wants 3 rows and footer 2, in 4 rows at width 1.
        assert_eq!(f.frame_top_bottom(Expanse::new(1, 4), false)?, ((1, 2), (3, 2)));
        let w = boxed(f);
        let c = render(&w, RenderSize::boxed(1, 4), false)?;
        CanvasTest::new(&c).assert_matches(buf!["a" "." "x" "y"]);
        Ok(())
    }

    #[test]
    fn footer_focus_trims_header() -> Result<()> {
        let mut f = Frame::new(boxed(SolidFill::new('.')))
            .with_header(boxed(Text::new("a b")))
            .with_footer(boxed(Edit::new("", "z")));
        f.set_focus_position(FramePart::Footer)?;
        assert_eq!(f.frame_top_bottom(Expanse::new(1, 2), true)?, ((1, 1), (2, 1)));
        let w = boxed(f);
        let c = render(&w, RenderSize::boxed(1, 2), true)?;
        CanvasTest::new(&c).assert_matches(buf!["a" "z"]);
        Ok(())
    }

    #[test]
    fn routing() -> Result<()> {
        let body = boxed(Filler::new(boxed(Edit::new("", ""))));
        let footer = boxed(Edit::new("> ", ""));
        let w = crate::widget::cached(
            Frame::new(body.clone())
                .with_header(boxed(Text::new("title")))
                .with_footer(footer.clone()),
        );
        let size = RenderSize::boxed(10, 5);
        w.borrow_mut().keypress(size, Key::from('b'))?;
        w.borrow_mut()
            .mouse_event(size, MouseEvent::press(Button::Left, Point::new(3, 4)), true)?;
        assert_eq!(w.borrow().focus_position()?, FramePart::Footer);
        w.borrow_mut().keypress(size, Key::from('f'))?;
        assert_eq!(w.borrow_mut().cursor_coords(size)?, Some(Point::new(3, 4)));
        assert!(w.borrow_mut().set_focus_position(FramePart::Header).is_ok());
        assert!(!w.borrow().selectable());
        let mut bare = Frame::new(body);
        assert!(bare.set_focus_position(FramePart::Footer).is_err());
        Ok(())
    }
}
