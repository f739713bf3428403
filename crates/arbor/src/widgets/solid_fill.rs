use crate::{
    canvas::{self, Canvas, CanvasRef},
    error::Result,
    geom::Expanse,
    id::WidgetId,
    sizing::{RenderSize, Sizing},
    style::Attr,
    widget::Widget,
};

/// Fills its whole box with one glyph.
pub struct SolidFill {
    /// Identity.
    id: WidgetId,
    /// Fill glyph.
    ch: char,
    /// Fill attribute.
    attr: Option<Attr>,
}

impl SolidFill {
    /// Fill with `ch`.
    pub fn new(ch: char) -> Self {
        Self {
            id: WidgetId::new(),
            ch,
            attr: None,
        }
    }

    /// Set the fill attribute.
    pub fn with_attr(mut self, attr: &str) -> Self {
        self.attr = Some(Attr::new(attr));
        self
    }
}

impl Widget for SolidFill {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn name(&self) -> &'static str {
        "solid_fill"
    }

    fn sizing(&self) -> Sizing {
        Sizing::BOX
    }

    fn ignore_focus(&self) -> bool {
        true
    }

    fn render(&mut self, size: RenderSize, _focus: bool) -> Result<CanvasRef> {
        let RenderSize::Box(e) = size else {
            return Ok(Canvas::blank(Expanse::default()));
        };
        Ok(Canvas::solid(self.ch, self.attr.clone(), e))
    }
}

/// A horizontal rule: one row of a repeated glyph with optional blank rows
/// above and below.
pub struct Divider {
    /// Identity.
    id: WidgetId,
    /// Rule glyph.
    ch: char,
    /// Blank rows above.
    top: u32,
    /// Blank rows below.
    bottom: u32,
}

impl Divider {
    /// A divider drawn with `ch`.
    pub fn new(ch: char) -> Self {
        Self {
            id: WidgetId::new(),
            ch,
            top: 0,
            bottom: 0,
        }
    }

    /// Add blank rows above and below.
    pub fn with_margins(mut self, top: u32, bottom: u32) -> Self {
        self.top = top;
        self.bottom = bottom;
        self
    }
}

impl Widget for Divider {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn name(&self) -> &'static str {
        "divider"
    }

    fn sizing(&self) -> Sizing {
        Sizing::FLOW
    }

    fn ignore_focus(&self) -> bool {
        true
    }

    fn rows(&mut self, _cols: u32, _focus: bool) -> Result<u32> {
        Ok(self.top + 1 + self.bottom)
    }

    fn render(&mut self, size: RenderSize, _focus: bool) -> Result<CanvasRef> {
        let cols = size.cols().unwrap_or(0);
        let rule = Canvas::solid(self.ch, None, Expanse::new(cols, 1));
        if self.top == 0 && self.bottom == 0 {
            return Ok(rule);
        }
        canvas::pad_trim_top_bottom(rule, self.top as i32, self.bottom as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{buf, testing::CanvasTest, widget::boxed};

    #[test]
    fn fills() -> Result<()> {
        let w = boxed(SolidFill::new('#').with_attr("bg"));
        let c = w.borrow_mut().render(RenderSize::boxed(3, 2), true)?;
        let t = CanvasTest::new(&c);
        t.assert_matches(buf!["###" "###"]);
        assert!(t.contains_text_attr("###", Some("bg")));
        Ok(())
    }

    #[test]
    fn divider_margins() -> Result<()> {
        let w = boxed(Divider::new('-').with_margins(1, 1));
        assert_eq!(w.borrow_mut().rows(4, false)?, 3);
        let c = w.borrow_mut().render(RenderSize::Flow(4), false)?;
        CanvasTest::new(&c).assert_matches(buf!["" "----" ""]);
        Ok(())
    }
}
