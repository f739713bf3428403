use unicode_segmentation::UnicodeSegmentation;

use crate::{
    cache,
    canvas::{Canvas, CanvasRef, TextRow},
    error::Result,
    id::WidgetId,
    sizing::{RenderSize, Sizing},
    style::Attr,
    text::{self, Align, LineLayout, Wrap},
    widget::Widget,
};

/// Attributed text: a sequence of `(attribute, text)` runs.
pub type Markup = Vec<(Option<Attr>, String)>;

/// Flatten markup into text plus `(attribute, byte length)` runs.
pub(crate) fn flatten(markup: Markup) -> (String, Vec<(Option<Attr>, usize)>) {
    let mut out = String::new();
    let mut attrs: Vec<(Option<Attr>, usize)> = vec![];
    for (attr, s) in markup {
        if s.is_empty() {
            continue;
        }
        out.push_str(&s);
        match attrs.last_mut() {
            Some((a, n)) if *a == attr => *n += s.len(),
            _ => attrs.push((attr, s.len())),
        }
    }
    (out, attrs)
}

/// The attribute covering byte `pos`.
fn attr_at(attrs: &[(Option<Attr>, usize)], pos: usize) -> Option<Attr> {
    let mut end = 0;
    for (a, n) in attrs {
        end += n;
        if pos < end {
            return a.clone();
        }
    }
    None
}

/// Turn a layout into canvas rows, carrying attributes from the byte runs.
pub(crate) fn layout_rows(text: &str, attrs: &[(Option<Attr>, usize)], layout: &[LineLayout]) -> Vec<TextRow> {
    layout
        .iter()
        .map(|seg| {
            let mut row = " ".repeat(seg.offset as usize);
            let mut spans: Vec<(Option<Attr>, u32)> = vec![];
            if seg.offset > 0 {
                spans.push((None, seg.offset));
            }
            let mut last = None;
            for (i, g) in text[seg.start..seg.end].grapheme_indices(true) {
                let attr = attr_at(attrs, seg.start + i);
                let w = text::grapheme_width(g) as u32;
                row.push_str(g);
                match spans.last_mut() {
                    Some((a, n)) if *a == attr => *n += w,
                    _ => spans.push((attr.clone(), w)),
                }
                last = Some(attr);
            }
            if seg.ellipsis {
                row.push('…');
                let attr = last.flatten();
                match spans.last_mut() {
                    Some((a, n)) if *a == attr => *n += 1,
                    _ => spans.push((attr, 1)),
                }
            }
            TextRow::with_spans(&row, spans)
        })
        .collect()
}

/// A block of attributed text. Flow widgets wrap it to the width they are
/// given; fixed widgets take its natural width with no wrapping.
pub struct Text {
    /// Identity.
    id: WidgetId,
    /// The text.
    text: String,
    /// `(attribute, byte length)` runs over the text.
    attrs: Vec<(Option<Attr>, usize)>,
    /// Line alignment.
    align: Align,
    /// Wrapping mode.
    wrap: Wrap,
}

impl Text {
    /// Plain text.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let attrs = vec![(None, text.len())];
        Self {
            id: WidgetId::new(),
            text,
            attrs,
            align: Align::Left,
            wrap: Wrap::Space,
        }
    }

    /// Attributed text.
    pub fn markup(markup: Markup) -> Self {
        let (text, attrs) = flatten(markup);
        Self {
            id: WidgetId::new(),
            text,
            attrs,
            align: Align::Left,
            wrap: Wrap::Space,
        }
    }

    /// Text with a single attribute.
    pub fn styled(attr: &str, text: impl Into<String>) -> Self {
        Self::markup(vec![(Some(Attr::new(attr)), text.into())])
    }

    /// Set the alignment.
    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// Set the wrapping mode.
    pub fn with_wrap(mut self, wrap: Wrap) -> Self {
        self.wrap = wrap;
        self
    }

    /// The text content.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// `(attribute, byte length)` runs over the text.
    pub fn attrib(&self) -> &[(Option<Attr>, usize)] {
        &self.attrs
    }

    /// Replace the content with plain text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.attrs = vec![(None, self.text.len())];
        cache::invalidate(self.id);
    }

    /// Replace the content with attributed text.
    pub fn set_markup(&mut self, markup: Markup) {
        (self.text, self.attrs) = flatten(markup);
        cache::invalidate(self.id);
    }

    /// Change the alignment.
    pub fn set_align(&mut self, align: Align) {
        self.align = align;
        cache::invalidate(self.id);
    }

    /// Change the wrapping mode.
    pub fn set_wrap(&mut self, wrap: Wrap) {
        self.wrap = wrap;
        cache::invalidate(self.id);
    }

    /// Layout at `cols` columns.
    pub fn layout(&self, cols: u32) -> Vec<LineLayout> {
        text::layout(&self.text, cols, self.align, self.wrap)
    }
}

impl Widget for Text {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn name(&self) -> &'static str {
        "text"
    }

    fn sizing(&self) -> Sizing {
        Sizing::FLOW | Sizing::FIXED
    }

    fn ignore_focus(&self) -> bool {
        true
    }

    fn rows(&mut self, cols: u32, _focus: bool) -> Result<u32> {
        Ok(self.layout(cols).len() as u32)
    }

    fn pack(&mut self, size: RenderSize, _focus: bool) -> Result<(u32, u32)> {
        match size {
            RenderSize::Flow(cols) => {
                let l = self.layout(cols);
                let w = l.iter().map(|s| s.offset + s.width + u32::from(s.ellipsis)).max();
                Ok((w.unwrap_or(0).min(cols), l.len() as u32))
            }
            _ => {
                let w = text::natural_width(&self.text);
                Ok((w, self.text.split('\n').count() as u32))
            }
        }
    }

    fn render(&mut self, size: RenderSize, _focus: bool) -> Result<CanvasRef> {
        let layout = match size.cols() {
            Some(cols) => self.layout(cols),
            None => text::layout(&self.text, text::natural_width(&self.text), self.align, Wrap::Clip),
        };
        let cols = size.cols().unwrap_or_else(|| text::natural_width(&self.text));
        let rows = layout_rows(&self.text, &self.attrs, &layout);
        Canvas::text(rows, Some(cols), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{buf, testing::CanvasTest, widget::boxed};

    #[test]
    fn flow_wraps() -> Result<()> {
        let w = boxed(Text::new("hello big world"));
        let c = w.borrow_mut().render(RenderSize::Flow(9), false)?;
        CanvasTest::new(&c).assert_matches(buf!["hello big" "world"]);
        assert_eq!(w.borrow_mut().rows(9, false)?, 2);
        Ok(())
    }

    #[test]
    fn fixed_is_natural() -> Result<()> {
        let w = boxed(Text::new("ab\nlonger"));
        assert_eq!(w.borrow_mut().pack(RenderSize::Fixed, false)?, (6, 2));
        let c = w.borrow_mut().render(RenderSize::Fixed, false)?;
        assert_eq!(c.text_lines(), vec!["ab    ", "longer"]);
        Ok(())
    }

    #[test]
    fn aligned_markup() -> Result<()> {
        let w = boxed(
            Text::markup(vec![
                (Some(Attr::new("a")), "ab".into()),
                (None, "cd".into()),
            ])
            .with_align(Align::Right),
        );
        let c = w.borrow_mut().render(RenderSize::Flow(6), false)?;
        let t = CanvasTest::new(&c);
        t.assert_matches(buf!["  abcd"]);
        assert!(t.contains_text_attr("ab", Some("a")));
        assert!(t.contains_text_attr("cd", None));
        Ok(())
    }

    #[test]
    fn set_text_invalidates() -> Result<()> {
        let h = crate::widget::cached(Text::new("one"));
        let a = h.borrow_mut().render(RenderSize::Flow(5), false)?;
        assert!(cache::is_cached(h.borrow().id()));
        h.borrow_mut().set_text("two");
        assert!(!cache::is_cached(h.borrow().id()));
        let b = h.borrow_mut().render(RenderSize::Flow(5), false)?;
        assert_eq!(a.text_lines(), vec!["one  "]);
        assert_eq!(b.text_lines(), vec!["two  "]);
        Ok(())
    }

    #[test]
    fn ellipsis() -> Result<()> {
        let w = boxed(Text::new("abcdefgh").with_wrap(Wrap::Ellipsis));
        let c = w.borrow_mut().render(RenderSize::Flow(4), false)?;
        assert_eq!(c.text_lines(), vec!["abc…"]);
        Ok(())
    }
}
