use std::rc::Rc;

use crate::{
    cache,
    canvas::{self, CanvasRef},
    error::Result,
    event::{key::Key, mouse::MouseEvent},
    geom::Point,
    id::WidgetId,
    sizing::{RenderSize, Sizing},
    style::AttrMapping,
    widget::{PrefCol, Widget, WidgetRef},
};

/// Substitutes attributes in everything its body draws, with a separate
/// mapping for when it is rendered in focus.
pub struct AttrMap {
    /// Identity.
    id: WidgetId,
    /// The decorated widget.
    body: WidgetRef,
    /// Mapping used out of focus, and in focus when there is no focus map.
    attr_map: Rc<AttrMapping>,
    /// Mapping used in focus.
    focus_map: Option<Rc<AttrMapping>>,
}

impl AttrMap {
    /// Decorate `body` with a mapping.
    pub fn new(body: WidgetRef, attr_map: AttrMapping) -> Self {
        Self {
            id: WidgetId::new(),
            body,
            attr_map: Rc::new(attr_map),
            focus_map: None,
        }
    }

    /// Paint unattributed cells with `attr`, and with `focus_attr` when in
    /// focus.
    pub fn fill(body: WidgetRef, attr: &str, focus_attr: Option<&str>) -> Self {
        let mut w = Self::new(body, AttrMapping::fill(attr));
        w.focus_map = focus_attr.map(|a| Rc::new(AttrMapping::fill(a)));
        w
    }

    /// Set the focus mapping.
    pub fn with_focus_map(mut self, focus_map: AttrMapping) -> Self {
        self.focus_map = Some(Rc::new(focus_map));
        self
    }

    /// The decorated widget.
    pub fn body(&self) -> WidgetRef {
        self.body.clone()
    }

    /// The unfocused mapping.
    pub fn attr_map(&self) -> &AttrMapping {
        &self.attr_map
    }

    /// The focus mapping, if any.
    pub fn focus_map(&self) -> Option<&AttrMapping> {
        self.focus_map.as_deref()
    }

    /// Replace the unfocused mapping.
    pub fn set_attr_map(&mut self, attr_map: AttrMapping) {
        self.attr_map = Rc::new(attr_map);
        cache::invalidate(self.id);
    }

    /// Replace the focus mapping. `None` uses the unfocused mapping
    /// everywhere.
    pub fn set_focus_map(&mut self, focus_map: Option<AttrMapping>) {
        self.focus_map = focus_map.map(Rc::new);
        cache::invalidate(self.id);
    }
}

impl Widget for AttrMap {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn name(&self) -> &'static str {
        "attr_map"
    }

    fn sizing(&self) -> Sizing {
        self.body.borrow().sizing()
    }

    fn selectable(&self) -> bool {
        self.body.borrow().selectable()
    }

    fn ignore_focus(&self) -> bool {
        self.focus_map.is_none() && self.body.borrow().ignore_focus()
    }

    fn rows(&mut self, cols: u32, focus: bool) -> Result<u32> {
        self.body.borrow_mut().rows(cols, focus)
    }

    fn pack(&mut self, size: RenderSize, focus: bool) -> Result<(u32, u32)> {
        self.body.borrow_mut().pack(size, focus)
    }

    fn render(&mut self, size: RenderSize, focus: bool) -> Result<CanvasRef> {
        let c = self.body.borrow_mut().render(size, focus)?;
        let mapping = match (&self.focus_map, focus) {
            (Some(m), true) => m.clone(),
            _ => self.attr_map.clone(),
        };
        canvas::attr_map(c, mapping)
    }

    fn keypress(&mut self, size: RenderSize, key: Key) -> Result<Option<Key>> {
        self.body.borrow_mut().keypress(size, key)
    }

    fn mouse_event(&mut self, size: RenderSize, event: MouseEvent, focus: bool) -> Result<bool> {
        self.body.borrow_mut().mouse_event(size, event, focus)
    }

    fn cursor_coords(&mut self, size: RenderSize) -> Result<Option<Point>> {
        self.body.borrow_mut().cursor_coords(size)
    }

    fn pref_col(&mut self, size: RenderSize) -> Result<Option<PrefCol>> {
        self.body.borrow_mut().pref_col(size)
    }

    fn move_cursor_to_coords(&mut self, size: RenderSize, col: PrefCol, row: u32) -> Result<bool> {
        self.body.borrow_mut().move_cursor_to_coords(size, col, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        style::Attr,
        testing::{CanvasTest, render},
        widget::{boxed, cached, erase},
        widgets::text::Text,
    };

    #[test]
    fn focus_and_unfocused() -> Result<()> {
        let w = boxed(AttrMap::fill(boxed(Text::new("hi")), "greeting", Some("fgreet")));
        let c = render(&w, RenderSize::Flow(5), false)?;
        assert!(CanvasTest::new(&c).contains_text_attr("hi   ", Some("greeting")));
        let c = render(&w, RenderSize::Flow(5), true)?;
        assert!(CanvasTest::new(&c).contains_text_attr("hi   ", Some("fgreet")));
        Ok(())
    }

    #[test]
    fn maps_named_attrs() -> Result<()> {
        let w = boxed(AttrMap::new(
            boxed(Text::markup(vec![(Some(Attr::new("word")), "hi".into())])),
            AttrMapping::new()
                .with(Some("word"), Some("greeting"))
                .with(None, Some("bg")),
        ));
        let c = render(&w, RenderSize::Flow(5), false)?;
        let t = CanvasTest::new(&c);
        assert!(t.contains_text_attr("hi", Some("greeting")));
        assert!(t.contains_text_attr("   ", Some("bg")));
        assert!(w.borrow().ignore_focus());
        Ok(())
    }

    #[test]
    fn set_map_invalidates() -> Result<()> {
        let w = cached(AttrMap::fill(boxed(Text::new("x")), "a", None));
        let held = render(&erase(&w), RenderSize::Flow(1), false)?;
        assert!(cache::is_cached(w.borrow().id()));
        w.borrow_mut().set_attr_map(AttrMapping::fill("b"));
        assert!(!cache::is_cached(w.borrow().id()));
        // The old canvas survives, but is no longer served.
        assert!(CanvasTest::new(&held).contains_text_attr("x", Some("a")));
        let fresh = render(&erase(&w), RenderSize::Flow(1), false)?;
        assert!(CanvasTest::new(&fresh).contains_text_attr("x", Some("b")));
        Ok(())
    }
}
