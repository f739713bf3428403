//! The widget contract and the caching wrapper every widget is held in.

use std::{
    cell::RefCell,
    ops::{Deref, DerefMut},
    rc::Rc,
};

use crate::{
    cache,
    canvas::{self, CanvasRef, Owner},
    error::{Error, Result},
    event::{key::Key, mouse::MouseEvent},
    geom::Point,
    id::WidgetId,
    sizing::{RenderSize, Sizing},
};

/// A preferred cursor column, carried across focus moves so vertical
/// navigation keeps its horizontal position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefCol {
    /// The leftmost column.
    Left,
    /// The rightmost column.
    Right,
    /// A specific column.
    Col(u32),
}

impl PrefCol {
    /// Resolve against a width.
    pub fn resolve(&self, cols: u32) -> u32 {
        match self {
            Self::Left => 0,
            Self::Right => cols.saturating_sub(1),
            Self::Col(c) => *c,
        }
    }

    /// Shift a concrete column left by `n`, leaving symbolic columns as
    /// they are.
    pub fn shift_left(self, n: u32) -> Self {
        match self {
            Self::Col(c) => Self::Col(c.saturating_sub(n)),
            other => other,
        }
    }
}

/// The widget contract. Sizes are passed as [`RenderSize`], whose variant
/// is the sizing mode the caller has chosen; a widget is only ever asked
/// for modes in its `sizing` set.
pub trait Widget {
    /// Stable identity, used to key the canvas cache.
    fn id(&self) -> WidgetId;

    /// Short name for diagnostics.
    fn name(&self) -> &'static str {
        "widget"
    }

    /// Sizing modes this widget supports.
    fn sizing(&self) -> Sizing;

    /// Can this widget take focus?
    fn selectable(&self) -> bool {
        false
    }

    /// Does rendering ignore the focus flag? Such widgets have one cache
    /// entry per size instead of two.
    fn ignore_focus(&self) -> bool {
        false
    }

    /// Can this widget's canvases be cached? A widget that changes without
    /// invalidating itself must return false.
    fn cacheable(&self) -> bool {
        true
    }

    /// Rows needed at `cols` columns, for FLOW widgets.
    fn rows(&mut self, cols: u32, focus: bool) -> Result<u32> {
        Ok(self.render(RenderSize::Flow(cols), focus)?.rows())
    }

    /// Natural `(cols, rows)` at a size. FIXED widgets must override this.
    fn pack(&mut self, size: RenderSize, focus: bool) -> Result<(u32, u32)> {
        match size {
            RenderSize::Box(e) => Ok((e.w, e.h)),
            RenderSize::Flow(cols) => Ok((cols, self.rows(cols, focus)?)),
            RenderSize::Fixed => Err(Error::Sizing(format!(
                "{} does not implement pack for fixed sizing",
                self.name()
            ))),
        }
    }

    /// Render a canvas of exactly the requested size.
    fn render(&mut self, size: RenderSize, focus: bool) -> Result<CanvasRef>;

    /// Handle a key. Returns the key if it was not handled.
    fn keypress(&mut self, _size: RenderSize, key: Key) -> Result<Option<Key>> {
        Ok(Some(key))
    }

    /// Handle a mouse event located relative to this widget. Returns true
    /// if the event was handled.
    fn mouse_event(&mut self, _size: RenderSize, _event: MouseEvent, _focus: bool) -> Result<bool> {
        Ok(false)
    }

    /// Where the cursor would be drawn when rendered in focus at `size`.
    fn cursor_coords(&mut self, _size: RenderSize) -> Result<Option<Point>> {
        Ok(None)
    }

    /// The column a cursor-moving container should try to preserve.
    fn pref_col(&mut self, _size: RenderSize) -> Result<Option<PrefCol>> {
        Ok(None)
    }

    /// Try to put the cursor at `(col, row)`. Returns false if that is
    /// impossible; widgets without a cursor accept every request.
    fn move_cursor_to_coords(&mut self, _size: RenderSize, _col: PrefCol, _row: u32) -> Result<bool> {
        Ok(true)
    }
}

/// Wraps a widget so that `render` and `rows` go through the canvas cache.
///
/// Every other method passes straight through to the inner widget via
/// `Deref`.
pub struct CachingWidget<W: ?Sized> {
    /// Caching switch; false for widgets wrapped with [`uncached`].
    caching: bool,
    /// The wrapped widget.
    inner: W,
}

impl<W: Widget + ?Sized> CachingWidget<W> {
    /// Is this render cacheable?
    fn use_cache(&self) -> bool {
        self.caching && self.inner.cacheable()
    }

    /// The focus flag as the widget sees it.
    fn effective_focus(&self, focus: bool) -> bool {
        focus && !self.inner.ignore_focus()
    }

    /// Render through the cache. Fresh canvases are checked against the
    /// requested size, stamped with their owner and stored.
    pub fn render(&mut self, size: RenderSize, focus: bool) -> Result<CanvasRef> {
        let focus = self.effective_focus(focus);
        let id = self.inner.id();
        if self.use_cache()
            && let Some(c) = cache::fetch(id, size, focus)
        {
            return Ok(c);
        }
        let sizing = self.inner.sizing();
        if !sizing.permits(size) {
            return Err(Error::Sizing(format!(
                "{} supports {sizing} but was rendered at {size}",
                self.inner.name()
            )));
        }
        let canvas = self.inner.render(size, focus)?;
        self.validate_size(size, focus, &canvas)?;
        let canvas = canvas::finalize(canvas, Owner { widget: id, size, focus });
        if self.use_cache() {
            cache::store(&canvas)?;
        }
        Ok(canvas)
    }

    /// Check a fresh canvas against the size it was rendered for.
    fn validate_size(&mut self, size: RenderSize, focus: bool, canvas: &CanvasRef) -> Result<()> {
        let name = self.inner.name();
        let got = canvas.size();
        let ok = match size {
            RenderSize::Box(e) => got == e,
            RenderSize::Flow(cols) => {
                // Re-deriving rows doubles the work of a render.
                got.w == cols && (!cfg!(debug_assertions) || got.h == self.inner.rows(cols, focus)?)
            }
            RenderSize::Fixed => {
                let (w, h) = self.inner.pack(size, focus)?;
                got.w == w && got.h == h
            }
        };
        if ok {
            Ok(())
        } else {
            Err(Error::Sizing(format!(
                "{name} rendered a {}x{} canvas at {size}",
                got.w, got.h
            )))
        }
    }

    /// Rows at `cols`, answered from a cached FLOW canvas when there is one.
    pub fn rows(&mut self, cols: u32, focus: bool) -> Result<u32> {
        let focus = self.effective_focus(focus);
        if self.use_cache()
            && let Some(c) = cache::fetch(self.inner.id(), RenderSize::Flow(cols), focus)
        {
            return Ok(c.rows());
        }
        self.inner.rows(cols, focus)
    }

    /// Natural size, as reported by the widget.
    pub fn pack(&mut self, size: RenderSize, focus: bool) -> Result<(u32, u32)> {
        let focus = self.effective_focus(focus);
        self.inner.pack(size, focus)
    }

    /// Is caching enabled for this wrapper?
    pub fn caching(&self) -> bool {
        self.caching
    }
}

impl<W: ?Sized> Deref for CachingWidget<W> {
    type Target = W;

    fn deref(&self) -> &W {
        &self.inner
    }
}

impl<W: ?Sized> DerefMut for CachingWidget<W> {
    fn deref_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

/// A shared handle to a concrete widget.
pub type Handle<W> = Rc<RefCell<CachingWidget<W>>>;

/// A shared, type-erased widget handle, as held by containers.
pub type WidgetRef = Handle<dyn Widget>;

/// Wrap a widget with caching enabled.
pub fn cached<W: Widget>(w: W) -> Handle<W> {
    Rc::new(RefCell::new(CachingWidget {
        caching: true,
        inner: w,
    }))
}

/// Wrap a widget with caching disabled. Every render call reaches the
/// widget.
pub fn uncached<W: Widget>(w: W) -> Handle<W> {
    Rc::new(RefCell::new(CachingWidget {
        caching: false,
        inner: w,
    }))
}

/// Erase a typed handle.
pub fn erase<W: Widget + 'static>(h: &Handle<W>) -> WidgetRef {
    h.clone()
}

/// Wrap a widget with caching enabled and erase its type.
pub fn boxed<W: Widget + 'static>(w: W) -> WidgetRef {
    cached(w)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{
        canvas::{Canvas, TextRow},
        geom::Expanse,
        widgets::Text,
    };

    /// Renders `rows` rows of dots and counts its renders.
    struct Counter {
        id: WidgetId,
        rows: u32,
        renders: Rc<Cell<u32>>,
        lie: bool,
    }

    impl Counter {
        fn new(rows: u32) -> (Self, Rc<Cell<u32>>) {
            let renders = Rc::new(Cell::new(0));
            (
                Self {
                    id: WidgetId::new(),
                    rows,
                    renders: renders.clone(),
                    lie: false,
                },
                renders,
            )
        }
    }

    impl Widget for Counter {
        fn id(&self) -> WidgetId {
            self.id
        }

        fn sizing(&self) -> Sizing {
            Sizing::FLOW | Sizing::BOX
        }

        fn rows(&mut self, _cols: u32, _focus: bool) -> Result<u32> {
            Ok(self.rows)
        }

        fn render(&mut self, size: RenderSize, _focus: bool) -> Result<CanvasRef> {
            self.renders.set(self.renders.get() + 1);
            let rows = size.rows().unwrap_or(self.rows) + u32::from(self.lie);
            let cols = size.cols().unwrap_or(0);
            Ok(Canvas::solid('.', None, Expanse::new(cols, rows)))
        }
    }

    #[test]
    fn cache_hit_is_same_canvas() -> Result<()> {
        let (p, renders) = Counter::new(2);
        let w = cached(p);
        let a = w.borrow_mut().render(RenderSize::Flow(4), false)?;
        let b = w.borrow_mut().render(RenderSize::Flow(4), false)?;
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(renders.get(), 1);
        assert_eq!(a.owner().map(|o| o.widget), Some(w.borrow().id()));

        // Different focus is a different entry.
        w.borrow_mut().render(RenderSize::Flow(4), true)?;
        assert_eq!(renders.get(), 2);

        // Rows are answered from the cached canvas.
        assert_eq!(w.borrow_mut().rows(4, false)?, 2);

        cache::invalidate(w.borrow().id());
        let c = w.borrow_mut().render(RenderSize::Flow(4), false)?;
        assert!(!Rc::ptr_eq(&a, &c));
        assert_eq!(renders.get(), 3);
        Ok(())
    }

    #[test]
    fn uncached_always_renders() -> Result<()> {
        let (p, renders) = Counter::new(1);
        let w = uncached(p);
        let _a = w.borrow_mut().render(RenderSize::boxed(3, 3), false)?;
        let _b = w.borrow_mut().render(RenderSize::boxed(3, 3), false)?;
        assert_eq!(renders.get(), 2);
        assert!(!w.borrow().caching());
        Ok(())
    }

    #[test]
    fn size_contract() -> Result<()> {
        let (mut p, _) = Counter::new(1);
        p.lie = true;
        let w = cached(p);
        assert!(matches!(
            w.borrow_mut().render(RenderSize::Flow(3), false),
            Err(Error::Sizing(_))
        ));
        assert!(matches!(
            w.borrow_mut().render(RenderSize::Fixed, false),
            Err(Error::Sizing(_))
        ));
        Ok(())
    }

    #[test]
    fn erased_handles() -> Result<()> {
        let (p, _) = Counter::new(1);
        let h = cached(p);
        let w = erase(&h);
        let c = w.borrow_mut().render(RenderSize::Flow(2), false)?;
        assert_eq!(c.size(), Expanse::new(2, 1));
        let t = boxed(FixedWord(WidgetId::new()));
        assert_eq!(t.borrow_mut().pack(RenderSize::Fixed, false)?, (2, 1));
        Ok(())
    }

    #[test]
    fn pack_reaches_the_widget() -> Result<()> {
        let t = cached(Text::new("hi"));
        assert_eq!(t.borrow_mut().pack(RenderSize::Flow(10), false)?, (2, 1));
        // A cached flow canvas does not change the natural width.
        let _held = t.borrow_mut().render(RenderSize::Flow(10), false)?;
        assert_eq!(t.borrow_mut().pack(RenderSize::Flow(10), false)?, (2, 1));
        let e = erase(&t);
        assert_eq!(e.borrow_mut().pack(RenderSize::Flow(10), false)?, (2, 1));
        Ok(())
    }

    struct FixedWord(WidgetId);

    impl Widget for FixedWord {
        fn id(&self) -> WidgetId {
            self.0
        }

        fn sizing(&self) -> Sizing {
            Sizing::FIXED
        }

        fn pack(&mut self, _size: RenderSize, _focus: bool) -> Result<(u32, u32)> {
            Ok((2, 1))
        }

        fn render(&mut self, _size: RenderSize, _focus: bool) -> Result<CanvasRef> {
            Canvas::text(vec![TextRow::new("ok", None)], None, None)
        }
    }
}
