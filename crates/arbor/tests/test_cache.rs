//! Integration tests for the canvas cache.

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use arbor::{
        Widget, cache,
        error::{Error, Result},
        event::Event,
        geom::Expanse,
        main_loop::MainLoop,
        sizing::RenderSize,
        testing::{TestDisplay, render},
        widget::{boxed, cached, erase},
        widgets::{Filler, Pile, Text},
    };

    #[test]
    fn repeat_render_is_a_hit() -> Result<()> {
        cache::clear();
        cache::reset_stats();
        let t = boxed(Text::new("hello"));
        let first = render(&t, RenderSize::Flow(5), false)?;
        let second = render(&t, RenderSize::Flow(5), false)?;
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache::stats().hits, 1);

        // A different size is a different entry.
        let narrow = render(&t, RenderSize::Flow(3), false)?;
        assert!(!Rc::ptr_eq(&first, &narrow));
        assert_eq!(narrow.rows(), 2);
        Ok(())
    }

    #[test]
    fn child_change_cascades_to_parent() -> Result<()> {
        cache::clear();
        cache::reset_stats();
        let a = cached(Text::new("one"));
        let b = cached(Text::new("two"));
        let a_id = a.borrow().id();
        let pile = boxed(Pile::from_widgets(vec![erase(&a), erase(&b)]));
        let pile_id = pile.borrow().id();

        let before = render(&pile, RenderSize::Flow(5), false)?;
        assert!(cache::is_cached(pile_id));
        assert!(cache::is_cached(a_id));

        a.borrow_mut().set_text("uno");
        assert!(!cache::is_cached(a_id));
        assert!(!cache::is_cached(pile_id));
        let cascades = cache::stats().cascades;
        assert!(cascades >= 1);

        // Nothing is left to discard the second time round.
        cache::invalidate(a_id);
        assert_eq!(cache::stats().cascades, cascades);

        let after = render(&pile, RenderSize::Flow(5), false)?;
        assert!(!Rc::ptr_eq(&before, &after));
        assert_eq!(after.text_lines()[0].trim_end(), "uno");
        assert_eq!(before.text_lines()[0].trim_end(), "one");
        Ok(())
    }

    #[test]
    fn sibling_change_leaves_untouched_child_cached() -> Result<()> {
        cache::clear();
        let a = cached(Text::new("one"));
        let b = cached(Text::new("two"));
        let b_id = b.borrow().id();
        let pile = boxed(Pile::from_widgets(vec![erase(&a), erase(&b)]));
        let _held = render(&pile, RenderSize::Flow(5), false)?;

        a.borrow_mut().set_text("uno");
        assert!(cache::is_cached(b_id));
        Ok(())
    }

    #[test]
    fn entries_die_with_their_canvas() -> Result<()> {
        cache::clear();
        let t = boxed(Text::new("gone"));
        let id = t.borrow().id();
        let c = render(&t, RenderSize::Flow(4), false)?;
        assert!(cache::is_cached(id));
        drop(c);
        assert!(!cache::is_cached(id));
        assert_eq!(cache::len(), 0);
        Ok(())
    }

    #[test]
    fn display_keeps_last_frame_alive() -> Result<()> {
        cache::clear();
        let display = TestDisplay::new(Expanse::new(6, 3));
        let text = cached(Text::new("hi"));
        let text_id = text.borrow().id();
        let root = boxed(Filler::new(erase(&text)));
        let root_id = root.borrow().id();

        let mut ml = MainLoop::new(root, Box::new(display.clone()))?;
        ml.set_unhandled_input(|_| Err(Error::Exit));
        display.push_input([Event::Key('q'.into())])?;
        ml.run()?;

        assert!(display.last_frame().is_some());
        assert!(cache::is_cached(root_id));
        assert!(cache::is_cached(text_id));

        display.forget();
        assert!(!cache::is_cached(root_id));
        assert!(!cache::is_cached(text_id));
        Ok(())
    }

    #[test]
    fn disabled_cache_always_renders() -> Result<()> {
        cache::clear();
        cache::set_enabled(false);
        let t = boxed(Text::new("x"));
        let first = render(&t, RenderSize::Flow(1), false)?;
        let second = render(&t, RenderSize::Flow(1), false)?;
        cache::set_enabled(true);
        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(cache::len(), 0);
        Ok(())
    }
}
