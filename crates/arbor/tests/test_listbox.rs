//! Integration tests for list box scrolling and focus movement.

#[cfg(test)]
mod tests {
    use arbor::{
        Widget,
        error::Result,
        event::key::{Key, KeyCode},
        sizing::RenderSize,
        testing::{render, render_lines},
        widget::{Handle, boxed, cached, erase},
        widgets::{ComingFrom, Container, Edit, FocusValign, ListBox, SimpleListWalker, Text},
    };

    type Lb = Handle<ListBox<SimpleListWalker>>;

    fn listbox(items: Vec<arbor::WidgetRef>) -> Lb {
        cached(ListBox::new(SimpleListWalker::new(items)))
    }

    fn numbered(n: usize) -> Lb {
        listbox((0..n).map(|i| boxed(Text::new(i.to_string()))).collect())
    }

    fn lines(lb: &Lb, size: RenderSize) -> Result<Vec<String>> {
        Ok(render_lines(&erase(lb), size, true)?
            .into_iter()
            .map(|l| l.trim_end().to_string())
            .collect())
    }

    fn focus(lb: &Lb) -> Result<usize> {
        lb.borrow().focus_position()
    }

    #[test]
    fn page_down_over_text() -> Result<()> {
        let lb = listbox(["a", "b", "c", "d", "e"].iter().map(|s| boxed(Text::new(*s))).collect());
        let size = RenderSize::boxed(10, 3);
        assert_eq!(lines(&lb, size)?, vec!["a", "b", "c"]);

        lb.borrow_mut().set_focus(2, None)?;
        lb.borrow_mut().set_focus_valign(FocusValign::FixedTop(1));
        assert_eq!(lines(&lb, size)?, vec!["b", "c", "d"]);
        assert_eq!(focus(&lb)?, 2);

        let unhandled = lb.borrow_mut().keypress(size, KeyCode::PageDown.into())?;
        assert_eq!(unhandled, None);
        assert_eq!(focus(&lb)?, 4);
        assert_eq!(lines(&lb, size)?, vec!["c", "d", "e"]);
        Ok(())
    }

    #[test]
    fn down_snaps_to_next_selectable() -> Result<()> {
        let lb = listbox(vec![
            boxed(Text::new("t0")),
            boxed(Edit::new("", "e1")),
            boxed(Text::new("t2")),
            boxed(Edit::new("", "e3")),
        ]);
        let size = RenderSize::boxed(4, 3);
        assert_eq!(lines(&lb, size)?, vec!["t0", "e1", "t2"]);
        assert_eq!(focus(&lb)?, 1);

        assert_eq!(lb.borrow_mut().keypress(size, KeyCode::Down.into())?, None);
        assert_eq!(focus(&lb)?, 3);
        assert_eq!(lines(&lb, size)?, vec!["e1", "t2", "e3"]);

        // Nothing selectable remains below.
        let unhandled = lb.borrow_mut().keypress(size, KeyCode::Down.into())?;
        assert_eq!(unhandled, Some(Key::from(KeyCode::Down)));
        assert_eq!(focus(&lb)?, 3);
        Ok(())
    }

    #[test]
    fn coming_from_places_new_focus() -> Result<()> {
        let size = RenderSize::boxed(2, 3);
        for (coming_from, expected) in [
            (Some(ComingFrom::Above), vec!["3", "4", "5"]),
            (Some(ComingFrom::Below), vec!["5", "6", "7"]),
            (None, vec!["4", "5", "6"]),
        ] {
            let lb = numbered(10);
            assert_eq!(lines(&lb, size)?, vec!["0", "1", "2"]);
            lb.borrow_mut().set_focus(5, coming_from)?;
            assert_eq!(lines(&lb, size)?, expected, "coming from {coming_from:?}");
            assert_eq!(focus(&lb)?, 5);
        }
        Ok(())
    }

    #[test]
    fn visible_focus_keeps_its_row() -> Result<()> {
        let lb = numbered(10);
        let size = RenderSize::boxed(2, 4);
        assert_eq!(lines(&lb, size)?, vec!["0", "1", "2", "3"]);
        lb.borrow_mut().set_focus(2, None)?;
        assert_eq!(lines(&lb, size)?, vec!["0", "1", "2", "3"]);
        assert_eq!(focus(&lb)?, 2);
        Ok(())
    }

    #[test]
    fn shared_walker_edits_show_up() -> Result<()> {
        let lb = numbered(3);
        let size = RenderSize::boxed(3, 4);
        assert_eq!(lines(&lb, size)?, vec!["0", "1", "2", ""]);
        let body = lb.borrow().body();
        body.borrow_mut().push(boxed(Text::new("new")));
        assert_eq!(lines(&lb, size)?, vec!["0", "1", "2", "new"]);
        body.borrow_mut().remove(0)?;
        assert_eq!(lines(&lb, size)?, vec!["1", "2", "new", ""]);
        Ok(())
    }

    #[test]
    fn tall_focus_keeps_cursor_in_view() -> Result<()> {
        let body = (0..6).map(|i| format!("l{i}")).collect::<Vec<_>>().join("\n");
        let lb = listbox(vec![
            boxed(Text::new("top")),
            boxed(Edit::new("", body).multiline()),
            boxed(Text::new("end")),
        ]);
        let size = RenderSize::boxed(4, 3);
        assert_eq!(focus(&lb)?, 1);

        let check = |lb: &Lb, step: &str| -> Result<()> {
            let c = render(&erase(lb), size, true)?;
            assert_eq!((c.cols(), c.rows()), (4, 3), "{step}");
            if focus(lb)? == 1 {
                let cur = lb.borrow_mut().cursor_coords(size)?;
                assert!(cur.is_some_and(|p| p.x < 4 && p.y < 3), "{step}: {cur:?}");
            }
            Ok(())
        };

        // The cursor starts on the last line, so the bottom of the edit shows.
        check(&lb, "initial")?;
        assert!(lines(&lb, size)?.contains(&"l5".to_string()));

        for _ in 0..5 {
            lb.borrow_mut().keypress(size, KeyCode::Up.into())?;
            check(&lb, "up")?;
        }
        assert!(lines(&lb, size)?.contains(&"l0".to_string()));

        for k in [
            KeyCode::Up,
            KeyCode::PageDown,
            KeyCode::Down,
            KeyCode::PageDown,
            KeyCode::Down,
            KeyCode::PageUp,
            KeyCode::Up,
            KeyCode::PageUp,
        ] {
            lb.borrow_mut().keypress(size, k.into())?;
            check(&lb, &format!("{k:?}"))?;
        }
        Ok(())
    }
}
