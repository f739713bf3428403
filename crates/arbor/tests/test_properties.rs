//! Property tests for sizing, canvas composition and list box scrolling.

#[cfg(test)]
mod tests {
    use arbor::{
        Widget,
        canvas::{self, Canvas},
        error::Result,
        event::key::KeyCode,
        geom::Expanse,
        sizing::RenderSize,
        testing::render,
        widget::{boxed, cached, erase},
        widgets::{Edit, ListBox, SimpleListWalker, Text},
    };
    use proptest::prelude::*;

    /// Render a list of items of the given heights, press `keys`, and
    /// return the row count of every frame.
    fn drive(heights: &[(u32, bool)], cols: u32, rows: u32, keys: &[KeyCode]) -> Result<Vec<u32>> {
        let items = heights
            .iter()
            .enumerate()
            .map(|(i, (h, selectable))| {
                let text = vec![i.to_string(); *h as usize].join("\n");
                if *selectable {
                    boxed(Edit::new("", text).multiline())
                } else {
                    boxed(Text::new(text))
                }
            })
            .collect();
        let lb = cached(ListBox::new(SimpleListWalker::new(items)));
        let size = RenderSize::boxed(cols, rows);
        let mut out = vec![render(&erase(&lb), size, true)?.rows()];
        for k in keys {
            lb.borrow_mut().keypress(size, (*k).into())?;
            let c = render(&erase(&lb), size, true)?;
            assert_eq!(c.cols(), cols);
            out.push(c.rows());
        }
        Ok(out)
    }

    fn nav_key() -> impl Strategy<Value = KeyCode> {
        prop::sample::select(vec![
            KeyCode::Up,
            KeyCode::Down,
            KeyCode::PageUp,
            KeyCode::PageDown,
            KeyCode::Home,
            KeyCode::End,
        ])
    }

    proptest! {
        #[test]
        fn text_rows_match_render(text in "[a-z ]{0,40}", cols in 1u32..20) {
            let t = boxed(Text::new(text));
            let rows = t.borrow_mut().rows(cols, false);
            let canvas = render(&t, RenderSize::Flow(cols), false);
            prop_assert!(rows.is_ok() && canvas.is_ok());
            if let (Ok(rows), Ok(canvas)) = (rows, canvas) {
                prop_assert_eq!(canvas.rows(), rows);
                prop_assert_eq!(canvas.cols(), cols);
            }
        }

        #[test]
        fn combine_bounds(dims in prop::collection::vec((0u32..10, 1u32..5), 1..6)) {
            let parts = dims
                .iter()
                .map(|(w, h)| (Canvas::solid('x', None, Expanse::new(*w, *h)), false))
                .collect();
            let combined = canvas::combine(parts);
            prop_assert!(combined.is_ok());
            if let Ok(c) = combined {
                prop_assert_eq!(c.rows(), dims.iter().map(|(_, h)| h).sum::<u32>());
                prop_assert_eq!(c.cols(), dims.iter().map(|(w, _)| *w).max().unwrap_or(0));
            }
        }

        #[test]
        fn listbox_always_fills_its_box(
            heights in prop::collection::vec((1u32..=3, any::<bool>()), 0..12),
            rows in 3u32..8,
            keys in prop::collection::vec(nav_key(), 0..25),
        ) {
            let frames = drive(&heights, 6, rows, &keys);
            prop_assert!(frames.is_ok(), "{:?}", frames);
            if let Ok(frames) = frames {
                prop_assert!(frames.iter().all(|r| *r == rows));
            }
        }
    }
}
