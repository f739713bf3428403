use std::{cell::RefCell, rc::Rc};

use arbor::{
    Widget, WidgetRef,
    canvas::CanvasRef,
    error::Result,
    event::{
        key::{self, Key},
        mouse::MouseEvent,
    },
    geom::Point,
    id::WidgetId,
    sizing::{RenderSize, Sizing},
    widget::{Handle, boxed, cached, erase},
    widgets::{AttrMap, Edit, Frame, ListBox, ListWalker, SimpleFocusListWalker, Text},
};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Words used to generate item text.
const WORDS: &[&str] = &[
    "alder", "birch", "cedar", "elm", "fir", "hazel", "larch", "maple", "oak", "pine", "rowan", "spruce",
    "willow", "yew",
];

/// Build one random list item: mostly text of one to four lines, with the
/// occasional edit field.
fn item(rng: &mut StdRng, n: usize) -> WidgetRef {
    if rng.random_bool(0.25) {
        let edit = boxed(Edit::new(&format!("{n:>3} edit: "), ""));
        return boxed(AttrMap::fill(edit, "edit", Some("focus")));
    }
    let lines: Vec<String> = (0..rng.random_range(1..=4))
        .map(|_| {
            let words: Vec<&str> = (0..rng.random_range(2..10))
                .map(|_| WORDS[rng.random_range(0..WORDS.len())])
                .collect();
            words.join(" ")
        })
        .collect();
    boxed(Text::new(format!("{n:>3} {}", lines.join("\n    "))))
}

/// A frame holding a list box of generated items and a status line.
///
/// Ctrl-n adds an item after the focus, Ctrl-x deletes the focus item.
pub struct ListGym {
    /// Widget id.
    id: WidgetId,
    /// The frame we draw.
    frame: WidgetRef,
    /// Shared list content.
    walker: Rc<RefCell<SimpleFocusListWalker>>,
    /// Status line text.
    status: Handle<Text>,
    /// Item generator.
    rng: StdRng,
    /// Items created so far, used to number new items.
    created: usize,
}

impl ListGym {
    /// A gym with `items` generated items.
    pub fn new(items: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let walker = Rc::new(RefCell::new(SimpleFocusListWalker::new(
            (0..items).map(|n| item(&mut rng, n)).collect(),
        )));
        let listbox = boxed(ListBox::with_body(walker.clone()));
        let status = cached(Text::new(""));
        let header = boxed(AttrMap::fill(boxed(Text::new(" arbor list gym")), "header", None));
        let footer = boxed(AttrMap::fill(erase(&status), "footer", None));
        let frame = boxed(Frame::new(listbox).with_header(header).with_footer(footer));
        tracing::info!("list gym with {items} items, seed {seed}");
        Self {
            id: WidgetId::new(),
            frame,
            walker,
            status,
            rng,
            created: items,
        }
    }

    /// The current status line.
    fn status_text(&self) -> String {
        let w = self.walker.borrow();
        match w.focus_index() {
            Some(i) => format!(" item {}/{}   ^n add  ^x delete  q or esc quit", i + 1, w.len()),
            None => " empty   ^n add  q or esc quit".into(),
        }
    }

    /// Refresh the status line if it changed.
    fn update_status(&mut self) {
        let text = self.status_text();
        if self.status.borrow().text() != text {
            self.status.borrow_mut().set_text(text);
        }
    }

    /// Insert a fresh item after the focus and focus it.
    fn add(&mut self) -> Result<()> {
        let at = self.walker.borrow().focus_index().map_or(0, |i| i + 1);
        let w = item(&mut self.rng, self.created);
        self.created += 1;
        let mut walker = self.walker.borrow_mut();
        walker.insert(at, w)?;
        walker.set_focus(at)?;
        tracing::debug!("added item at {at}");
        Ok(())
    }

    /// Remove the focus item.
    fn delete(&mut self) -> Result<()> {
        let focus = self.walker.borrow().focus_index();
        if let Some(i) = focus {
            self.walker.borrow_mut().remove(i)?;
            tracing::debug!("removed item {i}");
        }
        Ok(())
    }
}

impl Widget for ListGym {
    fn id(&self) -> WidgetId {
        self.id
    }

    fn name(&self) -> &'static str {
        "list gym"
    }

    fn sizing(&self) -> Sizing {
        Sizing::BOX
    }

    fn selectable(&self) -> bool {
        true
    }

    fn cacheable(&self) -> bool {
        false
    }

    fn render(&mut self, size: RenderSize, focus: bool) -> Result<CanvasRef> {
        self.update_status();
        self.frame.borrow_mut().render(size, focus)
    }

    fn keypress(&mut self, size: RenderSize, key: Key) -> Result<Option<Key>> {
        let Some(k) = self.frame.borrow_mut().keypress(size, key)? else {
            return Ok(None);
        };
        if k == key::Ctrl + 'n' {
            self.add()?;
        } else if k == key::Ctrl + 'x' {
            self.delete()?;
        } else {
            return Ok(Some(k));
        }
        Ok(None)
    }

    fn mouse_event(&mut self, size: RenderSize, event: MouseEvent, focus: bool) -> Result<bool> {
        self.frame.borrow_mut().mouse_event(size, event, focus)
    }

    fn cursor_coords(&mut self, size: RenderSize) -> Result<Option<Point>> {
        self.frame.borrow_mut().cursor_coords(size)
    }
}

#[cfg(test)]
mod tests {
    use arbor::{
        event::key::KeyCode,
        testing::{CanvasTest, render},
        widget::uncached,
    };

    use super::*;

    #[test]
    fn add_and_delete() -> Result<()> {
        let gym = uncached(ListGym::new(3, 7));
        let root = erase(&gym);
        let size = RenderSize::boxed(40, 8);
        let c = render(&root, size, true)?;
        assert!(CanvasTest::new(&c).contains_text("arbor list gym"));
        assert!(CanvasTest::new(&c).contains_text("/3"));

        assert_eq!(gym.borrow_mut().keypress(size, key::Ctrl + 'n')?, None);
        let c = render(&root, size, true)?;
        assert!(CanvasTest::new(&c).contains_text("/4"));

        assert_eq!(gym.borrow_mut().keypress(size, key::Ctrl + 'x')?, None);
        let c = render(&root, size, true)?;
        assert!(CanvasTest::new(&c).contains_text("/3"));

        let unhandled = gym.borrow_mut().keypress(size, KeyCode::Esc.into())?;
        assert!(unhandled.is_some());
        Ok(())
    }
}
