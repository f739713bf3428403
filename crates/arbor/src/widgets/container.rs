//! The shared container contract and the child list that ordered containers
//! keep.
use std::fmt;

use crate::{
    cache,
    error::{Error, Result},
    id::WidgetId,
    widget::{Widget, WidgetRef},
};

/// A widget with children, one of which has focus.
pub trait Container {
    /// Identifies a child: an index for ordered containers, a part name
    /// for frames.
    type Position: Clone + PartialEq + fmt::Debug;

    /// The focused child, if there is one.
    fn focus(&self) -> Option<WidgetRef>;

    /// The focus position. Empty containers have none.
    fn focus_position(&self) -> Result<Self::Position>;

    /// Move focus. Positions that don't exist are an error.
    fn set_focus_position(&mut self, position: Self::Position) -> Result<()>;
}

/// Focus index after inserting at `index`.
pub(crate) fn focus_after_insert(focus: usize, index: usize, was_empty: bool) -> usize {
    if was_empty {
        0
    } else if index <= focus {
        focus + 1
    } else {
        focus
    }
}

/// Focus index after removing `index`, leaving `len` items.
pub(crate) fn focus_after_remove(focus: usize, index: usize, len: usize) -> usize {
    if index < focus {
        focus - 1
    } else {
        focus.min(len.saturating_sub(1))
    }
}

/// An ordered list of `(child, options)` pairs with a focus index.
///
/// Mutators are the only way to change the list, and each one invalidates
/// the owning container's canvases. The focus index follows insertions and
/// removals before it.
pub struct Contents<O> {
    /// The container these children belong to.
    owner: WidgetId,
    /// Children and their options.
    items: Vec<(WidgetRef, O)>,
    /// Focus index; meaningless while empty.
    focus: usize,
}

impl<O: Clone> Contents<O> {
    /// Contents for `owner`, focused on the first item.
    pub fn new(owner: WidgetId, items: Vec<(WidgetRef, O)>) -> Self {
        Self {
            owner,
            items,
            focus: 0,
        }
    }

    /// Contents for `owner`, focused on the first selectable item, or the
    /// first item when none is selectable.
    pub fn first_selectable(owner: WidgetId, items: Vec<(WidgetRef, O)>) -> Self {
        let focus = items.iter().position(|(w, _)| w.borrow().selectable()).unwrap_or(0);
        Self { owner, items, focus }
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Is the list empty?
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// A child and its options.
    pub fn get(&self, index: usize) -> Option<&(WidgetRef, O)> {
        self.items.get(index)
    }

    /// The child at `index`.
    pub fn widget(&self, index: usize) -> Option<WidgetRef> {
        self.items.get(index).map(|(w, _)| w.clone())
    }

    /// The options at `index`.
    pub fn options(&self, index: usize) -> Option<O> {
        self.items.get(index).map(|(_, o)| o.clone())
    }

    /// Iterate over children and options.
    pub fn iter(&self) -> impl Iterator<Item = &(WidgetRef, O)> {
        self.items.iter()
    }

    /// The focus index, or `None` while empty.
    pub fn focus(&self) -> Option<usize> {
        (!self.items.is_empty()).then_some(self.focus)
    }

    /// Move focus to `index`.
    pub fn set_focus(&mut self, index: usize) -> Result<()> {
        if index >= self.items.len() {
            return Err(Error::OutOfRange(format!(
                "focus index {index} out of range for {} items",
                self.items.len()
            )));
        }
        if index != self.focus {
            self.focus = index;
            cache::invalidate(self.owner);
        }
        Ok(())
    }

    /// Append a child.
    pub fn push(&mut self, widget: WidgetRef, options: O) {
        let at = self.items.len();
        self.focus = focus_after_insert(self.focus, at, self.items.is_empty());
        self.items.push((widget, options));
        cache::invalidate(self.owner);
    }

    /// Insert a child at `index`.
    pub fn insert(&mut self, index: usize, widget: WidgetRef, options: O) -> Result<()> {
        if index > self.items.len() {
            return Err(Error::OutOfRange(format!("cannot insert at {index}")));
        }
        self.focus = focus_after_insert(self.focus, index, self.items.is_empty());
        self.items.insert(index, (widget, options));
        cache::invalidate(self.owner);
        Ok(())
    }

    /// Remove the child at `index`.
    pub fn remove(&mut self, index: usize) -> Result<(WidgetRef, O)> {
        if index >= self.items.len() {
            return Err(Error::OutOfRange(format!("cannot remove {index}")));
        }
        let item = self.items.remove(index);
        self.focus = focus_after_remove(self.focus, index, self.items.len());
        cache::invalidate(self.owner);
        Ok(item)
    }

    /// Replace the child and options at `index`.
    pub fn set(&mut self, index: usize, widget: WidgetRef, options: O) -> Result<()> {
        let Some(slot) = self.items.get_mut(index) else {
            return Err(Error::OutOfRange(format!("no item at {index}")));
        };
        *slot = (widget, options);
        cache::invalidate(self.owner);
        Ok(())
    }

    /// Replace the options at `index`.
    pub fn set_options(&mut self, index: usize, options: O) -> Result<()> {
        let Some(slot) = self.items.get_mut(index) else {
            return Err(Error::OutOfRange(format!("no item at {index}")));
        };
        slot.1 = options;
        cache::invalidate(self.owner);
        Ok(())
    }

    /// Remove every child.
    pub fn clear(&mut self) {
        self.items.clear();
        self.focus = 0;
        cache::invalidate(self.owner);
    }
}

impl<O> fmt::Debug for Contents<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contents")
            .field("owner", &self.owner)
            .field("len", &self.items.len())
            .field("focus", &self.focus)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sizing::RenderSize,
        testing::render,
        widget::{boxed, cached, erase},
        widgets::{edit::Edit, text::Text},
    };

    fn item(s: &str) -> WidgetRef {
        boxed(Text::new(s))
    }

    #[test]
    fn focus_follows_edits() -> Result<()> {
        let owner = WidgetId::new();
        let mut c = Contents::new(owner, (0..5).map(|i| (item(&i.to_string()), ())).collect());
        c.set_focus(3)?;
        c.remove(1)?;
        assert_eq!(c.focus(), Some(2));
        c.insert(0, item("x"), ())?;
        assert_eq!(c.focus(), Some(3));
        c.insert(4, item("y"), ())?;
        assert_eq!(c.focus(), Some(3));
        c.remove(3)?;
        assert_eq!(c.focus(), Some(3));
        assert!(c.set_focus(9).is_err());
        c.clear();
        assert_eq!(c.focus(), None);
        c.push(item("z"), ());
        assert_eq!(c.focus(), Some(0));
        Ok(())
    }

    #[test]
    fn starts_on_first_selectable() {
        let owner = WidgetId::new();
        let c = Contents::first_selectable(
            owner,
            vec![(item("a"), ()), (boxed(Edit::new("", "")), ()), (boxed(Edit::new("", "")), ())],
        );
        assert_eq!(c.focus(), Some(1));
        let c = Contents::first_selectable(owner, vec![(item("a"), ()), (item("b"), ())]);
        assert_eq!(c.focus(), Some(0));
        let c: Contents<()> = Contents::first_selectable(owner, vec![]);
        assert_eq!(c.focus(), None);
    }

    #[test]
    fn mutation_invalidates_owner() -> Result<()> {
        let w = cached(Text::new("owner"));
        let owner = w.borrow().id();
        let _held = render(&erase(&w), RenderSize::Flow(5), false)?;
        assert!(cache::is_cached(owner));
        let mut c: Contents<u32> = Contents::new(owner, vec![]);
        c.push(item("a"), 1);
        assert!(!cache::is_cached(owner));
        assert!(c.set_options(3, 1).is_err());
        Ok(())
    }
}
