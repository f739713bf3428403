//! List walkers feed a [`ListBox`](super::listbox::ListBox) one item at a
//! time.
//!
//! A walker owns the list content and the focus position. The list box
//! only asks for the focus item and its neighbours, so a walker can be
//! backed by a vector, a tree, or something generated on demand.
use std::{fmt, marker::PhantomData, mem};

use crate::{
    error::{Error, Result},
    signals::Signals,
    widget::WidgetRef,
    widgets::container::{focus_after_insert, focus_after_remove},
};

/// Signals emitted by list walkers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkerSignal {
    /// The content or the focus changed.
    Modified,
}

/// The source of a list box's items.
pub trait ListWalker {
    /// Identifies an item. The list box compares positions but never
    /// looks inside them.
    type Position: Clone + PartialEq + fmt::Debug;

    /// The focus item and its position, or `None` when empty.
    fn focus(&self) -> Option<(WidgetRef, Self::Position)>;

    /// The item strictly after `position`.
    fn next(&self, position: &Self::Position) -> Option<(WidgetRef, Self::Position)>;

    /// The item strictly before `position`.
    fn prev(&self, position: &Self::Position) -> Option<(WidgetRef, Self::Position)>;

    /// Move focus. Positions that don't exist are an error.
    fn set_focus(&mut self, position: Self::Position) -> Result<()>;

    /// Every position in order, or reversed. Walkers that can't list their
    /// positions cheaply return `None`.
    fn positions(&self, _reverse: bool) -> Option<Vec<Self::Position>> {
        None
    }

    /// Modification signals. A walker without them returns `None`, and list
    /// boxes showing it are not cached.
    fn signals(&mut self) -> Option<&mut Signals<WalkerSignal, ()>> {
        None
    }
}

/// How a [`VecWalker`] moves its focus when the list changes.
pub trait FocusPolicy {
    /// Focus after inserting at `index`.
    fn after_insert(focus: usize, index: usize, was_empty: bool) -> usize;

    /// Focus after removing `index`, leaving `len` items.
    fn after_remove(focus: usize, index: usize, len: usize) -> usize;
}

/// Focus keeps its index, clamped to the list.
#[derive(Debug)]
pub struct Clamp;

impl FocusPolicy for Clamp {
    fn after_insert(focus: usize, _index: usize, _was_empty: bool) -> usize {
        focus
    }

    fn after_remove(focus: usize, _index: usize, len: usize) -> usize {
        focus.min(len.saturating_sub(1))
    }
}

/// Focus stays on the same item when items before it come and go.
#[derive(Debug)]
pub struct Follow;

impl FocusPolicy for Follow {
    fn after_insert(focus: usize, index: usize, was_empty: bool) -> usize {
        focus_after_insert(focus, index, was_empty)
    }

    fn after_remove(focus: usize, index: usize, len: usize) -> usize {
        focus_after_remove(focus, index, len)
    }
}

/// A walker over a vector of widgets. Positions are indices.
///
/// Every mutation emits [`WalkerSignal::Modified`].
pub struct VecWalker<F> {
    /// The items.
    items: Vec<WidgetRef>,
    /// Focus index; meaningless while empty.
    focus: usize,
    /// Modification signals.
    signals: Signals<WalkerSignal, ()>,
    /// Focus policy marker.
    _policy: PhantomData<F>,
}

/// A vector walker whose focus index stays put, clamped to the list.
pub type SimpleListWalker = VecWalker<Clamp>;

/// A vector walker whose focus follows its item through insertions and
/// removals before it.
pub type SimpleFocusListWalker = VecWalker<Follow>;

impl<F: FocusPolicy> VecWalker<F> {
    /// A walker over `items`, focused on the first.
    pub fn new(items: Vec<WidgetRef>) -> Self {
        Self {
            items,
            focus: 0,
            signals: Signals::new(),
            _policy: PhantomData,
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Is the walker empty?
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item at `index`.
    pub fn get(&self, index: usize) -> Option<WidgetRef> {
        self.items.get(index).cloned()
    }

    /// Iterate over the items.
    pub fn iter(&self) -> impl Iterator<Item = &WidgetRef> {
        self.items.iter()
    }

    /// The focus index, or `None` while empty.
    pub fn focus_index(&self) -> Option<usize> {
        (!self.items.is_empty()).then_some(self.focus)
    }

    /// Append an item.
    pub fn push(&mut self, widget: WidgetRef) {
        let at = self.items.len();
        self.focus = F::after_insert(self.focus, at, self.items.is_empty());
        self.items.push(widget);
        self.modified();
    }

    /// Insert an item at `index`.
    pub fn insert(&mut self, index: usize, widget: WidgetRef) -> Result<()> {
        if index > self.items.len() {
            return Err(Error::OutOfRange(format!("cannot insert at {index}")));
        }
        self.focus = F::after_insert(self.focus, index, self.items.is_empty());
        self.items.insert(index, widget);
        self.modified();
        Ok(())
    }

    /// Remove the item at `index`.
    pub fn remove(&mut self, index: usize) -> Result<WidgetRef> {
        if index >= self.items.len() {
            return Err(Error::OutOfRange(format!("cannot remove {index}")));
        }
        let w = self.items.remove(index);
        self.focus = F::after_remove(self.focus, index, self.items.len());
        self.modified();
        Ok(w)
    }

    /// Replace the item at `index`.
    pub fn set(&mut self, index: usize, widget: WidgetRef) -> Result<WidgetRef> {
        let Some(slot) = self.items.get_mut(index) else {
            return Err(Error::OutOfRange(format!("no item at {index}")));
        };
        let old = mem::replace(slot, widget);
        self.modified();
        Ok(old)
    }

    /// Remove every item.
    pub fn clear(&mut self) {
        self.items.clear();
        self.focus = 0;
        self.modified();
    }

    /// Keep focus in range and tell listeners.
    fn modified(&mut self) {
        self.focus = self.focus.min(self.items.len().saturating_sub(1));
        self.signals.emit(WalkerSignal::Modified, &());
    }
}

impl<F: FocusPolicy> ListWalker for VecWalker<F> {
    type Position = usize;

    fn focus(&self) -> Option<(WidgetRef, usize)> {
        self.items.get(self.focus).map(|w| (w.clone(), self.focus))
    }

    fn next(&self, position: &usize) -> Option<(WidgetRef, usize)> {
        let p = position.checked_add(1)?;
        self.items.get(p).map(|w| (w.clone(), p))
    }

    fn prev(&self, position: &usize) -> Option<(WidgetRef, usize)> {
        let p = position.checked_sub(1)?;
        self.items.get(p).map(|w| (w.clone(), p))
    }

    fn set_focus(&mut self, position: usize) -> Result<()> {
        if position >= self.items.len() {
            return Err(Error::OutOfRange(format!("no widget at position {position}")));
        }
        self.focus = position;
        self.modified();
        Ok(())
    }

    fn positions(&self, reverse: bool) -> Option<Vec<usize>> {
        let mut v: Vec<usize> = (0..self.items.len()).collect();
        if reverse {
            v.reverse();
        }
        Some(v)
    }

    fn signals(&mut self) -> Option<&mut Signals<WalkerSignal, ()>> {
        Some(&mut self.signals)
    }
}

impl<F> fmt::Debug for VecWalker<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VecWalker")
            .field("len", &self.items.len())
            .field("focus", &self.focus)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;
    use crate::{widget::boxed, widgets::text::Text};

    fn items(n: usize) -> Vec<WidgetRef> {
        (0..n).map(|i| boxed(Text::new(i.to_string()))).collect()
    }

    #[test]
    fn neighbours() {
        let w = SimpleListWalker::new(items(3));
        assert_eq!(w.focus().map(|(_, p)| p), Some(0));
        assert_eq!(w.next(&0).map(|(_, p)| p), Some(1));
        assert!(w.next(&2).is_none());
        assert!(w.prev(&0).is_none());
        assert_eq!(w.prev(&2).map(|(_, p)| p), Some(1));
        assert_eq!(w.positions(true), Some(vec![2, 1, 0]));
        assert!(SimpleListWalker::new(vec![]).focus().is_none());
    }

    #[test]
    fn clamping_focus() -> Result<()> {
        let mut w = SimpleListWalker::new(items(5));
        w.set_focus(4)?;
        w.insert(0, boxed(Text::new("x")))?;
        assert_eq!(w.focus_index(), Some(4));
        w.remove(5)?;
        w.remove(4)?;
        assert_eq!(w.focus_index(), Some(3));
        assert!(matches!(w.set_focus(7), Err(Error::OutOfRange(_))));
        w.clear();
        assert_eq!(w.focus_index(), None);
        assert!(w.set_focus(0).is_err());
        Ok(())
    }

    #[test]
    fn following_focus() -> Result<()> {
        let mut w = SimpleFocusListWalker::new(items(5));
        w.set_focus(2)?;
        w.insert(0, boxed(Text::new("x")))?;
        assert_eq!(w.focus_index(), Some(3));
        w.remove(1)?;
        assert_eq!(w.focus_index(), Some(2));
        w.push(boxed(Text::new("y")));
        assert_eq!(w.focus_index(), Some(2));
        Ok(())
    }

    #[test]
    fn emits_modified() -> Result<()> {
        let mut w = SimpleFocusListWalker::new(items(2));
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        if let Some(s) = w.signals() {
            s.connect(WalkerSignal::Modified, move |_| c.set(c.get() + 1));
        }
        w.push(boxed(Text::new("z")));
        w.set_focus(1)?;
        w.set(0, boxed(Text::new("q")))?;
        assert!(w.set(9, boxed(Text::new("q"))).is_err());
        assert_eq!(count.get(), 3);
        Ok(())
    }
}
