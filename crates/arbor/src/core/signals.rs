//! Signals connect widgets to application callbacks.
//!
//! Each widget that emits signals owns a [`Signals`] registry keyed by its
//! own signal kind enum. Listeners are plain closures, or closures bound to
//! a weakly held target that disconnect themselves once the target is gone.
use std::{cell::RefCell, fmt, rc::Rc};

use slotmap::SlotMap;

use crate::id::ListenerKey;

/// Handle returned by `connect`, used to disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(ListenerKey);

/// A connected listener.
struct Listener<K, A> {
    /// Signal kind the listener is attached to.
    kind: K,
    /// Callback; returns false once it should be removed.
    call: Box<dyn FnMut(&A) -> bool>,
}

/// A registry of listeners for signals of kind `K` carrying argument `A`.
pub struct Signals<K, A> {
    /// Connected listeners.
    listeners: SlotMap<ListenerKey, Listener<K, A>>,
}

impl<K, A> Default for Signals<K, A> {
    fn default() -> Self {
        Self {
            listeners: SlotMap::with_key(),
        }
    }
}

impl<K: fmt::Debug, A> fmt::Debug for Signals<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.listeners.values().map(|l| &l.kind))
            .finish()
    }
}

impl<K: Copy + Eq, A> Signals<K, A> {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a callback.
    pub fn connect(&mut self, kind: K, mut f: impl FnMut(&A) + 'static) -> Subscription {
        Subscription(self.listeners.insert(Listener {
            kind,
            call: Box::new(move |a| {
                f(a);
                true
            }),
        }))
    }

    /// Connect a callback bound to a weakly held target. The listener
    /// disconnects itself the first time it fires after the target has been
    /// dropped. If the target is already borrowed when the signal fires,
    /// this delivery is skipped.
    pub fn connect_weak<T: 'static>(
        &mut self,
        kind: K,
        target: &Rc<RefCell<T>>,
        mut f: impl FnMut(&mut T, &A) + 'static,
    ) -> Subscription {
        let weak = Rc::downgrade(target);
        Subscription(self.listeners.insert(Listener {
            kind,
            call: Box::new(move |a| {
                let Some(target) = weak.upgrade() else {
                    return false;
                };
                match target.try_borrow_mut() {
                    Ok(mut t) => f(&mut t, a),
                    Err(_) => tracing::warn!("signal target busy, delivery skipped"),
                }
                true
            }),
        }))
    }

    /// Disconnect a listener. Returns false if it was already gone.
    pub fn disconnect(&mut self, sub: Subscription) -> bool {
        self.listeners.remove(sub.0).is_some()
    }

    /// Call every listener connected to `kind`, in connection order.
    /// Returns the number of listeners called.
    pub fn emit(&mut self, kind: K, arg: &A) -> usize {
        let mut called = 0;
        let mut dead = vec![];
        for (key, l) in self.listeners.iter_mut() {
            if l.kind != kind {
                continue;
            }
            if (l.call)(arg) {
                called += 1;
            } else {
                dead.push(key);
            }
        }
        for key in dead {
            self.listeners.remove(key);
        }
        called
    }

    /// Number of connected listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Are there no listeners?
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        Change,
        Activate,
    }

    #[test]
    fn connect_emit_disconnect() {
        let mut s: Signals<Kind, String> = Signals::new();
        let seen = Rc::new(RefCell::new(vec![]));
        let log = seen.clone();
        let sub = s.connect(Kind::Change, move |a| log.borrow_mut().push(a.clone()));
        assert_eq!(s.emit(Kind::Change, &"x".to_string()), 1);
        assert_eq!(s.emit(Kind::Activate, &"y".to_string()), 0);
        assert!(s.disconnect(sub));
        assert!(!s.disconnect(sub));
        assert_eq!(s.emit(Kind::Change, &"z".to_string()), 0);
        assert_eq!(*seen.borrow(), vec!["x".to_string()]);
    }

    #[test]
    fn weak_listener_expires() {
        let mut s: Signals<Kind, u32> = Signals::new();
        let target = Rc::new(RefCell::new(0));
        s.connect_weak(Kind::Change, &target, |t, a| *t += *a);
        assert_eq!(s.emit(Kind::Change, &3), 1);
        assert_eq!(*target.borrow(), 3);
        drop(target);
        assert_eq!(s.emit(Kind::Change, &3), 0);
        assert!(s.is_empty());
    }
}
