use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use slotmap::new_key_type;

/// Source of widget identities.
static NEXT_WIDGET: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a widget, used to key the canvas cache. Every widget
/// allocates one at construction and keeps it for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(u64);

impl WidgetId {
    /// Allocate a fresh identity.
    pub fn new() -> Self {
        Self(NEXT_WIDGET.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for WidgetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

new_key_type! {
    /// Generational slot of a cache entry. A stale key held by a dropped
    /// canvas never matches a newer entry in the same slot.
    pub struct EntryKey;
}

new_key_type! {
    /// Identifies a connected signal listener.
    pub struct ListenerKey;
}

new_key_type! {
    /// Identifies a scheduled alarm.
    pub struct AlarmKey;
}

new_key_type! {
    /// Identifies a watched input channel.
    pub struct WatchKey;
}

new_key_type! {
    /// Identifies an idle callback.
    pub struct IdleKey;
}
