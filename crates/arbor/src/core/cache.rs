//! The canvas cache.
//!
//! Canvases are cached by the render call that produced them: widget,
//! size and focus. The cache only holds weak references, so an entry lives
//! exactly as long as something else (usually the display's last frame, or
//! a parent canvas) keeps the canvas alive. When a canvas is dropped it
//! removes its own entry.
//!
//! Every stored canvas records the widgets it was composed from. Invalidating
//! a widget discards its entries and cascades to every widget whose cached
//! canvases depend on it, transitively.
//!
//! The cache is per thread, matching the single-threaded widget tree.
use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    rc::{Rc, Weak},
};

use slotmap::SlotMap;

use crate::{
    canvas::{Canvas, CanvasRef},
    error::{Error, Result},
    id::{EntryKey, WidgetId},
    sizing::RenderSize,
};

/// Cache key within one widget's entries.
type RenderKey = (RenderSize, bool);

/// Counters describing cache behaviour since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups.
    pub fetches: u64,
    /// Lookups that found a live canvas.
    pub hits: u64,
    /// Canvases stored.
    pub stores: u64,
    /// Stores skipped because a dependency was not cached.
    pub skipped: u64,
    /// Entries removed because their canvas was dropped.
    pub cleanups: u64,
    /// Widgets invalidated through a dependency rather than directly.
    pub cascades: u64,
}

/// A cached canvas.
struct Entry {
    /// The canvas.
    canvas: Weak<Canvas>,
    /// Rendering widget.
    widget: WidgetId,
    /// Size and focus of the render call.
    key: RenderKey,
}

/// Cache state.
#[derive(Default)]
struct CanvasCache {
    /// All live entries.
    entries: SlotMap<EntryKey, Entry>,
    /// Entries by widget, then by render key.
    by_widget: HashMap<WidgetId, HashMap<RenderKey, EntryKey>>,
    /// For each widget, the widgets whose cached canvases contain it.
    deps: HashMap<WidgetId, HashSet<WidgetId>>,
    /// Counters.
    stats: CacheStats,
}

impl CanvasCache {
    /// Remove one entry, pruning the widget's maps when it has no entries left.
    fn remove_entry(&mut self, slot: EntryKey) -> bool {
        let Some(entry) = self.entries.remove(slot) else {
            return false;
        };
        if let Some(sizes) = self.by_widget.get_mut(&entry.widget) {
            if sizes.get(&entry.key) == Some(&slot) {
                sizes.remove(&entry.key);
            }
            if sizes.is_empty() {
                self.by_widget.remove(&entry.widget);
                self.deps.remove(&entry.widget);
            }
        }
        true
    }
}

thread_local! {
    /// The thread's cache.
    static CACHE: RefCell<CanvasCache> = RefCell::new(CanvasCache::default());
    /// Set to false to bypass the cache entirely.
    static ENABLED: Cell<bool> = const { Cell::new(true) };
}

/// Enable or disable caching on this thread. Disabling does not clear
/// entries.
pub fn set_enabled(enabled: bool) {
    ENABLED.with(|e| e.set(enabled));
}

/// Is caching enabled on this thread?
pub fn enabled() -> bool {
    ENABLED.with(Cell::get)
}

/// Look up the canvas produced by a previous identical render call.
pub fn fetch(widget: WidgetId, size: RenderSize, focus: bool) -> Option<CanvasRef> {
    if !enabled() {
        return None;
    }
    CACHE.with(|c| {
        let mut c = c.borrow_mut();
        c.stats.fetches += 1;
        let slot = *c.by_widget.get(&widget)?.get(&(size, focus))?;
        let canvas = c.entries.get(slot).and_then(|e| e.canvas.upgrade());
        match canvas {
            Some(canvas) => {
                tracing::trace!("cache hit for {widget} at {size}");
                c.stats.hits += 1;
                Some(canvas)
            }
            None => {
                c.remove_entry(slot);
                None
            }
        }
    })
}

/// Store a finalized canvas. The store is skipped when any widget the
/// canvas depends on has no cached canvases, since invalidating that
/// widget could then never reach this entry.
pub fn store(canvas: &CanvasRef) -> Result<()> {
    if !enabled() {
        return Ok(());
    }
    let Some(owner) = canvas.owner().copied() else {
        return Err(Error::Canvas("cannot cache a canvas with no owner".into()));
    };
    let depends = canvas.depends();
    CACHE.with(|c| {
        let mut c = c.borrow_mut();
        if let Some(missing) = depends.iter().find(|d| !c.by_widget.contains_key(d)) {
            tracing::debug!("cache store for {} skipped: {} not cached", owner.widget, missing);
            c.stats.skipped += 1;
            return;
        }
        let key = (owner.size, owner.focus);
        if let Some(old) = c.by_widget.get(&owner.widget).and_then(|s| s.get(&key)).copied() {
            c.entries.remove(old);
        }
        let slot = c.entries.insert(Entry {
            canvas: Rc::downgrade(canvas),
            widget: owner.widget,
            key,
        });
        canvas.set_slot(Some(slot));
        c.by_widget.entry(owner.widget).or_default().insert(key, slot);
        for d in depends {
            c.deps.entry(d).or_default().insert(owner.widget);
        }
        c.stats.stores += 1;
        tracing::trace!("cache store for {} at {}", owner.widget, owner.size);
    });
    Ok(())
}

/// Discard every cached canvas of `widget`, and of every widget whose
/// cached canvases were built from it, transitively. Each widget is
/// invalidated at most once per call.
pub fn invalidate(widget: WidgetId) {
    invalidate_all([widget]);
}

/// Invalidate several widgets as one batch. A composite shared by more
/// than one of them is discarded once.
pub fn invalidate_all(widgets: impl IntoIterator<Item = WidgetId>) {
    CACHE.with(|c| {
        let mut c = c.borrow_mut();
        let roots: HashSet<WidgetId> = widgets.into_iter().collect();
        let mut seen = HashSet::new();
        let mut work: Vec<WidgetId> = roots.iter().copied().collect();
        while let Some(w) = work.pop() {
            if !seen.insert(w) {
                continue;
            }
            if let Some(sizes) = c.by_widget.remove(&w) {
                for slot in sizes.into_values() {
                    c.entries.remove(slot);
                }
                if !roots.contains(&w) {
                    tracing::trace!("cache invalidation cascaded to {w}");
                    c.stats.cascades += 1;
                }
            }
            if let Some(parents) = c.deps.remove(&w) {
                work.extend(parents);
            }
        }
    });
}

/// Called when a cached canvas is dropped.
pub(crate) fn release(slot: EntryKey) {
    // The thread-local may already be gone at thread exit, and a canvas
    // can in principle be dropped while the cache is borrowed. Either way
    // the entry is left for `fetch` to prune.
    let _ = CACHE.try_with(|c| {
        if let Ok(mut c) = c.try_borrow_mut()
            && c.remove_entry(slot)
        {
            c.stats.cleanups += 1;
        }
    });
}

/// Does `widget` have any cached canvas?
pub fn is_cached(widget: WidgetId) -> bool {
    CACHE.with(|c| c.borrow().by_widget.contains_key(&widget))
}

/// Number of live entries.
pub fn len() -> usize {
    CACHE.with(|c| c.borrow().entries.len())
}

/// Drop every entry.
pub fn clear() {
    CACHE.with(|c| {
        let mut c = c.borrow_mut();
        c.entries.clear();
        c.by_widget.clear();
        c.deps.clear();
    });
}

/// Current counters.
pub fn stats() -> CacheStats {
    CACHE.with(|c| c.borrow().stats)
}

/// Zero the counters.
pub fn reset_stats() {
    CACHE.with(|c| c.borrow_mut().stats = CacheStats::default());
}
