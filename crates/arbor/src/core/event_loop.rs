//! A single-threaded event loop with alarms, idle callbacks and watched
//! channels.
//!
//! The loop is generic over a context type `C`: every callback receives
//! `&mut C`, which is how the main loop hands its state to timers and input
//! handlers. Callbacks that need to schedule more work hold a
//! [`Scheduler`].
//!
//! Watched channels are serviced by a forwarding thread per channel that
//! wakes the loop; everything else runs on the loop's own thread.
use std::{
    any::Any,
    cell::RefCell,
    cmp::Ordering,
    collections::BinaryHeap,
    rc::{Rc, Weak},
    sync::mpsc::{self, RecvTimeoutError, TryRecvError},
    thread,
    time::{Duration, Instant},
};

use slotmap::SlotMap;

use crate::{
    error::{Error, Result},
    id::{AlarmKey, IdleKey, WatchKey},
};

/// A value forwarded from a watched channel.
type Payload = Box<dyn Any + Send>;

/// A one-shot alarm callback.
type AlarmFn<C> = Box<dyn FnOnce(&mut C) -> Result<()>>;

/// A repeating idle callback.
type IdleFn<C> = Rc<RefCell<dyn FnMut(&mut C) -> Result<()>>>;

/// A watched-channel callback.
type WatchFn<C> = Rc<RefCell<dyn FnMut(&mut C, Payload) -> Result<()>>>;

/// An alarm waiting in the heap.
#[derive(Debug)]
struct Pending {
    /// Due time.
    time: Instant,
    /// Insertion order, breaking ties between equal due times.
    seq: u64,
    /// The alarm's callback slot.
    key: AlarmKey,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for Pending {}

/// Reverse order so the earliest alarm is at the top.
impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reverse order so the earliest alarm is at the top.
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.time, other.seq).cmp(&(self.time, self.seq))
    }
}

/// Everything scheduled on a loop.
struct Queues<C> {
    /// Alarm heap. Entries whose callback slot is gone are skipped.
    heap: BinaryHeap<Pending>,
    /// Alarm callbacks.
    alarms: SlotMap<AlarmKey, AlarmFn<C>>,
    /// Idle callbacks.
    idle: SlotMap<IdleKey, IdleFn<C>>,
    /// Watched channel callbacks.
    watches: SlotMap<WatchKey, WatchFn<C>>,
    /// Next alarm sequence number.
    seq: u64,
}

impl<C> Default for Queues<C> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            alarms: SlotMap::with_key(),
            idle: SlotMap::with_key(),
            watches: SlotMap::with_key(),
            seq: 0,
        }
    }
}

impl<C> Queues<C> {
    /// Add an alarm with an explicit time base.
    fn _alarm(&mut self, now: Instant, delay: Duration, f: AlarmFn<C>) -> AlarmKey {
        let key = self.alarms.insert(f);
        self.seq += 1;
        self.heap.push(Pending {
            time: now + delay,
            seq: self.seq,
            key,
        });
        key
    }

    /// Drop cancelled alarms from the top of the heap.
    fn prune(&mut self) {
        while let Some(top) = self.heap.peek() {
            if self.alarms.contains_key(top.key) {
                break;
            }
            self.heap.pop();
        }
    }

    /// Time until the next alarm relative to `now`; zero if it is overdue.
    fn _current_wait(&mut self, now: Instant) -> Option<Duration> {
        self.prune();
        self.heap
            .peek()
            .map(|top| top.time.checked_duration_since(now).unwrap_or(Duration::ZERO))
    }

    /// Pop the earliest live alarm.
    fn pop_alarm(&mut self) -> Option<AlarmFn<C>> {
        self.prune();
        let top = self.heap.pop()?;
        self.alarms.remove(top.key)
    }
}

/// A cheap, cloneable handle for scheduling work on an [`EventLoop`] from
/// inside callbacks.
pub struct Scheduler<C> {
    /// The loop's queues.
    queues: Weak<RefCell<Queues<C>>>,
    /// Wakes the loop from forwarding threads.
    wake: mpsc::Sender<(WatchKey, Payload)>,
}

impl<C> Clone for Scheduler<C> {
    fn clone(&self) -> Self {
        Self {
            queues: self.queues.clone(),
            wake: self.wake.clone(),
        }
    }
}

impl<C: 'static> Scheduler<C> {
    /// The queues, if the loop still exists.
    fn queues(&self) -> Result<Rc<RefCell<Queues<C>>>> {
        self.queues
            .upgrade()
            .ok_or_else(|| Error::RunLoop("event loop has been dropped".into()))
    }

    /// Call `f` once, `delay` from now.
    pub fn alarm(&self, delay: Duration, f: impl FnOnce(&mut C) -> Result<()> + 'static) -> Result<AlarmKey> {
        Ok(self.queues()?.borrow_mut()._alarm(Instant::now(), delay, Box::new(f)))
    }

    /// Cancel an alarm. Returns false if it already fired or was removed.
    pub fn remove_alarm(&self, key: AlarmKey) -> bool {
        self.queues
            .upgrade()
            .is_some_and(|q| q.borrow_mut().alarms.remove(key).is_some())
    }

    /// Call `f` every time the loop becomes idle.
    pub fn enter_idle(&self, f: impl FnMut(&mut C) -> Result<()> + 'static) -> Result<IdleKey> {
        Ok(self.queues()?.borrow_mut().idle.insert(Rc::new(RefCell::new(f))))
    }

    /// Remove an idle callback.
    pub fn remove_enter_idle(&self, key: IdleKey) -> bool {
        self.queues
            .upgrade()
            .is_some_and(|q| q.borrow_mut().idle.remove(key).is_some())
    }

    /// Call `f` with every value received on `rx`. A forwarding thread
    /// waits on the channel and wakes the loop; it exits when `rx`
    /// disconnects or the loop is dropped.
    pub fn watch_channel<T: Send + 'static>(
        &self,
        rx: mpsc::Receiver<T>,
        mut f: impl FnMut(&mut C, T) -> Result<()> + 'static,
    ) -> Result<WatchKey> {
        let cb: WatchFn<C> = Rc::new(RefCell::new(move |ctx: &mut C, p: Payload| {
            match p.downcast::<T>() {
                Ok(v) => f(ctx, *v),
                Err(_) => Err(Error::RunLoop("watched channel payload type mismatch".into())),
            }
        }));
        let key = self.queues()?.borrow_mut().watches.insert(cb);
        let wake = self.wake.clone();
        thread::spawn(move || {
            for v in rx {
                if wake.send((key, Box::new(v))).is_err() {
                    return;
                }
            }
        });
        Ok(key)
    }

    /// Stop delivering values from a watched channel.
    pub fn remove_watch(&self, key: WatchKey) -> bool {
        self.queues
            .upgrade()
            .is_some_and(|q| q.borrow_mut().watches.remove(key).is_some())
    }
}

/// What the loop is waiting for when its wait times out.
enum Timeout {
    /// Run idle callbacks.
    Idle,
    /// Fire the earliest alarm.
    Alarm,
}

/// The event loop.
pub struct EventLoop<C> {
    /// Scheduled work.
    queues: Rc<RefCell<Queues<C>>>,
    /// Sender side of the wake channel, cloned into schedulers.
    wake_tx: mpsc::Sender<(WatchKey, Payload)>,
    /// Values forwarded from watched channels.
    wake_rx: mpsc::Receiver<(WatchKey, Payload)>,
    /// Work happened since the last idle.
    did_something: bool,
}

impl<C: 'static> Default for EventLoop<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> EventLoop<C> {
    /// A loop with nothing scheduled.
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = mpsc::channel();
        Self {
            queues: Rc::new(RefCell::new(Queues::default())),
            wake_tx,
            wake_rx,
            did_something: false,
        }
    }

    /// A handle for scheduling work from callbacks.
    pub fn scheduler(&self) -> Scheduler<C> {
        Scheduler {
            queues: Rc::downgrade(&self.queues),
            wake: self.wake_tx.clone(),
        }
    }

    /// See [`Scheduler::alarm`].
    pub fn alarm(&self, delay: Duration, f: impl FnOnce(&mut C) -> Result<()> + 'static) -> Result<AlarmKey> {
        self.scheduler().alarm(delay, f)
    }

    /// See [`Scheduler::remove_alarm`].
    pub fn remove_alarm(&self, key: AlarmKey) -> bool {
        self.scheduler().remove_alarm(key)
    }

    /// See [`Scheduler::enter_idle`].
    pub fn enter_idle(&self, f: impl FnMut(&mut C) -> Result<()> + 'static) -> Result<IdleKey> {
        self.scheduler().enter_idle(f)
    }

    /// See [`Scheduler::remove_enter_idle`].
    pub fn remove_enter_idle(&self, key: IdleKey) -> bool {
        self.scheduler().remove_enter_idle(key)
    }

    /// See [`Scheduler::watch_channel`].
    pub fn watch_channel<T: Send + 'static>(
        &self,
        rx: mpsc::Receiver<T>,
        f: impl FnMut(&mut C, T) -> Result<()> + 'static,
    ) -> Result<WatchKey> {
        self.scheduler().watch_channel(rx, f)
    }

    /// See [`Scheduler::remove_watch`].
    pub fn remove_watch(&self, key: WatchKey) -> bool {
        self.scheduler().remove_watch(key)
    }

    /// Run until a callback returns [`Error::Exit`], which ends the loop
    /// cleanly, or any other error, which is returned. Idle callbacks run
    /// first thing.
    pub fn run(&mut self, ctx: &mut C) -> Result<()> {
        self.did_something = true;
        loop {
            match self.run_once(ctx) {
                Ok(()) => {}
                Err(Error::Exit) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    /// One turn of the loop: wait for a watched value, the next alarm, or
    /// idleness, whichever comes first, and dispatch it. Idle callbacks run
    /// once the loop has done some work and nothing else is ready.
    pub fn run_once(&mut self, ctx: &mut C) -> Result<()> {
        let (wait, watching) = {
            let mut q = self.queues.borrow_mut();
            (q._current_wait(Instant::now()), !q.watches.is_empty())
        };
        let (timeout, on_timeout) = match wait {
            Some(w) if !(self.did_something && w > Duration::ZERO) => (Some(w), Timeout::Alarm),
            _ if self.did_something => (Some(Duration::ZERO), Timeout::Idle),
            _ if watching => (None, Timeout::Idle),
            _ => return Err(Error::RunLoop("event loop has nothing to wait for".into())),
        };
        let received = match timeout {
            Some(t) if t.is_zero() => match self.wake_rx.try_recv() {
                Ok(v) => Some(v),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    return Err(Error::RunLoop("wake channel closed".into()));
                }
            },
            Some(t) => match self.wake_rx.recv_timeout(t) {
                Ok(v) => Some(v),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::RunLoop("wake channel closed".into()));
                }
            },
            None => Some(self.wake_rx.recv()?),
        };
        match received {
            Some((key, payload)) => {
                let cb = self.queues.borrow().watches.get(key).cloned();
                if let Some(cb) = cb {
                    self.did_something = true;
                    (&mut *cb.borrow_mut())(ctx, payload)?;
                }
            }
            None => match on_timeout {
                Timeout::Idle => {
                    self.did_something = false;
                    let idle: Vec<IdleFn<C>> = self.queues.borrow().idle.values().cloned().collect();
                    for f in idle {
                        (&mut *f.borrow_mut())(ctx)?;
                    }
                }
                Timeout::Alarm => {
                    let alarm = self.queues.borrow_mut().pop_alarm();
                    if let Some(f) = alarm {
                        self.did_something = true;
                        f(ctx)?;
                    }
                }
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_order() {
        let mut q: Queues<Vec<u32>> = Queues::default();
        let now = Instant::now();
        q._alarm(now, Duration::from_secs(2), Box::new(|v| {
            v.push(2);
            Ok(())
        }));
        let cancelled = q._alarm(now, Duration::from_secs(1), Box::new(|v| {
            v.push(99);
            Ok(())
        }));
        q._alarm(now, Duration::from_secs(1), Box::new(|v| {
            v.push(1);
            Ok(())
        }));
        q._alarm(now, Duration::from_secs(1), Box::new(|v| {
            v.push(11);
            Ok(())
        }));
        q.alarms.remove(cancelled);
        assert_eq!(q._current_wait(now), Some(Duration::from_secs(1)));
        assert_eq!(q._current_wait(now + Duration::from_secs(5)), Some(Duration::ZERO));

        let mut out = vec![];
        while let Some(f) = q.pop_alarm() {
            f(&mut out).ok();
        }
        assert_eq!(out, vec![1, 11, 2]);
        assert_eq!(q._current_wait(now), None);
    }

    #[test]
    fn alarms_idle_and_exit() -> Result<()> {
        let mut el: EventLoop<Vec<&'static str>> = EventLoop::new();
        el.enter_idle(|log| {
            log.push("idle");
            Ok(())
        })?;
        let sched = el.scheduler();
        el.alarm(Duration::ZERO, move |log| {
            log.push("first");
            sched.alarm(Duration::from_millis(50), |log| {
                log.push("second");
                Err(Error::Exit)
            })?;
            Ok(())
        })?;
        let removed = el.alarm(Duration::ZERO, |log| {
            log.push("never");
            Ok(())
        })?;
        assert!(el.remove_alarm(removed));
        assert!(!el.remove_alarm(removed));

        let mut log = vec![];
        el.run(&mut log)?;
        assert_eq!(log, vec!["first", "idle", "second"]);
        Ok(())
    }

    #[test]
    fn watched_channel() -> Result<()> {
        let mut el: EventLoop<u32> = EventLoop::new();
        let (tx, rx) = mpsc::channel::<u32>();
        el.watch_channel(rx, |sum, v| {
            *sum += v;
            if v == 0 { Err(Error::Exit) } else { Ok(()) }
        })?;
        for v in [1, 2, 3, 0] {
            tx.send(v).map_err(|e| Error::RunLoop(e.to_string()))?;
        }
        let mut sum = 0;
        el.run(&mut sum)?;
        assert_eq!(sum, 6);
        Ok(())
    }

    #[test]
    fn nothing_to_wait_for() {
        let mut el: EventLoop<()> = EventLoop::new();
        assert!(matches!(el.run(&mut ()), Err(Error::RunLoop(_))));
    }

    #[test]
    fn errors_propagate() -> Result<()> {
        let mut el: EventLoop<()> = EventLoop::new();
        el.alarm(Duration::ZERO, |_| Err(Error::Invalid("boom".into())))?;
        assert_eq!(el.run(&mut ()), Err(Error::Invalid("boom".into())));
        Ok(())
    }
}
