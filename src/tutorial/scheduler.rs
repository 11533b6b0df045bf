//! Scheduler facade.
//!
//! Timers are plain values handed back to the engine when due, so every
//! callback runs on the caller's thread in due-time order. The clock is
//! pluggable: [`WallClock`] for a live host, [`VirtualClock`] to drive the
//! tutorial from tests without waiting.

use std::cell::Cell;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::rc::Rc;
use std::time::Instant;

use log::trace;
use serde::Serialize;

pub type TimerId = u64;

/// Deferred work understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Timer {
    /// Invoke the current stage with no event payload.
    Advance,
    /// End a pause, unless a newer pause replaced it.
    ClearPause { generation: u64 },
    /// Read the motion source and move tokens.
    MotionSample,
}

pub trait Scheduler {
    /// Fire `timer` once after `delay_ms`.
    fn after(&mut self, delay_ms: u64, timer: Timer) -> TimerId;

    /// Fire `timer` every `interval_ms` until cancelled.
    fn every(&mut self, interval_ms: u64, timer: Timer) -> TimerId;

    fn cancel(&mut self, id: TimerId);

    /// Pop the earliest timer whose time has come.
    fn next_due(&mut self) -> Option<Timer>;
}

pub trait Clock {
    fn now_ms(&self) -> u64;
}

pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: Rc<Cell<u64>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

#[derive(Debug)]
struct Entry {
    due: u64,
    id: TimerId,
    interval: Option<u64>,
    timer: Timer,
}

// Ordered by due time, then by scheduling order.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.id).cmp(&(other.due, other.id))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.id == other.id
    }
}

impl Eq for Entry {}

pub struct TimerQueue<C: Clock> {
    clock: C,
    pending: BinaryHeap<Reverse<Entry>>,
    cancelled: HashSet<TimerId>,
    next_id: TimerId,
}

impl<C: Clock> TimerQueue<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            pending: BinaryHeap::new(),
            cancelled: HashSet::new(),
            next_id: 0,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Number of timers still waiting.
    pub fn len(&self) -> usize {
        self.pending
            .iter()
            .filter(|Reverse(e)| !self.cancelled.contains(&e.id))
            .count()
    }

    fn push(&mut self, delay_ms: u64, interval: Option<u64>, timer: Timer) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        let due = self.clock.now_ms() + delay_ms;
        trace!("[Scheduler] {:?} due at {} ms (id={})", timer, due, id);
        self.pending.push(Reverse(Entry { due, id, interval, timer }));
        id
    }
}

impl<C: Clock> Scheduler for TimerQueue<C> {
    fn after(&mut self, delay_ms: u64, timer: Timer) -> TimerId {
        self.push(delay_ms, None, timer)
    }

    fn every(&mut self, interval_ms: u64, timer: Timer) -> TimerId {
        // A zero interval would refire forever within one tick.
        self.push(interval_ms, Some(interval_ms.max(1)), timer)
    }

    fn cancel(&mut self, id: TimerId) {
        self.cancelled.insert(id);
    }

    fn next_due(&mut self) -> Option<Timer> {
        let now = self.clock.now_ms();
        loop {
            let due = match self.pending.peek() {
                Some(Reverse(entry)) => entry.due,
                None => return None,
            };
            let Some(Reverse(entry)) = self.pending.pop() else {
                return None;
            };
            if self.cancelled.remove(&entry.id) {
                continue;
            }
            if due > now {
                self.pending.push(Reverse(entry));
                return None;
            }
            if let Some(interval) = entry.interval {
                self.pending.push(Reverse(Entry {
                    due: entry.due + interval,
                    id: entry.id,
                    interval: entry.interval,
                    timer: entry.timer,
                }));
            }
            return Some(entry.timer);
        }
    }
}
