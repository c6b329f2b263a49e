//! Virtual monotonic clock and cancellable timers.
//!
//! The engine never reads wall-clock time. The host advances a [`TimerQueue`]
//! and the orchestrator drains due timers one at a time, so every phase
//! transition is reproducible in tests without real waits.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::ClockError;

/// Milliseconds on the engine clock
pub type Millis = u64;

/// Opaque handle for a scheduled timer. Never reused within a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Schedule-after-delay / cancel-by-handle primitive consumed by the core.
pub trait Scheduler<T> {
    fn now(&self) -> Millis;

    /// Arm a timer firing `delay` ms from now with the given payload.
    fn schedule_after(&mut self, delay: Millis, payload: T) -> Result<TimerHandle, ClockError>;

    /// Disarm a timer. Returns `false` if it already fired or was cancelled.
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    /// Number of armed timers
    fn pending(&self) -> usize;
}

/// Binary-heap timer queue over a virtual clock.
///
/// Ordering is `(deadline, schedule order)`, so two timers due at the same
/// instant fire in the order they were armed. Cancellation is lazy: the heap
/// entry stays until popped, but its payload is dropped immediately and it
/// can never fire.
#[derive(Debug)]
pub struct TimerQueue<T> {
    now: Millis,
    next_id: u64,
    capacity: usize,
    heap: BinaryHeap<Reverse<(Millis, u64)>>,
    payloads: HashMap<u64, T>,
}

impl<T> TimerQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            now: 0,
            next_id: 0,
            capacity,
            heap: BinaryHeap::new(),
            payloads: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Move the clock forward. Time never runs backwards.
    pub fn advance_to(&mut self, t: Millis) {
        self.now = self.now.max(t);
    }

    pub fn advance(&mut self, delta: Millis) {
        self.now = self.now.saturating_add(delta);
    }

    /// Deadline of the earliest armed timer
    pub fn next_deadline(&mut self) -> Option<Millis> {
        while let Some(Reverse((deadline, id))) = self.heap.peek().copied() {
            if self.payloads.contains_key(&id) {
                return Some(deadline);
            }
            self.heap.pop();
        }
        None
    }

    /// Pop the next timer whose deadline is at or before `now`.
    pub fn pop_due(&mut self) -> Option<(TimerHandle, T)> {
        while let Some(Reverse((deadline, id))) = self.heap.peek().copied() {
            if deadline > self.now {
                return None;
            }
            self.heap.pop();
            if let Some(payload) = self.payloads.remove(&id) {
                return Some((TimerHandle(id), payload));
            }
        }
        None
    }

    /// Disarm everything.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.payloads.clear();
    }

    fn compact_if_needed(&mut self) {
        // Cancelled entries linger in the heap until popped
        if self.heap.len() > self.payloads.len() * 2 + 64 {
            let payloads = &self.payloads;
            self.heap.retain(|Reverse((_, id))| payloads.contains_key(id));
        }
    }
}

impl<T> Scheduler<T> for TimerQueue<T> {
    fn now(&self) -> Millis {
        self.now
    }

    fn schedule_after(&mut self, delay: Millis, payload: T) -> Result<TimerHandle, ClockError> {
        if self.payloads.len() >= self.capacity {
            return Err(ClockError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        let deadline = self
            .now
            .checked_add(delay)
            .ok_or(ClockError::DeadlineOverflow {
                now: self.now,
                delay,
            })?;

        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Reverse((deadline, id)));
        self.payloads.insert(id, payload);
        self.compact_if_needed();

        tracing::trace!(target: "riposte_core::clock", id, deadline, "timer armed");
        Ok(TimerHandle(id))
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.payloads.remove(&handle.0).is_some()
    }

    fn pending(&self) -> usize {
        self.payloads.len()
    }
}
