/// Emulated-time sync points.
///
/// The emulated machine wakes components at registered emulated instants.
/// `SyncPointQueue` keeps them in a min-heap keyed by `(time, id)`; ids are
/// strictly increasing, so sync points at the same instant fire in the
/// order they were set.
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::time::EmuTime;

/// Deterministic emulated-time wake-up facility.
pub trait VirtualScheduler {
    /// Current emulated time.
    fn current_time(&self) -> EmuTime;

    /// Request a wake-up at `time`.
    fn set_sync_point(&mut self, time: EmuTime);

    /// Cancel every outstanding wake-up.
    fn remove_sync_points(&mut self);

    /// Pop the earliest wake-up at or before `limit`, advancing the current
    /// time to it.
    fn next_due(&mut self, limit: EmuTime) -> Option<EmuTime>;

    /// Advance the current time to `time` (never backwards).
    fn advance_to(&mut self, time: EmuTime);
}

/// Min-heap of sync points.
#[derive(Debug, Clone, Default)]
pub struct SyncPointQueue {
    queue: BinaryHeap<Reverse<(EmuTime, u64)>>,
    next_id: u64,
    now: EmuTime,
}

impl SyncPointQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue whose clock starts at `now`.
    pub fn starting_at(now: EmuTime) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Earliest pending sync point.
    pub fn peek(&self) -> Option<EmuTime> {
        self.queue.peek().map(|Reverse((t, _))| *t)
    }

    /// All pending sync points in firing order.
    pub fn pending(&self) -> Vec<EmuTime> {
        let mut points: Vec<(EmuTime, u64)> = self.queue.iter().map(|Reverse(p)| *p).collect();
        points.sort();
        points.into_iter().map(|(t, _)| t).collect()
    }
}

impl VirtualScheduler for SyncPointQueue {
    fn current_time(&self) -> EmuTime {
        self.now
    }

    fn set_sync_point(&mut self, time: EmuTime) {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.push(Reverse((time, id)));
    }

    fn remove_sync_points(&mut self) {
        self.queue.clear();
    }

    fn next_due(&mut self, limit: EmuTime) -> Option<EmuTime> {
        let due = match self.queue.peek() {
            Some(Reverse((t, _))) if *t <= limit => *t,
            _ => return None,
        };
        self.queue.pop();
        self.advance_to(due);
        Some(due)
    }

    fn advance_to(&mut self, time: EmuTime) {
        if time > self.now {
            self.now = time;
        }
    }
}
