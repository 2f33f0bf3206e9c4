use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;

/// Identifies one run of a workflow. Every scheduled action carries the run it
/// was scheduled for, so actions outliving their run can be told apart.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RunId(pub u64);

impl RunId {
    pub fn next(self) -> Self {
        RunId(self.0 + 1)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Ordered `(relative delay, action)` pairs, scheduled together against one run.
#[derive(Debug, Clone)]
pub struct Schedule<A> {
    steps: Vec<(Duration, A)>,
}

impl<A> Default for Schedule<A> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<A> Schedule<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `action` to fire `delay` after the schedule's origin.
    pub fn after(mut self, delay: Duration, action: A) -> Self {
        self.steps.push((delay, action));
        self
    }

    pub fn steps(&self) -> &[(Duration, A)] {
        &self.steps
    }
}

/// An action waiting in (or just popped from) the timer queue.
#[derive(Debug, Clone)]
pub struct ScheduledAction<A> {
    pub run: RunId,
    pub due: DateTime<Utc>,
    pub action: A,
    seq: u64,
}

impl<A> ScheduledAction<A> {
    fn key(&self) -> (DateTime<Utc>, u64) {
        (self.due, self.seq)
    }
}

impl<A> PartialEq for ScheduledAction<A> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<A> Eq for ScheduledAction<A> {}

impl<A> PartialOrd for ScheduledAction<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A> Ord for ScheduledAction<A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Min-heap of scheduled actions. Actions pop in due order; actions due at
/// the same instant pop in the order they were scheduled.
#[derive(Debug)]
pub struct TimerQueue<A> {
    heap: BinaryHeap<Reverse<ScheduledAction<A>>>,
    next_seq: u64,
}

impl<A> Default for TimerQueue<A> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<A> TimerQueue<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, run: RunId, due: DateTime<Utc>, action: A) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(ScheduledAction {
            run,
            due,
            action,
            seq,
        }));
    }

    /// Schedule `action` at `origin + delay`. A deadline past the end of the
    /// representable range is clamped to it, so the action never fires.
    pub fn schedule_after(
        &mut self,
        run: RunId,
        origin: DateTime<Utc>,
        delay: Duration,
        action: A,
    ) {
        let due = origin
            .checked_add_signed(delay)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.schedule(run, due, action);
    }

    /// Schedule every step of `schedule` relative to `origin`.
    pub fn schedule_all(&mut self, run: RunId, origin: DateTime<Utc>, schedule: Schedule<A>) {
        for (delay, action) in schedule.steps {
            self.schedule_after(run, origin, delay, action);
        }
    }

    /// Pop the earliest action if it is due at `now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<ScheduledAction<A>> {
        if self.heap.peek()?.0.due > now {
            return None;
        }
        self.heap.pop().map(|Reverse(item)| item)
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|Reverse(item)| item.due)
    }

    /// Number of queued actions belonging to `run`.
    pub fn pending_for(&self, run: RunId) -> usize {
        self.heap.iter().filter(|Reverse(item)| item.run == run).count()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
