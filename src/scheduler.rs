//! Virtual-time timer queue.
//!
//! The core never reads a wall clock. Whoever owns the screen advances time
//! explicitly and due tasks are handed back one at a time, in deadline order
//! (ties in scheduling order). Every task is single-shot and cancellable.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_seq: u64,
    queue: BTreeMap<(Duration, u64), T>,
    deadlines: HashMap<u64, Duration>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, task: T) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let deadline = self.now + delay;
        self.queue.insert((deadline, seq), task);
        self.deadlines.insert(seq, deadline);
        TimerId(seq)
    }

    /// Returns false if the timer already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id.0) {
            Some(deadline) => self.queue.remove(&(deadline, id.0)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id.0)
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Pops the earliest task due at or before `until` and moves the clock to
    /// its deadline. Returns `None` once nothing is due; the caller then
    /// finishes with [`Scheduler::settle`].
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, T)> {
        let (&(deadline, seq), _) = self.queue.first_key_value()?;
        if deadline > until {
            return None;
        }
        let task = self.queue.remove(&(deadline, seq))?;
        self.deadlines.remove(&seq);
        if deadline > self.now {
            self.now = deadline;
        }
        Some((TimerId(seq), task))
    }

    /// Moves the clock forward to `until`; never backwards.
    pub fn settle(&mut self, until: Duration) {
        if until > self.now {
            self.now = until;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn fires_in_deadline_then_schedule_order() {
        let mut s = Scheduler::new();
        s.schedule(ms(300), "late");
        s.schedule(ms(100), "first");
        s.schedule(ms(100), "second");

        let mut fired = vec![];
        while let Some((_, t)) = s.pop_due(ms(1000)) {
            fired.push((s.now(), t));
        }
        assert_eq!(
            fired,
            vec![(ms(100), "first"), (ms(100), "second"), (ms(300), "late")]
        );
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut s = Scheduler::new();
        let id = s.schedule(ms(50), 1);
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert!(s.pop_due(ms(100)).is_none());
        assert_eq!(s.pending_count(), 0);
    }

    #[test]
    fn not_due_stays_queued() {
        let mut s = Scheduler::new();
        let id = s.schedule(ms(500), ());
        assert!(s.pop_due(ms(499)).is_none());
        s.settle(ms(499));
        assert!(s.is_pending(id));
        assert!(s.pop_due(ms(500)).is_some());
        assert!(!s.is_pending(id));
    }
}
