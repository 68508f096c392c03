// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Hypermesh Interest Pushback Suite - Discrete Event Clock

use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Scheduled<E> {
    at: f64,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the max-heap yields the earliest event, then the earliest insertion.
impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.at.total_cmp(&self.at).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Single-threaded event queue. Events with equal fire times pop in the
/// order they were scheduled.
pub struct EventQueue<E> {
    heap: BinaryHeap<Scheduled<E>>,
    now: f64,
    seq: u64,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self { heap: BinaryHeap::new(), now: 0.0, seq: 0 }
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    /// Schedules at an absolute time; times in the past fire at `now`.
    pub fn schedule(&mut self, at: f64, event: E) {
        let at = at.max(self.now);
        self.heap.push(Scheduled { at, seq: self.seq, event });
        self.seq += 1;
    }

    pub fn schedule_in(&mut self, delay: f64, event: E) {
        self.schedule(self.now + delay.max(0.0), event);
    }

    pub fn peek_time(&self) -> Option<f64> {
        self.heap.peek().map(|s| s.at)
    }

    /// Pops the next event, advancing the clock to it.
    pub fn pop(&mut self) -> Option<(f64, E)> {
        let next = self.heap.pop()?;
        self.now = next.at;
        Some((next.at, next.event))
    }

    /// Pops the next event no later than `until`, advancing the clock to it.
    pub fn pop_until(&mut self, until: f64) -> Option<(f64, E)> {
        if self.peek_time()? > until {
            return None;
        }
        self.pop()
    }

    /// Moves the clock forward without firing anything.
    pub fn advance_to(&mut self, t: f64) {
        self.now = self.now.max(t);
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_by_time_then_insertion() {
        let mut q = EventQueue::new();
        q.schedule(2.0, "late");
        q.schedule(1.0, "first");
        q.schedule(1.0, "second");
        q.schedule_in(0.5, "early");

        let order: Vec<&str> = std::iter::from_fn(|| q.pop_until(10.0)).map(|(_, e)| e).collect();
        assert_eq!(order, vec!["early", "first", "second", "late"]);
        assert!((q.now() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pop_until_respects_horizon() {
        let mut q = EventQueue::new();
        q.schedule(5.0, 1u32);
        assert!(q.pop_until(4.0).is_none());
        assert_eq!(q.len(), 1);
        q.advance_to(4.0);
        q.schedule(1.0, 2u32);
        assert_eq!(q.pop_until(4.0), Some((4.0, 2u32)));
    }

    #[test]
    fn test_past_events_fire_now() {
        let mut q = EventQueue::new();
        q.schedule(3.0, 'a');
        assert_eq!(q.pop(), Some((3.0, 'a')));
        q.schedule(1.0, 'b');
        assert_eq!(q.pop(), Some((3.0, 'b')));
        assert_eq!(q.pop(), None);
    }
}
