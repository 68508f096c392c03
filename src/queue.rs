// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Weighted fair queue of deferred pending requests for one outgoing link.
//!
//! Requests are grouped by the link they arrived on. Each source accumulates
//! a service counter (`1 / weight` per dequeued request) and [`pop`] serves
//! the non-empty source with the smallest counter, so a flooding neighbor
//! cannot starve the others sharing the link. A source that becomes active
//! starts at the current minimum counter rather than at zero.
//!
//! [`pop`]: FairPendingQueue::pop

use std::collections::{BTreeMap, VecDeque};

use crate::types::{LinkId, PendingId};

/// Default cap on requests queued per source.
pub const DEFAULT_MAX_PER_SOURCE: usize = 100;

/// Weights below this are raised to it.
pub const MIN_WEIGHT: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueuedRequest {
    pub id: PendingId,
    pub source: LinkId,
    pub weight: f64,
}

#[derive(Debug, Default)]
struct SourceQueue {
    entries: VecDeque<QueuedRequest>,
    service: f64,
}

#[derive(Debug)]
pub struct FairPendingQueue {
    sources: BTreeMap<LinkId, SourceQueue>,
    max_per_source: usize,
    len: usize,
}

impl Default for FairPendingQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PER_SOURCE)
    }
}

impl FairPendingQueue {
    pub fn new(max_per_source: usize) -> Self {
        Self {
            sources: BTreeMap::new(),
            max_per_source,
            len: 0,
        }
    }

    /// Queues `id` behind earlier requests from `source`. Returns false when
    /// that source's share of the queue is full.
    pub fn enqueue(&mut self, source: LinkId, id: PendingId, weight: f64) -> bool {
        let floor = self.min_active_service();
        let queue = self.sources.entry(source).or_default();
        if queue.entries.len() >= self.max_per_source {
            return false;
        }
        if queue.entries.is_empty() {
            queue.service = queue.service.max(floor);
        }
        let weight = if weight.is_finite() { weight.max(MIN_WEIGHT) } else { 1.0 };
        queue.entries.push_back(QueuedRequest { id, source, weight });
        self.len += 1;
        true
    }

    /// Next request under weighted fairness, `None` when nothing is eligible.
    pub fn pop(&mut self) -> Option<QueuedRequest> {
        let source = self
            .sources
            .iter()
            .filter(|(_, q)| !q.entries.is_empty())
            .min_by(|a, b| a.1.service.total_cmp(&b.1.service))
            .map(|(link, _)| *link)?;

        let queue = self.sources.get_mut(&source)?;
        let request = queue.entries.pop_front()?;
        queue.service += 1.0 / request.weight;
        self.len -= 1;
        self.rebase();
        Some(request)
    }

    /// Removes `id` wherever it is queued.
    pub fn remove(&mut self, id: PendingId) -> bool {
        for queue in self.sources.values_mut() {
            if let Some(pos) = queue.entries.iter().position(|r| r.id == id) {
                queue.entries.remove(pos);
                self.len -= 1;
                return true;
            }
        }
        false
    }

    pub fn contains(&self, id: PendingId) -> bool {
        self.sources.values().any(|q| q.entries.iter().any(|r| r.id == id))
    }

    /// Drops everything queued on behalf of `source`.
    pub fn remove_source(&mut self, source: LinkId) -> Vec<PendingId> {
        match self.sources.remove(&source) {
            Some(queue) => {
                self.len -= queue.entries.len();
                queue.entries.into_iter().map(|r| r.id).collect()
            }
            None => Vec::new(),
        }
    }

    pub fn drain_all(&mut self) -> Vec<PendingId> {
        self.len = 0;
        std::mem::take(&mut self.sources)
            .into_values()
            .flat_map(|q| q.entries.into_iter().map(|r| r.id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn source_len(&self, source: LinkId) -> usize {
        self.sources.get(&source).map_or(0, |q| q.entries.len())
    }

    fn min_active_service(&self) -> f64 {
        self.sources
            .values()
            .filter(|q| !q.entries.is_empty())
            .map(|q| q.service)
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.min(s))))
            .unwrap_or(0.0)
    }

    // Keeps counters bounded; only differences matter.
    fn rebase(&mut self) {
        let floor = self.min_active_service();
        if floor <= 0.0 {
            return;
        }
        for queue in self.sources.values_mut() {
            queue.service = (queue.service - floor).max(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &mut FairPendingQueue) -> Vec<LinkId> {
        std::iter::from_fn(|| queue.pop()).map(|r| r.source).collect()
    }

    #[test]
    fn test_equal_weights_alternate() {
        let mut q = FairPendingQueue::new(10);
        for i in 0..6 {
            assert!(q.enqueue(LinkId(1), PendingId(i), 1.0));
        }
        for i in 6..9 {
            assert!(q.enqueue(LinkId(2), PendingId(i), 1.0));
        }
        let order = drain(&mut q);
        let a = LinkId(1);
        let b = LinkId(2);
        assert_eq!(order, vec![a, b, a, b, a, b, a, a, a]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_weight_scales_share() {
        let mut q = FairPendingQueue::new(10);
        for i in 0..6 {
            q.enqueue(LinkId(1), PendingId(i), 2.0);
            q.enqueue(LinkId(2), PendingId(100 + i), 1.0);
        }
        let first_six = &drain(&mut q)[..6];
        let heavy = first_six.iter().filter(|l| **l == LinkId(1)).count();
        assert_eq!(heavy, 4);
    }

    #[test]
    fn test_late_source_does_not_monopolize() {
        let mut q = FairPendingQueue::new(50);
        for i in 0..20 {
            q.enqueue(LinkId(1), PendingId(i), 1.0);
        }
        for _ in 0..10 {
            q.pop();
        }
        for i in 0..10 {
            q.enqueue(LinkId(2), PendingId(100 + i), 1.0);
        }
        let next_four = &drain(&mut q)[..4];
        assert!(next_four.contains(&LinkId(1)));
        assert!(next_four.contains(&LinkId(2)));
    }

    #[test]
    fn test_per_source_cap() {
        let mut q = FairPendingQueue::new(2);
        assert!(q.enqueue(LinkId(1), PendingId(1), 1.0));
        assert!(q.enqueue(LinkId(1), PendingId(2), 1.0));
        assert!(!q.enqueue(LinkId(1), PendingId(3), 1.0));
        assert!(q.enqueue(LinkId(2), PendingId(4), 1.0));
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn test_remove_and_remove_source() {
        let mut q = FairPendingQueue::new(10);
        q.enqueue(LinkId(1), PendingId(1), 1.0);
        q.enqueue(LinkId(2), PendingId(2), 1.0);
        q.enqueue(LinkId(2), PendingId(3), 1.0);
        assert!(q.remove(PendingId(1)));
        assert!(!q.remove(PendingId(1)));
        assert_eq!(q.remove_source(LinkId(2)), vec![PendingId(2), PendingId(3)]);
        assert!(q.is_empty());
        assert_eq!(q.pop(), None);
    }
}
