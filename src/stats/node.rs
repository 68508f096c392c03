// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Per-prefix map of link load.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::face::FaceLoadStats;
use crate::types::LinkId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsNode {
    per_face: BTreeMap<LinkId, FaceLoadStats>,
}

impl StatsNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_served(&mut self, link: LinkId) {
        self.per_face.entry(link).or_default().served.increment();
    }

    pub fn add_unsatisfied(&mut self, link: LinkId) {
        self.per_face.entry(link).or_default().unsatisfied.increment();
    }

    pub fn insert(&mut self, link: LinkId, stats: FaceLoadStats) {
        self.per_face.insert(link, stats);
    }

    pub fn get(&self, link: LinkId) -> Option<&FaceLoadStats> {
        self.per_face.get(&link)
    }

    /// Current served value for `link`, zero if never observed.
    pub fn served(&self, link: LinkId) -> f64 {
        self.per_face.get(&link).map_or(0.0, |s| s.served.get())
    }

    /// Current unsatisfied value for `link`, zero if never observed.
    pub fn unsatisfied(&self, link: LinkId) -> f64 {
        self.per_face.get(&link).map_or(0.0, |s| s.unsatisfied.get())
    }

    pub fn iter(&self) -> impl Iterator<Item = (LinkId, &FaceLoadStats)> {
        self.per_face.iter().map(|(link, stats)| (*link, stats))
    }

    pub fn links(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.per_face.keys().copied()
    }

    /// Sums another node's pending raw counts into this one, link by link.
    pub fn absorb_raw(&mut self, child: &StatsNode) {
        for (link, stats) in &child.per_face {
            self.per_face.entry(*link).or_default().absorb_raw(stats);
        }
    }

    pub fn step(&mut self) {
        for stats in self.per_face.values_mut() {
            stats.step();
        }
    }

    pub fn is_zero(&self) -> bool {
        self.per_face.values().all(FaceLoadStats::is_zero)
    }

    pub fn remove_link(&mut self, link: LinkId) -> bool {
        self.per_face.remove(&link).is_some()
    }

    pub fn len(&self) -> usize {
        self.per_face.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_face.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_sums_matching_links() {
        let mut parent = StatsNode::new();
        parent.add_served(LinkId(1));
        let mut child = StatsNode::new();
        child.add_served(LinkId(1));
        child.add_served(LinkId(2));
        child.add_unsatisfied(LinkId(2));

        parent.absorb_raw(&child);
        assert_eq!(parent.get(LinkId(1)).map(|s| s.served.raw_count()), Some(2));
        assert_eq!(parent.get(LinkId(2)).map(|s| s.unsatisfied.raw_count()), Some(1));
    }

    #[test]
    fn test_unknown_link_reads_zero() {
        let node = StatsNode::new();
        assert_eq!(node.served(LinkId(7)), 0.0);
        assert!(node.is_zero());
    }
}
