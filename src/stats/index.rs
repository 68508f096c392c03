// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Prefix trie of link load.
//!
//! Requests are recorded against the node for their name minus the final
//! component. Once per tick [`StatsIndex::tick`] walks the trie post-order:
//! each child's pending raw counts are summed into its parent, then the child
//! is decayed, then dropped if it is all-zero and childless. The root is
//! decayed last, so it carries the smoothed per-link picture of all traffic
//! even after prefix-level detail has decayed away.

use std::collections::BTreeMap;

use tracing::trace;

use super::node::StatsNode;
use crate::name::Name;
use crate::types::LinkId;

#[derive(Debug, Clone, Default)]
struct TrieNode {
    stats: StatsNode,
    children: BTreeMap<String, TrieNode>,
}

impl TrieNode {
    fn count(&self) -> usize {
        1 + self.children.values().map(TrieNode::count).sum::<usize>()
    }

    fn remove_link(&mut self, link: LinkId) {
        self.stats.remove_link(link);
        for child in self.children.values_mut() {
            child.remove_link(link);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsIndex {
    root: TrieNode,
}

impl StatsIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts `in_link` as served at the node keyed by `name` minus its last component.
    pub fn record_forwarded(&mut self, name: &Name, in_link: LinkId) {
        self.node_mut(&name.without_last()).add_served(in_link);
    }

    pub fn record_unsatisfied<I>(&mut self, name: &Name, in_links: I)
    where
        I: IntoIterator<Item = LinkId>,
    {
        let node = self.node_mut(&name.without_last());
        for link in in_links {
            node.add_unsatisfied(link);
        }
    }

    /// Full per-tick pass: fold and decay every child, then decay the root.
    /// Returns the number of pruned nodes.
    pub fn tick(&mut self) -> usize {
        let pruned = self.aggregate();
        self.root.stats.step();
        trace!(pruned, nodes = self.node_count(), "stats tick");
        pruned
    }

    /// Post-order fold of every child into its parent, leaving the root's own
    /// values undecayed.
    pub fn aggregate(&mut self) -> usize {
        fold_children(&mut self.root)
    }

    /// Longest-matching existing node for `prefix`; never fails.
    pub fn query(&self, prefix: &Name) -> &StatsNode {
        let mut node = &self.root;
        for component in prefix.components() {
            match node.children.get(component) {
                Some(child) => node = child,
                None => break,
            }
        }
        &node.stats
    }

    pub fn contains(&self, prefix: &Name) -> bool {
        let mut node = &self.root;
        for component in prefix.components() {
            match node.children.get(component) {
                Some(child) => node = child,
                None => return false,
            }
        }
        true
    }

    pub fn root(&self) -> &StatsNode {
        &self.root.stats
    }

    pub fn remove_link(&mut self, link: LinkId) {
        self.root.remove_link(link);
    }

    pub fn node_count(&self) -> usize {
        self.root.count()
    }

    pub fn clear(&mut self) {
        self.root = TrieNode::default();
    }

    fn node_mut(&mut self, prefix: &Name) -> &mut StatsNode {
        let mut node = &mut self.root;
        for component in prefix.components() {
            node = node.children.entry(component.to_string()).or_default();
        }
        &mut node.stats
    }
}

fn fold_children(node: &mut TrieNode) -> usize {
    let mut pruned = 0;
    let mut exhausted = Vec::new();
    for (key, child) in node.children.iter_mut() {
        pruned += fold_children(child);
        node.stats.absorb_raw(&child.stats);
        child.stats.step();
        if child.children.is_empty() && child.stats.is_zero() {
            exhausted.push(key.clone());
        }
    }
    pruned += exhausted.len();
    for key in exhausted {
        node.children.remove(&key);
    }
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        s.parse().expect("test: name")
    }

    #[test]
    fn test_keyed_by_trimmed_name() {
        let mut index = StatsIndex::new();
        index.record_forwarded(&name("/good/1/42"), LinkId(3));
        assert!(index.contains(&name("/good/1")));
        assert!(!index.contains(&name("/good/1/42")));
    }

    #[test]
    fn test_aggregation_conserves_raw_counts() {
        let mut index = StatsIndex::new();
        let leaves = ["/good/1/a", "/good/1/b", "/good/2/c", "/evil/3/d", "/x"];
        for (i, leaf) in leaves.iter().enumerate() {
            for _ in 0..=i {
                index.record_forwarded(&name(leaf), LinkId(1));
            }
            index.record_unsatisfied(&name(leaf), [LinkId(2)]);
        }
        let before = index.root().get(LinkId(1)).map_or(0, |s| s.served.raw_count());

        index.aggregate();

        let root = index.root();
        let served = root.get(LinkId(1)).map_or(0, |s| s.served.raw_count());
        let unsatisfied = root.get(LinkId(2)).map_or(0, |s| s.unsatisfied.raw_count());
        assert_eq!(served - before, 1 + 2 + 3 + 4);
        assert_eq!(before, 5);
        assert_eq!(unsatisfied, 5);
    }

    #[test]
    fn test_root_keeps_history_after_prune() {
        let mut index = StatsIndex::new();
        for _ in 0..32 {
            index.record_forwarded(&name("/good/7/1"), LinkId(4));
        }
        index.tick();
        assert!((index.root().served(LinkId(4)) - 1.0).abs() < 1e-12);
        assert!(index.node_count() > 1);

        for _ in 0..200 {
            index.tick();
        }
        assert_eq!(index.node_count(), 1);
    }

    #[test]
    fn test_query_falls_back_to_ancestor() {
        let mut index = StatsIndex::new();
        index.record_forwarded(&name("/good/1/2"), LinkId(9));
        let hit = index.query(&name("/good/1/2/3/4"));
        assert_eq!(hit.get(LinkId(9)).map(|s| s.served.raw_count()), Some(1));
        let miss = index.query(&name("/evil"));
        assert!(miss.is_empty());
    }

    #[test]
    fn test_remove_link_walks_whole_trie() {
        let mut index = StatsIndex::new();
        index.record_forwarded(&name("/a/b/c"), LinkId(1));
        index.record_forwarded(&name("/a/b/c"), LinkId(2));
        index.tick();
        index.remove_link(LinkId(1));
        assert!(index.root().get(LinkId(1)).is_none());
        assert!(index.query(&name("/a/b")).get(LinkId(1)).is_none());
        assert!(index.query(&name("/a/b")).get(LinkId(2)).is_some());
    }
}
