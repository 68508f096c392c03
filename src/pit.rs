// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Hypermesh Interest Pushback Suite - Pending Interest Table

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::name::Name;
use crate::types::{LinkId, PendingId};

// ─── Interest ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interest {
    pub name: Name,
    pub lifetime: f64,
    /// `Some(0)` keeps the packet on the receiving node.
    pub scope: Option<u8>,
    pub nonce: u32,
}

impl Interest {
    pub fn new(name: Name, lifetime: f64, nonce: u32) -> Self {
        Self { name, lifetime, scope: None, nonce }
    }

    pub fn link_local(name: Name, nonce: u32) -> Self {
        Self { name, lifetime: 0.0, scope: Some(0), nonce }
    }

    pub fn is_link_local(&self) -> bool {
        self.scope == Some(0)
    }
}

// ─── Entry ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingEntry {
    pub id: PendingId,
    pub interest: Interest,
    pub incoming: BTreeSet<LinkId>,
    pub outgoing: BTreeSet<LinkId>,
    pub expire_at: f64,
    /// Outgoing link whose fair queue holds this entry.
    pub queued_on: Option<LinkId>,
    /// Dropped from a withdrawn link's queue and not forwarded since.
    pub stranded: bool,
}

impl PendingEntry {
    pub fn new(id: PendingId, interest: Interest, in_link: LinkId, now: f64) -> Self {
        let expire_at = now + interest.lifetime;
        Self {
            id,
            interest,
            incoming: BTreeSet::from([in_link]),
            outgoing: BTreeSet::new(),
            expire_at,
            queued_on: None,
            stranded: false,
        }
    }

    pub fn name(&self) -> &Name {
        &self.interest.name
    }

    /// Pushes the deadline out to at least `now + lifetime`; never pulls it in.
    pub fn update_lifetime(&mut self, now: f64, lifetime: f64) {
        self.expire_at = self.expire_at.max(now + lifetime);
    }

    pub fn offset_lifetime(&mut self, delta: f64) {
        self.expire_at += delta;
    }

    pub fn is_expired(&self, now: f64) -> bool {
        now >= self.expire_at
    }
}

// ─── Table ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<PendingId, PendingEntry>,
    by_name: HashMap<Name, PendingId>,
    next_id: u64,
}

/// What happened when an interest was offered to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Created(PendingId),
    /// An entry for the same name existed; the link was added to it.
    Aggregated(PendingId),
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, interest: &Interest, in_link: LinkId, now: f64) -> Insertion {
        if let Some(id) = self.by_name.get(&interest.name).copied() {
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.incoming.insert(in_link);
                entry.update_lifetime(now, interest.lifetime);
                return Insertion::Aggregated(id);
            }
        }
        let id = PendingId(self.next_id);
        self.next_id += 1;
        self.by_name.insert(interest.name.clone(), id);
        self.entries.insert(id, PendingEntry::new(id, interest.clone(), in_link, now));
        Insertion::Created(id)
    }

    pub fn get(&self, id: PendingId) -> Option<&PendingEntry> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: PendingId) -> Option<&mut PendingEntry> {
        self.entries.get_mut(&id)
    }

    pub fn find(&self, name: &Name) -> Option<PendingId> {
        self.by_name.get(name).copied()
    }

    pub fn erase(&mut self, id: PendingId) -> Option<PendingEntry> {
        let entry = self.entries.remove(&id)?;
        self.by_name.remove(entry.name());
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_name.clear();
    }

    /// Entries whose deadline has passed, in id order.
    pub fn expired(&self, now: f64) -> Vec<PendingId> {
        let mut ids: Vec<PendingId> =
            self.entries.values().filter(|e| e.is_expired(now)).map(|e| e.id).collect();
        ids.sort();
        ids
    }

    /// Clears every entry's incoming/outgoing reference to `link`.
    pub fn forget_link(&mut self, link: LinkId) {
        for entry in self.entries.values_mut() {
            entry.incoming.remove(&link);
            entry.outgoing.remove(&link);
            if entry.queued_on == Some(link) {
                entry.queued_on = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interest(s: &str) -> Interest {
        Interest::new(s.parse().expect("test: name"), 1.0, 7)
    }

    #[test]
    fn test_insert_aggregates_same_name() {
        let mut pit = PendingTable::new();
        let first = pit.insert(&interest("/good/1/1"), LinkId(1), 0.0);
        let second = pit.insert(&interest("/good/1/1"), LinkId(2), 0.5);
        let Insertion::Created(id) = first else { panic!("expected new entry") };
        assert_eq!(second, Insertion::Aggregated(id));
        let entry = pit.get(id).expect("test: entry");
        assert_eq!(entry.incoming.len(), 2);
        assert!((entry.expire_at - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deferral_lifetime_arithmetic() {
        let mut entry = PendingEntry::new(PendingId(0), interest("/good/1/1"), LinkId(1), 2.0);
        entry.offset_lifetime(-1.0);
        entry.update_lifetime(2.0, 0.1);
        assert!((entry.expire_at - 2.1).abs() < 1e-12);
        entry.offset_lifetime(-0.1 + 1.0);
        assert!((entry.expire_at - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_erase_drops_name_index() {
        let mut pit = PendingTable::new();
        let Insertion::Created(id) = pit.insert(&interest("/evil/2/5"), LinkId(3), 0.0) else {
            panic!("expected new entry")
        };
        assert!(pit.expired(0.5).is_empty());
        assert_eq!(pit.expired(1.0), vec![id]);
        assert!(pit.erase(id).is_some());
        assert_eq!(pit.find(&"/evil/2/5".parse().expect("test: name")), None);
        assert!(pit.is_empty());
    }
}
