// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Hypermesh Interest Pushback Suite - Type Definitions

use serde::{Serialize, Deserialize};
use std::fmt;

// ─── Identities ─────────────────────────────────────────────────────────────

pub type NodeId = u32;

/// A node's point of attachment to a neighbor or to a local application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkId(pub u32);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link{}", self.0)
    }
}

/// Host-assigned identity of a pending-request table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PendingId(pub u64);

impl fmt::Display for PendingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pit{}", self.0)
    }
}

// ─── Forwarding Outcome ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardOutcome {
    /// Sent out the link immediately.
    Accepted,
    /// Parked in the link's fair queue until a credit frees up.
    AcceptedDeferred,
    Rejected,
}

impl ForwardOutcome {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, ForwardOutcome::Rejected)
    }
}

// ─── Node Roles ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeRole {
    Producer,
    Router,
    GoodConsumer,
    EvilConsumer,
}

impl NodeRole {
    pub fn is_consumer(&self) -> bool {
        matches!(self, NodeRole::GoodConsumer | NodeRole::EvilConsumer)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrafficClass {
    Good,
    Evil,
}

impl TrafficClass {
    /// First name component used by consumers of this class.
    pub fn prefix_component(&self) -> &'static str {
        match self {
            TrafficClass::Good => "good",
            TrafficClass::Evil => "evil",
        }
    }
}

// ─── Simulation Output ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ClassCounters {
    pub sent: u64,
    pub satisfied: u64,
    pub timed_out: u64,
}

impl ClassCounters {
    pub fn satisfaction(&self) -> f64 {
        let resolved = self.satisfied + self.timed_out;
        if resolved == 0 {
            return 1.0;
        }
        self.satisfied as f64 / resolved as f64
    }

    pub fn absorb(&mut self, other: &ClassCounters) {
        self.sent += other.sent;
        self.satisfied += other.satisfied;
        self.timed_out += other.timed_out;
    }
}

/// Per-link limiter state at one node, as seen by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkLimitSnapshot {
    pub node: NodeId,
    pub link: LinkId,
    pub peer: Option<NodeId>,
    pub enabled: bool,
    pub current_limit: f64,
    pub max_limit: f64,
    pub outstanding: f64,
    pub queued: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickReport {
    pub time: u64,
    pub attack_active: bool,
    pub good: ClassCounters,
    pub evil: ClassCounters,
    pub good_satisfaction: f64,
    pub evil_satisfaction: f64,
    pub rejected: u64,
    pub deferred: u64,
    pub signals_sent: u64,
    pub pending_entries: usize,
    #[serde(default)]
    pub gateway_limits: Vec<LinkLimitSnapshot>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimStats {
    pub time: u64,
    pub good: ClassCounters,
    pub evil: ClassCounters,
    pub good_satisfaction: f64,
    pub evil_satisfaction: f64,
    pub attack_good_satisfaction: f64,
    pub rejected: u64,
    pub deferred: u64,
    pub signals_sent: u64,
    pub malformed_signals: u64,
}
