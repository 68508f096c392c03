// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Hypermesh Interest Pushback Suite - Simulation Core

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wasm_bindgen::prelude::*;

use crate::config::{ConfigError, StrategyConfig};
use crate::events::EventQueue;
use crate::name::Name;
use crate::pit::{Insertion, Interest, PendingEntry, PendingTable};
use crate::strategy::{FibEntry, ForwardingHost, ForwardingStrategy};
use crate::types::*;

/// Every node's local application attaches here.
pub const APP_LINK: LinkId = LinkId(0);

const PRODUCER: NodeId = 0;

/// Send-time jitter added to every consumer gap.
const APP_JITTER: f64 = 1e-6;

/// Slack when comparing a check time against an entry deadline.
const DEADLINE_EPSILON: f64 = 1e-9;

// ─── Errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid scenario JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{needed} consumers requested but the topology has {leaves} leaves")]
    NotEnoughLeaves { needed: u32, leaves: u32 },
    #[error("scenario needs at least one gateway")]
    NoGateways,
    #[error("invalid value for {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

// ─── Scenario Configuration ─────────────────────────────────────────────────

/// Interest-flooding scenario on a producer <- gateways <- leaves tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub strategy: StrategyConfig,
    pub gateways: u32,
    pub leaves: u32,
    pub good_count: u32,
    pub evil_count: u32,
    /// Data packets per time unit on a leaf-gateway link.
    pub link_capacity: f64,
    /// Data packets per time unit on a gateway-producer link.
    pub bottleneck_capacity: f64,
    pub link_delay: f64,
    /// Window limits are sized `capacity * default_rtt`; rate limits take the
    /// capacity itself.
    pub default_rtt: f64,
    pub interest_lifetime: f64,
    /// Interests per time unit per good consumer.
    pub good_rate: f64,
    /// Attacker rate as a multiple of its link's data capacity.
    pub evil_rate_factor: f64,
    pub attack_start: f64,
    pub attack_stop: f64,
    pub duration: u64,
    /// Leak step for rate limits.
    pub refill_interval: f64,
    pub seed: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::default(),
            gateways: 2,
            leaves: 8,
            good_count: 4,
            evil_count: 2,
            link_capacity: 100.0,
            bottleneck_capacity: 50.0,
            link_delay: 0.01,
            default_rtt: 0.25,
            interest_lifetime: 1.0,
            good_rate: 10.0,
            evil_rate_factor: 10.0,
            attack_start: 60.0,
            attack_stop: 120.0,
            duration: 180,
            refill_interval: 0.05,
            seed: 0,
        }
    }
}

impl ScenarioConfig {
    pub fn for_algorithm(algorithm: &str) -> Self {
        Self {
            strategy: StrategyConfig::for_strategy(algorithm),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.strategy.validate()?;
        if self.gateways == 0 {
            return Err(ScenarioError::NoGateways);
        }
        let needed = self.good_count + self.evil_count;
        if needed > self.leaves {
            return Err(ScenarioError::NotEnoughLeaves { needed, leaves: self.leaves });
        }
        for (name, value) in [
            ("link_capacity", self.link_capacity),
            ("bottleneck_capacity", self.bottleneck_capacity),
            ("default_rtt", self.default_rtt),
            ("interest_lifetime", self.interest_lifetime),
            ("good_rate", self.good_rate),
            ("evil_rate_factor", self.evil_rate_factor),
            ("refill_interval", self.refill_interval),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ScenarioError::InvalidParameter { name, value });
            }
        }
        if !(self.link_delay.is_finite() && self.link_delay >= 0.0) {
            return Err(ScenarioError::InvalidParameter { name: "link_delay", value: self.link_delay });
        }
        Ok(())
    }

    pub fn attack_active(&self, t: f64) -> bool {
        self.evil_count > 0 && t >= self.attack_start && t < self.attack_stop
    }
}

// ─── Nodes ──────────────────────────────────────────────────────────────────

enum Event {
    AppSend { node: NodeId },
    InterestArrive { node: NodeId, link: LinkId, interest: Interest },
    DataArrive { node: NodeId, link: LinkId, name: Name },
    PitCheck { node: NodeId, id: PendingId },
    StatsTick { node: NodeId },
    Announce { node: NodeId },
    Refill { node: NodeId },
}

struct Port {
    peer: NodeId,
    peer_link: LinkId,
    delay: f64,
}

struct Consumer {
    class: TrafficClass,
    prefix: Name,
    gap: f64,
    seq: u64,
    stop: f64,
}

/// The per-node side of [`ForwardingHost`]: clock, pending table, and an
/// outbox the simulation turns into link transmissions.
#[derive(Default)]
pub struct NodeHost {
    now: f64,
    pit: PendingTable,
    outbox: Vec<(LinkId, Interest)>,
}

impl ForwardingHost for NodeHost {
    fn now(&self) -> f64 {
        self.now
    }

    fn pending_mut(&mut self, id: PendingId) -> Option<&mut PendingEntry> {
        self.pit.get_mut(id)
    }

    fn send_interest(&mut self, out_link: LinkId, interest: Interest) {
        self.outbox.push((out_link, interest));
    }
}

struct SimNode {
    role: NodeRole,
    ports: BTreeMap<LinkId, Port>,
    fib: Vec<FibEntry>,
    strategy: ForwardingStrategy,
    host: NodeHost,
    consumer: Option<Consumer>,
}

impl SimNode {
    fn next_link(&self) -> LinkId {
        LinkId(self.ports.len() as u32 + 1)
    }
}

#[derive(Debug, Clone, Default)]
struct Tally {
    good: ClassCounters,
    evil: ClassCounters,
    rejected: u64,
    deferred: u64,
    signals_sent: u64,
    malformed_signals: u64,
}

impl Tally {
    fn class_mut(&mut self, class: TrafficClass) -> &mut ClassCounters {
        match class {
            TrafficClass::Good => &mut self.good,
            TrafficClass::Evil => &mut self.evil,
        }
    }
}

fn class_of(name: &Name) -> Option<TrafficClass> {
    match name.get(0) {
        Some("good") => Some(TrafficClass::Good),
        Some("evil") => Some(TrafficClass::Evil),
        _ => None,
    }
}

fn route(fib: &[FibEntry], name: &Name) -> Vec<LinkId> {
    fib.iter()
        .filter(|entry| entry.prefix.is_prefix_of(name))
        .max_by_key(|entry| entry.prefix.len())
        .map(|entry| entry.next_hops.clone())
        .unwrap_or_default()
}

// ─── PushbackSimulation ─────────────────────────────────────────────────────

#[wasm_bindgen]
pub struct PushbackSimulation {
    pub(crate) config: ScenarioConfig,
    nodes: Vec<SimNode>,
    events: EventQueue<Event>,
    rng: ChaCha8Rng,
    pub(crate) current_tick: u64,
    tick: Tally,
    total: Tally,
    attack_good: ClassCounters,
}

impl PushbackSimulation {
    pub fn from_config(config: ScenarioConfig) -> Result<Self, ScenarioError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let first_leaf = 1 + config.gateways;
        let mut leaf_order: Vec<u32> = (0..config.leaves).collect();
        for i in (1..leaf_order.len()).rev() {
            let j = rng.gen_range(0..=i);
            leaf_order.swap(i, j);
        }
        let evil: Vec<u32> = leaf_order[..config.evil_count as usize].to_vec();
        let good: Vec<u32> =
            leaf_order[config.evil_count as usize..(config.evil_count + config.good_count) as usize].to_vec();

        let mut nodes = Vec::new();
        for id in 0..first_leaf + config.leaves {
            let role = if id == PRODUCER {
                NodeRole::Producer
            } else if id < first_leaf {
                NodeRole::Router
            } else if evil.contains(&(id - first_leaf)) {
                NodeRole::EvilConsumer
            } else if good.contains(&(id - first_leaf)) {
                NodeRole::GoodConsumer
            } else {
                NodeRole::Router
            };
            let node_seed = config.seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(id as u64);
            let mut strategy = ForwardingStrategy::new(config.strategy.clone(), node_seed)?;
            strategy.add_link(APP_LINK, Some(0.0))?;
            nodes.push(SimNode {
                role,
                ports: BTreeMap::new(),
                fib: Vec::new(),
                strategy,
                host: NodeHost::default(),
                consumer: None,
            });
        }

        let mut sim = Self {
            config,
            nodes,
            events: EventQueue::new(),
            rng,
            current_tick: 0,
            tick: Tally::default(),
            total: Tally::default(),
            attack_good: ClassCounters::default(),
        };

        sim.nodes[PRODUCER as usize].fib.push(FibEntry { prefix: Name::root(), next_hops: vec![APP_LINK] });
        for gw in 1..first_leaf {
            let uplink = sim.connect(gw, PRODUCER, sim.config.bottleneck_capacity)?;
            sim.nodes[gw as usize].fib.push(FibEntry { prefix: Name::root(), next_hops: vec![uplink] });
        }
        for leaf in 0..sim.config.leaves {
            let id = first_leaf + leaf;
            let gw = 1 + leaf % sim.config.gateways;
            let uplink = sim.connect(id, gw, sim.config.link_capacity)?;
            sim.nodes[id as usize].fib.push(FibEntry { prefix: Name::root(), next_hops: vec![uplink] });
        }

        sim.schedule_initial();
        info!(
            strategy = %sim.config.strategy.strategy,
            nodes = sim.nodes.len(),
            good = sim.config.good_count,
            evil = sim.config.evil_count,
            "scenario built"
        );
        Ok(sim)
    }

    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        Self::from_config(ScenarioConfig::from_json(json)?)
    }

    /// Links `a` to `b`; returns the link id on `a`'s side.
    fn connect(&mut self, a: NodeId, b: NodeId, capacity: f64) -> Result<LinkId, ConfigError> {
        let la = self.nodes[a as usize].next_link();
        let lb = self.nodes[b as usize].next_link();
        let max_limit = if self.config.strategy.limit_type == crate::limits::rate::KIND {
            capacity
        } else {
            capacity * self.config.default_rtt
        };
        let delay = self.config.link_delay;
        self.nodes[a as usize].strategy.add_link(la, Some(max_limit))?;
        self.nodes[b as usize].strategy.add_link(lb, Some(max_limit))?;
        self.nodes[a as usize].ports.insert(la, Port { peer: b, peer_link: lb, delay });
        self.nodes[b as usize].ports.insert(lb, Port { peer: a, peer_link: la, delay });
        Ok(la)
    }

    fn schedule_initial(&mut self) {
        let stats_interval = self.config.strategy.stats_interval;
        let rate_limits = self.config.strategy.limit_type == crate::limits::rate::KIND;
        for id in 0..self.nodes.len() as NodeId {
            self.events.schedule(stats_interval, Event::StatsTick { node: id });
            let announce_at = self.nodes[id as usize]
                .strategy
                .pushback()
                .map(|p| p.first_announce_delay(&mut self.rng));
            if let Some(at) = announce_at {
                self.events.schedule(at, Event::Announce { node: id });
            }
            if rate_limits {
                self.events.schedule(self.config.refill_interval, Event::Refill { node: id });
            }

            let role = self.nodes[id as usize].role;
            let (class, gap, start, stop) = match role {
                NodeRole::GoodConsumer => (
                    TrafficClass::Good,
                    1.0 / self.config.good_rate,
                    self.rng.gen::<f64>(),
                    f64::INFINITY,
                ),
                NodeRole::EvilConsumer => (
                    TrafficClass::Evil,
                    1.0 / (self.config.evil_rate_factor * self.config.link_capacity),
                    self.config.attack_start + self.rng.gen::<f64>() * 1e-3,
                    self.config.attack_stop,
                ),
                _ => continue,
            };
            let prefix = Name::from_components([class.prefix_component().to_string(), id.to_string()]);
            self.nodes[id as usize].consumer = Some(Consumer { class, prefix, gap, seq: 0, stop });
            self.events.schedule(start, Event::AppSend { node: id });
        }
    }

    // ─── Tick Loop ──────────────────────────────────────────────────────────

    /// Runs every event up to the end of the next time unit.
    pub fn tick_core(&mut self) -> TickReport {
        self.tick = Tally::default();
        let until = (self.current_tick + 1) as f64;
        while let Some((_, event)) = self.events.pop_until(until) {
            self.handle(event);
        }
        self.events.advance_to(until);
        self.current_tick += 1;

        TickReport {
            time: self.current_tick,
            attack_active: self.config.attack_active(until - 0.5),
            good: self.tick.good,
            evil: self.tick.evil,
            good_satisfaction: self.tick.good.satisfaction(),
            evil_satisfaction: self.tick.evil.satisfaction(),
            rejected: self.tick.rejected,
            deferred: self.tick.deferred,
            signals_sent: self.tick.signals_sent,
            pending_entries: self.nodes.iter().map(|n| n.host.pit.len()).sum(),
            gateway_limits: (1..=self.config.gateways).flat_map(|gw| self.link_limits(gw)).collect(),
        }
    }

    pub fn run_to_end(&mut self) -> SimStats {
        while self.current_tick < self.config.duration {
            self.tick_core();
        }
        self.stats_core()
    }

    pub fn stats_core(&self) -> SimStats {
        SimStats {
            time: self.current_tick,
            good: self.total.good,
            evil: self.total.evil,
            good_satisfaction: self.total.good.satisfaction(),
            evil_satisfaction: self.total.evil.satisfaction(),
            attack_good_satisfaction: self.attack_good.satisfaction(),
            rejected: self.total.rejected,
            deferred: self.total.deferred,
            signals_sent: self.total.signals_sent,
            malformed_signals: self.total.malformed_signals,
        }
    }

    /// Limiter state of every neighbor link at `node`.
    pub fn link_limits(&self, node: NodeId) -> Vec<LinkLimitSnapshot> {
        let Some(sim_node) = self.nodes.get(node as usize) else {
            return Vec::new();
        };
        sim_node
            .strategy
            .link_states()
            .into_iter()
            .filter(|s| s.link != APP_LINK)
            .map(|s| LinkLimitSnapshot {
                node,
                link: s.link,
                peer: sim_node.ports.get(&s.link).map(|p| p.peer),
                enabled: s.enabled,
                current_limit: s.current_limit,
                max_limit: s.max_limit,
                outstanding: s.outstanding,
                queued: s.queued,
            })
            .collect()
    }

    pub fn role(&self, node: NodeId) -> Option<NodeRole> {
        self.nodes.get(node as usize).map(|n| n.role)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The gateway `node` hangs off, or `None` for the producer and gateways.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        let first_leaf = 1 + self.config.gateways;
        if node == PRODUCER || node as usize >= self.nodes.len() {
            None
        } else if node < first_leaf {
            Some(PRODUCER)
        } else {
            Some(1 + (node - first_leaf) % self.config.gateways)
        }
    }

    pub fn strategy(&self, node: NodeId) -> Option<&ForwardingStrategy> {
        self.nodes.get(node as usize).map(|n| &n.strategy)
    }

    /// Tears a node down. Its periodic work stops at the next firing and its
    /// neighbors withdraw the links that led to it.
    pub fn shutdown_node(&mut self, node: NodeId) {
        let Some(n) = self.nodes.get_mut(node as usize) else {
            return;
        };
        n.strategy.shutdown();
        n.host.pit.clear();
        n.consumer = None;
        let peers: Vec<(NodeId, LinkId)> = n.ports.values().map(|p| (p.peer, p.peer_link)).collect();
        n.ports.clear();
        n.fib.clear();
        for (peer, peer_link) in peers {
            self.detach_link(peer, peer_link);
        }
        debug!(node, "node shut down");
    }

    fn detach_link(&mut self, node: NodeId, link: LinkId) {
        let now = self.events.now();
        let n = &mut self.nodes[node as usize];
        n.host.now = now;
        n.strategy.remove_link(&mut n.host, link);
        n.host.pit.forget_link(link);
        n.ports.remove(&link);
        for entry in &mut n.fib {
            entry.next_hops.retain(|l| *l != link);
        }
        self.flush_outbox(node);
    }

    // ─── Event Handlers ─────────────────────────────────────────────────────

    fn handle(&mut self, event: Event) {
        match event {
            Event::AppSend { node } => self.on_app_send(node),
            Event::InterestArrive { node, link, interest } => self.on_interest(node, link, interest),
            Event::DataArrive { node, link, name } => self.on_data(node, link, name),
            Event::PitCheck { node, id } => self.on_pit_check(node, id),
            Event::StatsTick { node } => {
                if self.nodes[node as usize].strategy.tick_stats() {
                    self.events.schedule_in(self.config.strategy.stats_interval, Event::StatsTick { node });
                }
            }
            Event::Announce { node } => {
                let now = self.events.now();
                let n = &mut self.nodes[node as usize];
                n.host.now = now;
                let fib = n.fib.clone();
                n.strategy.announce_limits(&mut n.host, &fib);
                if n.strategy.is_alive() {
                    self.events.schedule_in(self.config.strategy.pushback.announce_interval, Event::Announce { node });
                }
                self.flush_outbox(node);
            }
            Event::Refill { node } => {
                let now = self.events.now();
                let n = &mut self.nodes[node as usize];
                n.host.now = now;
                n.strategy.refill(&mut n.host);
                if n.strategy.is_alive() {
                    self.events.schedule_in(self.config.refill_interval, Event::Refill { node });
                }
                self.flush_outbox(node);
            }
        }
    }

    fn on_app_send(&mut self, node: NodeId) {
        let now = self.events.now();
        let Some(consumer) = self.nodes[node as usize].consumer.as_mut() else {
            return;
        };
        if now >= consumer.stop {
            return;
        }
        consumer.seq += 1;
        let name = consumer.prefix.clone().append(consumer.seq.to_string());
        let class = consumer.class;
        let gap = consumer.gap;

        let interest = Interest::new(name, self.config.interest_lifetime, self.rng.gen());
        self.count(class, |c| c.sent += 1);
        self.on_interest(node, APP_LINK, interest);

        let jitter = self.rng.gen::<f64>() * APP_JITTER;
        self.events.schedule_in(gap + jitter, Event::AppSend { node });
    }

    fn on_interest(&mut self, node: NodeId, link: LinkId, interest: Interest) {
        let now = self.events.now();
        let n = &mut self.nodes[node as usize];
        if !n.strategy.is_alive() {
            return;
        }
        n.host.now = now;

        if interest.is_link_local() {
            if n.strategy.on_signal(&mut n.host, link, &interest).is_err() {
                self.total.malformed_signals += 1;
            }
            self.flush_outbox(node);
            return;
        }

        let id = match n.host.pit.insert(&interest, link, now) {
            Insertion::Created(id) => id,
            Insertion::Aggregated(_) => return,
        };
        let next_hops = route(&n.fib, &interest.name);
        let mut accepted = false;
        let mut rejected = 0;
        let mut deferred = 0;
        for out_link in next_hops.iter().copied().filter(|l| *l != link) {
            match n.strategy.try_forward(&mut n.host, link, out_link, id, &next_hops) {
                ForwardOutcome::Rejected => rejected += 1,
                ForwardOutcome::AcceptedDeferred => {
                    deferred += 1;
                    accepted = true;
                }
                ForwardOutcome::Accepted => accepted = true,
            }
            if accepted {
                break;
            }
        }

        if accepted {
            if let Some(entry) = n.host.pit.get(id) {
                self.events.schedule(entry.expire_at, Event::PitCheck { node, id });
            }
        } else {
            n.host.pit.erase(id);
        }
        self.tick.rejected += rejected;
        self.total.rejected += rejected;
        self.tick.deferred += deferred;
        self.total.deferred += deferred;

        if !accepted && link == APP_LINK {
            if let Some(class) = class_of(&interest.name) {
                self.count(class, |c| c.timed_out += 1);
            }
        }
        self.flush_outbox(node);
    }

    fn on_data(&mut self, node: NodeId, _link: LinkId, name: Name) {
        let now = self.events.now();
        let n = &mut self.nodes[node as usize];
        n.host.now = now;
        let Some(id) = n.host.pit.find(&name) else {
            return;
        };
        n.strategy.on_satisfied(&mut n.host, id);
        let Some(entry) = n.host.pit.erase(id) else {
            return;
        };

        let mut delivered_locally = false;
        for in_link in &entry.incoming {
            if *in_link == APP_LINK {
                delivered_locally = n.consumer.is_some();
            } else if let Some(port) = n.ports.get(in_link) {
                self.events.schedule_in(
                    port.delay,
                    Event::DataArrive { node: port.peer, link: port.peer_link, name: name.clone() },
                );
            }
        }
        if delivered_locally {
            if let Some(class) = class_of(&name) {
                self.count(class, |c| c.satisfied += 1);
            }
        }
        self.flush_outbox(node);
    }

    fn on_pit_check(&mut self, node: NodeId, id: PendingId) {
        let now = self.events.now();
        let n = &mut self.nodes[node as usize];
        n.host.now = now;
        let Some(entry) = n.host.pit.get(id) else {
            return;
        };
        if now + DEADLINE_EPSILON < entry.expire_at {
            self.events.schedule(entry.expire_at, Event::PitCheck { node, id });
            return;
        }
        let from_app = entry.incoming.contains(&APP_LINK) && n.consumer.is_some();
        let class = class_of(entry.name());

        n.strategy.on_timeout(&mut n.host, id);
        n.host.pit.erase(id);
        if from_app {
            if let Some(class) = class {
                self.count(class, |c| c.timed_out += 1);
            }
        }
        self.flush_outbox(node);
    }

    /// Turns queued transmissions into link arrivals.
    fn flush_outbox(&mut self, node: NodeId) {
        let now = self.events.now();
        let n = &mut self.nodes[node as usize];
        let outbox = std::mem::take(&mut n.host.outbox);
        for (link, interest) in outbox {
            if link == APP_LINK {
                let answers = n.role == NodeRole::Producer
                    && !interest.is_link_local()
                    && class_of(&interest.name) == Some(TrafficClass::Good);
                if answers {
                    self.events.schedule(now, Event::DataArrive { node, link: APP_LINK, name: interest.name });
                }
                continue;
            }
            let Some(port) = n.ports.get(&link) else {
                continue;
            };
            if interest.is_link_local() {
                self.tick.signals_sent += 1;
                self.total.signals_sent += 1;
            }
            self.events.schedule_in(
                port.delay,
                Event::InterestArrive { node: port.peer, link: port.peer_link, interest },
            );
        }
    }

    fn count(&mut self, class: TrafficClass, apply: fn(&mut ClassCounters)) {
        apply(self.tick.class_mut(class));
        apply(self.total.class_mut(class));
        if class == TrafficClass::Good && self.config.attack_active(self.events.now()) {
            apply(&mut self.attack_good);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet(algorithm: &str) -> ScenarioConfig {
        ScenarioConfig {
            evil_count: 0,
            duration: 10,
            ..ScenarioConfig::for_algorithm(algorithm)
        }
    }

    #[test]
    fn test_topology_shape() {
        let sim = PushbackSimulation::from_config(quiet("fairness")).expect("test: build");
        assert_eq!(sim.node_count(), 1 + 2 + 8);
        assert_eq!(sim.role(0), Some(NodeRole::Producer));
        assert_eq!(sim.parent(1), Some(0));
        assert_eq!(sim.parent(3), Some(1));
        assert_eq!(sim.parent(4), Some(2));
        let producer_links = sim.link_limits(0);
        assert_eq!(producer_links.len(), 2);
        assert!((producer_links[0].max_limit - 50.0 * 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_consumer_counts() {
        let config = ScenarioConfig { good_count: 3, evil_count: 2, ..quiet("fairness") };
        let sim = PushbackSimulation::from_config(config).expect("test: build");
        let roles: Vec<NodeRole> = (0..sim.node_count() as u32).filter_map(|n| sim.role(n)).collect();
        assert_eq!(roles.iter().filter(|r| **r == NodeRole::GoodConsumer).count(), 3);
        assert_eq!(roles.iter().filter(|r| **r == NodeRole::EvilConsumer).count(), 2);
    }

    #[test]
    fn test_rejects_oversubscribed_leaves() {
        let config = ScenarioConfig { good_count: 7, evil_count: 2, ..quiet("fairness") };
        assert!(matches!(
            PushbackSimulation::from_config(config),
            Err(ScenarioError::NotEnoughLeaves { needed: 9, leaves: 8 })
        ));
    }

    #[test]
    fn test_good_traffic_flows_without_attack() {
        let mut sim = PushbackSimulation::from_config(quiet("simple-limits")).expect("test: build");
        let stats = sim.run_to_end();
        assert!(stats.good.sent > 0);
        assert!(stats.good_satisfaction > 0.99, "satisfaction {}", stats.good_satisfaction);
    }
}
