// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Forwarding strategy: one dispatcher running the configured stages in a
//! fixed order.
//!
//! 1. statistics recording ([`StatsIndex`])
//! 2. satisfaction-based admission ([`AdmissionPolicy`])
//! 3. per-link limits with fair queueing ([`Limits`], [`FairPendingQueue`])
//!
//! Pushback ([`PushbackProtocol`]) runs beside the pipeline on its own
//! schedule and feeds received limits back into stage 3.
//!
//! The host owns the pending-request table, the clock and the wire. It calls
//! the hooks below from its event loop and supplies a [`ForwardingHost`] so
//! the strategy can touch pending entries and transmit. Limiters report freed
//! credit by queueing a wakeup; wakeups are drained at the end of the hook
//! that caused them, never from inside a limiter.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::admission::{AdmissionPolicy, Allowance, Verdict};
use crate::config::{resolve_stages, ConfigError, Stages, StrategyConfig};
use crate::limits::{self, Limits, LimitsFactory};
use crate::name::Name;
use crate::pit::{Interest, PendingEntry};
use crate::pushback::{decode_signal, LimitAnnouncement, PushbackProtocol, SignalError};
use crate::queue::FairPendingQueue;
use crate::stats::{StatsIndex, StatsNode};
use crate::types::{ForwardOutcome, LinkId, PendingId};

// ---------------------------------------------------------------------------
// Host interface
// ---------------------------------------------------------------------------

/// What the strategy needs from the node it runs on.
pub trait ForwardingHost {
    fn now(&self) -> f64;

    fn pending_mut(&mut self, id: PendingId) -> Option<&mut PendingEntry>;

    fn send_interest(&mut self, out_link: LinkId, interest: Interest);
}

/// Routing entry: a destination prefix and its candidate next hops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FibEntry {
    pub prefix: Name,
    pub next_hops: Vec<LinkId>,
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyCounters {
    pub forwarded: u64,
    pub deferred: u64,
    pub drained: u64,
    pub rejected_admission: u64,
    pub rejected_limit: u64,
    pub rejected_duplicate: u64,
    pub queue_overflow: u64,
    pub timed_out_queued: u64,
    pub unsatisfied: u64,
    pub signals_applied: u64,
    pub signals_discarded: u64,
    pub announcements: u64,
}

/// Limiter state of one attached link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkState {
    pub link: LinkId,
    pub enabled: bool,
    pub current_limit: f64,
    pub max_limit: f64,
    pub outstanding: f64,
    pub queued: usize,
}

// ---------------------------------------------------------------------------
// ForwardingStrategy
// ---------------------------------------------------------------------------

struct LinkBinding {
    limits: Option<Box<dyn Limits>>,
    queue: FairPendingQueue,
}

impl LinkBinding {
    fn is_below_limit(&self) -> bool {
        self.limits.as_ref().map_or(true, |l| l.is_below_limit())
    }

    fn borrow(&mut self) {
        if let Some(limits) = self.limits.as_mut() {
            limits.borrow();
        }
    }

    fn return_credit(&mut self) {
        if let Some(limits) = self.limits.as_mut() {
            limits.return_credit();
        }
    }
}

pub struct ForwardingStrategy {
    config: StrategyConfig,
    stages: Stages,
    limits_factory: LimitsFactory,
    links: BTreeMap<LinkId, LinkBinding>,
    stats: StatsIndex,
    admission: Option<AdmissionPolicy>,
    pushback: Option<PushbackProtocol>,
    wakeups: Rc<RefCell<VecDeque<LinkId>>>,
    rng: ChaCha8Rng,
    alive: bool,
    counters: StrategyCounters,
}

impl ForwardingStrategy {
    /// Resolves the strategy and limiter names once; fails on anything unknown.
    pub fn new(config: StrategyConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let stages = resolve_stages(&config.strategy)?;
        let limits_factory = limits::resolve(&config.limit_type)?;
        let admission = stages.admission.then(|| AdmissionPolicy::new(&config.admission));
        let pushback = stages.pushback.then(|| PushbackProtocol::new(&config.pushback));
        Ok(Self {
            config,
            stages,
            limits_factory,
            links: BTreeMap::new(),
            stats: StatsIndex::new(),
            admission,
            pushback,
            wakeups: Rc::new(RefCell::new(VecDeque::new())),
            rng: ChaCha8Rng::seed_from_u64(seed),
            alive: true,
            counters: StrategyCounters::default(),
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn stages(&self) -> Stages {
        self.stages
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn counters(&self) -> &StrategyCounters {
        &self.counters
    }

    pub fn stats(&self) -> &StatsIndex {
        &self.stats
    }

    pub fn pushback(&self) -> Option<&PushbackProtocol> {
        self.pushback.as_ref()
    }

    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    // ── Link lifecycle ──────────────────────────────────────────────────

    /// Attaches a link. `max_limit` of `None` leaves it without a limiter,
    /// which is a setup error when queueing or pushback is enabled.
    pub fn add_link(&mut self, link: LinkId, max_limit: Option<f64>) -> Result<(), ConfigError> {
        if self.links.contains_key(&link) {
            return Err(ConfigError::DuplicateLink(link));
        }
        if max_limit.is_none() && self.stages.requires_limits() {
            return Err(ConfigError::MissingLimits(link));
        }
        let limits = max_limit.map(|max| {
            let mut limits = (self.limits_factory)(max);
            let wakeups = Rc::clone(&self.wakeups);
            limits.register_available_slot_callback(Box::new(move || {
                wakeups.borrow_mut().push_back(link);
            }));
            limits
        });
        self.links.insert(
            link,
            LinkBinding {
                limits,
                queue: FairPendingQueue::new(self.config.queue.max_per_source),
            },
        );
        debug!(link = %link, ?max_limit, "link added");
        Ok(())
    }

    /// Withdraws a link: its stats, its queue, and anything it had queued elsewhere.
    pub fn remove_link<H: ForwardingHost>(&mut self, host: &mut H, link: LinkId) {
        self.stats.remove_link(link);
        let mut orphaned = Vec::new();
        if let Some(mut binding) = self.links.remove(&link) {
            orphaned.extend(binding.queue.drain_all());
        }
        for binding in self.links.values_mut() {
            orphaned.extend(binding.queue.remove_source(link));
        }
        for id in orphaned {
            if let Some(entry) = host.pending_mut(id) {
                entry.queued_on = None;
                entry.stranded = true;
            }
        }
        self.wakeups.borrow_mut().retain(|l| *l != link);
        debug!(link = %link, "link removed");
    }

    pub fn links(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.links.keys().copied()
    }

    pub fn limits(&self, link: LinkId) -> Option<&(dyn Limits + 'static)> {
        self.links.get(&link).and_then(|b| b.limits.as_deref())
    }

    pub fn limits_mut(&mut self, link: LinkId) -> Option<&mut (dyn Limits + 'static)> {
        self.links.get_mut(&link).and_then(|b| b.limits.as_deref_mut())
    }

    pub fn queue_len(&self, link: LinkId) -> usize {
        self.links.get(&link).map_or(0, |b| b.queue.len())
    }

    pub fn link_states(&self) -> Vec<LinkState> {
        self.links
            .iter()
            .map(|(link, binding)| LinkState {
                link: *link,
                enabled: binding.limits.as_ref().map_or(false, |l| l.is_enabled()),
                current_limit: binding.limits.as_ref().map_or(0.0, |l| l.current_limit()),
                max_limit: binding.limits.as_ref().map_or(0.0, |l| l.max_limit()),
                outstanding: binding.limits.as_ref().map_or(0.0, |l| l.outstanding()),
                queued: binding.queue.len(),
            })
            .collect()
    }

    /// Combined allowance of `candidates` under their current limits.
    pub fn allowance(&self, candidates: &[LinkId]) -> Allowance {
        Allowance::total(
            candidates
                .iter()
                .map(|link| self.links.get(link).and_then(|b| b.limits.as_deref())),
        )
    }

    // ── Request hooks ───────────────────────────────────────────────────

    /// Attempts to forward pending entry `id`, which arrived on `in_link`,
    /// out of `out_link`. `candidates` are the destination's next hops.
    pub fn try_forward<H: ForwardingHost>(
        &mut self,
        host: &mut H,
        in_link: LinkId,
        out_link: LinkId,
        id: PendingId,
        candidates: &[LinkId],
    ) -> ForwardOutcome {
        let now = host.now();
        let allowance = self.allowance(candidates);
        let Some(entry) = host.pending_mut(id) else {
            warn!(pending = %id, "forward attempt for unknown pending entry");
            return ForwardOutcome::Rejected;
        };

        if entry.queued_on.is_some() {
            entry.update_lifetime(now, self.config.queue.requeue_extension);
            return ForwardOutcome::Accepted;
        }
        if entry.outgoing.contains(&out_link) {
            self.counters.rejected_duplicate += 1;
            return ForwardOutcome::Rejected;
        }

        if let Some(policy) = &self.admission {
            let verdict = policy.evaluate(self.stats.root(), in_link, allowance, &mut self.rng);
            if let Verdict::Reject { .. } = verdict {
                self.counters.rejected_admission += 1;
                return ForwardOutcome::Rejected;
            }
        }

        let Some(binding) = self.links.get_mut(&out_link) else {
            warn!(link = %out_link, "forward attempt on unattached link");
            return ForwardOutcome::Rejected;
        };

        if binding.is_below_limit() {
            binding.borrow();
            entry.outgoing.insert(out_link);
            entry.stranded = false;
            let interest = entry.interest.clone();
            if self.stages.stats {
                self.stats.record_forwarded(&interest.name, in_link);
            }
            host.send_interest(out_link, interest);
            self.counters.forwarded += 1;
            return ForwardOutcome::Accepted;
        }

        if !self.stages.fair_queue {
            self.counters.rejected_limit += 1;
            return ForwardOutcome::Rejected;
        }

        if !binding.queue.enqueue(in_link, id, self.config.queue.default_weight) {
            self.counters.queue_overflow += 1;
            trace!(link = %out_link, source = %in_link, "fair queue full");
            return ForwardOutcome::Rejected;
        }
        let lifetime = entry.interest.lifetime;
        entry.offset_lifetime(-lifetime);
        entry.update_lifetime(now, self.config.queue.deferred_lifetime);
        entry.queued_on = Some(out_link);
        self.counters.deferred += 1;
        ForwardOutcome::AcceptedDeferred
    }

    /// Pending entry `id` expired. Call before erasing it.
    pub fn on_timeout<H: ForwardingHost>(&mut self, host: &mut H, id: PendingId) {
        let was_queued = self.remove_from_queues(id);
        let Some(entry) = host.pending_mut(id) else {
            return;
        };
        entry.queued_on = None;
        let outgoing: Vec<LinkId> = entry.outgoing.iter().copied().collect();

        if was_queued || entry.stranded {
            self.counters.timed_out_queued += 1;
        } else if self.stages.stats {
            self.stats.record_unsatisfied(&entry.interest.name, entry.incoming.iter().copied());
            self.counters.unsatisfied += 1;
        }

        self.return_credits(&outgoing);
        self.process_wakeups(host);
    }

    /// Pending entry `id` was answered. Call before erasing it.
    pub fn on_satisfied<H: ForwardingHost>(&mut self, host: &mut H, id: PendingId) {
        self.remove_from_queues(id);
        let Some(entry) = host.pending_mut(id) else {
            return;
        };
        entry.queued_on = None;
        let outgoing: Vec<LinkId> = entry.outgoing.iter().copied().collect();
        self.return_credits(&outgoing);
        self.process_wakeups(host);
    }

    /// Applies a link-local limit signal received on `in_link`. Malformed
    /// signals are logged and dropped; the current limit stays as it was.
    pub fn on_signal<H: ForwardingHost>(
        &mut self,
        host: &mut H,
        in_link: LinkId,
        interest: &Interest,
    ) -> Result<f64, SignalError> {
        let result = self.apply_signal(in_link, interest);
        match &result {
            Ok(limit) => {
                self.counters.signals_applied += 1;
                trace!(link = %in_link, limit, "applied announced limit");
            }
            Err(e) => {
                self.counters.signals_discarded += 1;
                warn!(link = %in_link, name = %interest.name, error = %e, "discarding limit signal");
            }
        }
        self.process_wakeups(host);
        result
    }

    fn apply_signal(&mut self, in_link: LinkId, interest: &Interest) -> Result<f64, SignalError> {
        if self.pushback.is_none() {
            return Err(SignalError::PushbackDisabled);
        }
        let (_prefix, limit) = decode_signal(&interest.name)?;
        let limits = self
            .limits_mut(in_link)
            .ok_or(SignalError::UnknownLink(in_link))?;
        limits.update_limit(limit);
        Ok(limit)
    }

    // ── Periodic work ───────────────────────────────────────────────────

    /// One stats interval. Returns false once the strategy is shut down, in
    /// which case the host must not reschedule.
    pub fn tick_stats(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        if self.stages.stats {
            self.stats.tick();
        }
        true
    }

    /// Computes and transmits per-link shares for every bounded destination.
    /// Returns what was announced; empty when pushback is off or the
    /// strategy is shut down.
    pub fn announce_limits<H: ForwardingHost>(&mut self, host: &mut H, fib: &[FibEntry]) -> Vec<LimitAnnouncement> {
        if !self.alive {
            return Vec::new();
        }
        let Some(pushback) = &self.pushback else {
            return Vec::new();
        };
        let links: Vec<LinkId> = self.links.keys().copied().collect();
        let root = self.stats.root();
        let normalization = pushback.normalization(root, &links);

        let mut announced = Vec::new();
        for entry in fib {
            let allowance = self.allowance(&entry.next_hops);
            announced.extend(pushback.compute_limits(root, &links, &entry.prefix, allowance, normalization));
        }
        for share in &announced {
            debug!(
                link = %share.link,
                prefix = %share.prefix,
                raw_weight = share.raw_weight,
                weight = share.weight,
                limit = share.limit,
                "announce limit"
            );
            let nonce = self.rng.gen();
            host.send_interest(share.link, Interest::link_local(share.signal_name(), nonce));
        }
        self.counters.announcements += announced.len() as u64;
        announced
    }

    /// Lets rate limiters leak up to the host's clock and drains any queue
    /// that gained credit.
    pub fn refill<H: ForwardingHost>(&mut self, host: &mut H) {
        if !self.alive {
            return;
        }
        let now = host.now();
        for binding in self.links.values_mut() {
            if let Some(limits) = binding.limits.as_mut() {
                limits.advance(now);
            }
        }
        self.process_wakeups(host);
    }

    /// Stops periodic work and drops all per-link state.
    pub fn shutdown(&mut self) {
        self.alive = false;
        self.links.clear();
        self.stats.clear();
        self.wakeups.borrow_mut().clear();
        debug!("strategy shut down");
    }

    /// Longest-matching snapshot for `prefix`.
    pub fn get_aggregate_stats(&self, prefix: &Name) -> StatsNode {
        self.stats.query(prefix).clone()
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn remove_from_queues(&mut self, id: PendingId) -> bool {
        self.links.values_mut().any(|b| b.queue.remove(id))
    }

    fn return_credits(&mut self, outgoing: &[LinkId]) {
        for link in outgoing {
            if let Some(binding) = self.links.get_mut(link) {
                binding.return_credit();
            }
        }
    }

    fn process_wakeups<H: ForwardingHost>(&mut self, host: &mut H) {
        loop {
            let next = self.wakeups.borrow_mut().pop_front();
            let Some(link) = next else {
                break;
            };
            self.drain_queue(host, link);
        }
    }

    fn drain_queue<H: ForwardingHost>(&mut self, host: &mut H, out_link: LinkId) {
        let deferred_lifetime = self.config.queue.deferred_lifetime;
        loop {
            let Some(binding) = self.links.get_mut(&out_link) else {
                return;
            };
            if binding.queue.is_empty() || !binding.is_below_limit() {
                return;
            }
            // None means the fairness policy deferred this pop.
            let Some(request) = binding.queue.pop() else {
                return;
            };
            let Some(entry) = host.pending_mut(request.id) else {
                continue;
            };
            entry.queued_on = None;
            entry.offset_lifetime(-deferred_lifetime + entry.interest.lifetime);
            if entry.outgoing.contains(&out_link) {
                continue;
            }
            binding.borrow();
            entry.outgoing.insert(out_link);
            entry.stranded = false;
            let interest = entry.interest.clone();
            if self.stages.stats {
                self.stats.record_forwarded(&interest.name, request.source);
            }
            host.send_interest(out_link, interest);
            self.counters.drained += 1;
            trace!(link = %out_link, source = %request.source, "drained deferred request");
        }
    }
}
