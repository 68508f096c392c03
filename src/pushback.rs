// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Hop-by-hop limit announcements.
//!
//! Every announce interval a node splits each bounded destination's outgoing
//! allowance among its links in proportion to how well each link's traffic
//! has been satisfied, and tells every neighbor its share with a link-local
//! signal named `<prefix>/limit/<value>`. A node receiving such a signal
//! applies the value to the limiter of the link it arrived on.
//!
//! Link weight is `1 - min(1 - grace, unsatisfied / served)`, so even the
//! worst link keeps a `grace` share. Links with negligible traffic get the
//! full allowance.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::admission::Allowance;
use crate::config::PushbackConfig;
use crate::name::Name;
use crate::stats::StatsNode;
use crate::types::LinkId;

/// Name component preceding the limit value in a signal.
pub const LIMIT_MARKER: &str = "limit";

/// Served counts at or below this carry no information.
pub const WEIGHT_EPSILON: f64 = 0.001;

/// Stretch applied when no link has a meaningful weight.
pub const MAX_NORMALIZATION: f64 = 1000.0;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A signal that cannot be applied. Logged and dropped by the receiver.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SignalError {
    #[error("{0} is not a limit signal")]
    NotASignal(Name),
    #[error("limit signal {0} carries no value")]
    MissingLimit(Name),
    #[error("unparsable limit value {0:?}")]
    InvalidLimit(String),
    #[error("limit signal arrived on {0}, which has no limits")]
    UnknownLink(LinkId),
    #[error("pushback is not enabled on this node")]
    PushbackDisabled,
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Satisfaction weight for one link, `None` when it has negligible traffic.
pub fn link_weight(served: f64, unsatisfied: f64, grace_threshold: f64) -> Option<f64> {
    if served <= WEIGHT_EPSILON {
        return None;
    }
    let ratio = unsatisfied.max(0.0) / served;
    Some(1.0 - ratio.min(1.0 - grace_threshold))
}

/// Factor stretching a weight sum up to 1. Sums of 1 or more are left alone.
pub fn normalization_factor(sum: f64) -> f64 {
    if sum >= 1.0 {
        1.0
    } else if sum > WEIGHT_EPSILON {
        1.0 / sum
    } else {
        MAX_NORMALIZATION
    }
}

// ---------------------------------------------------------------------------
// Signal codec
// ---------------------------------------------------------------------------

pub fn encode_signal(prefix: &Name, limit: f64) -> Name {
    prefix.clone().append(LIMIT_MARKER).append(limit.to_string())
}

/// Splits `<prefix>/limit/<value>` into prefix and value.
pub fn decode_signal(name: &Name) -> Result<(Name, f64), SignalError> {
    let len = name.len();
    match (len.checked_sub(2).and_then(|i| name.get(i)), name.get(len.wrapping_sub(1))) {
        (Some(LIMIT_MARKER), Some(value)) => {
            let limit: f64 = value
                .parse()
                .map_err(|_| SignalError::InvalidLimit(value.to_string()))?;
            if !limit.is_finite() || limit < 0.0 {
                return Err(SignalError::InvalidLimit(value.to_string()));
            }
            Ok((name.prefix(len - 2), limit))
        }
        (_, Some(LIMIT_MARKER)) => Err(SignalError::MissingLimit(name.clone())),
        _ => Err(SignalError::NotASignal(name.clone())),
    }
}

// ---------------------------------------------------------------------------
// Announcements
// ---------------------------------------------------------------------------

/// One computed share, kept for tracing alongside the signal it produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitAnnouncement {
    pub prefix: Name,
    pub link: LinkId,
    /// Unnormalized satisfaction weight, 1 when the link had no traffic.
    pub raw_weight: f64,
    pub weight: f64,
    pub limit: f64,
}

impl LimitAnnouncement {
    pub fn signal_name(&self) -> Name {
        encode_signal(&self.prefix, self.limit)
    }
}

#[derive(Debug, Clone)]
pub struct PushbackProtocol {
    grace_threshold: f64,
    announce_interval: f64,
}

impl PushbackProtocol {
    pub fn new(config: &PushbackConfig) -> Self {
        Self {
            grace_threshold: config.grace_threshold,
            announce_interval: config.announce_interval,
        }
    }

    pub fn announce_interval(&self) -> f64 {
        self.announce_interval
    }

    /// Random phase for the first announcement, in `[0, interval)`.
    pub fn first_announce_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen::<f64>() * self.announce_interval
    }

    /// Normalization shared by every destination in one announce round.
    pub fn normalization(&self, root: &StatsNode, links: &[LinkId]) -> f64 {
        let sum: f64 = links
            .iter()
            .filter_map(|link| link_weight(root.served(*link), root.unsatisfied(*link), self.grace_threshold))
            .sum();
        normalization_factor(sum)
    }

    /// Per-link shares of `allowance` for one destination prefix. Empty when
    /// the allowance is unlimited.
    pub fn compute_limits(
        &self,
        root: &StatsNode,
        links: &[LinkId],
        prefix: &Name,
        allowance: Allowance,
        normalization: f64,
    ) -> Vec<LimitAnnouncement> {
        let Some(total) = allowance.bounded() else {
            return Vec::new();
        };
        links
            .iter()
            .map(|link| {
                let (raw_weight, weight) =
                    match link_weight(root.served(*link), root.unsatisfied(*link), self.grace_threshold) {
                        Some(w) => (w, w * normalization),
                        None => (1.0, 1.0),
                    };
                LimitAnnouncement {
                    prefix: prefix.clone(),
                    link: *link,
                    raw_weight,
                    weight,
                    limit: (weight * total).max(0.0),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::FaceLoadStats;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn name(s: &str) -> Name {
        s.parse().expect("test: name")
    }

    #[test]
    fn test_weight_keeps_grace_floor() {
        let w = link_weight(10.0, 50.0, 0.05).expect("test: weight");
        assert!((w - 0.05).abs() < 1e-12);
        assert_eq!(link_weight(0.0005, 0.0, 0.05), None);
        assert!((link_weight(10.0, -3.0, 0.05).expect("test") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalization_factor() {
        assert!((normalization_factor(2.5) - 1.0).abs() < f64::EPSILON);
        assert!((normalization_factor(0.25) - 4.0).abs() < f64::EPSILON);
        assert!((normalization_factor(0.0) - MAX_NORMALIZATION).abs() < f64::EPSILON);
        assert!((normalization_factor(-1.0) - MAX_NORMALIZATION).abs() < f64::EPSILON);
    }

    #[test]
    fn test_first_announce_phase_is_spread() {
        let protocol = PushbackProtocol::new(&PushbackConfig::default());
        let interval = protocol.announce_interval();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let delays: Vec<f64> = (0..64).map(|_| protocol.first_announce_delay(&mut rng)).collect();

        assert!(delays.iter().all(|d| (0.0..interval).contains(d)), "phase outside one interval");
        assert!(delays.iter().any(|d| (d - delays[0]).abs() > f64::EPSILON), "nodes announce in lockstep");

        let first = |seed: u64| protocol.first_announce_delay(&mut ChaCha8Rng::seed_from_u64(seed));
        assert!((first(1) - first(1)).abs() < f64::EPSILON);
        assert!((first(1) - first(2)).abs() > f64::EPSILON);
    }

    #[test]
    fn test_signal_codec() {
        let signal = encode_signal(&name("/good"), 3.5);
        assert_eq!(signal.to_string(), "/good/limit/3.5");
        assert_eq!(decode_signal(&signal), Ok((name("/good"), 3.5)));
        assert_eq!(decode_signal(&name("/limit/0")), Ok((Name::root(), 0.0)));
    }

    #[test]
    fn test_malformed_signals() {
        assert!(matches!(decode_signal(&name("/good/limit/abc")), Err(SignalError::InvalidLimit(_))));
        assert!(matches!(decode_signal(&name("/good/limit/-2")), Err(SignalError::InvalidLimit(_))));
        assert!(matches!(decode_signal(&name("/good/limit")), Err(SignalError::MissingLimit(_))));
        assert!(matches!(decode_signal(&name("/good/7")), Err(SignalError::NotASignal(_))));
        assert!(matches!(decode_signal(&Name::root()), Err(SignalError::NotASignal(_))));
    }

    #[test]
    fn test_shares_favor_satisfied_links() {
        let protocol = PushbackProtocol::new(&PushbackConfig::default());
        let mut root = StatsNode::new();
        root.insert(LinkId(1), FaceLoadStats::with_values(100.0, 0.0));
        root.insert(LinkId(2), FaceLoadStats::with_values(100.0, 90.0));
        let links = [LinkId(1), LinkId(2), LinkId(3)];
        let norm = protocol.normalization(&root, &links);
        assert!((norm - 1.0).abs() < f64::EPSILON);

        let shares = protocol.compute_limits(&root, &links, &name("/good"), Allowance::Bounded(20.0), norm);
        assert_eq!(shares.len(), 3);
        assert!((shares[0].limit - 20.0).abs() < 1e-9);
        assert!((shares[1].limit - 2.0).abs() < 1e-9);
        // No traffic from link 3: generous full share.
        assert!((shares[2].limit - 20.0).abs() < 1e-9);
        assert!(shares.iter().all(|s| s.limit <= 20.0 + 1e-9));
    }

    #[test]
    fn test_unlimited_destination_is_skipped() {
        let protocol = PushbackProtocol::new(&PushbackConfig::default());
        let root = StatsNode::new();
        assert!(protocol
            .compute_limits(&root, &[LinkId(1)], &name("/good"), Allowance::Unlimited, 1.0)
            .is_empty());
    }
}
