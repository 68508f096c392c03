// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Satisfaction-based admission.
//!
//! A link that has pushed more than a grace share of the total outgoing
//! allowance and has any unsatisfied requests on record is throttled
//! probabilistically: each new request from it is accepted with probability
//! equal to its satisfaction ratio. Links with clean records, and requests
//! whose candidate links are all unlimited, always pass.

use rand::Rng;
use tracing::trace;

use crate::config::AdmissionConfig;
use crate::limits::Limits;
use crate::stats::{satisfaction_ratio, StatsNode};
use crate::types::LinkId;

/// Combined outgoing allowance of a request's candidate links.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Allowance {
    Unlimited,
    Bounded(f64),
}

impl Allowance {
    /// Sums current limits over enabled limiters. Links with no limiter or a
    /// disabled one contribute nothing; if none is enabled the result is
    /// unlimited.
    pub fn total<'a, I, L>(limits: I) -> Allowance
    where
        I: IntoIterator<Item = Option<&'a L>>,
        L: Limits + ?Sized + 'a,
    {
        let mut total = 0.0;
        let mut bounded = false;
        for limits in limits.into_iter().flatten() {
            if limits.is_enabled() {
                bounded = true;
                total += limits.current_limit();
            }
        }
        if bounded {
            Allowance::Bounded(total)
        } else {
            Allowance::Unlimited
        }
    }

    pub fn bounded(&self) -> Option<f64> {
        match self {
            Allowance::Unlimited => None,
            Allowance::Bounded(total) => Some(*total),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Accept,
    Reject { satisfaction: f64, draw: f64 },
}

#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    grace_threshold: f64,
}

impl AdmissionPolicy {
    pub fn new(config: &AdmissionConfig) -> Self {
        Self { grace_threshold: config.grace_threshold }
    }

    pub fn grace_threshold(&self) -> f64 {
        self.grace_threshold
    }

    /// Probability that a request arriving on `in_link` is admitted.
    pub fn acceptance_probability(&self, root: &StatsNode, in_link: LinkId, allowance: Allowance) -> f64 {
        let Some(total) = allowance.bounded() else {
            return 1.0;
        };
        let served = root.served(in_link);
        let unsatisfied = root.unsatisfied(in_link).max(0.0);
        if served > self.grace_threshold * total && unsatisfied > 0.0 {
            satisfaction_ratio(served, unsatisfied)
        } else {
            1.0
        }
    }

    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        root: &StatsNode,
        in_link: LinkId,
        allowance: Allowance,
        rng: &mut R,
    ) -> Verdict {
        let satisfaction = self.acceptance_probability(root, in_link, allowance);
        if satisfaction >= 1.0 {
            return Verdict::Accept;
        }
        let draw: f64 = rng.gen();
        if draw > satisfaction {
            trace!(link = %in_link, satisfaction, draw, "admission reject");
            Verdict::Reject { satisfaction, draw }
        } else {
            Verdict::Accept
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::WindowLimits;
    use crate::stats::FaceLoadStats;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn root_with(entries: &[(u32, f64, f64)]) -> StatsNode {
        let mut root = StatsNode::new();
        for (link, served, unsatisfied) in entries {
            root.insert(LinkId(*link), FaceLoadStats::with_values(*served, *unsatisfied));
        }
        root
    }

    #[test]
    fn test_allowance_sums_enabled_limits() {
        let a = WindowLimits::new(4.0);
        let b = WindowLimits::new(6.0);
        let off = WindowLimits::new(0.0);
        let total = Allowance::total([Some(&a as &dyn Limits), Some(&b as &dyn Limits), Some(&off as &dyn Limits), None]);
        assert_eq!(total, Allowance::Bounded(10.0));
        assert_eq!(Allowance::total([Some(&off as &dyn Limits), None]), Allowance::Unlimited);
    }

    #[test]
    fn test_grace_share_passes() {
        let policy = AdmissionPolicy::new(&AdmissionConfig::default());
        let root = root_with(&[(1, 0.4, 0.4)]);
        let p = policy.acceptance_probability(&root, LinkId(1), Allowance::Bounded(10.0));
        assert!((p - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unlimited_always_accepts() {
        let policy = AdmissionPolicy::new(&AdmissionConfig::default());
        let root = root_with(&[(1, 100.0, 100.0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..100 {
            assert_eq!(policy.evaluate(&root, LinkId(1), Allowance::Unlimited, &mut rng), Verdict::Accept);
        }
    }
}
