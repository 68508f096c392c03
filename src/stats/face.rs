// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Per-link load: requests forwarded on behalf of a link and requests from
//! that link that later timed out.

use serde::{Deserialize, Serialize};

use super::counter::DecayedCounter;

/// Served count keeps 31/32 of its value per tick.
pub const SERVED_RETENTION: f64 = 1.0 - 1.0 / 32.0;

/// Unsatisfied count keeps 7/8 of its value per tick.
pub const UNSATISFIED_RETENTION: f64 = 1.0 - 1.0 / 8.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaceLoadStats {
    pub served: DecayedCounter,
    pub unsatisfied: DecayedCounter,
}

impl FaceLoadStats {
    /// Stats whose current smoothed values are already set.
    pub fn with_values(served: f64, unsatisfied: f64) -> Self {
        Self {
            served: DecayedCounter::with_current(served),
            unsatisfied: DecayedCounter::with_current(unsatisfied),
        }
    }

    pub fn step(&mut self) {
        self.served.step(SERVED_RETENTION);
        self.unsatisfied.step(UNSATISFIED_RETENTION);
    }

    pub fn absorb_raw(&mut self, other: &FaceLoadStats) {
        self.served.absorb_raw(&other.served);
        self.unsatisfied.absorb_raw(&other.unsatisfied);
    }

    pub fn is_zero(&self) -> bool {
        self.served.is_zero() && self.unsatisfied.is_zero()
    }

    /// `1 - min(1, unsatisfied/served)` over current values, with negative
    /// unsatisfied treated as zero.
    pub fn satisfaction(&self) -> f64 {
        satisfaction_ratio(self.served.get(), self.unsatisfied.get())
    }
}

pub fn satisfaction_ratio(served: f64, unsatisfied: f64) -> f64 {
    let unsatisfied = unsatisfied.max(0.0);
    if served <= 0.0 {
        return if unsatisfied > 0.0 { 0.0 } else { 1.0 };
    }
    1.0 - (unsatisfied / served).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsatisfied_decays_faster() {
        let mut stats = FaceLoadStats::with_values(10.0, 10.0);
        for _ in 0..8 {
            stats.step();
        }
        assert!(stats.unsatisfied.get() < stats.served.get());
    }

    #[test]
    fn test_satisfaction_ratio_clamps() {
        assert!((satisfaction_ratio(100.0, 40.0) - 0.6).abs() < 1e-12);
        assert!((satisfaction_ratio(100.0, -5.0) - 1.0).abs() < f64::EPSILON);
        assert_eq!(satisfaction_ratio(10.0, 30.0), 0.0);
        assert!((satisfaction_ratio(0.0, 0.0) - 1.0).abs() < f64::EPSILON);
    }
}
