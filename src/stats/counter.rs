// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Exponentially smoothed event counter.
//!
//! Events accumulate in a raw count between steps. Each `step(alpha)` blends
//! the raw count into three timescales and resets it:
//!
//! - `current`: `alpha * current + (1 - alpha) * raw`
//! - `short`: mean of the last [`SHORT_WINDOW`] per-step counts
//! - `long`: mean of the last [`HISTORY_SAMPLES`] per-step counts
//!
//! Admission and pushback read `current` only; the windowed means exist for
//! reporting and for the pruning zero-check.

use serde::{Deserialize, Serialize};

/// Values below this magnitude are treated as exact zero.
pub const PRECISION: f64 = 0.01;

/// Per-step samples kept for the windowed averages.
pub const HISTORY_SAMPLES: usize = 30;

/// Samples in the short window.
pub const SHORT_WINDOW: usize = 10;

/// The three smoothed values, most responsive first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SmoothedTriple {
    pub current: f64,
    pub short: f64,
    pub long: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayedCounter {
    raw_count: i64,
    smoothed: SmoothedTriple,
    history: [f64; HISTORY_SAMPLES],
    next_sample: usize,
}

impl Default for DecayedCounter {
    fn default() -> Self {
        Self {
            raw_count: 0,
            smoothed: SmoothedTriple::default(),
            history: [0.0; HISTORY_SAMPLES],
            next_sample: 0,
        }
    }
}

impl DecayedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A counter whose current value is already `value`, with empty history.
    pub fn with_current(value: f64) -> Self {
        let mut counter = Self::default();
        counter.smoothed.current = value.max(0.0);
        counter
    }

    pub fn increment(&mut self) {
        self.raw_count += 1;
    }

    pub fn decrement(&mut self) {
        self.raw_count -= 1;
    }

    pub fn raw_count(&self) -> i64 {
        self.raw_count
    }

    /// The current smoothed value.
    pub fn get(&self) -> f64 {
        self.smoothed.current
    }

    pub fn smoothed(&self) -> SmoothedTriple {
        self.smoothed
    }

    /// Adds another counter's pending raw events to this one.
    pub fn absorb_raw(&mut self, other: &DecayedCounter) {
        self.raw_count += other.raw_count;
    }

    /// Blends the raw count into the smoothed values and resets it.
    pub fn step(&mut self, alpha: f64) {
        let raw = self.raw_count as f64;
        self.raw_count = 0;

        self.history[self.next_sample] = raw;
        self.next_sample = (self.next_sample + 1) % HISTORY_SAMPLES;

        let current = alpha * self.smoothed.current + (1.0 - alpha) * raw;
        self.smoothed.current = snap(current);
        self.smoothed.short = snap(self.window_mean(SHORT_WINDOW));
        self.smoothed.long = snap(self.window_mean(HISTORY_SAMPLES));
    }

    pub fn is_zero(&self) -> bool {
        self.raw_count == 0
            && self.smoothed.current == 0.0
            && self.smoothed.short == 0.0
            && self.smoothed.long == 0.0
    }

    fn window_mean(&self, window: usize) -> f64 {
        let sum: f64 = (1..=window)
            .map(|back| self.history[(self.next_sample + HISTORY_SAMPLES - back) % HISTORY_SAMPLES])
            .sum();
        sum / window as f64
    }
}

/// Clamps negatives and sub-precision noise to zero.
fn snap(value: f64) -> f64 {
    if value < PRECISION {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_blends_raw_count() {
        let mut c = DecayedCounter::new();
        for _ in 0..8 {
            c.increment();
        }
        c.step(0.875);
        assert!((c.get() - 1.0).abs() < f64::EPSILON);
        assert_eq!(c.raw_count(), 0);
        c.step(0.875);
        assert!((c.get() - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_decay_is_monotone_until_zero() {
        let mut c = DecayedCounter::with_current(50.0);
        let mut prev = c.get();
        for _ in 0..500 {
            c.step(0.96875);
            let now = c.get();
            if prev > 0.0 {
                assert!(now < prev, "value must strictly decrease: {} -> {}", prev, now);
            } else {
                assert_eq!(now, 0.0);
            }
            prev = now;
        }
        assert!(c.is_zero());
    }

    #[test]
    fn test_negative_raw_is_clamped() {
        let mut c = DecayedCounter::new();
        c.decrement();
        c.decrement();
        c.step(0.5);
        assert_eq!(c.get(), 0.0);
        assert!(c.smoothed().long >= 0.0);
    }

    #[test]
    fn test_window_means() {
        let mut c = DecayedCounter::new();
        for _ in 0..10 {
            for _ in 0..3 {
                c.increment();
            }
            c.step(0.5);
        }
        let s = c.smoothed();
        assert!((s.short - 3.0).abs() < 1e-12);
        assert!((s.long - 1.0).abs() < 1e-12);
        for _ in 0..HISTORY_SAMPLES {
            c.step(0.5);
        }
        assert_eq!(c.smoothed().long, 0.0);
    }
}
