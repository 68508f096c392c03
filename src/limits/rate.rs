// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Rate limits: a leaky bucket draining `current_limit` credits per time unit.

use super::{Limits, SlotCallback};

pub const KIND: &str = "rate";

/// Bucket depth, in time units of traffic at the current rate.
pub const BUCKET_DEPTH: f64 = 1.0;

pub struct RateLimits {
    max_limit: f64,
    current_limit: f64,
    bucket: f64,
    last_leak: Option<f64>,
    on_slot: Option<SlotCallback>,
}

impl RateLimits {
    pub fn new(max_limit: f64) -> Self {
        let max_limit = max_limit.max(0.0);
        Self {
            max_limit,
            current_limit: max_limit,
            bucket: 0.0,
            last_leak: None,
            on_slot: None,
        }
    }

    fn depth(&self) -> f64 {
        self.current_limit * BUCKET_DEPTH
    }

    fn notify(&mut self) {
        if let Some(callback) = self.on_slot.as_mut() {
            callback();
        }
    }
}

impl Limits for RateLimits {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn set_max_limit(&mut self, max_limit: f64) {
        self.max_limit = max_limit.max(0.0);
        self.current_limit = self.max_limit;
    }

    fn max_limit(&self) -> f64 {
        self.max_limit
    }

    fn current_limit(&self) -> f64 {
        self.current_limit
    }

    fn outstanding(&self) -> f64 {
        self.bucket
    }

    fn is_below_limit(&self) -> bool {
        !self.is_enabled() || self.depth() - self.bucket >= 1.0
    }

    fn borrow(&mut self) -> bool {
        if !self.is_enabled() {
            return true;
        }
        if !self.is_below_limit() {
            return false;
        }
        self.bucket += 1.0;
        true
    }

    /// Credits only come back through the leak.
    fn return_credit(&mut self) {}

    fn update_limit(&mut self, limit: f64) {
        let was_below = self.is_below_limit();
        self.current_limit = limit.clamp(0.0, self.max_limit);
        if !was_below && self.is_below_limit() {
            self.notify();
        }
    }

    fn advance(&mut self, now: f64) {
        let last = self.last_leak.replace(now).unwrap_or(now);
        let elapsed = now - last;
        if elapsed <= 0.0 || self.bucket <= 0.0 {
            return;
        }
        let was_below = self.is_below_limit();
        self.bucket = (self.bucket - self.current_limit * elapsed).max(0.0);
        if !was_below && self.is_below_limit() {
            self.notify();
        }
    }

    fn register_available_slot_callback(&mut self, callback: SlotCallback) {
        self.on_slot = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_leak_frees_credit() {
        let fired = Rc::new(Cell::new(0u32));
        let mut limits = RateLimits::new(4.0);
        let counter = Rc::clone(&fired);
        limits.register_available_slot_callback(Box::new(move || counter.set(counter.get() + 1)));
        limits.advance(0.0);

        for _ in 0..4 {
            assert!(limits.borrow());
        }
        assert!(!limits.is_below_limit());
        limits.return_credit();
        assert!(!limits.is_below_limit());

        limits.advance(0.25);
        assert!(limits.is_below_limit());
        assert_eq!(fired.get(), 1);
        assert!((limits.outstanding() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_bucket_never_negative() {
        let mut limits = RateLimits::new(2.0);
        limits.advance(0.0);
        assert!(limits.borrow());
        limits.advance(10.0);
        assert_eq!(limits.outstanding(), 0.0);
    }

    #[test]
    fn test_pushed_limit_slows_drain() {
        let mut limits = RateLimits::new(10.0);
        limits.advance(0.0);
        limits.update_limit(2.0);
        assert!(limits.borrow());
        assert!(limits.borrow());
        assert!(!limits.borrow());
        limits.advance(0.5);
        assert!(limits.is_below_limit());
    }
}
