// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Window limits: caps the number of requests in flight on a link.

use super::{Limits, SlotCallback};

pub const KIND: &str = "window";

pub struct WindowLimits {
    max_limit: f64,
    current_limit: f64,
    outstanding: f64,
    on_slot: Option<SlotCallback>,
}

impl WindowLimits {
    pub fn new(max_limit: f64) -> Self {
        let max_limit = max_limit.max(0.0);
        Self {
            max_limit,
            current_limit: max_limit,
            outstanding: 0.0,
            on_slot: None,
        }
    }

    fn notify(&mut self) {
        if let Some(callback) = self.on_slot.as_mut() {
            callback();
        }
    }
}

impl Limits for WindowLimits {
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
        self.outstanding
    }

    fn is_below_limit(&self) -> bool {
        !self.is_enabled() || self.current_limit - self.outstanding >= 1.0
    }

    fn borrow(&mut self) -> bool {
        if !self.is_enabled() {
            return true;
        }
        if !self.is_below_limit() {
            return false;
        }
        self.outstanding += 1.0;
        true
    }

    fn return_credit(&mut self) {
        if !self.is_enabled() {
            return;
        }
        self.outstanding = (self.outstanding - 1.0).max(0.0);
        self.notify();
    }

    fn update_limit(&mut self, limit: f64) {
        let was_below = self.is_below_limit();
        self.current_limit = limit.clamp(0.0, self.max_limit);
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
    fn test_capacity_five_then_return_fires_once() {
        let fired = Rc::new(Cell::new(0u32));
        let mut limits = WindowLimits::new(5.0);
        let counter = Rc::clone(&fired);
        limits.register_available_slot_callback(Box::new(move || counter.set(counter.get() + 1)));

        for _ in 0..5 {
            assert!(limits.borrow());
        }
        assert!(!limits.is_below_limit());
        assert!(!limits.borrow());
        assert_eq!(fired.get(), 0);

        limits.return_credit();
        assert!(limits.is_below_limit());
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_outstanding_stays_within_bounds() {
        let mut limits = WindowLimits::new(3.0);
        // Deterministic mixed sequence of borrows and returns.
        let ops = [1, 1, 0, 1, 1, 1, 1, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 0, 1];
        for op in ops {
            if op == 1 {
                limits.borrow();
            } else {
                limits.return_credit();
            }
            assert!(limits.outstanding() <= limits.current_limit());
            assert!(limits.outstanding() >= 0.0);
        }
    }

    #[test]
    fn test_zero_limit_blocks_but_stays_enabled() {
        let mut limits = WindowLimits::new(10.0);
        limits.update_limit(0.0);
        assert!(limits.is_enabled());
        assert!(!limits.is_below_limit());
        limits.update_limit(25.0);
        assert!((limits.current_limit() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_disabled_never_blocks() {
        let mut limits = WindowLimits::new(0.0);
        assert!(!limits.is_enabled());
        for _ in 0..100 {
            assert!(limits.borrow());
        }
        assert!(limits.is_below_limit());
        assert_eq!(limits.outstanding(), 0.0);
    }

    #[test]
    fn test_raising_limit_wakes_waiters() {
        let fired = Rc::new(Cell::new(0u32));
        let mut limits = WindowLimits::new(4.0);
        let counter = Rc::clone(&fired);
        limits.register_available_slot_callback(Box::new(move || counter.set(counter.get() + 1)));
        limits.update_limit(1.0);
        assert!(limits.borrow());
        assert!(!limits.is_below_limit());
        limits.update_limit(3.0);
        assert_eq!(fired.get(), 1);
    }
}
