// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Per-link credit gates.
//!
//! Each outgoing link owns one [`Limits`] implementation. A request borrows a
//! credit before it is sent and the credit comes back when the request is
//! answered or expires (window) or as the bucket leaks (rate). Whenever a
//! credit frees up the registered slot callback fires so the owner can drain
//! its fair queue.
//!
//! A limiter with `max_limit == 0` is disabled and never blocks. A limiter
//! whose current limit was pushed down to 0 stays enabled and blocks every
//! send, so requests keep queueing.

pub mod rate;
pub mod window;

pub use rate::RateLimits;
pub use window::WindowLimits;

use crate::config::ConfigError;

/// Fired whenever a credit frees up.
pub type SlotCallback = Box<dyn FnMut()>;

pub trait Limits {
    /// Registry name of this limiter type.
    fn kind(&self) -> &'static str;

    /// Sets the configured ceiling and resets the current limit to it.
    fn set_max_limit(&mut self, max_limit: f64);

    fn max_limit(&self) -> f64;

    fn current_limit(&self) -> f64;

    /// Credits currently borrowed.
    fn outstanding(&self) -> f64;

    fn is_enabled(&self) -> bool {
        self.max_limit() > 0.0
    }

    /// True when at least one more credit can be borrowed.
    fn is_below_limit(&self) -> bool;

    /// Takes one credit. Refuses (returns false) when no credit is available.
    fn borrow(&mut self) -> bool;

    fn return_credit(&mut self);

    /// Applies a new current limit, clamped to `[0, max_limit]`.
    fn update_limit(&mut self, limit: f64);

    /// Advances time-driven state to `now`. Window limits ignore it.
    fn advance(&mut self, _now: f64) {}

    fn register_available_slot_callback(&mut self, callback: SlotCallback);
}

pub type LimitsFactory = fn(f64) -> Box<dyn Limits>;

fn new_window(max_limit: f64) -> Box<dyn Limits> {
    Box::new(WindowLimits::new(max_limit))
}

fn new_rate(max_limit: f64) -> Box<dyn Limits> {
    Box::new(RateLimits::new(max_limit))
}

const REGISTRY: &[(&str, LimitsFactory)] = &[
    (window::KIND, new_window),
    (rate::KIND, new_rate),
];

/// Resolves a configured limiter type name once at setup.
pub fn resolve(kind: &str) -> Result<LimitsFactory, ConfigError> {
    REGISTRY
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|(_, factory)| *factory)
        .ok_or_else(|| ConfigError::UnknownLimitType(kind.to_string()))
}

pub fn available() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_resolves_known_kinds() {
        for kind in available() {
            let factory = resolve(kind).expect("test: registered kind");
            assert_eq!(factory(4.0).kind(), kind);
        }
        assert!(matches!(resolve("leaky"), Err(ConfigError::UnknownLimitType(_))));
    }
}
