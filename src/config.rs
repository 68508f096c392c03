// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Hypermesh Interest Pushback Suite - Strategy Configuration

use serde::{Deserialize, Serialize};

use crate::types::LinkId;

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Setup failures. All of these abort startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown strategy {0:?}")]
    UnknownStrategy(String),
    #[error("unknown limit type {0:?}")]
    UnknownLimitType(String),
    #[error("{0} has no limits attached but the strategy requires them")]
    MissingLimits(LinkId),
    #[error("{0} is already attached")]
    DuplicateLink(LinkId),
    #[error("invalid value for {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

// ─── Defaults ───────────────────────────────────────────────────────────────

pub const DEFAULT_STRATEGY: &str = "satisfaction-pushback";
pub const DEFAULT_GRACE_THRESHOLD: f64 = 0.05;
pub const DEFAULT_DEFERRED_LIFETIME: f64 = 0.1;
pub const DEFAULT_ANNOUNCE_INTERVAL: f64 = 1.0;
pub const DEFAULT_STATS_INTERVAL: f64 = 1.0;

// ─── Sections ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Fraction of total outgoing allowance a link may use before its
    /// satisfaction ratio starts to matter.
    pub grace_threshold: f64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self { grace_threshold: DEFAULT_GRACE_THRESHOLD }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Lifetime given to a request while it waits in a fair queue.
    pub deferred_lifetime: f64,
    /// Lifetime extension when a queued request is forwarded again.
    pub requeue_extension: f64,
    pub max_per_source: usize,
    pub default_weight: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            deferred_lifetime: DEFAULT_DEFERRED_LIFETIME,
            requeue_extension: DEFAULT_DEFERRED_LIFETIME,
            max_per_source: crate::queue::DEFAULT_MAX_PER_SOURCE,
            default_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushbackConfig {
    pub grace_threshold: f64,
    pub announce_interval: f64,
}

impl Default for PushbackConfig {
    fn default() -> Self {
        Self {
            grace_threshold: DEFAULT_GRACE_THRESHOLD,
            announce_interval: DEFAULT_ANNOUNCE_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub strategy: String,
    pub limit_type: String,
    pub admission: AdmissionConfig,
    pub queue: QueueConfig,
    pub pushback: PushbackConfig,
    pub stats_interval: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            strategy: DEFAULT_STRATEGY.to_string(),
            limit_type: crate::limits::window::KIND.to_string(),
            admission: AdmissionConfig::default(),
            queue: QueueConfig::default(),
            pushback: PushbackConfig::default(),
            stats_interval: DEFAULT_STATS_INTERVAL,
        }
    }
}

impl StrategyConfig {
    pub fn for_strategy(name: &str) -> Self {
        Self { strategy: name.to_string(), ..Self::default() }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: StrategyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks ranges and that every named component is registered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        resolve_stages(&self.strategy)?;
        crate::limits::resolve(&self.limit_type)?;
        check_fraction("admission.grace_threshold", self.admission.grace_threshold)?;
        check_fraction("pushback.grace_threshold", self.pushback.grace_threshold)?;
        check_positive("queue.deferred_lifetime", self.queue.deferred_lifetime)?;
        check_positive("queue.requeue_extension", self.queue.requeue_extension)?;
        check_positive("queue.default_weight", self.queue.default_weight)?;
        check_positive("pushback.announce_interval", self.pushback.announce_interval)?;
        check_positive("stats_interval", self.stats_interval)?;
        if self.queue.max_per_source == 0 {
            return Err(ConfigError::InvalidParameter { name: "queue.max_per_source", value: 0.0 });
        }
        Ok(())
    }
}

fn check_fraction(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter { name, value })
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter { name, value })
    }
}

// ─── Strategy Registry ──────────────────────────────────────────────────────

/// Which pipeline stages a named strategy runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stages {
    pub stats: bool,
    pub admission: bool,
    pub fair_queue: bool,
    pub pushback: bool,
}

impl Stages {
    /// Every link must carry a limiter when queueing or pushback is on.
    pub fn requires_limits(&self) -> bool {
        self.fair_queue || self.pushback
    }
}

fn simple_limits() -> Stages {
    Stages::default()
}

fn fairness() -> Stages {
    Stages { fair_queue: true, ..Stages::default() }
}

fn satisfaction_accept() -> Stages {
    Stages { stats: true, admission: true, ..Stages::default() }
}

fn satisfaction_pushback() -> Stages {
    Stages { stats: true, pushback: true, fair_queue: true, ..Stages::default() }
}

fn full() -> Stages {
    Stages { stats: true, admission: true, fair_queue: true, pushback: true }
}

const STRATEGIES: &[(&str, fn() -> Stages)] = &[
    ("simple-limits", simple_limits),
    ("fairness", fairness),
    ("satisfaction-accept", satisfaction_accept),
    ("satisfaction-pushback", satisfaction_pushback),
    ("full", full),
];

pub fn resolve_stages(name: &str) -> Result<Stages, ConfigError> {
    STRATEGIES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, build)| build())
        .ok_or_else(|| ConfigError::UnknownStrategy(name.to_string()))
}

pub fn strategy_names() -> impl Iterator<Item = &'static str> {
    STRATEGIES.iter().map(|(n, _)| *n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = StrategyConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.admission.grace_threshold - 0.05).abs() < f64::EPSILON);
        assert!((config.queue.deferred_lifetime - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = StrategyConfig::from_json(
            r#"{"strategy": "fairness", "limit_type": "rate", "pushback": {"grace_threshold": 0.01}}"#,
        )
        .expect("test: parse");
        assert_eq!(config.strategy, "fairness");
        assert_eq!(config.limit_type, "rate");
        assert!((config.pushback.grace_threshold - 0.01).abs() < f64::EPSILON);
        assert!((config.pushback.announce_interval - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_unknown_names_and_bad_ranges() {
        assert!(matches!(
            StrategyConfig::from_json(r#"{"strategy": "nope"}"#),
            Err(ConfigError::UnknownStrategy(_))
        ));
        assert!(matches!(
            StrategyConfig::from_json(r#"{"limit_type": "bucket"}"#),
            Err(ConfigError::UnknownLimitType(_))
        ));
        assert!(matches!(
            StrategyConfig::from_json(r#"{"admission": {"grace_threshold": 1.5}}"#),
            Err(ConfigError::InvalidParameter { .. })
        ));
        assert!(matches!(StrategyConfig::from_json("{"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_registry_stage_sets() {
        assert!(!resolve_stages("simple-limits").expect("test").requires_limits());
        assert!(resolve_stages("fairness").expect("test").fair_queue);
        let accept = resolve_stages("satisfaction-accept").expect("test");
        assert!(accept.stats && accept.admission && !accept.pushback);
        assert_eq!(strategy_names().count(), 5);
    }
}
