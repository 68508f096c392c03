// Scenario Definitions: every strategy against a quiet network, a two-attacker
// flood and a four-attacker flood, plus rate-limit and node-failure variants.

use pushback_engine::{NodeRole, PushbackSimulation, ScenarioConfig};

pub const ALGORITHMS: [&str; 5] = ["simple-limits", "fairness", "satisfaction-accept", "satisfaction-pushback", "full"];

// ─── Scenario Configuration ─────────────────────────────────────────────────

pub struct Scenario {
    pub name: String,
    pub label: String,
    pub category: &'static str,
    pub algorithm: &'static str,
    /// Seed is overwritten per Monte Carlo run.
    pub config: ScenarioConfig,
    pub criteria: PassCriteria,
    /// Mid-simulation events (e.g., shutdown_node at a specific tick)
    pub mid_event: Option<Box<dyn Fn(&mut PushbackSimulation, u64) + Send + Sync>>,
}

pub struct PassCriteria {
    pub min_good_satisfaction: Option<f64>,
    pub min_attack_good_satisfaction: Option<f64>,
    pub max_evil_satisfaction: Option<f64>,
    pub require_signals: bool,
    pub max_malformed_signals: u64,
}

impl Default for PassCriteria {
    fn default() -> Self {
        Self {
            min_good_satisfaction: None,
            min_attack_good_satisfaction: None,
            max_evil_satisfaction: Some(0.0),
            require_signals: false,
            max_malformed_signals: 0,
        }
    }
}

fn slug(algorithm: &str) -> String {
    algorithm.replace('-', "_").to_uppercase()
}

fn uses_pushback(algorithm: &str) -> bool {
    algorithm == "satisfaction-pushback" || algorithm == "full"
}

// ─── Scenario Builders ──────────────────────────────────────────────────────

fn baseline(algorithm: &'static str) -> Scenario {
    Scenario {
        name: format!("BASELINE_{}", slug(algorithm)),
        label: format!("Baseline ({})", algorithm),
        category: "baseline",
        algorithm,
        config: ScenarioConfig {
            evil_count: 0,
            duration: 60,
            ..ScenarioConfig::for_algorithm(algorithm)
        },
        criteria: PassCriteria {
            min_good_satisfaction: Some(0.99),
            ..PassCriteria::default()
        },
        mid_event: None,
    }
}

fn attack(algorithm: &'static str, attackers: u32) -> Scenario {
    let mitigates = algorithm != "simple-limits";
    Scenario {
        name: format!("ATTACK_{}_X{}", slug(algorithm), attackers),
        label: format!("Flood x{} ({})", attackers, algorithm),
        category: "attack",
        algorithm,
        config: ScenarioConfig {
            evil_count: attackers,
            ..ScenarioConfig::for_algorithm(algorithm)
        },
        criteria: PassCriteria {
            min_attack_good_satisfaction: if mitigates { Some(0.5) } else { None },
            require_signals: uses_pushback(algorithm),
            ..PassCriteria::default()
        },
        mid_event: None,
    }
}

fn rate_limited_pushback() -> Scenario {
    let mut config = ScenarioConfig::for_algorithm("satisfaction-pushback");
    config.strategy.limit_type = "rate".to_string();
    Scenario {
        name: "ATTACK_RATE_PUSHBACK_X2".to_string(),
        label: "Flood x2 (pushback, rate limits)".to_string(),
        category: "variant",
        algorithm: "satisfaction-pushback",
        config,
        criteria: PassCriteria {
            require_signals: true,
            ..PassCriteria::default()
        },
        mid_event: None,
    }
}

/// One attacker is torn down halfway through the attack window.
fn attacker_failure() -> Scenario {
    let config = ScenarioConfig::for_algorithm("satisfaction-pushback");
    let kill_at = ((config.attack_start + config.attack_stop) / 2.0) as u64;
    Scenario {
        name: "ATTACKER_FAILURE".to_string(),
        label: "Attacker torn down mid-flood".to_string(),
        category: "variant",
        algorithm: "satisfaction-pushback",
        config,
        criteria: PassCriteria {
            require_signals: true,
            ..PassCriteria::default()
        },
        mid_event: Some(Box::new(move |sim: &mut PushbackSimulation, tick: u64| {
            if tick != kill_at {
                return;
            }
            let victim = (0..sim.node_count() as u32).find(|n| sim.role(*n) == Some(NodeRole::EvilConsumer));
            if let Some(node) = victim {
                sim.shutdown_node(node);
            }
        })),
    }
}

pub fn scenarios() -> Vec<Scenario> {
    let mut all = Vec::new();
    for algorithm in ALGORITHMS {
        all.push(baseline(algorithm));
    }
    for attackers in [2, 4] {
        for algorithm in ALGORITHMS {
            all.push(attack(algorithm, attackers));
        }
    }
    all.push(rate_limited_pushback());
    all.push(attacker_failure());
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_registered_strategy_is_benchmarked() {
        for name in pushback_engine::config::strategy_names() {
            assert!(ALGORITHMS.contains(&name), "{} has no scenarios", name);
        }
        let all = scenarios();
        for algorithm in ALGORITHMS {
            assert!(all.iter().any(|s| s.category == "baseline" && s.algorithm == algorithm));
            assert_eq!(all.iter().filter(|s| s.category == "attack" && s.algorithm == algorithm).count(), 2);
        }
    }

    #[test]
    fn test_scenario_names_are_unique() {
        let all = scenarios();
        let names: HashSet<&str> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), all.len());
    }
}
