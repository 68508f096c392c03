#[cfg(test)]
mod tests {
    use pushback_engine::config::ConfigError;
    use pushback_engine::{NodeRole, PushbackSimulation, ScenarioConfig, ScenarioError};

    fn short(algorithm: &str, evil_count: u32) -> ScenarioConfig {
        ScenarioConfig {
            evil_count,
            duration: 25,
            attack_start: 5.0,
            attack_stop: 20.0,
            seed: 7,
            ..ScenarioConfig::for_algorithm(algorithm)
        }
    }

    /// Six good leaves out of eight guarantee every gateway serves some good traffic.
    fn crowded(algorithm: &str) -> ScenarioConfig {
        ScenarioConfig { good_count: 6, ..short(algorithm, 2) }
    }

    fn evil_nodes(sim: &PushbackSimulation) -> Vec<u32> {
        (0..sim.node_count() as u32)
            .filter(|n| sim.role(*n) == Some(NodeRole::EvilConsumer))
            .collect()
    }

    fn uplink_limit(sim: &PushbackSimulation, node: u32) -> f64 {
        sim.link_limits(node)
            .first()
            .map(|l| l.current_limit)
            .expect("test: leaf has an uplink")
    }

    // ========== Determinism ==========

    #[test]
    fn test_same_seed_same_run() {
        let run = || {
            let mut sim = PushbackSimulation::from_config(short("satisfaction-pushback", 2)).expect("test: build");
            let reports: Vec<String> = (0..25)
                .map(|_| serde_json::to_string(&sim.tick_core()).expect("test: serialize"))
                .collect();
            reports
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_reset_replays_from_start() {
        let mut sim = PushbackSimulation::from_config(short("fairness", 2)).expect("test: build");
        let first: Vec<u64> = (0..10).map(|_| sim.tick_core().good.sent).collect();
        sim.reset();
        assert_eq!(sim.current_tick(), 0);
        let second: Vec<u64> = (0..10).map(|_| sim.tick_core().good.sent).collect();
        assert_eq!(first, second);
    }

    // ========== Quiet Network ==========

    #[test]
    fn test_every_algorithm_serves_quiet_network() {
        for algorithm in ["simple-limits", "fairness", "satisfaction-accept", "satisfaction-pushback", "full"] {
            let mut sim = PushbackSimulation::from_config(short(algorithm, 0)).expect("test: build");
            let stats = sim.run_to_end();
            assert!(stats.good.sent > 500, "{}: only {} sent", algorithm, stats.good.sent);
            assert!(
                stats.good_satisfaction > 0.99,
                "{}: good satisfaction {}",
                algorithm,
                stats.good_satisfaction
            );
            assert_eq!(stats.evil.sent, 0);
            assert_eq!(stats.malformed_signals, 0);
        }
    }

    // ========== Under Attack ==========

    #[test]
    fn test_attack_traffic_is_never_satisfied() {
        let mut sim = PushbackSimulation::from_config(short("simple-limits", 2)).expect("test: build");
        let stats = sim.run_to_end();
        assert!(stats.evil.sent > 1000);
        assert_eq!(stats.evil.satisfied, 0);
        assert!(stats.rejected > 0, "windows saturate under the flood");
    }

    #[test]
    fn test_attack_window_bounds_evil_traffic() {
        let mut sim = PushbackSimulation::from_config(short("fairness", 2)).expect("test: build");
        for _ in 0..25 {
            let report = sim.tick_core();
            if report.time <= 5 || report.time > 21 {
                assert_eq!(report.evil.sent, 0, "tick {}", report.time);
            }
            assert_eq!(report.attack_active, report.time > 5 && report.time <= 20);
        }
    }

    #[test]
    fn test_pushback_throttles_attacker_links() {
        let mut sim = PushbackSimulation::from_config(crowded("satisfaction-pushback")).expect("test: build");
        let attackers = evil_nodes(&sim);
        assert_eq!(attackers.len(), 2);

        let mut lowest = f64::INFINITY;
        for _ in 0..20 {
            let report = sim.tick_core();
            if report.attack_active {
                for node in &attackers {
                    lowest = lowest.min(uplink_limit(&sim, *node));
                }
            }
        }

        assert!(lowest < 1.0, "attacker uplink never pushed below one request: {}", lowest);
        let stats = sim.stats_core();
        assert!(stats.signals_sent > 0);
        assert!(stats.good.satisfied > 0);
    }

    #[test]
    fn test_satisfied_leaves_keep_their_share() {
        let mut sim = PushbackSimulation::from_config(crowded("satisfaction-pushback")).expect("test: build");
        for _ in 0..15 {
            sim.tick_core();
        }
        let good: Vec<u32> = (0..sim.node_count() as u32)
            .filter(|n| sim.role(*n) == Some(NodeRole::GoodConsumer))
            .collect();
        for node in good {
            let limit = uplink_limit(&sim, node);
            assert!(limit >= 1.0, "good leaf {} throttled to {}", node, limit);
        }
    }

    // ========== Teardown ==========

    #[test]
    fn test_shutdown_node_mid_run() {
        let mut sim = PushbackSimulation::from_config(crowded("satisfaction-pushback")).expect("test: build");
        for _ in 0..8 {
            sim.tick_core();
        }
        sim.shutdown_node(1);
        let before = sim.stats_core();
        for _ in 8..25 {
            sim.tick_core();
        }
        let after = sim.stats_core();

        assert!(!sim.strategy(1).expect("test: gateway").is_alive());
        assert!(sim.link_limits(1).is_empty());
        let orphans: Vec<u32> = (0..sim.node_count() as u32).filter(|n| sim.parent(*n) == Some(1)).collect();
        assert!(!orphans.is_empty());
        for leaf in orphans {
            assert!(sim.link_limits(leaf).is_empty(), "leaf {} still attached", leaf);
        }
        assert!(after.good.timed_out > before.good.timed_out, "traffic behind the dead gateway expires");
    }

    // ========== Configuration ==========

    #[test]
    fn test_json_defaults_and_errors() {
        let sim = PushbackSimulation::from_json("{}").expect("test: default scenario");
        assert_eq!(sim.node_count(), 11);

        let partial = ScenarioConfig::from_json(r#"{"leaves": 4, "good_count": 2, "evil_count": 1}"#)
            .expect("test: partial scenario");
        assert_eq!(partial.leaves, 4);
        assert_eq!(partial.strategy.strategy, "satisfaction-pushback");

        assert!(matches!(
            PushbackSimulation::from_json(r#"{"strategy": {"strategy": "flooding"}}"#),
            Err(ScenarioError::Config(ConfigError::UnknownStrategy(_)))
        ));
        assert!(matches!(
            PushbackSimulation::from_json(r#"{"gateways": 0}"#),
            Err(ScenarioError::NoGateways)
        ));
        assert!(matches!(PushbackSimulation::from_json("[1, 2"), Err(ScenarioError::Json(_))));
    }
}
