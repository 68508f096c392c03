// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Hypermesh Interest Pushback Suite

pub mod types;
pub mod name;
pub mod config;
pub mod stats;
pub mod limits;
pub mod queue;
pub mod admission;
pub mod pushback;
pub mod pit;
pub mod events;
pub mod strategy;
pub mod simulation;

pub use types::*;
pub use name::Name;
pub use config::{ConfigError, StrategyConfig};
pub use strategy::{FibEntry, ForwardingHost, ForwardingStrategy};
pub use simulation::{PushbackSimulation, ScenarioConfig, ScenarioError};

use wasm_bindgen::prelude::*;

// ─── WASM Interface ──────────────────────────────────────────────────────────

#[wasm_bindgen]
impl PushbackSimulation {
    /// Builds a scenario from its JSON description; missing fields take
    /// their defaults, so `"{}"` is the default attack scenario.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<PushbackSimulation, JsValue> {
        #[cfg(target_arch = "wasm32")]
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        PushbackSimulation::from_json(config_json).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Scenario with defaults for the named strategy.
    pub fn with_algorithm(algorithm: &str, seed: u32) -> Result<PushbackSimulation, JsValue> {
        let config = ScenarioConfig { seed: seed as u64, ..ScenarioConfig::for_algorithm(algorithm) };
        PushbackSimulation::from_config(config).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn tick(&mut self) -> JsValue {
        let result = self.tick_core();
        serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
    }

    /// Run N ticks without returning results (fast batch mode for benchmarking)
    pub fn run_batch(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick_core();
        }
    }

    pub fn get_stats(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.stats_core()).unwrap_or(JsValue::NULL)
    }

    pub fn get_limits(&self, node_id: u32) -> JsValue {
        serde_wasm_bindgen::to_value(&self.link_limits(node_id)).unwrap_or(JsValue::NULL)
    }

    pub fn get_roles(&self) -> JsValue {
        let roles: Vec<Option<NodeRole>> =
            (0..self.node_count() as u32).map(|id| self.role(id)).collect();
        serde_wasm_bindgen::to_value(&roles).unwrap_or(JsValue::NULL)
    }

    pub fn kill_node(&mut self, node_id: u32) {
        self.shutdown_node(node_id);
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Reset simulation to initial state
    pub fn reset(&mut self) {
        if let Ok(fresh) = PushbackSimulation::from_config(self.config.clone()) {
            *self = fresh;
        }
    }
}
