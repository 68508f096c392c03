// Benchmark Report Types
// Structured output for independent analysis of each mitigation strategy

use serde::Serialize;

// ─── Statistics (per-metric Monte Carlo aggregation) ────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub mean: f64,
    pub std_dev: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl Stats {
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self { mean: 0.0, std_dev: 0.0, ci_lower: 0.0, ci_upper: 0.0, min: 0.0, max: 0.0, n: 0 };
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        let std_dev = variance.sqrt();
        let stderr = std_dev / (n as f64).sqrt();
        let z = 1.96; // 95% CI
        Self {
            mean,
            std_dev,
            ci_lower: mean - z * stderr,
            ci_upper: mean + z * stderr,
            min: samples.iter().cloned().fold(f64::INFINITY, f64::min),
            max: samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            n,
        }
    }

    pub fn half_width(&self) -> f64 {
        (self.ci_upper - self.ci_lower) / 2.0
    }
}

// ─── Single-Run Result ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BenchResult {
    pub scenario: String,
    pub name: String,
    pub category: String,
    pub algorithm: String,
    pub seed: u64,
    pub pass: bool,
    pub good_sent: u64,
    pub good_satisfied: u64,
    pub evil_sent: u64,
    pub good_satisfaction: f64,
    pub attack_good_satisfaction: f64,
    pub evil_satisfaction: f64,
    pub rejected: u64,
    pub deferred: u64,
    pub signals_sent: u64,
    pub malformed_signals: u64,
    /// Lowest current/max ratio seen on any gateway link during the attack.
    pub min_limit_ratio: f64,
    pub peak_pending_entries: usize,
    pub ticks: u64,
    pub elapsed_ms: u128,
    pub throughput_per_sec: f64,
}

// ─── Monte Carlo Report (per-scenario aggregation) ──────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MonteCarloReport {
    pub scenario_name: String,
    pub label: String,
    pub category: String,
    pub algorithm: String,
    pub n_runs: usize,
    pub pass_rate: f64,
    pub good_satisfaction: Stats,
    pub attack_good_satisfaction: Stats,
    pub evil_satisfaction: Stats,
    pub rejected: Stats,
    pub deferred: Stats,
    pub signals_sent: Stats,
    pub min_limit_ratio: Stats,
    pub peak_pending_entries: Stats,
    pub elapsed_ms: Stats,
    pub throughput_per_sec: Stats,
    pub individual_runs: Vec<BenchResult>,
}

// ─── Mitigation Comparison ──────────────────────────────────────────────────

/// Good-traffic satisfaction under attack, relative to the unmitigated
/// simple-limits run with the same attacker count.
#[derive(Debug, Clone, Serialize)]
pub struct MitigationComparison {
    pub attackers: u32,
    pub algorithm: String,
    pub attack_good_satisfaction: f64,
    pub simple_limits_good_satisfaction: f64,
    pub improvement: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MitigationValidation {
    pub baselines_clean: bool,
    pub comparisons: Vec<MitigationComparison>,
}

impl MitigationValidation {
    pub fn all_pass(&self) -> bool {
        self.baselines_clean && self.comparisons.iter().all(|c| c.improvement >= 0.0)
    }
}

// ─── Top-Level Report ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub timestamp: String,
    pub version: &'static str,
    pub prng: &'static str,
    pub n_runs_per_scenario: usize,
    pub summary: Summary,
    pub mitigation_validation: MitigationValidation,
    pub scenarios: Vec<MonteCarloReport>,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
}
