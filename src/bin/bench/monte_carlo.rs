// Monte Carlo Infrastructure: N runs per scenario with statistical aggregation
// Each scenario runs N times with seeds base..base+N-1, computing mean ± 95% CI

use pushback_engine::*;
use tracing::{debug, warn};

use crate::report::*;
use crate::scenarios::Scenario;
use crate::time_series::TimeSeriesRecorder;

use std::time::Instant;

/// Run a single scenario iteration with a specific seed.
pub fn run_single(
    scenario: &Scenario,
    seed: u64,
    time_series_dir: Option<&std::path::Path>,
) -> Result<BenchResult, ScenarioError> {
    let start = Instant::now();
    let config = ScenarioConfig { seed, ..scenario.config.clone() };
    let ticks = config.duration;
    let mut sim = PushbackSimulation::from_config(config)?;

    let mut time_series = if time_series_dir.is_some() {
        Some(TimeSeriesRecorder::new())
    } else {
        None
    };

    let mut min_limit_ratio: f64 = 1.0;
    let mut peak_pending_entries = 0;

    for tick in 0..ticks {
        if let Some(event) = &scenario.mid_event {
            event(&mut sim, tick);
        }

        let result = sim.tick_core();
        peak_pending_entries = peak_pending_entries.max(result.pending_entries);
        if result.attack_active {
            for link in result.gateway_limits.iter().filter(|l| l.enabled) {
                min_limit_ratio = min_limit_ratio.min(link.current_limit / link.max_limit);
            }
        }

        if let Some(ref mut ts) = time_series {
            ts.record(&result);
        }
    }

    if let (Some(ts), Some(dir)) = (&time_series, time_series_dir) {
        let path = dir.join(format!("seed-{}.jsonl", seed));
        if let Err(e) = ts.write_jsonl(&path) {
            warn!(path = %path.display(), error = %e, "failed to write time series");
        }
    }

    let elapsed = start.elapsed();
    let elapsed_secs = elapsed.as_secs_f64().max(0.001);
    let stats = sim.stats_core();

    let criteria = &scenario.criteria;
    let mut pass = stats.malformed_signals <= criteria.max_malformed_signals;
    if let Some(min) = criteria.min_good_satisfaction {
        if stats.good_satisfaction < min {
            pass = false;
        }
    }
    if let Some(min) = criteria.min_attack_good_satisfaction {
        if stats.attack_good_satisfaction < min {
            pass = false;
        }
    }
    if let Some(max) = criteria.max_evil_satisfaction {
        if stats.evil.sent > 0 && stats.evil_satisfaction > max {
            pass = false;
        }
    }
    if criteria.require_signals && stats.signals_sent == 0 {
        pass = false;
    }
    debug!(scenario = %scenario.name, seed, pass, "run finished");

    Ok(BenchResult {
        scenario: scenario.label.clone(),
        name: scenario.name.clone(),
        category: scenario.category.to_string(),
        algorithm: scenario.algorithm.to_string(),
        seed,
        pass,
        good_sent: stats.good.sent,
        good_satisfied: stats.good.satisfied,
        evil_sent: stats.evil.sent,
        good_satisfaction: stats.good_satisfaction,
        attack_good_satisfaction: stats.attack_good_satisfaction,
        evil_satisfaction: stats.evil_satisfaction,
        rejected: stats.rejected,
        deferred: stats.deferred,
        signals_sent: stats.signals_sent,
        malformed_signals: stats.malformed_signals,
        min_limit_ratio,
        peak_pending_entries,
        ticks,
        elapsed_ms: elapsed.as_millis(),
        throughput_per_sec: ticks as f64 / elapsed_secs,
    })
}

/// Run Monte Carlo: N runs of a scenario, aggregate stats.
pub fn run_monte_carlo(
    scenario: &Scenario,
    n_runs: usize,
    base_seed: u64,
    time_series_base: Option<&std::path::Path>,
) -> Result<MonteCarloReport, ScenarioError> {
    let ts_dir = time_series_base.map(|base| base.join(scenario.name.to_lowercase()));

    let mut results = Vec::with_capacity(n_runs);
    for i in 0..n_runs {
        let seed = base_seed + i as u64;
        results.push(run_single(scenario, seed, ts_dir.as_deref())?);
    }

    Ok(aggregate(scenario, results))
}

fn stats_of(results: &[BenchResult], metric: impl Fn(&BenchResult) -> f64) -> Stats {
    Stats::from_samples(&results.iter().map(metric).collect::<Vec<_>>())
}

/// Aggregate individual runs into a MonteCarloReport.
fn aggregate(scenario: &Scenario, results: Vec<BenchResult>) -> MonteCarloReport {
    let n = results.len();
    let passed = results.iter().filter(|r| r.pass).count();
    let pass_rate = if n > 0 { passed as f64 / n as f64 } else { 0.0 };

    MonteCarloReport {
        scenario_name: scenario.name.clone(),
        label: scenario.label.clone(),
        category: scenario.category.to_string(),
        algorithm: scenario.algorithm.to_string(),
        n_runs: n,
        pass_rate,
        good_satisfaction: stats_of(&results, |r| r.good_satisfaction),
        attack_good_satisfaction: stats_of(&results, |r| r.attack_good_satisfaction),
        evil_satisfaction: stats_of(&results, |r| r.evil_satisfaction),
        rejected: stats_of(&results, |r| r.rejected as f64),
        deferred: stats_of(&results, |r| r.deferred as f64),
        signals_sent: stats_of(&results, |r| r.signals_sent as f64),
        min_limit_ratio: stats_of(&results, |r| r.min_limit_ratio),
        peak_pending_entries: stats_of(&results, |r| r.peak_pending_entries as f64),
        elapsed_ms: stats_of(&results, |r| r.elapsed_ms as f64),
        throughput_per_sec: stats_of(&results, |r| r.throughput_per_sec),
        individual_runs: results,
    }
}
