// Pushback Benchmark Runner v1.0.0
// Monte Carlo (N=30), seedable PRNG, per-tick JSONL audit trail
//
// Usage:
//   cargo run --release --bin bench                     # Run all scenarios (30 runs each)
//   cargo run --release --bin bench -- --runs 5         # Quick mode (5 runs each)
//   cargo run --release --bin bench -- ATTACK           # Filter by name
//   cargo run --release --bin bench -- --time-series    # Enable JSONL output
//   cargo run --release --bin bench -- --seed 42        # Custom base seed
//   RUST_LOG=pushback_engine=debug cargo run --bin bench -- --runs 1 BASELINE

mod report;
mod scenarios;
mod monte_carlo;
mod time_series;

use report::*;
use scenarios::*;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct CliArgs {
    runs: usize,
    seed: u64,
    time_series: bool,
    filter: Option<String>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cli = CliArgs {
        runs: 30,
        seed: 0,
        time_series: false,
        filter: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--runs" => {
                i += 1;
                if i < args.len() {
                    cli.runs = args[i].parse().unwrap_or(30);
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    cli.seed = args[i].parse().unwrap_or(0);
                }
            }
            "--time-series" => {
                cli.time_series = true;
            }
            arg if !arg.starts_with('-') => {
                cli.filter = Some(arg.to_string());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    cli
}

// ─── Mitigation Validation ──────────────────────────────────────────────────

fn compare_mitigations(reports: &[MonteCarloReport]) -> MitigationValidation {
    let baselines_clean = reports
        .iter()
        .filter(|r| r.category == "baseline")
        .all(|r| r.pass_rate >= 0.933);

    let mut comparisons = Vec::new();
    for attackers in [2u32, 4] {
        let suffix = format!("_X{}", attackers);
        let attack_runs: Vec<&MonteCarloReport> = reports
            .iter()
            .filter(|r| r.category == "attack" && r.scenario_name.ends_with(&suffix))
            .collect();
        let Some(unmitigated) = attack_runs.iter().find(|r| r.algorithm == "simple-limits") else {
            continue;
        };
        let reference = unmitigated.attack_good_satisfaction.mean;
        for run in attack_runs.iter().filter(|r| r.algorithm != "simple-limits") {
            comparisons.push(MitigationComparison {
                attackers,
                algorithm: run.algorithm.clone(),
                attack_good_satisfaction: run.attack_good_satisfaction.mean,
                simple_limits_good_satisfaction: reference,
                improvement: run.attack_good_satisfaction.mean - reference,
            });
        }
    }

    MitigationValidation { baselines_clean, comparisons }
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();
    let all_scenarios = scenarios();

    let to_run: Vec<&Scenario> = match &cli.filter {
        Some(f) => {
            let f_lower = f.to_lowercase();
            all_scenarios.iter()
                .filter(|s| s.name.to_lowercase().contains(&f_lower)
                          || s.label.to_lowercase().contains(&f_lower)
                          || s.category.contains(&f_lower))
                .collect()
        }
        None => all_scenarios.iter().collect(),
    };

    if to_run.is_empty() {
        eprintln!("No scenarios match filter: {:?}", cli.filter);
        std::process::exit(1);
    }

    let ts_dir = if cli.time_series {
        Some(std::path::Path::new("benchmark-results/time-series").to_path_buf())
    } else {
        None
    };

    println!("\n  Pushback Benchmark Runner v1.0.0");
    println!("  PRNG: ChaCha8Rng | Runs/scenario: {} | Base seed: {}", cli.runs, cli.seed);
    println!("  Running {} scenario(s)...\n", to_run.len());
    println!("  {:<36} {:>5} {:>12} {:>12} {:>9} {:>7} {:>7}",
        "Scenario", "Pass%", "Good%", "Attack%", "Signals", "Limit", "Time");
    println!("  {}", "-".repeat(96));

    let suite_start = Instant::now();
    let mut mc_reports = Vec::new();

    for scenario in &to_run {
        let report = match monte_carlo::run_monte_carlo(scenario, cli.runs, cli.seed, ts_dir.as_deref()) {
            Ok(report) => report,
            Err(e) => {
                eprintln!("  {}: scenario failed to build: {}", scenario.name, e);
                std::process::exit(2);
            }
        };

        let pass_pct = report.pass_rate * 100.0;
        let status = if pass_pct >= 93.3 { "PASS" } else { "FAIL" };

        println!("  {:<36} {:>4}% {:>6.1}±{:<4.1} {:>6.1}±{:<4.1} {:>9.0} {:>7.3} {:>5.0}ms  {}",
            report.label,
            pass_pct as u32,
            report.good_satisfaction.mean * 100.0, report.good_satisfaction.half_width() * 100.0,
            report.attack_good_satisfaction.mean * 100.0, report.attack_good_satisfaction.half_width() * 100.0,
            report.signals_sent.mean,
            report.min_limit_ratio.mean,
            report.elapsed_ms.mean,
            status,
        );

        mc_reports.push(report);
    }

    let suite_elapsed = suite_start.elapsed();
    let validation = compare_mitigations(&mc_reports);

    // ─── Summary ────────────────────────────────────────────────────────

    let total = mc_reports.len();
    let passed = mc_reports.iter().filter(|r| r.pass_rate >= 0.933).count();
    let failed = total - passed;

    println!("  {}", "-".repeat(96));
    println!("  Total: {}  Passed: {}  Failed: {}  Suite time: {:.1}s\n",
        total, passed, failed, suite_elapsed.as_secs_f64());

    println!("  Mitigation vs simple-limits (good satisfaction under attack):");
    println!("    Baselines clean:      {}", if validation.baselines_clean { "PASS" } else { "FAIL" });
    for c in &validation.comparisons {
        println!("    x{} {:<22} {:>6.1}% vs {:>6.1}%  ({:+.1})",
            c.attackers,
            c.algorithm,
            c.attack_good_satisfaction * 100.0,
            c.simple_limits_good_satisfaction * 100.0,
            c.improvement * 100.0,
        );
    }
    println!();

    // ─── Write JSON Report ──────────────────────────────────────────────

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let timestamp = format!("{}", ts);

    let report = BenchReport {
        timestamp: timestamp.clone(),
        version: "1.0.0",
        prng: "ChaCha8Rng",
        n_runs_per_scenario: cli.runs,
        summary: Summary {
            total,
            passed,
            failed,
            pass_rate: passed as f64 / total as f64,
        },
        mitigation_validation: validation,
        scenarios: mc_reports,
    };

    let dir = std::path::Path::new("benchmark-results");
    if !dir.exists() {
        std::fs::create_dir_all(dir).expect("Failed to create benchmark-results/");
    }
    let path = dir.join(format!("bench-{}.json", timestamp));
    let json = serde_json::to_string_pretty(&report).expect("Failed to serialize");
    std::fs::write(&path, &json).expect("Failed to write benchmark file");
    println!("  Results saved to: {}\n", path.display());

    if failed > 0 {
        std::process::exit(1);
    }
}
