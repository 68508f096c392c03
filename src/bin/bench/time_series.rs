// Per-Tick JSONL Time Series Recorder
// Outputs one JSON line per tick for independent analysis

use serde::Serialize;
use pushback_engine::TickReport;
use std::io::Write;

#[derive(Debug, Serialize)]
pub struct TickSnapshot {
    pub tick: u64,
    pub attack_active: bool,
    pub good_sent: u64,
    pub good_satisfied: u64,
    pub good_timed_out: u64,
    pub good_satisfaction: f64,
    pub evil_sent: u64,
    pub evil_timed_out: u64,
    pub rejected: u64,
    pub deferred: u64,
    pub signals_sent: u64,
    pub pending_entries: usize,
    /// Gateway link limits as current/max, in link order.
    pub gateway_limit_ratios: Vec<f64>,
}

impl TickSnapshot {
    pub fn from_report(report: &TickReport) -> Self {
        Self {
            tick: report.time,
            attack_active: report.attack_active,
            good_sent: report.good.sent,
            good_satisfied: report.good.satisfied,
            good_timed_out: report.good.timed_out,
            good_satisfaction: report.good_satisfaction,
            evil_sent: report.evil.sent,
            evil_timed_out: report.evil.timed_out,
            rejected: report.rejected,
            deferred: report.deferred,
            signals_sent: report.signals_sent,
            pending_entries: report.pending_entries,
            gateway_limit_ratios: report
                .gateway_limits
                .iter()
                .filter(|l| l.enabled)
                .map(|l| l.current_limit / l.max_limit)
                .collect(),
        }
    }
}

/// Time series recorder that accumulates snapshots and writes JSONL
pub struct TimeSeriesRecorder {
    snapshots: Vec<TickSnapshot>,
}

impl TimeSeriesRecorder {
    pub fn new() -> Self {
        Self { snapshots: Vec::new() }
    }

    pub fn record(&mut self, report: &TickReport) {
        self.snapshots.push(TickSnapshot::from_report(report));
    }

    /// Write all snapshots to a JSONL file
    pub fn write_jsonl(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        for snapshot in &self.snapshots {
            let line = serde_json::to_string(snapshot)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }
}
