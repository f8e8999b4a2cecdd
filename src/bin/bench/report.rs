// Benchmark Report Types
// Structured output for the scripted walkthroughs and seeded workload runs

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
}

// ─── Scripted Walkthrough Result ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub what: String,
    pub expected: String,
    pub actual: String,
    pub pass: bool,
}

impl Check {
    pub fn equals<T: PartialEq + std::fmt::Display>(what: impl Into<String>, expected: T, actual: T) -> Self {
        Self {
            what: what.into(),
            pass: expected == actual,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptedResult {
    pub name: String,
    pub label: String,
    pub category: String,
    pub pass: bool,
    pub checks: Vec<Check>,
    /// Set when the script itself failed before its checks ran.
    pub error: Option<String>,
}

// ─── Single Workload Run ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct PathCounts {
    pub accepted: u32,
    pub governance_resolved: u32,
    pub governance_canceled: u32,
    pub dispute_rejected: u32,
    pub timed_out: u32,
    pub externally_canceled: u32,
    pub deferred: u32,
}

impl PathCounts {
    pub fn total_settled(&self) -> u32 {
        self.accepted
            + self.governance_resolved
            + self.governance_canceled
            + self.dispute_rejected
            + self.timed_out
            + self.externally_canceled
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchResult {
    pub workload: String,
    pub name: String,
    pub category: String,
    pub seed: u64,
    pub pass: bool,
    pub steps: u64,
    pub calls: u64,
    pub rejected_calls: u64,
    pub conditions_created: u32,
    pub disputes: u32,
    pub withdrawals: u32,
    pub param_changes: u32,
    pub paths: PathCounts,
    pub open_at_end: u32,
    pub conservation_violations: u32,
    pub settlement_imbalances: u32,
    pub max_conservation_error: f64,
    pub total_escrowed: f64,
    pub total_credited: f64,
    pub outstanding_escrow: f64,
    pub elapsed_ms: u128,
    pub calls_per_sec: f64,
}

// ─── Monte Carlo Report (per-workload aggregation) ──────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MonteCarloReport {
    pub workload_name: String,
    pub label: String,
    pub category: String,
    pub n_runs: usize,
    pub pass_rate: f64,
    pub settlements: Stats,
    pub settlement_rate: Stats,
    pub rejected_call_rate: Stats,
    pub deferred: Stats,
    pub open_at_end: Stats,
    pub conservation_violations: Stats,
    pub max_conservation_error: Stats,
    pub elapsed_ms: Stats,
    pub calls_per_sec: Stats,
    pub individual_runs: Vec<BenchResult>,
}

// ─── Top-Level Report ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub timestamp: String,
    pub version: &'static str,
    pub prng: &'static str,
    pub n_runs_per_workload: usize,
    pub steps_per_run: u64,
    pub base_seed: u64,
    pub summary: Summary,
    pub scripted: Vec<ScriptedResult>,
    pub workloads: Vec<MonteCarloReport>,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
}

impl Summary {
    pub fn new(total: usize, passed: usize) -> Self {
        Self {
            total,
            passed,
            failed: total - passed,
            pass_rate: if total > 0 { passed as f64 / total as f64 } else { 1.0 },
        }
    }
}
