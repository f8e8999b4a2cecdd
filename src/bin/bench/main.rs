// Arbiter Benchmark Runner
// Scripted walkthroughs A–E plus seeded Monte Carlo workloads, conservation checked every step
//
// Usage:
//   cargo run --release --bin bench                       # Everything (30 runs per workload)
//   cargo run --release --bin bench -- --runs 5           # Quick mode
//   cargo run --release --bin bench -- --steps 2000       # Longer runs
//   cargo run --release --bin bench -- MC_SILENT_DAO      # Filter by name, label or category
//   cargo run --release --bin bench -- --seed 42 --json   # Custom base seed, JSON report on stdout

mod metrics;
mod monte_carlo;
mod report;
mod scenarios;
mod traffic;
mod world;

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use report::*;
use scenarios::{scripted, workloads};

// ─── CLI ────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "bench", about = "Dispute engine benchmark runner")]
struct Cli {
    /// Seeded runs per workload
    #[arg(long, default_value_t = 30)]
    runs: usize,

    /// Base seed; run i uses seed + i
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Steps per run
    #[arg(long, default_value_t = 500)]
    steps: u64,

    /// Print the JSON report to stdout instead of the table
    #[arg(long)]
    json: bool,

    /// Directory the JSON report is written to
    #[arg(long, default_value = "benchmark-results")]
    out_dir: std::path::PathBuf,

    /// Only run scenarios whose name, label or category contains this
    filter: Option<String>,
}

fn matches(filter: &Option<String>, name: &str, label: &str, category: &str) -> bool {
    match filter {
        Some(f) => {
            let f = f.to_lowercase();
            name.to_lowercase().contains(&f)
                || label.to_lowercase().contains(&f)
                || category.to_lowercase().contains(&f)
        }
        None => true,
    }
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    // Engine logs go to stderr; default to warnings so per-call info lines don't
    // drown the table. RUST_LOG overrides.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let all_scripted = scripted();
    let all_workloads = workloads();
    let scripted_to_run: Vec<_> = all_scripted
        .iter()
        .filter(|s| matches(&cli.filter, s.name, s.label, s.category))
        .collect();
    let workloads_to_run: Vec<_> = all_workloads
        .iter()
        .filter(|w| matches(&cli.filter, w.name, w.label, w.category))
        .collect();

    if scripted_to_run.is_empty() && workloads_to_run.is_empty() {
        anyhow::bail!("no scenarios match filter {:?}", cli.filter);
    }

    let table = !cli.json;
    if table {
        println!("\n  Arbiter Benchmark Runner v{}", env!("CARGO_PKG_VERSION"));
        println!("  PRNG: ChaCha8Rng | Runs/workload: {} | Steps/run: {} | Base seed: {}", cli.runs, cli.steps, cli.seed);
    }

    let suite_start = Instant::now();

    // ─── Scripted walkthroughs ──────────────────────────────────────────

    if table && !scripted_to_run.is_empty() {
        println!("\n  {:<40} {:>6}", "Walkthrough", "Result");
        println!("  {}", "-".repeat(48));
    }

    let mut scripted_results = Vec::new();
    for scenario in &scripted_to_run {
        let mut world = scenario.world()?;
        let (checks, error) = match (scenario.run)(&mut world) {
            Ok(checks) => (checks, None),
            Err(e) => (Vec::new(), Some(format!("{e:#}"))),
        };
        let conserved = world.engine.verify_conservation().is_ok();
        let pass = error.is_none() && conserved && checks.iter().all(|c| c.pass);

        if table {
            println!("  {:<40} {:>6}", scenario.label, if pass { "PASS" } else { "FAIL" });
            for c in checks.iter().filter(|c| !c.pass) {
                println!("      {}: expected {}, got {}", c.what, c.expected, c.actual);
            }
            if let Some(e) = &error {
                println!("      error: {e}");
            }
        }

        scripted_results.push(ScriptedResult {
            name: scenario.name.to_string(),
            label: scenario.label.to_string(),
            category: scenario.category.to_string(),
            pass,
            checks,
            error,
        });
    }

    // ─── Monte Carlo workloads ──────────────────────────────────────────

    if table && !workloads_to_run.is_empty() {
        println!("\n  {:<36} {:>5} {:>9} {:>8} {:>7} {:>6} {:>10} {:>7}",
            "Workload", "Pass%", "Settled", "Reject%", "Defer", "Open", "Conserv", "Time");
        println!("  {}", "-".repeat(96));
    }

    let mut mc_reports = Vec::new();
    for workload in &workloads_to_run {
        let report = monte_carlo::run_monte_carlo(workload, cli.runs, cli.seed, cli.steps)
            .with_context(|| format!("workload {}", workload.name))?;

        if table {
            let pass_pct = report.pass_rate * 100.0;
            println!("  {:<36} {:>4}% {:>9.1} {:>7.1}% {:>7.1} {:>6.1} {:>10.2e} {:>5.0}ms  {}",
                report.label,
                pass_pct as u32,
                report.settlements.mean,
                report.rejected_call_rate.mean,
                report.deferred.mean,
                report.open_at_end.mean,
                report.max_conservation_error.max,
                report.elapsed_ms.mean,
                if report.pass_rate >= 1.0 { "PASS" } else { "FAIL" },
            );
        }

        mc_reports.push(report);
    }

    let suite_elapsed = suite_start.elapsed();

    // ─── Summary ────────────────────────────────────────────────────────

    let total = scripted_results.len() + mc_reports.len();
    let passed = scripted_results.iter().filter(|r| r.pass).count()
        + mc_reports.iter().filter(|r| r.pass_rate >= 1.0).count();
    let summary = Summary::new(total, passed);

    if table {
        println!("\n  Total: {}  Passed: {}  Failed: {}  Suite time: {:.1}s\n",
            summary.total, summary.passed, summary.failed, suite_elapsed.as_secs_f64());
    }

    // ─── JSON Report ────────────────────────────────────────────────────

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before Unix epoch")?
        .as_millis();
    let failed = summary.failed;

    let report = BenchReport {
        timestamp: ts.to_string(),
        version: env!("CARGO_PKG_VERSION"),
        prng: "ChaCha8Rng",
        n_runs_per_workload: cli.runs,
        steps_per_run: cli.steps,
        base_seed: cli.seed,
        summary,
        scripted: scripted_results,
        workloads: mc_reports,
    };

    let json = serde_json::to_string_pretty(&report).context("serializing report")?;
    if cli.json {
        println!("{json}");
    } else {
        std::fs::create_dir_all(&cli.out_dir)
            .with_context(|| format!("creating {}", cli.out_dir.display()))?;
        let path = cli.out_dir.join(format!("bench-{ts}.json"));
        std::fs::write(&path, &json).with_context(|| format!("writing {}", path.display()))?;
        println!("  Results saved to: {}\n", path.display());
    }

    if failed > 0 {
        anyhow::bail!("{failed} scenario(s) failed");
    }
    Ok(())
}
