use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use sysinfo::System;
use tracing_subscriber::EnvFilter;

use miramark::config::{
    DEFAULT_HISTORIC_DIR, DEFAULT_RESULTS_FILE, DEFAULT_RUNS, DEFAULT_SAMPLE_INTERVAL_MS,
    DEFAULT_SETTLE_MS, DEFAULT_SUITE_DIR, OutputConfig, RUNS_ENV, RunnerConfig,
};
use miramark::discover;
use miramark::orchestrator::Orchestrator;
use miramark::progress::Progress;
use miramark::report;
use miramark::runner::ProcessRunner;

#[derive(Parser)]
#[command(
    name = "miramark",
    version,
    about = "Run a benchmark suite and report CPU, memory and self-reported metrics"
)]
struct Cli {
    /// Number of rounds; every benchmark runs once per round
    #[arg(long, env = RUNS_ENV, default_value_t = DEFAULT_RUNS)]
    runs: usize,

    /// Directory containing the benchmarks
    #[arg(long, env = "MIRAMARK_SUITE", default_value = DEFAULT_SUITE_DIR)]
    suite: PathBuf,

    /// Latest results file
    #[arg(long, default_value = DEFAULT_RESULTS_FILE)]
    output: PathBuf,

    /// Directory for timestamped copies of each report
    #[arg(long, default_value = DEFAULT_HISTORIC_DIR)]
    historic_dir: PathBuf,

    /// Program used to launch each benchmark, e.g. python3
    #[arg(long, env = "MIRAMARK_INTERPRETER")]
    interpreter: Option<String>,

    #[arg(long, hide = true, default_value_t = DEFAULT_SETTLE_MS)]
    settle_ms: u64,

    #[arg(long, hide = true, default_value_t = DEFAULT_SAMPLE_INTERVAL_MS)]
    interval_ms: u64,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let benchmarks = discover::discover_benchmarks(&cli.suite)?;
    if benchmarks.is_empty() {
        tracing::warn!(suite = %cli.suite.display(), "no benchmarks found");
    }

    let runner = ProcessRunner::new(RunnerConfig {
        settle_delay: Duration::from_millis(cli.settle_ms),
        sample_interval: Duration::from_millis(cli.interval_ms),
        interpreter: cli.interpreter,
    });
    let mut orchestrator = Orchestrator::new(runner, cli.runs);
    let mut progress = Progress::new(std::io::stdout());

    let results = orchestrator.run_suite(&benchmarks, &mut progress);

    let ran_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let host = System::host_name().unwrap_or_else(|| "unknown".to_string());
    let document = report::render_report(&results, cli.runs, &ran_at, &host);

    report::write_report(
        &document,
        &OutputConfig {
            results_file: cli.output,
            historic_dir: cli.historic_dir,
        },
        &ran_at,
    )?;

    println!("Done!");
    Ok(())
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("{}", err);
        process::exit(1);
    }
}
