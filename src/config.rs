use std::path::PathBuf;
use std::time::Duration;

pub const RUNS_ENV: &str = "MIRAMARK_RUNS";
pub const DEFAULT_RUNS: usize = 10;
pub const DEFAULT_SUITE_DIR: &str = "suite";
pub const DEFAULT_RESULTS_FILE: &str = "results.md";
pub const DEFAULT_HISTORIC_DIR: &str = "historic";
pub const DEFAULT_SETTLE_MS: u64 = 3000;
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1000;

/// How each benchmark process is launched and measured.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Pause before every launch so earlier activity does not bleed into the measurement.
    pub settle_delay: Duration,
    pub sample_interval: Duration,
    /// Program the benchmark path is handed to. `None` executes the path itself.
    pub interpreter: Option<String>,
}

/// Where the report is written.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub results_file: PathBuf,
    pub historic_dir: PathBuf,
}
