use std::path::PathBuf;

/// Fatal, suite-level errors. These stop the tool before or after the suite runs,
/// never in the middle of it.
#[derive(thiserror::Error, Debug)]
pub enum MiramarkError {
    #[error("Benchmark directory {path} does not exist")]
    SuiteDirNotFound { path: PathBuf },

    #[error("Failed to list benchmark directory {path}: {source}")]
    SuiteReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write report to {path}: {source}")]
    ReportWriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Why a single benchmark run did not produce metrics.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RunFailure {
    #[error("could not launch benchmark: {0}")]
    SpawnFailed(String),

    #[error("could not collect benchmark exit status: {0}")]
    WaitFailed(String),

    #[error("benchmark exited with status {}", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    NonZeroExit { code: Option<i32> },

    #[error("benchmark produced no output")]
    MissingOutput,

    #[error("last output line is not valid JSON: {0}")]
    MalformedOutput(String),

    #[error("last output line is not a JSON object")]
    NotAnObject,

    #[error("metric '{key}' is not a number")]
    NonNumericMetric { key: String },
}
