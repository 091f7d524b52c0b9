use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::errors::RunFailure;

/// Names prefixed with this character are helpers (shared fixtures, modules) and are never run.
pub const RESERVED_PREFIX: char = '_';

/// One benchmark found in the suite directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Benchmark {
    pub name: String,
    pub path: PathBuf,
}

/// One resource reading taken while a benchmark was alive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub taken_at: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_delta_mb: f64,
}

/// Metric name to value, in insertion order.
///
/// Inserting an existing key replaces the value but keeps the key's original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    entries: Vec<(String, f64)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Metrics {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut metrics = Metrics::new();
        for (k, v) in iter {
            metrics.insert(k, v);
        }
        metrics
    }
}

/// Result of a single run: metrics on success, the reason otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(Metrics),
    Failed(RunFailure),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    pub fn metrics(&self) -> Option<&Metrics> {
        match self {
            RunOutcome::Completed(m) => Some(m),
            RunOutcome::Failed(_) => None,
        }
    }
}

/// Per-benchmark outcome lists, one entry per repetition in execution order.
#[derive(Debug, Clone, Default)]
pub struct SuiteResults {
    by_benchmark: BTreeMap<String, Vec<RunOutcome>>,
}

impl SuiteResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures `name` has an entry, even if it never gets an outcome.
    pub fn register(&mut self, name: &str) {
        self.by_benchmark.entry(name.to_string()).or_default();
    }

    pub fn record(&mut self, name: &str, outcome: RunOutcome) {
        self.by_benchmark
            .entry(name.to_string())
            .or_default()
            .push(outcome);
    }

    pub fn get(&self, name: &str) -> Option<&[RunOutcome]> {
        self.by_benchmark.get(name).map(Vec::as_slice)
    }

    /// Benchmarks in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RunOutcome])> {
        self.by_benchmark
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.by_benchmark.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_benchmark.is_empty()
    }
}
