use std::io::Write;

use crate::progress::Progress;
use crate::runner::BenchmarkRunner;
use crate::types::{Benchmark, SuiteResults};

/// Runs every benchmark once per round, for a fixed number of rounds.
///
/// Rounds are interleaved (A, B, A, B, ...) so slow drift such as thermal throttling is
/// spread over all benchmarks instead of landing on whichever ran last. Only one benchmark
/// process is alive at a time.
pub struct Orchestrator<R: BenchmarkRunner> {
    runner: R,
    runs: usize,
}

impl<R: BenchmarkRunner> Orchestrator<R> {
    pub fn new(runner: R, runs: usize) -> Self {
        Self { runner, runs }
    }

    #[cfg(test)]
    fn runner(&self) -> &R {
        &self.runner
    }

    pub fn run_suite<W: Write>(
        &mut self,
        benchmarks: &[Benchmark],
        progress: &mut Progress<W>,
    ) -> SuiteResults {
        let mut results = SuiteResults::new();
        for benchmark in benchmarks {
            results.register(&benchmark.name);
        }

        tracing::info!(
            benchmarks = benchmarks.len(),
            runs = self.runs,
            "starting suite"
        );

        for round in 1..=self.runs {
            progress.round_started(round, self.runs);

            for benchmark in benchmarks {
                let outcome = self.runner.run(benchmark);
                progress.run_finished(&outcome);
                results.record(&benchmark.name, outcome);
            }

            progress.round_finished();
        }

        tracing::info!("suite finished");
        results
    }
}
