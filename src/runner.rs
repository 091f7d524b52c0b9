use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};

use crate::config::RunnerConfig;
use crate::errors::RunFailure;
use crate::sampler::{ResourceProbe, Sampler, SystemProbe};
use crate::stats::IntervalStats;
use crate::types::{Benchmark, Metrics, RunOutcome, Sample};

/// Keys the runner always adds to a successful run, in report column order.
pub const RESOURCE_KEYS: [&str; 6] = [
    "cpu_avg",
    "cpu_p75",
    "cpu_p25",
    "memory_avg",
    "memory_p75",
    "memory_p25",
];

const STDERR_TAIL_LINES: usize = 5;

/// Runs a single benchmark to completion and classifies the result.
pub trait BenchmarkRunner {
    fn run(&mut self, benchmark: &Benchmark) -> RunOutcome;
}

/// Launches benchmarks as child processes and samples resources while they run.
pub struct ProcessRunner<P: ResourceProbe = SystemProbe> {
    config: RunnerConfig,
    probe: P,
}

impl ProcessRunner<SystemProbe> {
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_probe(config, SystemProbe::new())
    }
}

impl<P: ResourceProbe> ProcessRunner<P> {
    pub fn with_probe(config: RunnerConfig, probe: P) -> Self {
        Self { config, probe }
    }

    fn command_for(&self, benchmark: &Benchmark) -> Command {
        let mut cmd = match &self.config.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(&benchmark.path);
                cmd
            }
            None => Command::new(&benchmark.path),
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn execute(&mut self, benchmark: &Benchmark) -> Result<Metrics, RunFailure> {
        thread::sleep(self.config.settle_delay);

        let baseline_mb = self.probe.used_memory_mb();

        let mut child = self
            .command_for(benchmark)
            .spawn()
            .map_err(|e| RunFailure::SpawnFailed(e.to_string()))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let samples: Vec<Sample> = Sampler::new(
            &mut child,
            &mut self.probe,
            baseline_mb,
            self.config.sample_interval,
        )
        .collect();

        let status = child
            .wait()
            .map_err(|e| RunFailure::WaitFailed(e.to_string()));
        let stdout = collect(stdout);
        let stderr = collect(stderr);

        tracing::debug!(
            benchmark = %benchmark.name,
            samples = samples.len(),
            stdout_bytes = stdout.len(),
            "benchmark exited"
        );

        let status = status?;
        if !status.success() {
            log_stderr_tail(benchmark, &stderr);
            return Err(RunFailure::NonZeroExit {
                code: status.code(),
            });
        }

        let reported = parse_reported_metrics(&stdout)?;
        Ok(merge_metrics(&samples, reported))
    }
}

impl<P: ResourceProbe> BenchmarkRunner for ProcessRunner<P> {
    fn run(&mut self, benchmark: &Benchmark) -> RunOutcome {
        match self.execute(benchmark) {
            Ok(metrics) => RunOutcome::Completed(metrics),
            Err(failure) => {
                tracing::warn!(benchmark = %benchmark.name, %failure, "benchmark run failed");
                RunOutcome::Failed(failure)
            }
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(error) = pipe.read_to_end(&mut buf) {
                tracing::debug!(%error, bytes = buf.len(), "child output truncated");
            }
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn log_stderr_tail(benchmark: &Benchmark, stderr: &str) {
    let lines: Vec<&str> = stderr.lines().collect();
    if lines.is_empty() {
        return;
    }
    let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
    tracing::warn!(benchmark = %benchmark.name, stderr = %tail, "benchmark stderr");
}

/// Parse the benchmark's self-reported metrics from the last line of its stdout.
///
/// The line must be a JSON object whose values are all numbers.
pub fn parse_reported_metrics(stdout: &str) -> Result<Metrics, RunFailure> {
    let last_line = stdout.lines().last().ok_or(RunFailure::MissingOutput)?;

    let value: serde_json::Value = serde_json::from_str(last_line)
        .map_err(|e| RunFailure::MalformedOutput(e.to_string()))?;

    let object = match value {
        serde_json::Value::Object(map) => map,
        _ => return Err(RunFailure::NotAnObject),
    };

    let mut metrics = Metrics::new();
    for (key, value) in object {
        let number = value
            .as_f64()
            .ok_or_else(|| RunFailure::NonNumericMetric { key: key.clone() })?;
        metrics.insert(key, number);
    }
    Ok(metrics)
}

/// Resource stats for a run, keyed by [`RESOURCE_KEYS`]. No samples means all zeros.
pub fn resource_metrics(samples: &[Sample]) -> Metrics {
    let cpu: Vec<f64> = samples.iter().map(|s| s.cpu_percent).collect();
    let memory: Vec<f64> = samples.iter().map(|s| s.memory_delta_mb).collect();

    let cpu = IntervalStats::from_samples(&cpu).unwrap_or_default();
    let memory = IntervalStats::from_samples(&memory).unwrap_or_default();

    let values = [cpu.avg, cpu.p75, cpu.p25, memory.avg, memory.p75, memory.p25];
    RESOURCE_KEYS.iter().copied().zip(values).collect()
}

/// Resource stats first, then the benchmark's own metrics. Reported values win on collision.
pub fn merge_metrics(samples: &[Sample], reported: Metrics) -> Metrics {
    let mut merged = resource_metrics(samples);
    for (key, value) in reported.iter() {
        merged.insert(key, value);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::tests::ScriptedProbe;
    use chrono::Utc;
    use std::time::Duration;

    fn sample(cpu: f64, mem: f64) -> Sample {
        Sample {
            taken_at: Utc::now(),
            cpu_percent: cpu,
            memory_delta_mb: mem,
        }
    }

    // --- parse_reported_metrics ---

    #[test]
    fn parses_last_line_only() {
        let out = "epoch 1/5\nloss 0.3\n{\"fit_time\": 1.5, \"dataset_processing_time\": 0.25}\n";
        let metrics = parse_reported_metrics(out).unwrap();
        let keys: Vec<&str> = metrics.keys().collect();
        assert_eq!(keys, vec!["fit_time", "dataset_processing_time"]);
        assert_eq!(metrics.get("fit_time"), Some(1.5));
    }

    #[test]
    fn integer_values_accepted() {
        let metrics = parse_reported_metrics("{\"ops\": 12}").unwrap();
        assert_eq!(metrics.get("ops"), Some(12.0));
    }

    #[test]
    fn empty_output_is_missing() {
        assert_eq!(parse_reported_metrics(""), Err(RunFailure::MissingOutput));
    }

    #[test]
    fn trailing_blank_line_is_malformed() {
        let result = parse_reported_metrics("{\"a\": 1}\n\n");
        assert!(matches!(result, Err(RunFailure::MalformedOutput(_))));
    }

    #[test]
    fn garbage_is_malformed() {
        let result = parse_reported_metrics("done!");
        assert!(matches!(result, Err(RunFailure::MalformedOutput(_))));
    }

    #[test]
    fn array_is_not_an_object() {
        assert_eq!(parse_reported_metrics("[1, 2]"), Err(RunFailure::NotAnObject));
    }

    #[test]
    fn string_value_rejected() {
        assert_eq!(
            parse_reported_metrics("{\"a\": 1, \"b\": \"fast\"}"),
            Err(RunFailure::NonNumericMetric {
                key: "b".to_string()
            })
        );
    }

    // --- merge_metrics ---

    #[test]
    fn resource_keys_come_first() {
        let reported: Metrics = [("fit_time", 2.0)].into_iter().collect();
        let merged = merge_metrics(&[sample(50.0, 10.0)], reported);

        let keys: Vec<&str> = merged.keys().collect();
        assert_eq!(
            keys,
            vec![
                "cpu_avg",
                "cpu_p75",
                "cpu_p25",
                "memory_avg",
                "memory_p75",
                "memory_p25",
                "fit_time"
            ]
        );
        assert_eq!(merged.get("cpu_avg"), Some(50.0));
        assert_eq!(merged.get("memory_p25"), Some(10.0));
    }

    #[test]
    fn reported_key_overrides_computed() {
        let reported: Metrics = [("cpu_avg", 99.0)].into_iter().collect();
        let merged = merge_metrics(&[sample(10.0, 0.0), sample(20.0, 0.0)], reported);

        assert_eq!(merged.get("cpu_avg"), Some(99.0));
        assert_eq!(merged.get("cpu_p75"), Some(20.0));
        assert_eq!(merged.len(), 6);
    }

    #[test]
    fn no_samples_gives_zeroes() {
        let metrics = resource_metrics(&[]);
        assert_eq!(metrics.len(), 6);
        assert!(metrics.iter().all(|(_, v)| v == 0.0));
    }

    // --- ProcessRunner ---

    fn fast_config() -> RunnerConfig {
        RunnerConfig {
            settle_delay: Duration::ZERO,
            sample_interval: Duration::from_millis(20),
            interpreter: Some("sh".to_string()),
        }
    }

    fn script(dir: &assert_fs::TempDir, name: &str, body: &str) -> Benchmark {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        Benchmark {
            name: name.to_string(),
            path,
        }
    }

    #[cfg(unix)]
    #[test]
    fn successful_script_is_completed() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let bench = script(
            &tmp,
            "ok.sh",
            "echo warming up\nsleep 0.1\necho '{\"score\": 7, \"cpu_avg\": 99}'\n",
        );
        let probe = ScriptedProbe::new(vec![25.0], vec![0.0]);
        let mut runner = ProcessRunner::with_probe(fast_config(), probe);

        let outcome = runner.run(&bench);
        let metrics = outcome.metrics().expect("run should complete");
        assert_eq!(metrics.get("score"), Some(7.0));
        assert_eq!(metrics.get("cpu_avg"), Some(99.0));
        assert!(metrics.get("memory_avg").is_some());
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_fails() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let bench = script(&tmp, "boom.sh", "echo '{\"a\": 1}'\necho oops >&2\nexit 3\n");
        let mut runner = ProcessRunner::with_probe(fast_config(), ScriptedProbe::new(vec![0.0], vec![0.0]));

        assert_eq!(
            runner.run(&bench),
            RunOutcome::Failed(RunFailure::NonZeroExit { code: Some(3) })
        );
    }

    #[cfg(unix)]
    #[test]
    fn malformed_output_fails() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let bench = script(&tmp, "chatty.sh", "echo not json\n");
        let mut runner = ProcessRunner::with_probe(fast_config(), ScriptedProbe::new(vec![0.0], vec![0.0]));

        assert!(matches!(
            runner.run(&bench),
            RunOutcome::Failed(RunFailure::MalformedOutput(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn large_output_does_not_block() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let bench = script(
            &tmp,
            "loud.sh",
            "i=0\nwhile [ $i -lt 20000 ]; do echo \"line $i padding padding padding\"; i=$((i+1)); done\necho '{\"n\": 20000}'\n",
        );
        let mut runner = ProcessRunner::with_probe(fast_config(), ScriptedProbe::new(vec![0.0], vec![0.0]));

        let outcome = runner.run(&bench);
        assert_eq!(outcome.metrics().and_then(|m| m.get("n")), Some(20000.0));
    }

    #[cfg(unix)]
    #[test]
    fn executable_runs_without_interpreter() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = assert_fs::TempDir::new().unwrap();
        let bench = script(&tmp, "direct.sh", "#!/bin/sh\necho '{\"v\": 4}'\n");
        std::fs::set_permissions(&bench.path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = RunnerConfig {
            interpreter: None,
            ..fast_config()
        };
        let mut runner = ProcessRunner::with_probe(config, ScriptedProbe::new(vec![0.0], vec![0.0]));

        let outcome = runner.run(&bench);
        assert_eq!(outcome.metrics().and_then(|m| m.get("v")), Some(4.0));
    }

    /// Yields some bytes, then fails like a broken pipe.
    struct FailingReader {
        sent: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.sent {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
            }
            self.sent = true;
            buf[..5].copy_from_slice(b"epoch");
            Ok(5)
        }
    }

    #[test]
    fn read_error_keeps_partial_output() {
        let handle = drain(Some(FailingReader { sent: false }));
        assert_eq!(collect(handle), "epoch");
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let config = RunnerConfig {
            interpreter: None,
            ..fast_config()
        };
        let bench = Benchmark {
            name: "ghost".to_string(),
            path: "/nonexistent/miramark/ghost".into(),
        };
        let mut runner = ProcessRunner::with_probe(config, ScriptedProbe::new(vec![0.0], vec![0.0]));

        assert!(matches!(
            runner.run(&bench),
            RunOutcome::Failed(RunFailure::SpawnFailed(_))
        ));
    }
}
