use std::process::Child;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use sysinfo::{MINIMUM_CPU_UPDATE_INTERVAL, System};

use crate::types::Sample;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Source of CPU and memory readings.
pub trait ResourceProbe {
    /// Memory currently in use, in megabytes.
    fn used_memory_mb(&mut self) -> f64;

    /// CPU utilization percentage measured across `interval`. Blocks for the interval.
    fn cpu_percent_over(&mut self, interval: Duration) -> f64;
}

/// System-wide readings through `sysinfo`.
pub struct SystemProbe {
    system: System,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProbe for SystemProbe {
    fn used_memory_mb(&mut self) -> f64 {
        self.system.refresh_memory();
        self.system.used_memory() as f64 / BYTES_PER_MB
    }

    fn cpu_percent_over(&mut self, interval: Duration) -> f64 {
        self.system.refresh_cpu_usage();
        thread::sleep(interval.max(MINIMUM_CPU_UPDATE_INTERVAL));
        self.system.refresh_cpu_usage();
        self.system.global_cpu_usage() as f64
    }
}

/// Something whose liveness can be polled without blocking.
pub trait Supervised {
    fn is_running(&mut self) -> bool;
}

impl Supervised for Child {
    fn is_running(&mut self) -> bool {
        // An error from try_wait means the status can never be collected; treat as exited.
        matches!(self.try_wait(), Ok(None))
    }
}

/// Yields one [`Sample`] per interval while the supervised process is alive.
///
/// Pacing comes from the blocking CPU measurement, so no separate timer is involved.
/// A process that is already gone on the first poll yields nothing.
pub struct Sampler<'a, S: Supervised, P: ResourceProbe> {
    process: &'a mut S,
    probe: &'a mut P,
    baseline_mb: f64,
    interval: Duration,
}

impl<'a, S: Supervised, P: ResourceProbe> Sampler<'a, S, P> {
    pub fn new(process: &'a mut S, probe: &'a mut P, baseline_mb: f64, interval: Duration) -> Self {
        Self {
            process,
            probe,
            baseline_mb,
            interval,
        }
    }
}

impl<S: Supervised, P: ResourceProbe> Iterator for Sampler<'_, S, P> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        if !self.process.is_running() {
            return None;
        }

        let cpu_percent = self.probe.cpu_percent_over(self.interval);
        let memory_delta_mb = (self.probe.used_memory_mb() - self.baseline_mb).max(0.0);

        Some(Sample {
            taken_at: Utc::now(),
            cpu_percent,
            memory_delta_mb,
        })
    }
}
