//! In-process measurement engine.
//!
//! A [`Benchmark`] drives one workload through the prepare, run and finish
//! phases and samples the process-wide instruments in [`instrument`] around
//! every run. Only one session may be active per process.

pub mod instrument;
pub mod stats;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::definition::{Assertion, AssertionTarget, BenchmarkDefinition, Metric, RunMode, TestMode};
use crate::error::{BenchmarkException, BridgeError, Result};
use crate::harness::BenchConfig;

use instrument::{Delta, Probe};
use stats::{MetricStatistics, RunSample};

static ACTIVE_SESSION: AtomicBool = AtomicBool::new(false);
static SESSIONS_PREPARED: AtomicU64 = AtomicU64::new(0);

/// Number of prepare phases entered since process start.
pub fn sessions_prepared() -> u64 {
    SESSIONS_PREPARED.load(Ordering::SeqCst)
}

/// One call of the code under measurement.
pub trait Workload {
    fn name(&self) -> &str;

    /// Performs exactly one iteration. Panics are caught by the engine.
    fn invoke_once(&mut self);
}

/// Run-phase shape after profile defaults are applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolvedRunMode {
    Iterations { runs: u32 },
    Throughput { runs: u32, run_time: Duration },
}

#[derive(Clone, Debug, PartialEq)]
pub struct BenchmarkSettings {
    pub run_mode: ResolvedRunMode,
    pub warmup_invocations: u64,
    pub metrics: Vec<Metric>,
    pub assertions: Vec<Assertion>,
}

impl BenchmarkSettings {
    pub fn from_definition(def: &BenchmarkDefinition, cfg: &BenchConfig) -> Self {
        let run_mode = match def.run_mode {
            RunMode::Iterations { runs } => ResolvedRunMode::Iterations {
                runs: runs.unwrap_or_else(|| cfg.iteration_runs()).max(1),
            },
            RunMode::Throughput { run_time } => ResolvedRunMode::Throughput {
                runs: 1,
                run_time: run_time.unwrap_or_else(|| cfg.throughput_window()),
            },
        };
        let assertions = match def.test_mode {
            TestMode::Test => def.assertions.clone(),
            TestMode::Measurement => Vec::new(),
        };
        Self {
            run_mode,
            warmup_invocations: if def.skip_warmups {
                0
            } else {
                cfg.warmup_invocations()
            },
            metrics: def.tracked_metrics(),
            assertions,
        }
    }
}

/// Marks the single active session; dropping it ends the session.
#[derive(Debug)]
pub struct SessionGuard {
    _private: (),
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        ACTIVE_SESSION.store(false, Ordering::SeqCst);
    }
}

/// Raw engine output for one finished session.
#[derive(Clone, Debug, Default)]
pub struct BenchmarkResults {
    pub stats_by_metric: Vec<(Metric, MetricStatistics)>,
    pub assertion_results: Vec<(bool, String)>,
    pub exceptions: Vec<BenchmarkException>,
}

pub struct Benchmark<'w> {
    settings: BenchmarkSettings,
    workload: &'w mut dyn Workload,
    probe: Probe,
    runs: Vec<Delta>,
    invocations: Vec<u64>,
    exceptions: Vec<BenchmarkException>,
}

impl<'w> Benchmark<'w> {
    pub fn new(settings: BenchmarkSettings, workload: &'w mut dyn Workload) -> Self {
        let probe = Probe::new(&settings.metrics);
        Self {
            settings,
            workload,
            probe,
            runs: Vec::new(),
            invocations: Vec::new(),
            exceptions: Vec::new(),
        }
    }

    /// Claims the process-wide session and zeroes every instrument.
    ///
    /// Fails with [`BridgeError::ConcurrentRun`] instead of waiting when
    /// another session is active.
    pub fn prepare_for_run() -> Result<SessionGuard> {
        if ACTIVE_SESSION
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BridgeError::ConcurrentRun);
        }
        SESSIONS_PREPARED.fetch_add(1, Ordering::SeqCst);
        instrument::reset();
        Ok(SessionGuard { _private: () })
    }

    pub fn run(&mut self) {
        if self.settings.metrics.contains(&Metric::TotalBytesAllocated)
            && !instrument::allocator_installed()
        {
            tracing::warn!(
                benchmark = %self.workload.name(),
                "CountingAllocator is not the global allocator; memory metrics will read 0"
            );
        }

        if let Err(e) = self.warmup() {
            self.exceptions.push(e);
            return;
        }

        let (runs, window) = match self.settings.run_mode {
            ResolvedRunMode::Iterations { runs } => (runs, None),
            ResolvedRunMode::Throughput { runs, run_time } => (runs, Some(run_time)),
        };

        for run in 0..runs as usize {
            let start = self.probe.start();
            let outcome = match window {
                None => invoke_guarded(self.workload).map(|()| 1),
                Some(window) => invoke_for(self.workload, window),
            };
            let end = self.probe.stop();

            match outcome {
                Ok(invocations) => {
                    self.runs.push(Delta::between(&start, &end));
                    self.invocations.push(invocations);
                }
                Err(message) => {
                    self.exceptions.push(BenchmarkException {
                        run: Some(run),
                        message,
                    });
                    return;
                }
            }
        }
    }

    fn warmup(&mut self) -> std::result::Result<(), BenchmarkException> {
        let to_exception = |message| BenchmarkException { run: None, message };
        if self.settings.warmup_invocations == 0 {
            return Ok(());
        }
        match self.settings.run_mode {
            ResolvedRunMode::Iterations { .. } => {
                for _ in 0..self.settings.warmup_invocations {
                    invoke_guarded(self.workload).map_err(to_exception)?;
                }
            }
            ResolvedRunMode::Throughput { run_time, .. } => {
                invoke_for(self.workload, run_time / 10).map_err(to_exception)?;
            }
        }
        Ok(())
    }

    /// Closes measurement and evaluates assertions against the collected runs.
    pub fn finish(self) -> BenchmarkResults {
        if !self.exceptions.is_empty() {
            return BenchmarkResults {
                exceptions: self.exceptions,
                ..Default::default()
            };
        }

        let mut counter_index = 0;
        let mut stats_by_metric = Vec::with_capacity(self.settings.metrics.len());
        for metric in &self.settings.metrics {
            let samples = self
                .runs
                .iter()
                .zip(&self.invocations)
                .map(|(delta, &invocations)| RunSample {
                    elapsed: delta.elapsed,
                    invocations,
                    value: delta.value_of(metric, counter_index),
                })
                .collect();
            if matches!(metric, Metric::Counter(_)) {
                counter_index += 1;
            }
            stats_by_metric.push((
                metric.clone(),
                MetricStatistics::from_runs(metric.unit(), samples),
            ));
        }

        let assertion_results = self
            .settings
            .assertions
            .iter()
            .map(|a| {
                let actual = stats_by_metric
                    .iter()
                    .find(|(m, _)| *m == a.metric)
                    .map(|(_, s)| match a.target {
                        AssertionTarget::PerInvocation => s.per_invocation.average,
                        AssertionTarget::PerSecond => s.per_second.average,
                    })
                    .unwrap_or(0.0);
                a.evaluate(actual)
            })
            .collect();

        BenchmarkResults {
            stats_by_metric,
            assertion_results,
            exceptions: Vec::new(),
        }
    }
}

fn invoke_guarded(workload: &mut dyn Workload) -> std::result::Result<(), String> {
    panic::catch_unwind(AssertUnwindSafe(|| workload.invoke_once())).map_err(panic_message)
}

/// Invokes the workload until `window` has elapsed, at least once.
fn invoke_for(workload: &mut dyn Workload, window: Duration) -> std::result::Result<u64, String> {
    let started = Instant::now();
    let mut invocations = 0u64;
    loop {
        invoke_guarded(workload)?;
        invocations += 1;
        if started.elapsed() >= window {
            return Ok(invocations);
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "workload panicked".to_string()
    }
}
