use std::time::Duration;

use crate::definition::{BenchmarkDefinition, Metric};
use crate::engine::stats::MetricStatistics;
use crate::engine::{Benchmark, BenchmarkSettings, Workload};
use crate::error::{BenchmarkException, Result};
use crate::harness::BenchConfig;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssertionOutcome {
    pub passed: bool,
    pub message: String,
}

/// Everything one benchmark run produced, handed to translation and reporting.
#[derive(Clone, Debug)]
pub struct BenchmarkRunResult {
    pub method: String,
    pub description: String,
    pub assertions: Vec<AssertionOutcome>,
    /// Definition order.
    pub metrics: Vec<(Metric, MetricStatistics)>,
    /// First run of the first metric; zero when nothing was measured.
    pub elapsed: Duration,
    pub exceptions: Vec<BenchmarkException>,
}

impl BenchmarkRunResult {
    pub fn has_exceptions(&self) -> bool {
        !self.exceptions.is_empty()
    }

    pub fn is_measurement_only(&self) -> bool {
        self.assertions.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct BenchmarkRunner {
    config: BenchConfig,
}

impl BenchmarkRunner {
    pub fn new(config: BenchConfig) -> Self {
        Self { config }
    }

    /// Runs one definition to completion against `workload`.
    ///
    /// Engine exceptions come back inside the result; the only error is a
    /// second session racing this one.
    pub fn execute(
        &self,
        definition: &BenchmarkDefinition,
        workload: &mut dyn Workload,
    ) -> Result<BenchmarkRunResult> {
        let span = tracing::debug_span!("benchmark", method = definition.method);
        let _enter = span.enter();

        let settings = BenchmarkSettings::from_definition(definition, &self.config);
        tracing::debug!(
            run_mode = ?settings.run_mode,
            metrics = settings.metrics.len(),
            assertions = settings.assertions.len(),
            "starting benchmark"
        );

        let results = {
            let _session = Benchmark::prepare_for_run()?;
            let mut benchmark = Benchmark::new(settings, workload);
            benchmark.run();
            benchmark.finish()
        };

        let mut run = BenchmarkRunResult {
            method: definition.method.to_string(),
            description: definition.description.clone(),
            assertions: Vec::new(),
            metrics: Vec::new(),
            elapsed: Duration::ZERO,
            exceptions: results.exceptions,
        };
        if run.has_exceptions() {
            tracing::debug!(count = run.exceptions.len(), "benchmark raised exceptions");
            return Ok(run);
        }

        run.assertions = results
            .assertion_results
            .into_iter()
            .map(|(passed, message)| AssertionOutcome { passed, message })
            .collect();
        run.elapsed = results
            .stats_by_metric
            .first()
            .and_then(|(_, stats)| stats.runs.first())
            .map(|r| r.elapsed)
            .unwrap_or_default();
        run.metrics = results.stats_by_metric;

        tracing::info!(
            method = definition.method,
            elapsed_s = run.elapsed.as_secs_f64(),
            failed = run.assertions.iter().filter(|a| !a.passed).count(),
            "benchmark finished"
        );
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{MustBe, TestMode};
    use crate::engine::instrument;
    use serial_test::serial;

    struct Ticker {
        fail: bool,
    }

    impl Workload for Ticker {
        fn name(&self) -> &str {
            "ticker"
        }

        fn invoke_once(&mut self) {
            instrument::counter("runner.test.ticks").add(3);
            if self.fail {
                panic!("ticker broke");
            }
        }
    }

    #[test]
    #[serial]
    fn test_execute_collects_assertions_and_first_run_elapsed() {
        let def = BenchmarkDefinition::builder("tick")
            .iterations(2)
            .measure(Metric::ElapsedTime)
            .assert_counter_total("runner.test.ticks", MustBe::ExactlyEqualTo(3.0))
            .assert_counter_total("runner.test.ticks", MustBe::LessThan(3.0))
            .build();
        let result = BenchmarkRunner::default()
            .execute(&def, &mut Ticker { fail: false })
            .unwrap();

        assert_eq!(result.method, "tick");
        assert_eq!(result.metrics[0].0, Metric::ElapsedTime);
        assert_eq!(result.metrics[1].0, Metric::counter("runner.test.ticks"));
        assert_eq!(result.elapsed, result.metrics[0].1.runs[0].elapsed);
        assert_eq!(
            result.assertions.iter().map(|a| a.passed).collect::<Vec<_>>(),
            vec![true, false]
        );
    }

    #[test]
    #[serial]
    fn test_exceptions_skip_extraction() {
        let def = BenchmarkDefinition::builder("tick")
            .assert_counter_total("runner.test.ticks", MustBe::GreaterThan(0.0))
            .build();
        let result = BenchmarkRunner::default()
            .execute(&def, &mut Ticker { fail: true })
            .unwrap();

        assert!(result.has_exceptions());
        assert_eq!(result.exceptions[0].message, "ticker broke");
        assert!(result.assertions.is_empty());
        assert!(result.metrics.is_empty());
        assert_eq!(result.elapsed, Duration::ZERO);
    }

    #[test]
    #[serial]
    fn test_measurement_only_has_no_assertions() {
        let def = BenchmarkDefinition::builder("tick")
            .test_mode(TestMode::Measurement)
            .assert_counter_total("runner.test.ticks", MustBe::LessThan(0.0))
            .build();
        let result = BenchmarkRunner::default()
            .execute(&def, &mut Ticker { fail: false })
            .unwrap();

        assert!(result.is_measurement_only());
        assert_eq!(result.metrics.len(), 1);
        assert_eq!(result.metrics[0].1.per_invocation.average, 3.0);
    }

    #[test]
    #[serial]
    fn test_no_metrics_reports_zero_elapsed() {
        let def = BenchmarkDefinition::builder("tick").build();
        let result = BenchmarkRunner::default()
            .execute(&def, &mut Ticker { fail: false })
            .unwrap();
        assert!(result.metrics.is_empty());
        assert_eq!(result.elapsed, Duration::ZERO);
    }
}
