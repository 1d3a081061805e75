//! Declarative benchmark metadata attached to a test method.
//!
//! A [`BenchmarkDefinition`] is built once per class through
//! [`BenchmarkDefinition::builder`] and never mutated afterwards.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// How the workload is repeated during the run phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// A fixed number of runs, each invoking the workload exactly once.
    /// `None` uses the profile default.
    Iterations { runs: Option<u32> },
    /// Each run invokes the workload as often as fits in `run_time`.
    /// `None` uses the profile default window.
    Throughput { run_time: Option<Duration> },
}

impl Default for RunMode {
    fn default() -> Self {
        RunMode::Iterations { runs: None }
    }
}

/// Whether declared assertions are checked after the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TestMode {
    #[default]
    Test,
    /// Collect statistics only; assertions are ignored.
    Measurement,
}

/// A quantity the engine can sample around each run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    TotalBytesAllocated,
    Counter(String),
    ElapsedTime,
}

impl Metric {
    pub fn counter(name: impl Into<String>) -> Self {
        Metric::Counter(name.into())
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::TotalBytesAllocated => "bytes",
            Metric::Counter(_) => "operations",
            Metric::ElapsedTime => "ms",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::TotalBytesAllocated => f.write_str("[Memory] TotalBytesAllocated"),
            Metric::Counter(name) => write!(f, "[Counter] {name}"),
            Metric::ElapsedTime => f.write_str("[Timing] ElapsedTime"),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Comparison applied to the observed value, thresholds included.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MustBe {
    LessThan(f64),
    LessThanOrEqualTo(f64),
    GreaterThan(f64),
    GreaterThanOrEqualTo(f64),
    ExactlyEqualTo(f64),
    /// Inclusive on both ends.
    Between(f64, f64),
}

impl MustBe {
    pub fn test(&self, actual: f64) -> bool {
        match *self {
            MustBe::LessThan(t) => actual < t,
            MustBe::LessThanOrEqualTo(t) => actual <= t,
            MustBe::GreaterThan(t) => actual > t,
            MustBe::GreaterThanOrEqualTo(t) => actual >= t,
            MustBe::ExactlyEqualTo(t) => actual == t,
            MustBe::Between(lo, hi) => lo <= actual && actual <= hi,
        }
    }

    fn describe(&self, unit: &str) -> String {
        match *self {
            MustBe::LessThan(t) => format!("must be less than {t:.2} {unit}"),
            MustBe::LessThanOrEqualTo(t) => format!("must be less than or equal to {t:.2} {unit}"),
            MustBe::GreaterThan(t) => format!("must be greater than {t:.2} {unit}"),
            MustBe::GreaterThanOrEqualTo(t) => {
                format!("must be greater than or equal to {t:.2} {unit}")
            }
            MustBe::ExactlyEqualTo(t) => format!("must be exactly {t:.2} {unit}"),
            MustBe::Between(lo, hi) => format!("must be between {lo:.2} {unit} and {hi:.2} {unit}"),
        }
    }
}

/// Which statistic view an assertion reads its average from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssertionTarget {
    #[default]
    PerInvocation,
    PerSecond,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assertion {
    pub metric: Metric,
    pub must_be: MustBe,
    pub target: AssertionTarget,
}

impl Assertion {
    /// Checks `actual` and renders the outcome message.
    pub fn evaluate(&self, actual: f64) -> (bool, String) {
        let passed = self.must_be.test(actual);
        let unit = match self.target {
            AssertionTarget::PerInvocation => self.metric.unit().to_string(),
            AssertionTarget::PerSecond => format!("{} / s", self.metric.unit()),
        };
        let message = format!(
            "[{}] Expected {} to {}; actual value was {actual:.2} {unit}.",
            if passed { "PASS" } else { "FAIL" },
            self.metric,
            self.must_be.describe(&unit),
        );
        (passed, message)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BenchmarkDefinition {
    /// Name of the test method this benchmark decorates.
    pub method: &'static str,
    pub description: String,
    pub run_mode: RunMode,
    pub test_mode: TestMode,
    pub skip_warmups: bool,
    /// Metrics in declaration order; the report and elapsed-time lookup follow it.
    pub measurements: Vec<Metric>,
    pub assertions: Vec<Assertion>,
}

impl BenchmarkDefinition {
    pub fn builder(method: &'static str) -> BenchmarkDefinitionBuilder {
        BenchmarkDefinitionBuilder {
            def: BenchmarkDefinition {
                method,
                description: method.to_string(),
                run_mode: RunMode::default(),
                test_mode: TestMode::default(),
                skip_warmups: false,
                measurements: Vec::new(),
                assertions: Vec::new(),
            },
        }
    }

    /// Declared measurements followed by any metric only named in an assertion.
    pub fn tracked_metrics(&self) -> Vec<Metric> {
        let mut metrics = self.measurements.clone();
        for a in &self.assertions {
            if !metrics.contains(&a.metric) {
                metrics.push(a.metric.clone());
            }
        }
        metrics
    }
}

pub struct BenchmarkDefinitionBuilder {
    def: BenchmarkDefinition,
}

impl BenchmarkDefinitionBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.def.description = description.into();
        self
    }

    pub fn iterations(mut self, runs: u32) -> Self {
        self.def.run_mode = RunMode::Iterations {
            runs: Some(runs.max(1)),
        };
        self
    }

    pub fn run_mode(mut self, run_mode: RunMode) -> Self {
        self.def.run_mode = run_mode;
        self
    }

    pub fn throughput(mut self) -> Self {
        self.def.run_mode = RunMode::Throughput { run_time: None };
        self
    }

    pub fn test_mode(mut self, test_mode: TestMode) -> Self {
        self.def.test_mode = test_mode;
        self
    }

    pub fn skip_warmups(mut self) -> Self {
        self.def.skip_warmups = true;
        self
    }

    pub fn measure(mut self, metric: Metric) -> Self {
        if !self.def.measurements.contains(&metric) {
            self.def.measurements.push(metric);
        }
        self
    }

    pub fn assert(mut self, metric: Metric, must_be: MustBe, target: AssertionTarget) -> Self {
        self.def.assertions.push(Assertion {
            metric,
            must_be,
            target,
        });
        self
    }

    pub fn assert_memory(self, must_be: MustBe) -> Self {
        self.assert(
            Metric::TotalBytesAllocated,
            must_be,
            AssertionTarget::PerInvocation,
        )
    }

    pub fn assert_counter_throughput(self, counter: &str, must_be: MustBe) -> Self {
        self.assert(
            Metric::counter(counter),
            must_be,
            AssertionTarget::PerSecond,
        )
    }

    pub fn assert_counter_total(self, counter: &str, must_be: MustBe) -> Self {
        self.assert(
            Metric::counter(counter),
            must_be,
            AssertionTarget::PerInvocation,
        )
    }

    pub fn assert_elapsed(self, must_be: MustBe) -> Self {
        self.assert(Metric::ElapsedTime, must_be, AssertionTarget::PerInvocation)
    }

    pub fn build(self) -> BenchmarkDefinition {
        self.def
    }
}
