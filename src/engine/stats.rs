use std::time::Duration;

use serde::Serialize;

/// Summary statistics over the per-run values of one metric view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct BenchmarkStat {
    pub average: f64,
    pub max: f64,
    pub min: f64,
    pub standard_deviation: f64,
    pub standard_error: f64,
}

impl BenchmarkStat {
    /// Sample standard deviation (n - 1); a single value has zero spread.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let average = values.iter().sum::<f64>() / n;
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);

        let standard_deviation = if values.len() < 2 {
            0.0
        } else {
            let var = values.iter().map(|v| (v - average).powi(2)).sum::<f64>() / (n - 1.0);
            var.sqrt()
        };

        Self {
            average,
            max,
            min,
            standard_deviation,
            standard_error: standard_deviation / n.sqrt(),
        }
    }
}

/// One measured run of a metric.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RunSample {
    pub elapsed: Duration,
    pub invocations: u64,
    pub value: f64,
}

impl RunSample {
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn per_second(&self) -> f64 {
        let secs = self.elapsed_seconds();
        if secs <= 0.0 {
            0.0
        } else {
            self.value / secs
        }
    }

    pub fn per_invocation(&self) -> f64 {
        self.value / (self.invocations.max(1) as f64)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricStatistics {
    pub unit: String,
    pub per_second: BenchmarkStat,
    pub per_invocation: BenchmarkStat,
    #[serde(skip)]
    pub runs: Vec<RunSample>,
}

impl MetricStatistics {
    pub fn from_runs(unit: &str, runs: Vec<RunSample>) -> Self {
        let per_second: Vec<f64> = runs.iter().map(RunSample::per_second).collect();
        let per_invocation: Vec<f64> = runs.iter().map(RunSample::per_invocation).collect();
        Self {
            unit: unit.to_string(),
            per_second: BenchmarkStat::from_values(&per_second),
            per_invocation: BenchmarkStat::from_values(&per_invocation),
            runs,
        }
    }
}
