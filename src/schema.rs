use serde::Serialize;

use crate::adapter::InvocationRecord;
use crate::definition::Metric;
use crate::engine::stats::BenchmarkStat;

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub bridge_version: String,
    pub profile: String,
    pub seed: u64,
    /// Seconds since the Unix epoch.
    pub timestamp_unix: u64,
    pub git_sha: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssertionEntry {
    pub passed: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricEntry {
    pub metric: Metric,
    pub unit: String,
    pub runs: usize,
    pub per_second: BenchmarkStat,
    pub per_invocation: BenchmarkStat,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    /// Case label, including theory arguments.
    pub name: String,
    pub method: String,
    pub description: String,
    pub passed: bool,
    pub duration_s: f64,
    pub assertions: Vec<AssertionEntry>,
    pub metrics: Vec<MetricEntry>,
    pub error: Option<String>,
}

impl BenchmarkReport {
    pub fn from_record(name: &str, record: &InvocationRecord) -> Self {
        let result = &record.result;
        Self {
            name: name.to_string(),
            method: result.method.clone(),
            description: record.definition.description.clone(),
            passed: record.verdict.is_ok(),
            duration_s: result.elapsed.as_secs_f64(),
            assertions: result
                .assertions
                .iter()
                .map(|a| AssertionEntry {
                    passed: a.passed,
                    message: a.message.clone(),
                })
                .collect(),
            metrics: result
                .metrics
                .iter()
                .map(|(metric, stats)| MetricEntry {
                    metric: metric.clone(),
                    unit: stats.unit.clone(),
                    runs: stats.runs.len(),
                    per_second: stats.per_second,
                    per_invocation: stats.per_invocation,
                })
                .collect(),
            error: record.verdict.as_ref().err().map(ToString::to_string),
        }
    }

    /// Report for a case that never reached the engine.
    pub fn from_error(name: &str, method: &str, error: &crate::error::BridgeError) -> Self {
        Self {
            name: name.to_string(),
            method: method.to_string(),
            description: String::new(),
            passed: false,
            duration_s: 0.0,
            assertions: Vec::new(),
            metrics: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub run: RunMeta,
    pub benchmarks: Vec<BenchmarkReport>,
}

impl SuiteReport {
    pub fn failed(&self) -> usize {
        self.benchmarks.iter().filter(|b| !b.passed).count()
    }
}
