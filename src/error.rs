//! Error types for the benchmark/test bridge.

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// A failure raised from inside a measured workload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", run_label(.run))]
pub struct BenchmarkException {
    /// Zero-based run index in which the exception occurred; `None` during warmup.
    pub run: Option<usize>,
    pub message: String,
}

/// Every exception an engine run reported, combined into one error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "{} exception(s) raised during benchmark run{}",
    .exceptions.len(),
    parenthesized(.exceptions)
)]
pub struct AggregateError {
    pub exceptions: Vec<BenchmarkException>,
}

fn run_label(run: &Option<usize>) -> String {
    match run {
        Some(run) => format!("run {run}"),
        None => "warmup".to_string(),
    }
}

fn parenthesized(exceptions: &[BenchmarkException]) -> String {
    exceptions.iter().map(|e| format!(" ({e})")).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The invoked test method carries no benchmark definition.
    #[error("no benchmark declared for method `{method}` on `{class}`")]
    BenchmarkNotFound { class: &'static str, method: String },

    #[error("{count} benchmarks declared for method `{method}` on `{class}`")]
    AmbiguousBenchmark {
        class: &'static str,
        method: String,
        count: usize,
    },

    #[error("benchmark `{method}` failed: {source}")]
    EngineExecution {
        method: String,
        #[source]
        source: AggregateError,
    },

    #[error(
        "benchmark `{method}` failed {} assertion(s):\n{}",
        .failures.len(),
        .failures.join("\n")
    )]
    AssertionFailed {
        method: String,
        failures: Vec<String>,
    },

    /// Another benchmark session is already active in this process.
    #[error("a benchmark run is already active in this process; disable test parallelism")]
    ConcurrentRun,

    #[error("benchmark worker failed: {0}")]
    Worker(String),
}

impl BridgeError {
    /// Failing assertion messages, empty for every other kind of error.
    pub fn assertion_failures(&self) -> &[String] {
        match self {
            BridgeError::AssertionFailed { failures, .. } => failures,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_lists_every_exception() {
        let err = AggregateError {
            exceptions: vec![
                BenchmarkException {
                    run: None,
                    message: "boom".to_string(),
                },
                BenchmarkException {
                    run: Some(2),
                    message: "again".to_string(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("2 exception(s)"));
        assert!(text.contains("(warmup: boom)"));
        assert!(text.contains("(run 2: again)"));
    }

    #[test]
    fn test_assertion_failed_message_carries_all_failures() {
        let err = BridgeError::AssertionFailed {
            method: "m".to_string(),
            failures: vec!["first".to_string(), "second".to_string()],
        };
        let text = err.to_string();
        assert!(text.contains("failed 2 assertion(s)"));
        assert!(text.contains("first\nsecond"));
        assert_eq!(err.assertion_failures().len(), 2);
    }
}
