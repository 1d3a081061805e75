//! Maps a benchmark run onto the host test's pass/fail outcome.

use std::time::Duration;

use crate::error::{AggregateError, BridgeError, Result};
use crate::runner::BenchmarkRunResult;

/// Pass/fail tally of one translated run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Duration reported to the host runner.
    pub time: Duration,
    pub total: usize,
    pub failed: usize,
}

pub struct ResultTranslator;

impl ResultTranslator {
    /// Exceptions win over assertions: when present, no assertion is looked at.
    /// Otherwise every assertion is checked and each failing message is kept.
    pub fn translate(result: &BenchmarkRunResult) -> Result<RunSummary> {
        if result.has_exceptions() {
            return Err(BridgeError::EngineExecution {
                method: result.method.clone(),
                source: AggregateError {
                    exceptions: result.exceptions.clone(),
                },
            });
        }

        let mut summary = RunSummary {
            time: result.elapsed,
            ..Default::default()
        };
        let mut failures = Vec::new();
        for outcome in &result.assertions {
            summary.total += 1;
            if !outcome.passed {
                summary.failed += 1;
                failures.push(outcome.message.clone());
            }
        }

        if failures.is_empty() {
            Ok(summary)
        } else {
            Err(BridgeError::AssertionFailed {
                method: result.method.clone(),
                failures,
            })
        }
    }
}
