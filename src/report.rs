//! Human-readable run report written to the host's trace channel.

use std::sync::Mutex;

use crate::engine::stats::BenchmarkStat;
use crate::runner::BenchmarkRunResult;

/// Line-oriented diagnostic output of the running test.
pub trait OutputSink: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Forwards each line to `tracing` at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TraceSink;

impl OutputSink for TraceSink {
    fn write_line(&self, line: &str) {
        tracing::info!(target: "bench_test_bridge::output", "{line}");
    }
}

/// Prints to stdout, which libtest captures per test.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write_line(&self, line: &str) {
        println!("{line}");
    }
}

#[derive(Debug, Default)]
pub struct BufferSink {
    lines: Mutex<Vec<String>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl OutputSink for BufferSink {
    fn write_line(&self, line: &str) {
        let mut lines = match self.lines.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push(line.to_string());
    }
}

pub const NO_ASSERTIONS: &str = "No assertions returned.";
pub const NO_MEASUREMENTS: &str = "No measurements returned.";
pub const MEASUREMENTS_HEADER: &str = "---------- Measurements ----------";

pub struct ReportEmitter;

impl ReportEmitter {
    pub fn emit(result: &BenchmarkRunResult, sink: &dyn OutputSink) {
        sink.write_line("");

        if result.assertions.is_empty() {
            sink.write_line(NO_ASSERTIONS);
        } else {
            for assertion in &result.assertions {
                sink.write_line(&assertion.message);
                sink.write_line("");
            }
        }

        sink.write_line("");
        sink.write_line(MEASUREMENTS_HEADER);
        sink.write_line("");

        if result.metrics.is_empty() {
            sink.write_line(NO_MEASUREMENTS);
            return;
        }

        for (metric, stats) in &result.metrics {
            sink.write_line(&format!("Metric : {metric}"));
            sink.write_line("");
            sink.write_line(&format!("Per Second ( {} / s )", stats.unit));
            write_stat(sink, &stats.per_second);
            sink.write_line("");
            sink.write_line(&format!("Per Invocation ( {} )", stats.unit));
            write_stat(sink, &stats.per_invocation);
            sink.write_line("");
            sink.write_line("----------");
            sink.write_line("");
        }
    }
}

fn write_stat(sink: &dyn OutputSink, stat: &BenchmarkStat) {
    sink.write_line(&format!("Average         : {:.2}", stat.average));
    sink.write_line(&format!("Max             : {:.2}", stat.max));
    sink.write_line(&format!("Min             : {:.2}", stat.min));
    sink.write_line(&format!("Std. Deviation  : {:.2}", stat.standard_deviation));
    sink.write_line(&format!("Std. Error      : {:.2}", stat.standard_error));
}
