//! Entry point used by tests: runs one test method as a benchmark and
//! reports its outcome the way the test runner expects.
//!
//! The engine's instruments are process-wide, so only one benchmark may run
//! at a time. Tests that invoke benchmarks must run serially, either with
//! `--test-threads=1` or by marking them `#[serial]`. A violation surfaces as
//! [`BridgeError::ConcurrentRun`].

use std::future::Future;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::catalog::{BenchmarkCatalog, BenchmarkClass};
use crate::definition::BenchmarkDefinition;
use crate::error::{BridgeError, Result};
use crate::harness::BenchConfig;
use crate::invoker::{BenchmarkInvoker, TestMethod};
use crate::report::{OutputSink, ReportEmitter, StdoutSink};
use crate::runner::{BenchmarkRunResult, BenchmarkRunner};
use crate::translate::{ResultTranslator, RunSummary};

/// The test runner's "invoke this method and tell me how long it took" hook.
pub trait TestInvoker {
    fn invoke_test_method<C, A>(
        &self,
        instance: C,
        method: TestMethod<C, A>,
        args: A,
    ) -> impl Future<Output = Result<Duration>> + Send
    where
        C: BenchmarkClass,
        A: Send + 'static;
}

/// Full outcome of one invocation, kept for reports.
#[derive(Debug)]
pub struct InvocationRecord {
    pub definition: Arc<BenchmarkDefinition>,
    pub result: BenchmarkRunResult,
    pub verdict: Result<RunSummary>,
}

#[derive(Clone)]
pub struct TestInvocationAdapter {
    config: BenchConfig,
    sink: Arc<dyn OutputSink>,
}

/// Reports go to stdout, which libtest captures and shows for failing tests.
impl Default for TestInvocationAdapter {
    fn default() -> Self {
        Self::new(BenchConfig::from_env(), Arc::new(StdoutSink))
    }
}

impl TestInvocationAdapter {
    pub fn new(config: BenchConfig, sink: Arc<dyn OutputSink>) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Resolves, runs, reports and translates one test case.
    ///
    /// Discovery failures return before any engine phase starts. Assertion
    /// and engine failures are carried in [`InvocationRecord::verdict`].
    pub fn run_case<C, A>(
        &self,
        instance: C,
        method: TestMethod<C, A>,
        args: A,
    ) -> Result<InvocationRecord>
    where
        C: BenchmarkClass,
    {
        let definition = BenchmarkCatalog::for_class::<C>().resolve(method.name)?;
        let mut invoker = BenchmarkInvoker::new(instance, method, args);

        let result = BenchmarkRunner::new(self.config.clone()).execute(&definition, &mut invoker)?;

        if result.has_exceptions() {
            for e in &result.exceptions {
                tracing::error!(method = %result.method, "{e}");
            }
        } else {
            ReportEmitter::emit(&result, self.sink.as_ref());
        }

        let verdict = ResultTranslator::translate(&result);
        Ok(InvocationRecord {
            definition,
            result,
            verdict,
        })
    }

    /// Synchronous form of [`TestInvoker::invoke_test_method`].
    pub fn invoke_blocking<C, A>(
        &self,
        instance: C,
        method: TestMethod<C, A>,
        args: A,
    ) -> Result<Duration>
    where
        C: BenchmarkClass,
    {
        let record = self.run_case(instance, method, args)?;
        record.verdict.map(|summary| summary.time)
    }
}

impl TestInvoker for TestInvocationAdapter {
    /// Runs the benchmark on tokio's blocking pool when called inside a
    /// runtime, on a dedicated thread otherwise. The polling thread only
    /// waits for completion.
    fn invoke_test_method<C, A>(
        &self,
        instance: C,
        method: TestMethod<C, A>,
        args: A,
    ) -> impl Future<Output = Result<Duration>> + Send
    where
        C: BenchmarkClass,
        A: Send + 'static,
    {
        let adapter = self.clone();
        async move {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => handle
                    .spawn_blocking(move || adapter.invoke_blocking(instance, method, args))
                    .await
                    .map_err(|e| BridgeError::Worker(e.to_string()))?,
                Err(_) => {
                    let (tx, rx) = oneshot::channel();
                    thread::Builder::new()
                        .name("bench-worker".to_string())
                        .spawn(move || {
                            let _ = tx.send(adapter.invoke_blocking(instance, method, args));
                        })
                        .map_err(|e| BridgeError::Worker(e.to_string()))?;
                    rx.await.map_err(|_| {
                        BridgeError::Worker("worker exited without a result".to_string())
                    })?
                }
            }
        }
    }
}

/// Fails the calling test with the bridge error, for tests that do not return `Result`.
#[track_caller]
pub fn expect_pass(outcome: Result<Duration>) -> Duration {
    match outcome {
        Ok(duration) => duration,
        Err(e) => panic!("{e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Metric, MustBe, TestMode};
    use crate::engine::{self, instrument};
    use crate::report::{BufferSink, NO_ASSERTIONS};
    use serial_test::serial;
    use std::pin::pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll, Wake, Waker};
    use std::thread::ThreadId;

    struct Widgets {
        made: u64,
    }

    impl Widgets {
        fn make(&mut self, batch: &u64) {
            self.made += batch;
            instrument::counter("adapter.test.widgets").add(*batch);
        }

        fn make_or_fail(&mut self, batch: &u64) {
            if *batch == 0 {
                panic!("empty batch");
            }
            self.make(batch);
        }

        fn undeclared(&mut self, _: &u64) {}
    }

    impl BenchmarkClass for Widgets {
        fn benchmarks() -> Vec<BenchmarkDefinition> {
            vec![
                BenchmarkDefinition::builder("make")
                    .iterations(2)
                    .measure(Metric::ElapsedTime)
                    .assert_counter_total("adapter.test.widgets", MustBe::GreaterThanOrEqualTo(5.0))
                    .assert_counter_total("adapter.test.widgets", MustBe::LessThan(5.0))
                    .build(),
                BenchmarkDefinition::builder("make_or_fail")
                    .iterations(2)
                    .assert_counter_total("adapter.test.widgets", MustBe::GreaterThan(0.0))
                    .build(),
            ]
        }
    }

    struct Measured;

    impl Measured {
        fn spin(&mut self, _: &()) {
            instrument::counter("adapter.test.spins").increment();
        }
    }

    impl BenchmarkClass for Measured {
        fn benchmarks() -> Vec<BenchmarkDefinition> {
            vec![BenchmarkDefinition::builder("spin")
                .test_mode(TestMode::Measurement)
                .measure(Metric::counter("adapter.test.spins"))
                .assert_counter_total("adapter.test.spins", MustBe::LessThan(0.0))
                .build()]
        }
    }

    struct ThreadRecorder {
        seen: Arc<Mutex<Vec<ThreadId>>>,
    }

    impl ThreadRecorder {
        fn record(&mut self, _: &()) {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(thread::current().id());
            }
        }
    }

    impl BenchmarkClass for ThreadRecorder {
        fn benchmarks() -> Vec<BenchmarkDefinition> {
            vec![BenchmarkDefinition::builder("record")
                .iterations(3)
                .test_mode(TestMode::Measurement)
                .measure(Metric::ElapsedTime)
                .build()]
        }
    }

    struct Unpark(thread::Thread);

    impl Wake for Unpark {
        fn wake(self: Arc<Self>) {
            self.0.unpark();
        }
    }

    /// Minimal executor with no tokio runtime behind it.
    fn block_on<F: Future>(fut: F) -> F::Output {
        let mut fut = pin!(fut);
        let waker = Waker::from(Arc::new(Unpark(thread::current())));
        let mut cx = Context::from_waker(&waker);
        loop {
            match fut.as_mut().poll(&mut cx) {
                Poll::Ready(out) => return out,
                Poll::Pending => thread::park(),
            }
        }
    }

    fn adapter_with(sink: Arc<BufferSink>) -> TestInvocationAdapter {
        TestInvocationAdapter::new(BenchConfig::default(), sink)
    }

    #[test]
    #[serial]
    fn test_unknown_method_fails_before_any_lifecycle_phase() {
        let before = engine::sessions_prepared();
        let err = adapter_with(Arc::new(BufferSink::new()))
            .invoke_blocking(Widgets { made: 0 }, crate::test_method!(Widgets::undeclared), 1)
            .unwrap_err();
        assert!(matches!(err, BridgeError::BenchmarkNotFound { .. }));
        assert_eq!(engine::sessions_prepared(), before);
    }

    #[test]
    #[serial]
    fn test_failing_assertions_surface_every_message() {
        let sink = Arc::new(BufferSink::new());
        let record = adapter_with(sink.clone())
            .run_case(Widgets { made: 0 }, crate::test_method!(Widgets::make), 5)
            .unwrap();

        let err = record.verdict.unwrap_err();
        assert_eq!(err.assertion_failures().len(), 1);
        assert!(err.assertion_failures()[0].starts_with("[FAIL]"));
        let lines = sink.lines();
        assert!(lines.iter().any(|l| l.starts_with("[PASS]")));
        assert!(lines.iter().any(|l| l.starts_with("[FAIL]")));
    }

    #[test]
    #[serial]
    fn test_engine_exception_fails_without_report() {
        let sink = Arc::new(BufferSink::new());
        let err = adapter_with(sink.clone())
            .invoke_blocking(Widgets { made: 0 }, crate::test_method!(Widgets::make_or_fail), 0)
            .unwrap_err();
        match err {
            BridgeError::EngineExecution { source, .. } => {
                assert_eq!(source.exceptions[0].message, "empty batch");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(sink.lines().is_empty());
    }

    #[test]
    #[serial]
    fn test_measurement_only_passes() {
        let sink = Arc::new(BufferSink::new());
        let duration = adapter_with(sink.clone())
            .invoke_blocking(Measured, crate::test_method!(Measured::spin), ())
            .unwrap();
        assert!(sink.lines().iter().any(|l| l == NO_ASSERTIONS));
        assert!(duration <= Duration::from_secs(1));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn test_async_invocation_returns_duration() {
        let adapter = adapter_with(Arc::new(BufferSink::new()));
        let duration = adapter
            .invoke_test_method(Measured, crate::test_method!(Measured::spin), ())
            .await;
        expect_pass(duration);
    }

    #[test]
    #[serial]
    fn test_async_invocation_without_runtime_runs_off_the_polling_thread() {
        assert!(tokio::runtime::Handle::try_current().is_err());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let adapter = adapter_with(Arc::new(BufferSink::new()));
        let outcome = block_on(adapter.invoke_test_method(
            ThreadRecorder { seen: seen.clone() },
            crate::test_method!(ThreadRecorder::record),
            (),
        ));
        expect_pass(outcome);

        let seen = seen.lock().unwrap();
        // one warmup invocation plus three runs
        assert_eq!(seen.len(), 4);
        let caller = thread::current().id();
        assert!(seen.iter().all(|id| *id != caller));
    }

    #[test]
    #[serial]
    #[should_panic(expected = "no benchmark declared for method `undeclared`")]
    fn test_expect_pass_panics_with_bridge_error() {
        let adapter = adapter_with(Arc::new(BufferSink::new()));
        expect_pass(adapter.invoke_blocking(
            Widgets { made: 0 },
            crate::test_method!(Widgets::undeclared),
            1,
        ));
    }
}
