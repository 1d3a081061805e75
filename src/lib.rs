//! Runs benchmark definitions as ordinary Rust tests.
//!
//! A test type declares benchmarks for its methods through
//! [`BenchmarkClass`]. [`TestInvocationAdapter`] then resolves the definition,
//! drives the measurement engine, writes a report to the test's output and
//! turns failed assertions or workload panics into a failing test.
//!
//! ```ignore
//! #[global_allocator]
//! static GLOBAL: bench_test_bridge::CountingAllocator = bench_test_bridge::CountingAllocator;
//!
//! // The default adapter writes its report to stdout, which libtest captures.
//! // Engine exceptions are logged through `tracing`; install a subscriber with
//! // `tracing_subscriber::fmt::layer().with_test_writer()` to see them per test.
//! #[test]
//! #[serial_test::serial]
//! fn add_memory() -> bench_test_bridge::Result<()> {
//!     let adapter = bench_test_bridge::TestInvocationAdapter::default();
//!     adapter.invoke_blocking(MyBenches::new(), test_method!(MyBenches::add_memory), ())?;
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod catalog;
pub mod definition;
pub mod demo;
pub mod engine;
pub mod error;
pub mod harness;
pub mod invoker;
pub mod report;
pub mod runner;
pub mod schema;
pub mod translate;

pub use adapter::{expect_pass, InvocationRecord, TestInvocationAdapter, TestInvoker};
pub use catalog::{BenchmarkCatalog, BenchmarkClass};
pub use definition::{
    Assertion, AssertionTarget, BenchmarkDefinition, Metric, MustBe, RunMode, TestMode,
};
pub use engine::instrument::{counter, Counter, CountingAllocator};
pub use error::{BridgeError, Result};
pub use harness::{BenchConfig, Profile};
pub use invoker::{BenchmarkInvoker, TestMethod};
pub use report::{BufferSink, OutputSink, ReportEmitter, StdoutSink, TraceSink};
pub use runner::{AssertionOutcome, BenchmarkRunResult, BenchmarkRunner};
pub use translate::{ResultTranslator, RunSummary};
