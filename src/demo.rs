//! Demo benchmark suite: memory and throughput of populating a `HashMap`.
//!
//! Mirrors what a test author would write. `add_memory_failing_test` is
//! expected to fail: without pre-sizing, the table's growth allocations add
//! up to more than the per-entry budget allows.

use std::collections::HashMap;
use std::hint::black_box;

use rand::seq::SliceRandom;

use crate::adapter::{InvocationRecord, TestInvocationAdapter};
use crate::catalog::BenchmarkClass;
use crate::definition::{BenchmarkDefinition, Metric, MustBe, TestMode};
use crate::engine::instrument::{self, Counter};
use crate::error::Result;
use crate::harness::BenchConfig;
use crate::invoker::TestMethod;

/// Estimated bytes per map entry used to derive the memory budget.
pub const ENTRY_SIZE: usize = 24;
pub const NUMBER_OF_ADDS: usize = 1_000_000;
pub const MAX_EXPECTED_MEMORY: usize = NUMBER_OF_ADDS * ENTRY_SIZE;

pub const MEASUREMENT_SIZES: [usize; 4] = [1_000, 10_000, 100_000, 1_000_000];
pub const TEST_THEORY_ROWS: [(usize, &str); 4] = [
    (1_000, "One Thousand"),
    (10_000, "Ten Thousand"),
    (100_000, "One Hundred Thousand"),
    (1_000_000, "One Million"),
];

pub const INSERT_COUNTER: &str = "map.inserts";
const THROUGHPUT_KEYS: usize = 10_000;

pub struct MapPopulationBenchmarks {
    keys: Vec<u32>,
    inserts: Counter,
}

impl MapPopulationBenchmarks {
    pub fn new(cfg: &BenchConfig) -> Self {
        let mut keys: Vec<u32> = (0..THROUGHPUT_KEYS as u32).collect();
        keys.shuffle(&mut cfg.rng());
        Self {
            keys,
            inserts: instrument::counter(INSERT_COUNTER),
        }
    }

    pub fn add_memory_failing_test(&mut self, _: &()) {
        let mut map = HashMap::new();
        populate(&mut map, NUMBER_OF_ADDS);
    }

    pub fn add_memory_measurement(&mut self, _: &()) {
        let mut map = HashMap::new();
        populate(&mut map, NUMBER_OF_ADDS);
    }

    pub fn add_memory_measurement_theory(&mut self, number_of_adds: &usize) {
        let mut map = HashMap::with_capacity(*number_of_adds);
        populate(&mut map, *number_of_adds);
    }

    pub fn add_memory_passing_test(&mut self, _: &()) {
        let mut map = HashMap::with_capacity(NUMBER_OF_ADDS);
        populate(&mut map, NUMBER_OF_ADDS);
    }

    pub fn add_memory_test_theory(&mut self, row: &(usize, &'static str)) {
        let mut map = HashMap::with_capacity(row.0);
        populate(&mut map, row.0);
    }

    pub fn insert_throughput(&mut self, _: &()) {
        let mut map = HashMap::with_capacity(self.keys.len());
        for &k in &self.keys {
            map.insert(k, k);
        }
        self.inserts.add(self.keys.len() as u64);
        black_box(map);
    }
}

pub fn populate(map: &mut HashMap<u32, u32>, n: usize) {
    for i in 0..n as u32 {
        map.insert(i, i);
    }
    black_box(map);
}

impl BenchmarkClass for MapPopulationBenchmarks {
    fn benchmarks() -> Vec<BenchmarkDefinition> {
        let budget = MAX_EXPECTED_MEMORY as f64;
        vec![
            BenchmarkDefinition::builder("add_memory_failing_test")
                .description("Map without capacity, add memory test.")
                .assert_memory(MustBe::LessThan(budget))
                .build(),
            BenchmarkDefinition::builder("add_memory_measurement")
                .description("AddMemoryMeasurement")
                .test_mode(TestMode::Measurement)
                .measure(Metric::TotalBytesAllocated)
                .build(),
            BenchmarkDefinition::builder("add_memory_measurement_theory")
                .description("AddMemoryMeasurement_Theory")
                .test_mode(TestMode::Measurement)
                .measure(Metric::TotalBytesAllocated)
                .build(),
            BenchmarkDefinition::builder("add_memory_passing_test")
                .description("add_memory_passing_test")
                .assert_memory(MustBe::LessThan(budget * 2.0))
                .build(),
            BenchmarkDefinition::builder("add_memory_test_theory")
                .description("add_memory_passing_test")
                .assert_memory(MustBe::LessThan(budget * 2.0))
                .build(),
            BenchmarkDefinition::builder("insert_throughput")
                .description("Shuffled key inserts per second")
                .throughput()
                .measure(Metric::counter(INSERT_COUNTER))
                .measure(Metric::ElapsedTime)
                .assert_counter_throughput(INSERT_COUNTER, MustBe::GreaterThan(1.0))
                .build(),
        ]
    }
}

type CaseFn = dyn Fn(&TestInvocationAdapter) -> Result<InvocationRecord> + Send + Sync;

/// One fact, or one row of a theory.
pub struct DemoCase {
    pub name: String,
    pub method: &'static str,
    run: Box<CaseFn>,
}

impl DemoCase {
    fn new<A>(method: TestMethod<MapPopulationBenchmarks, A>, args: A, cfg: &BenchConfig) -> Self
    where
        A: Clone + std::fmt::Debug + Send + Sync + 'static,
    {
        let args_text = format!("{args:?}");
        let name = if std::any::TypeId::of::<A>() == std::any::TypeId::of::<()>() {
            method.name.to_string()
        } else if args_text.starts_with('(') {
            format!("{}{args_text}", method.name)
        } else {
            format!("{}({args_text})", method.name)
        };
        let cfg = cfg.clone();
        Self {
            name,
            method: method.name,
            run: Box::new(move |adapter| {
                adapter.run_case(MapPopulationBenchmarks::new(&cfg), method, args.clone())
            }),
        }
    }

    pub fn run(&self, adapter: &TestInvocationAdapter) -> Result<InvocationRecord> {
        (self.run)(adapter)
    }
}

pub fn cases(cfg: &BenchConfig) -> Vec<DemoCase> {
    let mut out = vec![
        DemoCase::new(
            crate::test_method!(MapPopulationBenchmarks::add_memory_failing_test),
            (),
            cfg,
        ),
        DemoCase::new(
            crate::test_method!(MapPopulationBenchmarks::add_memory_measurement),
            (),
            cfg,
        ),
    ];
    for n in MEASUREMENT_SIZES {
        out.push(DemoCase::new(
            crate::test_method!(MapPopulationBenchmarks::add_memory_measurement_theory),
            n,
            cfg,
        ));
    }
    out.push(DemoCase::new(
        crate::test_method!(MapPopulationBenchmarks::add_memory_passing_test),
        (),
        cfg,
    ));
    for row in TEST_THEORY_ROWS {
        out.push(DemoCase::new(
            crate::test_method!(MapPopulationBenchmarks::add_memory_test_theory),
            row,
            cfg,
        ));
    }
    out.push(DemoCase::new(
        crate::test_method!(MapPopulationBenchmarks::insert_throughput),
        (),
        cfg,
    ));
    out
}
