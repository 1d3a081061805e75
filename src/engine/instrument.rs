//! Process-wide measurement instrumentation.
//!
//! Allocation counters and named counters are global mutable state shared by
//! every thread in the process. Readings taken around a run are only
//! meaningful while that run is the only one active, see
//! [`Benchmark::prepare_for_run`](super::Benchmark::prepare_for_run).

use std::alloc::{GlobalAlloc, Layout, System};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Instant;

use crate::definition::Metric;

static BYTES_ALLOCATED: AtomicU64 = AtomicU64::new(0);
static ALLOCATOR_INSTALLED: AtomicBool = AtomicBool::new(false);

static COUNTERS: OnceLock<Mutex<HashMap<String, Arc<AtomicU64>>>> = OnceLock::new();

/// Global allocator wrapper that counts every byte handed out.
///
/// ```ignore
/// #[global_allocator]
/// static GLOBAL: bench_test_bridge::CountingAllocator = bench_test_bridge::CountingAllocator;
/// ```
pub struct CountingAllocator;

impl CountingAllocator {
    #[inline]
    fn record(size: usize) {
        BYTES_ALLOCATED.fetch_add(size as u64, Ordering::Relaxed);
        if !ALLOCATOR_INSTALLED.load(Ordering::Relaxed) {
            ALLOCATOR_INSTALLED.store(true, Ordering::Relaxed);
        }
    }
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        Self::record(layout.size());
        System.alloc(layout)
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        Self::record(layout.size());
        System.alloc_zeroed(layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // Growth counts in full: the allocation is new memory from the program's view.
        Self::record(new_size);
        System.realloc(ptr, layout, new_size)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }
}

/// True once any allocation went through [`CountingAllocator`].
pub fn allocator_installed() -> bool {
    ALLOCATOR_INSTALLED.load(Ordering::Relaxed)
}

pub fn total_bytes_allocated() -> u64 {
    BYTES_ALLOCATED.load(Ordering::Relaxed)
}

fn counters() -> MutexGuard<'static, HashMap<String, Arc<AtomicU64>>> {
    let registry = COUNTERS.get_or_init(|| Mutex::new(HashMap::new()));
    match registry.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Handle to a named process-wide counter. Cheap to clone and increment.
#[derive(Clone, Debug)]
pub struct Counter {
    value: Arc<AtomicU64>,
}

impl Counter {
    #[inline]
    pub fn increment(&self) {
        self.add(1);
    }

    #[inline]
    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Returns the counter registered under `name`, creating it on first use.
pub fn counter(name: &str) -> Counter {
    let mut registry = counters();
    let value = registry
        .entry(name.to_string())
        .or_insert_with(|| Arc::new(AtomicU64::new(0)))
        .clone();
    Counter { value }
}

/// Zeroes allocation totals and every registered counter.
pub fn reset() {
    BYTES_ALLOCATED.store(0, Ordering::Relaxed);
    for value in counters().values() {
        value.store(0, Ordering::Relaxed);
    }
}

/// Instrument readings at one instant, restricted to the tracked metrics.
#[derive(Clone, Debug)]
pub struct Snapshot {
    at: Instant,
    bytes_allocated: u64,
    counters: Vec<u64>,
}

/// Resolved handles for the metrics of one session, so the hot path never
/// touches the counter registry.
pub struct Probe {
    counters: Vec<Counter>,
}

impl Probe {
    pub fn new(metrics: &[Metric]) -> Self {
        let counters = metrics
            .iter()
            .filter_map(|m| match m {
                Metric::Counter(name) => Some(counter(name)),
                _ => None,
            })
            .collect();
        Self { counters }
    }

    /// Reading taken before a run. Counter values are read first so that the
    /// buffer allocation is not attributed to the run.
    pub fn start(&self) -> Snapshot {
        let mut counters = Vec::with_capacity(self.counters.len());
        counters.extend(self.counters.iter().map(Counter::value));
        let bytes_allocated = total_bytes_allocated();
        Snapshot {
            at: Instant::now(),
            bytes_allocated,
            counters,
        }
    }

    /// Reading taken after a run. Time and bytes are read before anything allocates.
    pub fn stop(&self) -> Snapshot {
        let at = Instant::now();
        let bytes_allocated = total_bytes_allocated();
        let mut counters = Vec::with_capacity(self.counters.len());
        counters.extend(self.counters.iter().map(Counter::value));
        Snapshot {
            at,
            bytes_allocated,
            counters,
        }
    }
}

/// Difference between two snapshots of the same [`Probe`].
#[derive(Clone, Debug)]
pub struct Delta {
    pub elapsed: std::time::Duration,
    pub bytes_allocated: u64,
    pub counters: Vec<u64>,
}

impl Delta {
    pub fn between(start: &Snapshot, end: &Snapshot) -> Self {
        Self {
            elapsed: end.at.saturating_duration_since(start.at),
            bytes_allocated: end.bytes_allocated.saturating_sub(start.bytes_allocated),
            counters: end
                .counters
                .iter()
                .zip(&start.counters)
                .map(|(e, s)| e.saturating_sub(*s))
                .collect(),
        }
    }

    /// Raw value of `metric` for this run. `counter_index` is the metric's
    /// position among the counter metrics of the probe.
    pub fn value_of(&self, metric: &Metric, counter_index: usize) -> f64 {
        match metric {
            Metric::TotalBytesAllocated => self.bytes_allocated as f64,
            Metric::Counter(_) => self.counters.get(counter_index).copied().unwrap_or(0) as f64,
            Metric::ElapsedTime => self.elapsed.as_secs_f64() * 1_000.0,
        }
    }
}
