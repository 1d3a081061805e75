use crate::engine::Workload;

/// A test method bound to its name, the identity the catalog resolves by.
pub struct TestMethod<C, A> {
    pub name: &'static str,
    func: fn(&mut C, &A),
}

impl<C, A> TestMethod<C, A> {
    pub fn new(name: &'static str, func: fn(&mut C, &A)) -> Self {
        Self { name, func }
    }
}

impl<C, A> Clone for TestMethod<C, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, A> Copy for TestMethod<C, A> {}

/// Builds a [`TestMethod`] named after the method path's last segment.
///
/// ```ignore
/// let method = test_method!(MapPopulationBenchmarks::add_memory_passing_test);
/// ```
#[macro_export]
macro_rules! test_method {
    ($ty:ident :: $method:ident) => {
        $crate::TestMethod::new(stringify!($method), $ty::$method)
    };
}

/// Live test instance plus the arguments of one test case, shaped as an engine workload.
pub struct BenchmarkInvoker<C, A> {
    instance: C,
    method: TestMethod<C, A>,
    args: A,
}

impl<C, A> BenchmarkInvoker<C, A> {
    pub fn new(instance: C, method: TestMethod<C, A>, args: A) -> Self {
        Self {
            instance,
            method,
            args,
        }
    }

    pub fn into_instance(self) -> C {
        self.instance
    }
}

impl<C, A> Workload for BenchmarkInvoker<C, A> {
    fn name(&self) -> &str {
        self.method.name
    }

    #[inline]
    fn invoke_once(&mut self) {
        (self.method.func)(&mut self.instance, &self.args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<(usize, &'static str)>,
    }

    impl Recorder {
        fn record(&mut self, args: &(usize, &'static str)) {
            self.seen.push(*args);
        }
    }

    #[test]
    fn test_each_invocation_calls_method_once_with_same_args() {
        let method = test_method!(Recorder::record);
        assert_eq!(method.name, "record");

        let mut invoker = BenchmarkInvoker::new(Recorder::default(), method, (3, "three"));
        invoker.invoke_once();
        invoker.invoke_once();
        assert_eq!(invoker.name(), "record");

        let recorder = invoker.into_instance();
        assert_eq!(recorder.seen, vec![(3, "three"), (3, "three")]);
    }
}
