//! Lookup of benchmark definitions by test method name.
//!
//! Each test type registers its benchmarks through [`BenchmarkClass`]. The
//! list is built once per type and cached for the life of the process.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::definition::BenchmarkDefinition;
use crate::error::{BridgeError, Result};

/// A test type that declares benchmarks for some of its methods.
pub trait BenchmarkClass: Sized + Send + 'static {
    fn benchmarks() -> Vec<BenchmarkDefinition>;
}

type Definitions = Arc<[Arc<BenchmarkDefinition>]>;

static CATALOGS: OnceLock<Mutex<HashMap<TypeId, Definitions>>> = OnceLock::new();

#[derive(Clone, Debug)]
pub struct BenchmarkCatalog {
    class: &'static str,
    definitions: Definitions,
}

impl BenchmarkCatalog {
    pub fn for_class<C: BenchmarkClass>() -> Self {
        let registry = CATALOGS.get_or_init(|| Mutex::new(HashMap::new()));
        let mut cached = match registry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let definitions = cached
            .entry(TypeId::of::<C>())
            .or_insert_with(|| C::benchmarks().into_iter().map(Arc::new).collect())
            .clone();
        Self {
            class: type_name::<C>(),
            definitions,
        }
    }

    /// Catalog over an explicit list, bypassing the per-type cache.
    pub fn from_definitions(class: &'static str, definitions: Vec<BenchmarkDefinition>) -> Self {
        Self {
            class,
            definitions: definitions.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn class(&self) -> &'static str {
        self.class
    }

    pub fn definitions(&self) -> &[Arc<BenchmarkDefinition>] {
        &self.definitions
    }

    /// Finds the single definition whose invocation method is `method`.
    pub fn resolve(&self, method: &str) -> Result<Arc<BenchmarkDefinition>> {
        let mut matches = self.definitions.iter().filter(|d| d.method == method);
        let Some(found) = matches.next() else {
            return Err(BridgeError::BenchmarkNotFound {
                class: self.class,
                method: method.to_string(),
            });
        };
        let extra = matches.count();
        if extra > 0 {
            return Err(BridgeError::AmbiguousBenchmark {
                class: self.class,
                method: method.to_string(),
                count: extra + 1,
            });
        }
        Ok(Arc::clone(found))
    }
}

pub fn resolve<C: BenchmarkClass>(method: &str) -> Result<Arc<BenchmarkDefinition>> {
    BenchmarkCatalog::for_class::<C>().resolve(method)
}
