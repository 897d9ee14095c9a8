//! Top-level runtime context (§9: "the intrinsic implementation manager and
//! the compiled-kernel cache are the only process-wide resources. Both are
//! created at context construction and torn down with the context; no lazy
//! singletons"). [`Runtime`] owns one [`Accelerator`] per registered
//! [`AcceleratorFamily`], a process-wide [`KernelCache`] shared across all of
//! them (a compiled CPU-IL/PTX/Velocity artifact is reusable regardless of
//! which accelerator eventually loads it), and the `dashmap`-backed
//! device-poison set every accelerator consults before acting.

use std::sync::Arc;

use dashmap::DashSet;

use crate::accelerator::Accelerator;
use crate::cache::KernelCache;
use crate::driver::{default_drivers, AcceleratorDriver, AcceleratorFamily};
use crate::error::RuntimeError;

/// Per-accelerator memory pool capacity, in concurrently rented buffers.
/// Not spec-mandated; chosen generously enough that realistic workloads
/// rarely suspend on it.
const DEFAULT_POOL_CAPACITY: usize = 64;

pub struct Runtime {
    cache: Arc<KernelCache>,
    poisoned: Arc<DashSet<AcceleratorFamily>>,
    accelerators: Vec<Accelerator>,
}

impl Runtime {
    /// Build a runtime with the default driver registration: a real,
    /// in-process [`crate::driver::VelocityDriver`] plus a
    /// `DeviceUnavailable` stub for every other family.
    pub fn new() -> Self {
        Runtime::with_drivers(default_drivers(), DEFAULT_POOL_CAPACITY)
    }

    /// Build a runtime from an explicit driver registration -- mainly for
    /// tests that want a narrower or differently configured set of
    /// accelerators than [`default_drivers`] provides.
    pub fn with_drivers(drivers: Vec<(AcceleratorFamily, Arc<dyn AcceleratorDriver>)>, pool_capacity: usize) -> Self {
        let cache = Arc::new(KernelCache::new());
        let poisoned = Arc::new(DashSet::new());
        let accelerators = drivers
            .into_iter()
            .map(|(_, driver)| Accelerator::new(driver, pool_capacity, Arc::clone(&cache), Arc::clone(&poisoned)))
            .collect();
        Runtime { cache, poisoned, accelerators }
    }

    pub fn accelerator(&self, family: AcceleratorFamily) -> Result<&Accelerator, RuntimeError> {
        self.accelerators
            .iter()
            .find(|a| a.family() == family)
            .ok_or_else(|| RuntimeError::DeviceUnavailable {
                reason: format!("no accelerator registered for family {:?}", family),
            })
    }

    pub fn accelerators(&self) -> impl Iterator<Item = &Accelerator> {
        self.accelerators.iter()
    }

    /// Number of distinct compiled-kernel cache entries across every
    /// accelerator this runtime manages (they all share one cache).
    pub fn compiled_kernel_count(&self) -> usize {
        self.cache.len()
    }

    pub fn is_poisoned(&self, family: AcceleratorFamily) -> bool {
        self.poisoned.contains(&family)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_runtime_registers_velocity_and_every_stub_family() {
        let runtime = Runtime::new();
        assert!(runtime.accelerator(AcceleratorFamily::Velocity).is_ok());
        assert!(runtime.accelerator(AcceleratorFamily::Ptx).is_ok());
        assert!(runtime.accelerator(AcceleratorFamily::OpenCl).is_ok());
        assert!(runtime.accelerator(AcceleratorFamily::Amx).is_ok());
        assert!(runtime.accelerator(AcceleratorFamily::Npu).is_ok());
        assert!(runtime.accelerator(AcceleratorFamily::Ane).is_ok());
    }

    #[test]
    fn distinct_accelerators_start_unpoisoned() {
        let runtime = Runtime::new();
        assert!(!runtime.is_poisoned(AcceleratorFamily::Velocity));
    }
}
