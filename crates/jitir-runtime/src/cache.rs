//! Compiled-kernel cache (§4.6, §6): in-memory mapping from
//! `(kernel_method_id, backend_id, specialization_tuple)` to a compiled
//! handle, `dashmap`-backed per §5's "Implementation substrate", serializing
//! concurrent waiters on the same compiled-kernel cache key.
//!
//! At-most-one concurrent compilation per key is guaranteed by a
//! `tokio::sync::OnceCell` per key: every caller racing for the same key
//! shares the same cell, so only the first to arrive actually runs the
//! compile closure.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use jitir_backend::{BackendOptions, BackendTarget, CompiledArtifact, CpuIlBackend, PtxBackend, PtxModule, VelocityBackend, VelocityProgram};
use jitir_backend::{BackendError, CacheKey};
use jitir_transform::LoweredMethod;
use tokio::sync::OnceCell;

use crate::error::RuntimeError;

/// A compiled kernel, carrying both the backend-agnostic [`CompiledArtifact`]
/// (entry point + opaque bytes, per §9) and whichever structured,
/// in-process payload the target backend actually needs to execute it.
/// Drivers other than [`crate::driver::VelocityDriver`] consult only
/// `artifact`.
#[derive(Debug, Clone)]
pub struct CompiledKernel {
    pub artifact: CompiledArtifact,
    pub velocity: Option<Arc<VelocityProgram>>,
    pub ptx: Option<Arc<PtxModule>>,
}

impl CompiledKernel {
    /// Lower `lowered` for `options.target`, producing both the artifact
    /// and whatever structured payload that target's driver needs.
    #[tracing::instrument(skip(lowered, types, options), fields(method = %lowered.method.name, target = ?options.target))]
    pub fn compile(lowered: &LoweredMethod, types: &jitir_core::TypeRegistry, options: &BackendOptions) -> Result<CompiledKernel, BackendError> {
        let entry_point = lowered.method.name.clone();
        match options.target {
            BackendTarget::CpuIl => {
                let program = CpuIlBackend::lower(lowered, types)?;
                // CPU-IL's bytecode is not (yet) serialized; the artifact's
                // `bytes` records only enough to identify it to a driver
                // that does interpret serialized bytecode in the future.
                let artifact = CompiledArtifact {
                    backend: BackendTarget::CpuIl,
                    entry_point: entry_point.clone(),
                    bytes: entry_point.into_bytes(),
                };
                tracing::debug!(blocks = program.blocks.len(), "lowered to CPU-IL");
                Ok(CompiledKernel {
                    artifact,
                    velocity: None,
                    ptx: None,
                })
            }
            BackendTarget::Ptx => {
                let module = PtxBackend::lower(lowered, types, options)?;
                let artifact = CompiledArtifact {
                    backend: BackendTarget::Ptx,
                    entry_point: module.entry_point.clone(),
                    bytes: module.source.clone().into_bytes(),
                };
                Ok(CompiledKernel {
                    artifact,
                    velocity: None,
                    ptx: Some(Arc::new(module)),
                })
            }
            BackendTarget::Velocity => {
                let program = VelocityBackend::lower(lowered, types, options)?;
                let artifact = CompiledArtifact {
                    backend: BackendTarget::Velocity,
                    entry_point: entry_point.clone(),
                    bytes: entry_point.into_bytes(),
                };
                Ok(CompiledKernel {
                    artifact,
                    velocity: Some(Arc::new(program)),
                    ptx: None,
                })
            }
        }
    }
}

type CacheCell = Arc<OnceCell<Result<Arc<CompiledKernel>, String>>>;

/// The process-wide compiled-kernel cache (§9 "the compiled-kernel cache
/// [is] the only process-wide resource[...] created at context construction
/// and torn down with the context").
#[derive(Default)]
pub struct KernelCache {
    entries: DashMap<CacheKey, CacheCell>,
}

impl KernelCache {
    pub fn new() -> Self {
        KernelCache::default()
    }

    /// Look up `key`; on a miss, run `compile` exactly once even if several
    /// callers race for the same key (§6 "at-most-one concurrent
    /// compilation per key"), and remember a failure against `key` so later
    /// callers fail fast instead of recompiling (§7 policy).
    pub async fn get_or_compile<F, Fut>(&self, key: CacheKey, compile: F) -> Result<Arc<CompiledKernel>, RuntimeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CompiledKernel, BackendError>>,
    {
        let cell = self.entries.entry(key).or_insert_with(|| Arc::new(OnceCell::new())).clone();
        let result = cell
            .get_or_init(|| async move { compile().await.map(Arc::new).map_err(|e| e.to_string()) })
            .await;
        match result {
            Ok(kernel) => Ok(kernel.clone()),
            Err(reason) => Err(RuntimeError::Backend(BackendError::EmissionFailed { reason: reason.clone() })),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dummy_artifact(name: &str) -> CompiledKernel {
        CompiledKernel {
            artifact: CompiledArtifact {
                backend: BackendTarget::CpuIl,
                entry_point: name.to_string(),
                bytes: Vec::new(),
            },
            velocity: None,
            ptx: None,
        }
    }

    /// §8 scenario 4: repeated lookups on the same key share one compiled
    /// artifact and do not recompile.
    #[tokio::test]
    async fn repeated_lookups_on_the_same_key_compile_exactly_once() {
        let cache = KernelCache::new();
        let compiles = Arc::new(AtomicUsize::new(0));
        let key = [7u8; 32];

        for _ in 0..5 {
            let compiles = Arc::clone(&compiles);
            let result = cache
                .get_or_compile(key, || async move {
                    compiles.fetch_add(1, Ordering::SeqCst);
                    Ok(dummy_artifact("k"))
                })
                .await
                .unwrap();
            assert_eq!(result.artifact.entry_point, "k");
        }
        assert_eq!(compiles.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_each_compile_their_own_artifact() {
        let cache = KernelCache::new();
        let a = cache.get_or_compile([1u8; 32], || async { Ok(dummy_artifact("a")) }).await.unwrap();
        let b = cache.get_or_compile([2u8; 32], || async { Ok(dummy_artifact("b")) }).await.unwrap();
        assert_eq!(a.artifact.entry_point, "a");
        assert_eq!(b.artifact.entry_point, "b");
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn a_failed_compile_is_cached_against_its_key() {
        let cache = KernelCache::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let key = [9u8; 32];

        for _ in 0..3 {
            let attempts = Arc::clone(&attempts);
            let result = cache
                .get_or_compile(key, || async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(BackendError::EmissionFailed { reason: "boom".to_string() })
                })
                .await;
            assert!(result.is_err());
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
