//! The device-generic accelerator abstraction (§4.6): `allocate`, `copy`,
//! `create_stream`/`synchronize`, `load_kernel`, `launch`. One
//! [`Accelerator`] wraps one [`driver::AcceleratorDriver`] plus the
//! memory pool, compiled-kernel cache, and device-poison flag its
//! operations consult.

use std::sync::Arc;

use dashmap::DashSet;
use jitir_backend::HostArg;
use jitir_core::{Method, TypeRegistry};
use jitir_transform::{run_pipeline, IntrinsicTable};

use crate::argbuild::build_lane_params;
use crate::cache::{CompiledKernel, KernelCache};
use crate::cancellation::CancellationHandle;
use crate::dim::Dim3;
use crate::driver::{self, AcceleratorDriver, AcceleratorFamily, DeviceCapabilities, KernelHandle};
use crate::error::RuntimeError;
use crate::launch::LaunchConfig;
use crate::memory::{Pool, PooledBuffer};

/// A device buffer as the runtime hands it back to callers: the pooled
/// bytes plus the family it was allocated on (copies across families are
/// always rejected -- no cross-accelerator peer access is modeled).
pub struct Buffer {
    pub family: AcceleratorFamily,
    pooled: PooledBuffer,
}

impl Buffer {
    pub fn len(&self) -> usize {
        self.pooled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pooled.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.pooled.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pooled.bytes
    }
}

/// One accelerator instance: a driver, the memory pool backing its
/// `allocate`/return lifecycle, and the shared compiled-kernel cache and
/// device-poison set a [`crate::Runtime`] hands every accelerator it owns.
pub struct Accelerator {
    family: AcceleratorFamily,
    driver: Arc<dyn AcceleratorDriver>,
    pool: Pool,
    cache: Arc<KernelCache>,
    poisoned: Arc<DashSet<AcceleratorFamily>>,
}

impl Accelerator {
    pub fn new(driver: Arc<dyn AcceleratorDriver>, pool_capacity: usize, cache: Arc<KernelCache>, poisoned: Arc<DashSet<AcceleratorFamily>>) -> Self {
        Accelerator {
            family: driver.family(),
            pool: Pool::new(pool_capacity),
            driver,
            cache,
            poisoned,
        }
    }

    pub fn family(&self) -> AcceleratorFamily {
        self.family
    }

    pub fn capabilities(&self) -> DeviceCapabilities {
        self.driver.capabilities()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.contains(&self.family)
    }

    fn check_not_poisoned(&self) -> Result<(), RuntimeError> {
        if self.is_poisoned() {
            return Err(RuntimeError::DeviceUnavailable {
                reason: format!("{:?} is poisoned by a prior device-level fault", self.family),
            });
        }
        Ok(())
    }

    /// Mark this accelerator poisoned (§7: "the accelerator is marked
    /// poisoned and subsequent operations fail with `DeviceUnavailable`").
    pub fn poison(&self) {
        tracing::warn!(family = ?self.family, "accelerator marked poisoned after a device-level fault");
        self.poisoned.insert(self.family);
    }

    /// Active allocations currently held against this accelerator's pool.
    pub fn active_allocations(&self) -> usize {
        self.pool.active_allocations()
    }

    /// Choose a grid/group split for a launch that names only a total
    /// thread count (§4.6: "implicitly-grouped kernels receive only the
    /// global index and the runtime chooses the group shape"). Groups are
    /// filled to the device's reported `max_group.x` and the remainder
    /// spills into however many groups the grid's x-dimension needs; y/z
    /// stay at 1, since nothing about an implicit launch names more than a
    /// flat thread count.
    pub fn choose_group_shape(&self, total_threads: u64) -> (Dim3, Dim3) {
        let max_group_x = self.capabilities().max_group.x.max(1) as u64;
        let group_x = max_group_x.min(total_threads.max(1));
        let groups = total_threads.div_ceil(group_x).max(1);
        (Dim3::new(groups as u32, 1, 1), Dim3::new(group_x as u32, 1, 1))
    }

    #[tracing::instrument(skip(self, cancellation), fields(family = ?self.family))]
    pub async fn allocate(&self, element_bytes: usize, cancellation: &CancellationHandle) -> Result<Buffer, RuntimeError> {
        self.check_not_poisoned()?;
        let pooled = self.pool.rent(element_bytes, cancellation).await?;
        Ok(Buffer { family: self.family, pooled })
    }

    pub async fn free(&self, buffer: Buffer) {
        self.pool.return_to_pool(buffer.pooled).await;
    }

    /// Copy `src` into `dst`, both on this accelerator. When `stream` is
    /// given, first drains that stream's FIFO so the copy observes every
    /// command submitted to it so far, preserving the stream's ordering
    /// guarantee without itself becoming a queued command.
    #[tracing::instrument(skip(self, src, dst, stream))]
    pub async fn copy(&self, src: &Buffer, dst: &mut Buffer, stream: Option<&crate::stream::Stream>) -> Result<(), RuntimeError> {
        self.check_not_poisoned()?;
        if src.family != self.family || dst.family != self.family {
            return Err(RuntimeError::LaunchFailed {
                reason: "copy across two different accelerator families is not supported".to_string(),
            });
        }
        if let Some(stream) = stream {
            stream.synchronize().await?;
        }
        self.driver.copy(&src.pooled.bytes, &mut dst.pooled.bytes)
    }

    pub fn create_stream(&self) -> crate::stream::Stream {
        crate::stream::Stream::new()
    }

    pub async fn synchronize(&self, stream: Option<&crate::stream::Stream>) -> Result<(), RuntimeError> {
        self.check_not_poisoned()?;
        if let Some(stream) = stream {
            stream.synchronize().await
        } else {
            Ok(())
        }
    }

    /// Compile (or reuse a cached compile of) `method` for this launch's
    /// target, then ask the driver to load it.
    #[tracing::instrument(skip(self, method, types, program, config), fields(method = %method.name))]
    pub async fn load_kernel(&self, method: &Method, types: &TypeRegistry, program: &jitir_core::Program, config: &LaunchConfig) -> Result<KernelHandle, RuntimeError> {
        self.check_not_poisoned()?;
        let backend_options = config.backend_options();
        let key = jitir_backend::cache_key(method.id, backend_options.target, &config.specialized);

        let method = method.clone();
        let mut types = types.clone();
        let program_owned = clone_program_view(program);
        let pipeline_options = backend_options.pipeline.clone();

        let kernel = self
            .cache
            .get_or_compile(key, || async move {
                let table = default_intrinsic_table(backend_options.target, backend_options.ptx_sm);
                let lowered = run_pipeline(method, &mut types, &program_owned, &table, &pipeline_options)?;
                CompiledKernel::compile(&lowered, &types, &backend_options)
            })
            .await?;

        self.driver.load_kernel(&kernel)
    }

    /// Launch a loaded kernel: build one parameter list per lane from the
    /// launch geometry and the per-lane host arguments, then hand off to
    /// the driver.
    #[tracing::instrument(skip(self, kernel, config, args, memory), fields(entry = %kernel.entry_point))]
    pub async fn launch(&self, kernel: &KernelHandle, config: &LaunchConfig, args: &[HostArg], memory: &mut Vec<u8>) -> Result<driver::LaunchOutputs, RuntimeError> {
        self.check_not_poisoned()?;
        if config.cancellation.is_canceled() {
            return Err(RuntimeError::Canceled);
        }
        let params_per_lane = build_lane_params(config.grid, config.group, args);
        let result = self.driver.launch(kernel, config.grid, config.group, &params_per_lane, memory);
        if let Err(RuntimeError::DeviceUnavailable { .. }) = &result {
            self.poison();
        }
        result
    }
}

fn clone_program_view(program: &jitir_core::Program) -> jitir_core::Program {
    let mut clone = jitir_core::Program::new();
    clone.types = program.types.clone();
    for (id, method) in &program.methods {
        clone.methods.insert(*id, method.clone());
    }
    clone
}

fn default_intrinsic_table(target: jitir_backend::BackendTarget, ptx_sm: Option<u32>) -> IntrinsicTable {
    match target {
        jitir_backend::BackendTarget::CpuIl => IntrinsicTable::new(),
        jitir_backend::BackendTarget::Ptx => jitir_backend::PtxBackend::intrinsic_table(ptx_sm),
        jitir_backend::BackendTarget::Velocity => jitir_backend::VelocityBackend::intrinsic_table(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::VelocityDriver;

    fn new_velocity_accelerator(capacity: usize) -> Accelerator {
        let driver: Arc<dyn AcceleratorDriver> = Arc::new(VelocityDriver::new(8));
        let cache = Arc::new(KernelCache::new());
        let poisoned = Arc::new(DashSet::new());
        Accelerator::new(driver, capacity, cache, poisoned)
    }

    #[tokio::test]
    async fn allocate_and_free_round_trips_through_the_pool() {
        let accel = new_velocity_accelerator(2);
        let cancellation = CancellationHandle::new();
        let buf = accel.allocate(32, &cancellation).await.unwrap();
        assert_eq!(accel.active_allocations(), 1);
        accel.free(buf).await;
        assert_eq!(accel.active_allocations(), 0);
    }

    #[tokio::test]
    async fn poisoning_rejects_further_allocation() {
        let accel = new_velocity_accelerator(2);
        accel.poison();
        let cancellation = CancellationHandle::new();
        let result = accel.allocate(16, &cancellation).await;
        assert!(matches!(result, Err(RuntimeError::DeviceUnavailable { .. })));
    }
}
