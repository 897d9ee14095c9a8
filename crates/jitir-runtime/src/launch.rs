//! Per-launch configuration (§10): grid, group, accelerator target,
//! specialized values, and a cancellation handle -- these vary per launch
//! rather than per static ahead-of-time build, so they live apart from
//! [`BackendOptions`] instead of folded into it.

use jitir_backend::{BackendOptions, BackendTarget, SpecializedValue};

use crate::cancellation::CancellationHandle;
use crate::dim::Dim3;
use crate::driver::AcceleratorFamily;

/// Everything a `launch` call needs beyond the kernel method and its
/// arguments: the launch geometry, which accelerator family to target, the
/// specialized values participating in the compiled-kernel cache key, and a
/// cancellation handle for the whole operation.
#[derive(Clone)]
pub struct LaunchConfig {
    pub grid: Dim3,
    pub group: Dim3,
    pub accelerator: AcceleratorFamily,
    pub specialized: Vec<SpecializedValue>,
    pub cancellation: CancellationHandle,
}

impl LaunchConfig {
    pub fn new(accelerator: AcceleratorFamily, grid: Dim3, group: Dim3) -> Self {
        LaunchConfig {
            grid,
            group,
            accelerator,
            specialized: Vec::new(),
            cancellation: CancellationHandle::new(),
        }
    }

    pub fn with_specialized(mut self, specialized: Vec<SpecializedValue>) -> Self {
        self.specialized = specialized;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationHandle) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// The backend target this launch's accelerator family compiles for.
    /// Only `Velocity` has an in-tree backend; every other family still
    /// needs a target to key the compiled-kernel cache by, so each maps to
    /// its natural backend even though launching it always fails with
    /// `DeviceUnavailable` before that cache entry is ever read.
    pub fn backend_target(&self) -> BackendTarget {
        match self.accelerator {
            AcceleratorFamily::Velocity => BackendTarget::Velocity,
            AcceleratorFamily::Ptx => BackendTarget::Ptx,
            AcceleratorFamily::OpenCl | AcceleratorFamily::Amx | AcceleratorFamily::Npu | AcceleratorFamily::Ane => BackendTarget::CpuIl,
        }
    }

    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions::for_target(self.backend_target())
    }
}
