//! Per-backend compilation knobs (§10 "Configuration"): which emitter a
//! method targets, and the tuning parameters that emitter reads while
//! lowering and code-generating it.

/// Which of the three in-tree emitters a method is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendTarget {
    CpuIl,
    Ptx,
    Velocity,
}

impl BackendTarget {
    /// A stable byte tag, folded into the compiled-kernel cache key.
    pub fn tag(self) -> u8 {
        match self {
            BackendTarget::CpuIl => 0,
            BackendTarget::Ptx => 1,
            BackendTarget::Velocity => 2,
        }
    }
}

/// Options controlling how a method is lowered and emitted for one backend.
#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub target: BackendTarget,
    /// CUDA SM version gate for the PTX backend; `None` disables every
    /// hardware-form intrinsic and leaves only software fallbacks registered.
    pub ptx_sm: Option<u32>,
    /// Lane count the Velocity backend's warp simulation uses.
    pub velocity_lane_width: usize,
    /// Forwarded to `jitir_transform::run_pipeline`.
    pub pipeline: jitir_transform::PipelineOptions,
}

impl BackendOptions {
    pub fn for_target(target: BackendTarget) -> Self {
        BackendOptions {
            target,
            ptx_sm: None,
            velocity_lane_width: 32,
            pipeline: jitir_transform::PipelineOptions::default(),
        }
    }
}

impl Default for BackendOptions {
    fn default() -> Self {
        BackendOptions::for_target(BackendTarget::CpuIl)
    }
}
