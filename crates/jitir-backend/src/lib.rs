//! Backend code emission (§4.5): three emitters -- CPU-IL, PTX, Velocity --
//! sharing the same post-lowering IR, the same [`moveemitter::MoveEmitter`]
//! phi-destruction logic, and the same [`argmap`] argument-mapping/cache-key
//! layer.
//!
//! # Modules
//!
//! - [`options`] -- per-backend compilation knobs (`BackendTarget`, `BackendOptions`)
//! - [`argmap`] -- host-call argument mapping and specialization cache keys
//! - [`moveemitter`] -- phi-destruction shared across all three backends
//! - [`cpu_il`] -- stack-based bytecode emitter plus its in-process interpreter
//! - [`ptx`] -- textual PTX emitter for CUDA consumption
//! - [`velocity`] -- portable SIMD-vectorized CPU emitter

pub mod argmap;
pub mod cpu_il;
pub mod error;
pub mod moveemitter;
pub mod options;
pub mod ptx;
pub mod velocity;

pub use argmap::{cache_key, map_arguments, CacheKey, HostArg, MappedArg, SpecializedValue};
pub use cpu_il::{CpuIlBackend, CpuIlProgram, IlOp, IlValue, Interpreter, ThreadPosition};
pub use error::BackendError;
pub use moveemitter::{emit_phi_destructions, MoveEmitter};
pub use options::{BackendOptions, BackendTarget};
pub use ptx::{PtxBackend, PtxModule};
pub use velocity::{GroupContext, VelocityBackend, VelocityProgram, WarpExecutor};

/// A compiled, invocable artifact handed back by any of the three emitters:
/// the emitted bytes (textual PTX, or a serialized bytecode program) plus
/// the entry-point name the runtime's driver looks up at `load_kernel` time
/// (§4.6, §6 "module load").
#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    pub backend: BackendTarget,
    pub entry_point: String,
    pub bytes: Vec<u8>,
}
