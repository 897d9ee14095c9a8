//! Launch runtime (§4.6): the device-generic accelerator abstraction,
//! grid/group dispatch, stream ordering, and the compiled-kernel cache's
//! concurrent-compile guarantee.
//!
//! # Modules
//!
//! - [`dim`] -- `Dim3` grid/group geometry
//! - [`driver`] -- the `AcceleratorDriver` trait (§6 "Core → Drivers") and
//!   the in-tree Velocity driver plus stub drivers for every other family
//! - [`memory`] -- the per-accelerator rent/return buffer pool
//! - [`stream`] -- a FIFO command stream per accelerator
//! - [`cancellation`] -- cooperative cancellation handles
//! - [`cache`] -- the compiled-kernel cache, `dashmap`-backed
//! - [`launch`] -- per-launch configuration (`LaunchConfig`)
//! - [`argbuild`] -- per-lane parameter list construction
//! - [`accelerator`] -- one accelerator instance: pool + cache + driver
//! - [`runtime`] -- the top-level `Runtime` owning every registered accelerator

pub mod accelerator;
pub mod argbuild;
pub mod cache;
pub mod cancellation;
pub mod dim;
pub mod driver;
pub mod error;
pub mod launch;
pub mod memory;
pub mod runtime;
pub mod stream;

pub use accelerator::{Accelerator, Buffer};
pub use argbuild::build_lane_params;
pub use cache::{CompiledKernel, KernelCache};
pub use cancellation::CancellationHandle;
pub use dim::Dim3;
pub use driver::{
    default_drivers, AcceleratorDriver, AcceleratorFamily, DeviceBuffer, DeviceCapabilities, KernelHandle,
    LaunchOutputs, UnavailableDriver, VelocityDriver,
};
pub use error::RuntimeError;
pub use launch::LaunchConfig;
pub use memory::{Pool, PooledBuffer};
pub use runtime::Runtime;
pub use stream::Stream;
