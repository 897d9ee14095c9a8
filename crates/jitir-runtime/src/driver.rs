//! Accelerator driver surface (§6 "Core → Drivers"): a single object-safe
//! [`AcceleratorDriver`] trait, implemented in-tree only by
//! [`VelocityDriver`] (runs the Velocity backend's bytecode directly,
//! in-process). Every other family is represented only by the trait plus a
//! [`UnavailableDriver`] stub that always reports [`RuntimeError::DeviceUnavailable`].

use std::any::Any;
use std::sync::Arc;

use jitir_backend::{GroupContext, ThreadPosition, VelocityProgram, WarpExecutor};

use crate::cache::CompiledKernel;
use crate::dim::Dim3;
use crate::error::RuntimeError;

/// Which accelerator family a driver instance speaks for. Mirrors §6's
/// enumeration: "PTX/CUDA, OpenCL, AMX, NPU, ANE" plus the in-tree Velocity
/// CPU path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcceleratorFamily {
    Velocity,
    Ptx,
    OpenCl,
    Amx,
    Npu,
    Ane,
}

impl AcceleratorFamily {
    pub fn label(self) -> &'static str {
        match self {
            AcceleratorFamily::Velocity => "velocity",
            AcceleratorFamily::Ptx => "ptx",
            AcceleratorFamily::OpenCl => "opencl",
            AcceleratorFamily::Amx => "amx",
            AcceleratorFamily::Npu => "npu",
            AcceleratorFamily::Ane => "ane",
        }
    }
}

/// A device's reported capabilities (§6: "a record of booleans and sizes:
/// max-grid, max-group, max-shared-memory, supported dtypes, tile geometry
/// where applicable").
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    pub max_grid: Dim3,
    pub max_group: Dim3,
    pub max_shared_memory_bytes: usize,
    pub supports_f64: bool,
    pub supports_f16: bool,
    pub tile_geometry: Option<(u32, u32)>,
}

/// An opaque, driver-loaded kernel. The runtime never interprets `payload`
/// (§9 "the core does not interpret driver payloads beyond opaque handles
/// and byte blobs") -- only the driver that produced it downcasts it back.
pub struct KernelHandle {
    pub entry_point: String,
    payload: Arc<dyn Any + Send + Sync>,
}

impl KernelHandle {
    pub fn new(entry_point: String, payload: Arc<dyn Any + Send + Sync>) -> Self {
        KernelHandle { entry_point, payload }
    }
}

/// One device buffer as the driver sees it: an opaque byte blob (§9).
pub type DeviceBuffer = Vec<u8>;

/// A launched kernel's return value, if the method has a non-unit return
/// type, per lane in the launch's implicit index space.
pub type LaunchOutputs = Vec<Option<jitir_backend::IlValue>>;

/// The driver surface §6 describes, reduced to what an in-process emulator
/// or a stub registration needs: device enumeration/capability query is
/// `capabilities`; context creation/destruction has no in-process analog and
/// is therefore omitted; everything else maps one to one.
pub trait AcceleratorDriver: Send + Sync {
    fn family(&self) -> AcceleratorFamily;

    fn capabilities(&self) -> DeviceCapabilities;

    fn allocate(&self, bytes: usize) -> Result<DeviceBuffer, RuntimeError>;

    fn copy(&self, src: &DeviceBuffer, dst: &mut DeviceBuffer) -> Result<(), RuntimeError>;

    fn zero(&self, buffer: &mut DeviceBuffer) -> Result<(), RuntimeError>;

    /// Load a compiled kernel into a device-resident, launchable form.
    fn load_kernel(&self, compiled: &CompiledKernel) -> Result<KernelHandle, RuntimeError>;

    /// Launch a loaded kernel over `grid` groups of `group` threads each,
    /// with `params_per_lane` supplying every lane's parameter list in the
    /// kernel's canonical (post-argument-mapping) order.
    fn launch(&self, kernel: &KernelHandle, grid: Dim3, group: Dim3, params_per_lane: &[Vec<jitir_backend::IlValue>], memory: &mut Vec<u8>) -> Result<LaunchOutputs, RuntimeError>;
}

/// Runs the Velocity backend's bytecode directly, in-process: the only
/// family this crate implements against real (if emulated) execution
/// (§6).
#[derive(Default)]
pub struct VelocityDriver {
    lane_width: usize,
}

impl VelocityDriver {
    pub fn new(lane_width: usize) -> Self {
        VelocityDriver { lane_width }
    }
}

impl AcceleratorDriver for VelocityDriver {
    fn family(&self) -> AcceleratorFamily {
        AcceleratorFamily::Velocity
    }

    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities {
            max_grid: Dim3::new(u32::MAX, u32::MAX, u32::MAX),
            max_group: Dim3::new(self.lane_width as u32, 1, 1),
            max_shared_memory_bytes: 48 * 1024,
            supports_f64: true,
            supports_f16: false,
            tile_geometry: None,
        }
    }

    fn allocate(&self, bytes: usize) -> Result<DeviceBuffer, RuntimeError> {
        Ok(vec![0u8; bytes])
    }

    fn copy(&self, src: &DeviceBuffer, dst: &mut DeviceBuffer) -> Result<(), RuntimeError> {
        if dst.len() != src.len() {
            dst.resize(src.len(), 0);
        }
        dst.copy_from_slice(src);
        Ok(())
    }

    fn zero(&self, buffer: &mut DeviceBuffer) -> Result<(), RuntimeError> {
        buffer.iter_mut().for_each(|b| *b = 0);
        Ok(())
    }

    fn load_kernel(&self, compiled: &CompiledKernel) -> Result<KernelHandle, RuntimeError> {
        let program = compiled.velocity.clone().ok_or_else(|| RuntimeError::LaunchFailed {
            reason: format!("{} was not compiled for the Velocity backend", compiled.artifact.entry_point),
        })?;
        Ok(KernelHandle::new(compiled.artifact.entry_point.clone(), program))
    }

    #[tracing::instrument(skip(self, kernel, params_per_lane, memory), fields(entry = %kernel.entry_point))]
    fn launch(&self, kernel: &KernelHandle, grid: Dim3, group: Dim3, params_per_lane: &[Vec<jitir_backend::IlValue>], memory: &mut Vec<u8>) -> Result<LaunchOutputs, RuntimeError> {
        let program = kernel
            .payload
            .downcast_ref::<VelocityProgram>()
            .ok_or_else(|| RuntimeError::LaunchFailed {
                reason: "kernel handle did not carry a Velocity program".to_string(),
            })?;
        let lanes_per_group = group.volume() as usize;
        if params_per_lane.len() != lanes_per_group * grid.volume() as usize {
            return Err(RuntimeError::LaunchFailed {
                reason: format!(
                    "expected {} lane parameter lists for grid {:?} x group {:?}, found {}",
                    lanes_per_group * grid.volume() as usize,
                    grid,
                    group,
                    params_per_lane.len()
                ),
            });
        }

        let executor = WarpExecutor::new(program);
        let mut outputs = Vec::with_capacity(params_per_lane.len());
        for (group_linear, chunk) in params_per_lane.chunks(lanes_per_group.max(1)).enumerate() {
            let group_coord = grid.unflatten(group_linear as u64);
            let positions: Vec<ThreadPosition> = (0..chunk.len())
                .map(|lane| {
                    let local_coord = group.unflatten(lane as u64);
                    ThreadPosition {
                        global: [
                            group_coord.x * group.x + local_coord.x,
                            group_coord.y * group.y + local_coord.y,
                            group_coord.z * group.z + local_coord.z,
                        ],
                        group: [group_coord.x, group_coord.y, group_coord.z],
                        local: [local_coord.x, local_coord.y, local_coord.z],
                    }
                })
                .collect();
            let mut ctx = GroupContext::new(chunk.len(), 0, 0);
            let results = executor
                .run_group(chunk, &positions, memory, &mut ctx)
                .map_err(|e| RuntimeError::LaunchFailed { reason: e.to_string() })?;
            outputs.extend(results);
        }
        Ok(outputs)
    }
}

/// Stands in for every accelerator family this crate does not implement
/// real FFI bindings for (§1 non-goal, §6): any operation past
/// `capabilities` fails with `DeviceUnavailable`.
pub struct UnavailableDriver {
    family: AcceleratorFamily,
}

impl UnavailableDriver {
    pub fn new(family: AcceleratorFamily) -> Self {
        UnavailableDriver { family }
    }

    fn unavailable(&self) -> RuntimeError {
        RuntimeError::DeviceUnavailable {
            reason: format!("no in-tree driver for accelerator family {:?}", self.family),
        }
    }
}

impl AcceleratorDriver for UnavailableDriver {
    fn family(&self) -> AcceleratorFamily {
        self.family
    }

    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities {
            max_grid: Dim3::new(0, 0, 0),
            max_group: Dim3::new(0, 0, 0),
            max_shared_memory_bytes: 0,
            supports_f64: false,
            supports_f16: false,
            tile_geometry: None,
        }
    }

    fn allocate(&self, _bytes: usize) -> Result<DeviceBuffer, RuntimeError> {
        Err(self.unavailable())
    }

    fn copy(&self, _src: &DeviceBuffer, _dst: &mut DeviceBuffer) -> Result<(), RuntimeError> {
        Err(self.unavailable())
    }

    fn zero(&self, _buffer: &mut DeviceBuffer) -> Result<(), RuntimeError> {
        Err(self.unavailable())
    }

    fn load_kernel(&self, _compiled: &CompiledKernel) -> Result<KernelHandle, RuntimeError> {
        Err(self.unavailable())
    }

    fn launch(&self, _kernel: &KernelHandle, _grid: Dim3, _group: Dim3, _params_per_lane: &[Vec<jitir_backend::IlValue>], _memory: &mut Vec<u8>) -> Result<LaunchOutputs, RuntimeError> {
        Err(self.unavailable())
    }
}

/// Every driver this crate registers out of the box: the real in-process
/// Velocity driver, plus a `DeviceUnavailable`-returning stub for every
/// other family (§6).
pub fn default_drivers() -> Vec<(AcceleratorFamily, Arc<dyn AcceleratorDriver>)> {
    vec![
        (AcceleratorFamily::Velocity, Arc::new(VelocityDriver::new(32))),
        (AcceleratorFamily::Ptx, Arc::new(UnavailableDriver::new(AcceleratorFamily::Ptx))),
        (AcceleratorFamily::OpenCl, Arc::new(UnavailableDriver::new(AcceleratorFamily::OpenCl))),
        (AcceleratorFamily::Amx, Arc::new(UnavailableDriver::new(AcceleratorFamily::Amx))),
        (AcceleratorFamily::Npu, Arc::new(UnavailableDriver::new(AcceleratorFamily::Npu))),
        (AcceleratorFamily::Ane, Arc::new(UnavailableDriver::new(AcceleratorFamily::Ane))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_drivers_fail_every_operation_with_device_unavailable() {
        let driver = UnavailableDriver::new(AcceleratorFamily::Ptx);
        let mut buf = vec![0u8; 4];
        assert!(matches!(driver.allocate(4), Err(RuntimeError::DeviceUnavailable { .. })));
        assert!(matches!(driver.zero(&mut buf), Err(RuntimeError::DeviceUnavailable { .. })));
    }

    #[test]
    fn velocity_driver_round_trips_a_copy() {
        let driver = VelocityDriver::new(8);
        let src = vec![1u8, 2, 3, 4];
        let mut dst = Vec::new();
        driver.copy(&src, &mut dst).unwrap();
        assert_eq!(src, dst);
    }
}
