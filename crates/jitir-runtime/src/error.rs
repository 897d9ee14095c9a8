//! Runtime error types (§7 error taxonomy).

use jitir_backend::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Driver reports no device, wrong generation, or missing feature; also
    /// raised for every operation submitted against an accelerator already
    /// marked poisoned by a prior device-level fault.
    #[error("device unavailable: {reason}")]
    DeviceUnavailable { reason: String },

    /// Driver out of memory, or the memory pool is exhausted with no
    /// release imminent.
    #[error("allocation failed: {reason}")]
    AllocationFailed { reason: String },

    /// Driver rejected the launch (bad grid, misaligned buffer, null
    /// pointer, unsupported operand shape/type for this device).
    #[error("launch failed: {reason}")]
    LaunchFailed { reason: String },

    /// Cooperative cancellation observed at a suspension point.
    #[error("operation canceled")]
    Canceled,

    #[error(transparent)]
    Backend(#[from] BackendError),
}
