//! Backend error types (§7).

use jitir_core::ValueId;
use jitir_transform::TransformError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// A value's operation has no legalization for this backend.
    #[error("unsupported operation on {value} for this backend")]
    UnsupportedOperation { value: ValueId },

    /// Emission produced an inconsistent or incomplete artifact.
    #[error("emission failed: {reason}")]
    EmissionFailed { reason: String },

    #[error(transparent)]
    Transform(#[from] TransformError),
}
