//! Transform-pipeline error types (§7 error taxonomy).

use jitir_analysis::AnalysisError;
use jitir_core::{CoreError, MethodId, ValueId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    /// A value's operation has no legalization for the selected backend
    /// at this point in the pipeline.
    #[error("unsupported operation on {value}")]
    UnsupportedOperation { value: ValueId },

    /// A call to an `Intrinsic`-kind method remained unresolved after the
    /// intrinsic sub-pipeline reached its fixed-point iteration cap.
    #[error("intrinsic {name} (target {target}) did not resolve for this backend")]
    IntrinsicUnresolved { target: MethodId, name: String },

    /// Control-flow edits needed for this pass (e.g. LICM preheader
    /// insertion) require `accept_control_flow_updates(true)`.
    #[error("control-flow edit rejected while running pass {pass}")]
    ControlFlowEditRejected { pass: &'static str },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}
