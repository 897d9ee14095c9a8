//! Analysis error types.

use thiserror::Error;

use jitir_core::{BasicBlockId, CoreError, ValueId};

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A loop analysis found more than one header reaching a back edge's
    /// target; such loops are opaque to LICM (§4.2).
    #[error("loop headed by {header} has multiple entries; opaque to LICM")]
    MultiEntryLoop { header: BasicBlockId },

    #[error("block {0} is unreachable from the entry block")]
    UnreachableBlock(BasicBlockId),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// Raised by `verify`: the first invariant violation found, tagged with
    /// the offending value so callers can report it (§7 InvalidIR).
    #[error("invalid IR at {value}: {reason}")]
    InvalidIr { value: ValueId, reason: String },
}
