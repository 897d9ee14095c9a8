//! Core error types for jitir-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering every
//! `InvalidIr`-class failure the builder and its invariant checks can raise.

use thiserror::Error;

use crate::id::{BasicBlockId, MethodId, ValueId};
use crate::type_id::TypeId;

/// Core errors produced by the jitir-core crate. These compose into
/// `InvalidIR` at the boundaries described in the error-handling design:
/// every variant here represents an invariant violation in §3.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A value's declared operand signature does not match its actual operands.
    #[error("type mismatch on {value}: expected {expected}, found {found}")]
    TypeMismatch {
        value: ValueId,
        expected: String,
        found: String,
    },

    /// `remove` was called on a value that still has uses.
    #[error("cannot remove {value}: still has {use_count} use(s)")]
    ValueStillUsed { value: ValueId, use_count: usize },

    /// A value id does not resolve within the method.
    #[error("value not found: {0}")]
    ValueNotFound(ValueId),

    /// A block id does not resolve within the method.
    #[error("block not found: {0}")]
    BlockNotFound(BasicBlockId),

    /// A method id does not resolve within the program.
    #[error("method not found: {0}")]
    MethodNotFound(MethodId),

    /// A type id does not resolve within the registry.
    #[error("type not found: {0}")]
    TypeNotFound(TypeId),

    /// Attempted to insert a second terminator into a block.
    #[error("block {block} already has a terminator ({existing})")]
    DuplicateTerminator { block: BasicBlockId, existing: ValueId },

    /// A phi's source count does not match its parent block's predecessor count.
    #[error("phi {phi} has {sources} source(s), block {block} has {predecessors} predecessor(s)")]
    PhiArityMismatch {
        phi: ValueId,
        sources: usize,
        predecessors: usize,
        block: BasicBlockId,
    },

    /// A control-flow edit was attempted while `accept_control_flow_updates` was off.
    #[error("control-flow edits are not accepted on this builder")]
    ControlFlowEditsRejected,

    /// A use of `value` was found that dominance does not permit.
    #[error("{use_value} uses {def_value} which does not dominate it")]
    UseNotDominatedByDef { use_value: ValueId, def_value: ValueId },

    /// The uses recorded for a value do not match its actual operand lists.
    #[error("dangling use: {0} has a recorded use that no longer references it")]
    DanglingUse(ValueId),

    /// A block is empty (no terminator, no values) -- basic blocks must be non-empty.
    #[error("block {0} is empty; every block must end with exactly one terminator")]
    EmptyBlock(BasicBlockId),

    /// A block's last value is not a control (terminator) value.
    #[error("block {0} does not end with a terminator")]
    MissingTerminator(BasicBlockId),
}
