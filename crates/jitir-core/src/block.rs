//! Basic blocks: an ordered, non-empty sequence of values terminated by a
//! control value (§3 "Basic block").

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{BasicBlockId, ValueId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BasicBlockId,
    /// Values in program order; the last entry, once the block is
    /// terminated, is always a terminator value.
    pub values: Vec<ValueId>,
    /// Maintained by the builder as control edges are added/removed.
    pub predecessors: SmallVec<[BasicBlockId; 4]>,
}

impl BasicBlock {
    pub fn new(id: BasicBlockId) -> Self {
        BasicBlock {
            id,
            values: Vec::new(),
            predecessors: SmallVec::new(),
        }
    }

    pub fn terminator(&self) -> Option<ValueId> {
        self.values.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
