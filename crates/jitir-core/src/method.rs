//! Methods: named, typed containers of basic blocks (§3 "Method").

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::block::BasicBlock;
use crate::id::{BasicBlockId, MethodId, ValueId};
use crate::type_id::TypeId;
use crate::value::Value;

/// What role a method plays in the launch pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodKind {
    /// An ordinary callee, not directly launchable.
    Normal,
    /// Marked as a kernel entry point: launchable via the runtime (§4.6).
    Kernel,
    /// Requires resolution by `IntrinsicResolver` before codegen; calling an
    /// unresolved intrinsic past that point is an `IntrinsicUnresolved` error.
    Intrinsic,
}

/// A named, typed container of basic blocks with a designated entry block,
/// a formal parameter list, and a return type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Method {
    pub id: MethodId,
    pub name: String,
    pub kind: MethodKind,
    pub params: Vec<TypeId>,
    pub return_type: TypeId,
    pub entry_block: BasicBlockId,
    pub blocks: HashMap<BasicBlockId, BasicBlock>,
    pub values: HashMap<ValueId, Value>,
    /// Monotonically bumped on every builder commit that mutates this
    /// method; analyses cache themselves against this to detect staleness.
    pub generation: u64,
}

impl Method {
    pub fn block_order(&self) -> Vec<BasicBlockId> {
        // Blocks are stored unordered in the map; callers that need a stable
        // order should use an analysis (reverse post order) rather than this.
        self.blocks.keys().copied().collect()
    }

    pub fn block(&self, id: BasicBlockId) -> Option<&BasicBlock> {
        self.blocks.get(&id)
    }

    pub fn value(&self, id: ValueId) -> Option<&Value> {
        self.values.get(&id)
    }

    pub fn is_kernel(&self) -> bool {
        self.kind == MethodKind::Kernel
    }

    pub fn is_intrinsic(&self) -> bool {
        self.kind == MethodKind::Intrinsic
    }

    pub fn successors(&self, block: BasicBlockId) -> Vec<BasicBlockId> {
        let Some(bb) = self.block(block) else {
            return Vec::new();
        };
        let Some(term) = bb.terminator().and_then(|id| self.value(id)) else {
            return Vec::new();
        };
        use crate::value::ValueKind::*;
        match &term.kind {
            Branch { if_true, if_false, .. } => vec![*if_true, *if_false],
            Jump { target } => vec![*target],
            Switch { arms, default, .. } => {
                let mut targets: Vec<BasicBlockId> = arms.iter().map(|(_, b)| *b).collect();
                targets.push(*default);
                targets
            }
            Return { .. } => Vec::new(),
            _ => Vec::new(),
        }
    }
}
