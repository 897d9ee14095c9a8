//! Dominator tree analysis (§4.2).
//!
//! A pure function of the method's current CFG; produces an immutable
//! artifact answering immediate-dominator and "A dominates B" queries, in
//! either the forward (ordinary dominance) or reverse (post-dominance)
//! direction.

use std::collections::HashMap;

use petgraph::algo::dominators::{self, Dominators};
use petgraph::graph::NodeIndex;

use jitir_core::BasicBlockId;

use crate::cfg::Cfg;

pub struct DominatorTree {
    doms: Dominators<NodeIndex>,
    index_of: HashMap<BasicBlockId, NodeIndex>,
    block_of: HashMap<NodeIndex, BasicBlockId>,
}

impl DominatorTree {
    /// Build the forward dominator tree, rooted at the method's entry block.
    pub fn forward(cfg: &Cfg) -> Self {
        let doms = dominators::simple_fast(&cfg.graph, cfg.entry);
        let mut block_of = HashMap::new();
        for (&block, &idx) in &cfg.index_of {
            block_of.insert(idx, block);
        }
        DominatorTree {
            doms,
            index_of: cfg.index_of.clone(),
            block_of,
        }
    }

    /// Build the post-dominator tree: dominance over the CFG with every
    /// edge reversed, rooted at... a virtual root is not modeled here;
    /// callers pass the block they want to treat as the reverse-root (e.g.
    /// a single-exit method's exit block).
    pub fn reverse_from(cfg: &Cfg, root: BasicBlockId) -> Option<Self> {
        let reversed = cfg.reversed();
        let root_idx = cfg.index_of(root)?;
        let doms = dominators::simple_fast(&reversed, root_idx);
        let mut block_of = HashMap::new();
        for (&block, &idx) in &cfg.index_of {
            block_of.insert(idx, block);
        }
        Some(DominatorTree {
            doms,
            index_of: cfg.index_of.clone(),
            block_of,
        })
    }

    pub fn immediate_dominator(&self, block: BasicBlockId) -> Option<BasicBlockId> {
        let idx = *self.index_of.get(&block)?;
        let idom = self.doms.immediate_dominator(idx)?;
        self.block_of.get(&idom).copied()
    }

    /// `true` iff `a` dominates `b` (every path from the root to `b` passes
    /// through `a`). A block trivially dominates itself.
    pub fn dominates(&self, a: BasicBlockId, b: BasicBlockId) -> bool {
        if a == b {
            return true;
        }
        let (Some(&a_idx), Some(&b_idx)) = (self.index_of.get(&a), self.index_of.get(&b)) else {
            return false;
        };
        let Some(mut chain) = self.doms.strict_dominators(b_idx) else {
            return false;
        };
        chain.any(|idx| idx == a_idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jitir_core::{ConstValue, MethodBuilder, MethodId, TypeId};

    #[test]
    fn entry_dominates_everything() {
        let mut b = MethodBuilder::new(MethodId(0), "f", vec![], TypeId::UNIT);
        let entry = b.entry_block();
        let then_bb = b.create_block();
        let else_bb = b.create_block();
        let merge = b.create_block();
        b.accept_control_flow_updates(true);

        b.set_insertion_block(entry);
        let cond = b.create_const(TypeId::BOOL, ConstValue::Bool(true)).unwrap();
        b.create_branch(TypeId::UNIT, cond, then_bb, else_bb).unwrap();

        b.set_insertion_block(then_bb);
        b.create_jump(TypeId::UNIT, merge).unwrap();
        b.set_insertion_block(else_bb);
        b.create_jump(TypeId::UNIT, merge).unwrap();
        b.set_insertion_block(merge);
        b.create_return(TypeId::UNIT, None).unwrap();

        let method = b.commit();
        let cfg = Cfg::build(&method);
        let doms = DominatorTree::forward(&cfg);

        assert!(doms.dominates(entry, merge));
        assert!(!doms.dominates(then_bb, merge), "then does not dominate merge: else is another path");
        assert_eq!(doms.immediate_dominator(merge), Some(entry));
    }
}
