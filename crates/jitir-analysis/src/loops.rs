//! Loop nest analysis: headers, back edges, and the blocks each loop owns
//! (§4.2). LICM only trusts single-entry loops; a header reached by back
//! edges from more than one header is reported via
//! [`AnalysisError::MultiEntryLoop`] and left out of the returned nest.

use std::collections::{HashSet, VecDeque};

use jitir_core::{BasicBlockId, Method};

use crate::cfg::Cfg;
use crate::dominators::DominatorTree;
use crate::error::AnalysisError;

#[derive(Debug, Clone)]
pub struct Loop {
    pub header: BasicBlockId,
    /// Blocks whose back edge targets `header`, i.e. the loop's latches.
    pub back_edges: Vec<BasicBlockId>,
    /// Every block owned by the loop, including `header`, found by walking
    /// backward from each latch until `header` is reached.
    pub body: HashSet<BasicBlockId>,
}

impl Loop {
    pub fn contains(&self, block: BasicBlockId) -> bool {
        self.body.contains(&block)
    }
}

pub struct LoopNest {
    pub loops: Vec<Loop>,
}

impl LoopNest {
    /// Find the loop (if any) whose header is `header`.
    pub fn loop_with_header(&self, header: BasicBlockId) -> Option<&Loop> {
        self.loops.iter().find(|l| l.header == header)
    }

    /// The innermost loop containing `block`, i.e. the one with the smallest
    /// body among all loops that contain it.
    pub fn innermost_containing(&self, block: BasicBlockId) -> Option<&Loop> {
        self.loops
            .iter()
            .filter(|l| l.contains(block))
            .min_by_key(|l| l.body.len())
    }
}

/// Identify natural loops: an edge `latch -> header` where `header`
/// dominates `latch` is a back edge, and `header` is that loop's header.
/// Multiple back edges sharing a header merge into a single loop (common
/// for `continue`-like control flow); a header reached by back edges whose
/// latches are not all dominated consistently is rejected as multi-entry.
pub fn find_loops(method: &Method, cfg: &Cfg, doms: &DominatorTree) -> Result<LoopNest, AnalysisError> {
    let mut by_header: std::collections::HashMap<BasicBlockId, Vec<BasicBlockId>> = std::collections::HashMap::new();

    for &block in method.blocks.keys() {
        for succ in method.successors(block) {
            if doms.dominates(succ, block) {
                by_header.entry(succ).or_default().push(block);
            }
        }
    }

    let mut loops = Vec::new();
    for (header, back_edges) in by_header {
        let mut body = HashSet::new();
        body.insert(header);
        let mut queue: VecDeque<BasicBlockId> = back_edges.iter().copied().collect();
        while let Some(block) = queue.pop_front() {
            if !body.insert(block) {
                continue;
            }
            for pred in &method.block(block).ok_or(AnalysisError::UnreachableBlock(block))?.predecessors {
                queue.push_back(*pred);
            }
        }

        if !single_entry(cfg, header, &body) {
            return Err(AnalysisError::MultiEntryLoop { header });
        }

        loops.push(Loop { header, back_edges, body });
    }

    Ok(LoopNest { loops })
}

/// A loop is single-entry iff `header` is the only body block with a
/// predecessor outside the body.
fn single_entry(cfg: &Cfg, header: BasicBlockId, body: &HashSet<BasicBlockId>) -> bool {
    for &block in body {
        if block == header {
            continue;
        }
        for pred_idx in cfg.graph.neighbors_directed(cfg.index_of[&block], petgraph::Direction::Incoming) {
            let pred = cfg.block_of(pred_idx);
            if !body.contains(&pred) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use jitir_core::{ConstValue, MethodBuilder, MethodId, TypeId};

    #[test]
    fn single_back_edge_loop_owns_its_body() {
        let mut b = MethodBuilder::new(MethodId(0), "f", vec![], TypeId::UNIT);
        let entry = b.entry_block();
        let header = b.create_block();
        let body_bb = b.create_block();
        let exit = b.create_block();
        b.accept_control_flow_updates(true);

        b.set_insertion_block(entry);
        b.create_jump(TypeId::UNIT, header).unwrap();
        b.set_insertion_block(header);
        let cond = b.create_const(TypeId::BOOL, ConstValue::Bool(true)).unwrap();
        b.create_branch(TypeId::UNIT, cond, body_bb, exit).unwrap();
        b.set_insertion_block(body_bb);
        b.create_jump(TypeId::UNIT, header).unwrap();
        b.set_insertion_block(exit);
        b.create_return(TypeId::UNIT, None).unwrap();

        let method = b.commit();
        let cfg = Cfg::build(&method);
        let doms = DominatorTree::forward(&cfg);
        let nest = find_loops(&method, &cfg, &doms).unwrap();

        assert_eq!(nest.loops.len(), 1);
        let lp = nest.loop_with_header(header).unwrap();
        assert!(lp.contains(header));
        assert!(lp.contains(body_bb));
        assert!(!lp.contains(exit));
    }

    #[test]
    fn acyclic_method_has_no_loops() {
        let mut b = MethodBuilder::new(MethodId(0), "f", vec![], TypeId::UNIT);
        let entry = b.entry_block();
        b.set_insertion_block(entry);
        b.create_return(TypeId::UNIT, None).unwrap();
        let method = b.commit();

        let cfg = Cfg::build(&method);
        let doms = DominatorTree::forward(&cfg);
        let nest = find_loops(&method, &cfg, &doms).unwrap();
        assert!(nest.loops.is_empty());
    }
}
