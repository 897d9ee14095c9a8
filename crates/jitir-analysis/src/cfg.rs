//! Builds a `petgraph` control-flow graph view of a [`Method`] on demand.
//!
//! The method IR itself stores successors implicitly (as the terminator
//! value's targets) and predecessors explicitly (on `BasicBlock`); every
//! other analysis in this crate needs an actual graph to run `petgraph`
//! algorithms over, so this is the one place that bridges `BasicBlockId` to
//! `NodeIndex`.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use jitir_core::{BasicBlockId, Method};

pub struct Cfg {
    pub graph: DiGraph<BasicBlockId, ()>,
    pub index_of: HashMap<BasicBlockId, NodeIndex>,
    pub entry: NodeIndex,
}

impl Cfg {
    pub fn build(method: &Method) -> Self {
        let mut graph = DiGraph::new();
        let mut index_of = HashMap::new();

        for &block in method.blocks.keys() {
            index_of.insert(block, graph.add_node(block));
        }
        for &block in method.blocks.keys() {
            for succ in method.successors(block) {
                graph.add_edge(index_of[&block], index_of[&succ], ());
            }
        }

        let entry = index_of[&method.entry_block];
        Cfg { graph, index_of, entry }
    }

    pub fn block_of(&self, idx: NodeIndex) -> BasicBlockId {
        self.graph[idx]
    }

    pub fn index_of(&self, block: BasicBlockId) -> Option<NodeIndex> {
        self.index_of.get(&block).copied()
    }

    /// A graph with every edge reversed, for post-dominance / reverse
    /// traversal queries (§4.2 "Dominators ... in either forward or reverse
    /// direction").
    pub fn reversed(&self) -> DiGraph<BasicBlockId, ()> {
        let mut reversed = self.graph.clone();
        reversed.reverse();
        reversed
    }

    pub fn direction(&self, dir: Direction) -> DiGraph<BasicBlockId, ()> {
        match dir {
            Direction::Outgoing => self.graph.clone(),
            Direction::Incoming => self.reversed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jitir_core::{ConstValue, MethodBuilder, MethodId, TypeId};

    #[test]
    fn straight_line_cfg_has_one_edge_chain() {
        let mut b = MethodBuilder::new(MethodId(0), "f", vec![], TypeId::UNIT);
        let entry = b.entry_block();
        let next = b.create_block();
        b.set_insertion_block(entry);
        b.accept_control_flow_updates(true);
        b.create_jump(TypeId::UNIT, next).unwrap();
        b.set_insertion_block(next);
        b.create_return(TypeId::UNIT, None).unwrap();
        let method = b.commit();

        let cfg = Cfg::build(&method);
        assert_eq!(cfg.graph.node_count(), 2);
        assert_eq!(cfg.graph.edge_count(), 1);
    }

    #[test]
    fn branch_produces_two_successors() {
        let mut b = MethodBuilder::new(MethodId(0), "f", vec![], TypeId::UNIT);
        let entry = b.entry_block();
        let then_bb = b.create_block();
        let else_bb = b.create_block();
        b.set_insertion_block(entry);
        b.accept_control_flow_updates(true);
        let cond = b.create_const(TypeId::BOOL, ConstValue::Bool(true)).unwrap();
        b.create_branch(TypeId::UNIT, cond, then_bb, else_bb).unwrap();
        b.set_insertion_block(then_bb);
        b.create_return(TypeId::UNIT, None).unwrap();
        b.set_insertion_block(else_bb);
        b.create_return(TypeId::UNIT, None).unwrap();
        let method = b.commit();

        let cfg = Cfg::build(&method);
        assert_eq!(cfg.graph.edge_count(), 2);
    }
}
