//! Reverse post-order traversal: the canonical total order used by LICM and
//! codegen (§4.2).

use petgraph::visit::Dfs;

use jitir_core::BasicBlockId;

use crate::cfg::Cfg;

/// Compute the reverse post order of a CFG's blocks starting from `entry`.
/// Unreachable blocks are omitted; only nodes reachable from the function's
/// roots are ordered.
pub fn reverse_post_order(cfg: &Cfg) -> Vec<BasicBlockId> {
    let mut post_order = Vec::new();
    let mut visited = std::collections::HashSet::new();
    post_order_visit(cfg, cfg.entry, &mut visited, &mut post_order);
    post_order.reverse();
    post_order.into_iter().map(|idx| cfg.block_of(idx)).collect()
}

fn post_order_visit(
    cfg: &Cfg,
    node: petgraph::graph::NodeIndex,
    visited: &mut std::collections::HashSet<petgraph::graph::NodeIndex>,
    out: &mut Vec<petgraph::graph::NodeIndex>,
) {
    if !visited.insert(node) {
        return;
    }
    for succ in cfg.graph.neighbors(node) {
        post_order_visit(cfg, succ, visited, out);
    }
    out.push(node);
}

/// Reverse post order restricted to a subset of blocks (e.g. a loop body),
/// excluding the loop's own entry -- the shape LICM needs (§4.3 item 3).
pub fn reverse_post_order_excluding(cfg: &Cfg, exclude: BasicBlockId) -> Vec<BasicBlockId> {
    reverse_post_order(cfg).into_iter().filter(|&b| b != exclude).collect()
}

/// Convenience: whether `b` is reachable from the entry block at all, using
/// a DFS over the reversed graph rooted at `b` would be the post-dominance
/// direction; here we want plain forward reachability.
pub fn is_reachable(cfg: &Cfg, block: BasicBlockId) -> bool {
    let Some(target) = cfg.index_of(block) else {
        return false;
    };
    let mut dfs = Dfs::new(&cfg.graph, cfg.entry);
    while let Some(node) = dfs.next(&cfg.graph) {
        if node == target {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use jitir_core::{ConstValue, MethodBuilder, MethodId, TypeId};

    #[test]
    fn rpo_visits_entry_first() {
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
        let order = reverse_post_order(&cfg);

        assert_eq!(order[0], entry);
        assert_eq!(*order.last().unwrap(), merge);
        assert_eq!(order.len(), 4);
    }
}
