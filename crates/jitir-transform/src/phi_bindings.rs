//! `PhiBindings` (§4.3 item 4): the map backends consume to destruct phis
//! during emission (§4.5 "Phi destruction during emission").
//!
//! For every edge from a predecessor block `P` into a successor `S`, the
//! bindings on that edge are `(phi, value)` pairs: `phi` is one of `S`'s own
//! phi values, and `value` is the source `phi` reads when control arrives
//! from `P`. A binding's `value` is flagged *intermediate* when it is itself
//! one of `S`'s phis being written on this same edge -- emitting the moves in
//! binding order would otherwise clobber it before another binding reads it
//! (the phi-swap case in §8 scenario 5).

use std::collections::{HashMap, HashSet};

use jitir_analysis::phis_in_block;
use jitir_core::{BasicBlockId, Method, ValueId, ValueKind};

/// The `(phi, value)` bindings one predecessor edge must perform on entry to
/// its successor block, plus which of those values are themselves phis of
/// the same successor (and therefore need snapshotting before any binding
/// on this edge overwrites them).
#[derive(Debug, Clone)]
pub struct EdgeBindings {
    pub target: BasicBlockId,
    pub bindings: Vec<(ValueId, ValueId)>,
    pub intermediates: HashSet<ValueId>,
}

/// Immutable once built: every backend reads the same map for a given
/// method, keyed by the predecessor block that must perform the move.
#[derive(Debug, Default)]
pub struct PhiBindings {
    by_source_block: HashMap<BasicBlockId, Vec<EdgeBindings>>,
}

impl PhiBindings {
    /// The edge-bindings a given predecessor block must emit, one entry per
    /// successor of `block` that has phis reading from it.
    pub fn bindings_from(&self, block: BasicBlockId) -> &[EdgeBindings] {
        self.by_source_block.get(&block).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.by_source_block.is_empty()
    }
}

/// Compute the phi-binding map for `method`. A pure function of the method's
/// current state, recomputed whenever the method is rebuilt -- this is not
/// itself cached by `AnalysisCache` since it is only ever consumed once, by
/// the backend that immediately follows it in the pipeline.
pub fn compute_phi_bindings(method: &Method) -> PhiBindings {
    let mut by_source_block: HashMap<BasicBlockId, Vec<EdgeBindings>> = HashMap::new();

    for &target in method.block_order().iter() {
        let phis = phis_in_block(method, target);
        if phis.is_empty() {
            continue;
        }
        let Some(bb) = method.block(target) else { continue };
        let lhs: HashSet<ValueId> = phis.iter().copied().collect();

        for (pred_index, &pred) in bb.predecessors.iter().enumerate() {
            let mut bindings = Vec::with_capacity(phis.len());
            for &phi_id in &phis {
                let Some(phi_value) = method.value(phi_id) else { continue };
                let ValueKind::Phi { sources } = &phi_value.kind else { continue };
                if let Some(&(src, _)) = sources.get(pred_index) {
                    bindings.push((phi_id, src));
                }
            }
            let intermediates: HashSet<ValueId> = bindings
                .iter()
                .filter(|(_, value)| lhs.contains(value))
                .map(|(_, value)| *value)
                .collect();

            by_source_block
                .entry(pred)
                .or_default()
                .push(EdgeBindings { target, bindings, intermediates });
        }
    }

    PhiBindings { by_source_block }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jitir_core::{ConstValue, MethodBuilder, MethodId, TypeId};

    #[test]
    fn empty_method_has_no_bindings() {
        let mut b = MethodBuilder::new(MethodId(0), "f", vec![], TypeId::UNIT);
        let entry = b.entry_block();
        b.set_insertion_block(entry);
        b.create_return(TypeId::UNIT, None).unwrap();
        let method = b.commit();

        let bindings = compute_phi_bindings(&method);
        assert!(bindings.is_empty());
    }

    #[test]
    fn single_phi_has_one_binding_per_predecessor() {
        let mut b = MethodBuilder::new(MethodId(0), "f", vec![], TypeId::I32);
        let entry = b.entry_block();
        let pred_a = b.create_block();
        let pred_b = b.create_block();
        let merge = b.create_block();
        b.accept_control_flow_updates(true);

        b.set_insertion_block(entry);
        let cond = b.create_const(TypeId::BOOL, ConstValue::Bool(true)).unwrap();
        b.create_branch(TypeId::UNIT, cond, pred_a, pred_b).unwrap();

        b.set_insertion_block(pred_a);
        let a = b.create_const(TypeId::I32, ConstValue::I32(1)).unwrap();
        b.create_jump(TypeId::UNIT, merge).unwrap();

        b.set_insertion_block(pred_b);
        let c = b.create_const(TypeId::I32, ConstValue::I32(2)).unwrap();
        b.create_jump(TypeId::UNIT, merge).unwrap();

        b.set_insertion_block(merge);
        let phi = b.create_phi(TypeId::I32, merge, vec![(a, pred_a), (c, pred_b)]).unwrap();
        b.create_return(TypeId::I32, Some(phi)).unwrap();
        let method = b.commit();

        let bindings = compute_phi_bindings(&method);
        let from_a = bindings.bindings_from(pred_a);
        assert_eq!(from_a.len(), 1);
        assert_eq!(from_a[0].bindings, vec![(phi, a)]);
        assert!(from_a[0].intermediates.is_empty());

        let from_b = bindings.bindings_from(pred_b);
        assert_eq!(from_b[0].bindings, vec![(phi, c)]);
    }

    /// Scenario 5 (§8): a loop header whose latch edge binds `phi1 <- phi2`
    /// and `phi2 <- phi1`. Both values are themselves phis of the same
    /// block, so both must be flagged intermediate -- the emitter snapshots
    /// one before either move runs.
    #[test]
    fn swap_bindings_flag_both_sides_as_intermediate() {
        let mut b = MethodBuilder::new(MethodId(0), "f", vec![TypeId::I32, TypeId::I32], TypeId::UNIT);
        let entry = b.entry_block();
        let header = b.create_block();
        let latch = b.create_block();
        let exit = b.create_block();
        b.accept_control_flow_updates(true);

        b.set_insertion_block(entry);
        let x0 = b.create_parameter(0).unwrap();
        let y0 = b.create_parameter(1).unwrap();
        b.create_jump(TypeId::UNIT, header).unwrap();

        // Terminate `latch` first so `header` already carries both of its
        // predecessors by the time its phis are created below.
        b.set_insertion_block(latch);
        b.create_jump(TypeId::UNIT, header).unwrap();

        // `header` is left unterminated while its phis are built: a fresh
        // phi can only be pushed into a block that has no terminator yet.
        // Build placeholder self-reads for `phi1`/`phi2` first, then two
        // more phis with the actual swapped sources, then retire the
        // placeholders -- this is the only way to give a phi a source that
        // is itself another phi not yet allocated.
        b.set_insertion_block(header);
        let phi1 = b.create_phi(TypeId::I32, header, vec![(x0, entry), (x0, latch)]).unwrap();
        let phi2 = b.create_phi(TypeId::I32, header, vec![(y0, entry), (y0, latch)]).unwrap();
        let fresh1 = b.create_phi(TypeId::I32, header, vec![(x0, entry), (phi2, latch)]).unwrap();
        let fresh2 = b.create_phi(TypeId::I32, header, vec![(y0, entry), (phi1, latch)]).unwrap();
        b.replace(phi1, fresh1).unwrap();
        b.replace(phi2, fresh2).unwrap();
        b.remove(phi1).unwrap();
        b.remove(phi2).unwrap();

        let cond = b.create_const(TypeId::BOOL, ConstValue::Bool(true)).unwrap();
        b.create_branch(TypeId::UNIT, cond, latch, exit).unwrap();

        b.set_insertion_block(exit);
        b.create_return(TypeId::UNIT, None).unwrap();
        let method = b.commit();

        let bindings = compute_phi_bindings(&method);
        let from_latch = bindings.bindings_from(latch);
        assert_eq!(from_latch.len(), 1);
        assert_eq!(from_latch[0].bindings.len(), 2);
        assert_eq!(from_latch[0].intermediates.len(), 2);
    }
}
