//! Phi collection: the set of phi values live at the head of a block,
//! needed by `PhiBindings` (jitir-transform) and by the validator's phi
//! arity check (§4.1, §4.5).

use jitir_core::{BasicBlockId, Method, ValueId};

/// All phi values in `block`, in definition order. A block's phis are
/// exactly its leading values whose kind is `Phi` -- the builder never
/// interleaves a phi after a non-phi value in the same block.
pub fn phis_in_block(method: &Method, block: BasicBlockId) -> Vec<ValueId> {
    let Some(bb) = method.block(block) else {
        return Vec::new();
    };
    bb.values
        .iter()
        .copied()
        .take_while(|&v| method.value(v).map(|val| val.kind.is_phi()).unwrap_or(false))
        .collect()
}

/// Every phi in the method, keyed by the block that owns it.
pub fn all_phis(method: &Method) -> Vec<(BasicBlockId, ValueId)> {
    let mut out = Vec::new();
    for &block in method.block_order().iter() {
        for phi in phis_in_block(method, block) {
            out.push((block, phi));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use jitir_core::{ConstValue, MethodBuilder, MethodId, TypeId};

    #[test]
    fn leading_phis_are_collected() {
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
        let phis = phis_in_block(&method, merge);
        assert_eq!(phis, vec![phi]);
    }
}
