//! Exhaustive IR well-formedness checks (§4.1 "Validation"): SSA dominance
//! of uses, phi arity, terminator uniqueness and placement, operand
//! reachability, and (post `LowerPointerViews`) the absence of view-typed
//! values. Dispatch over value/op kinds is written exhaustively throughout,
//! never leaving a kind unhandled.

use jitir_core::{BasicBlockId, JitType, Method, TypeRegistry, ValueId};

use crate::cfg::Cfg;
use crate::dominators::DominatorTree;
use crate::error::AnalysisError;
use crate::phi::phis_in_block;
use crate::rpo::reverse_post_order;

/// Run every structural check against `method`. Stops at the first
/// violation found, reported with the offending value.
pub fn verify(method: &Method, types: &TypeRegistry) -> Result<(), AnalysisError> {
    check_blocks_nonempty_and_terminated(method)?;
    check_phi_arity(method)?;

    let cfg = Cfg::build(method);
    let doms = DominatorTree::forward(&cfg);
    check_dominance(method, &cfg, &doms)?;
    check_operands_resolve(method)?;
    let _ = types;
    Ok(())
}

/// Stronger post-lowering check: no value (and no phi, parameter, or
/// return) may carry a view type once `LowerPointerViews` has run.
pub fn verify_no_view_types(method: &Method, types: &TypeRegistry) -> Result<(), AnalysisError> {
    for value in method.values.values() {
        if is_view_type(types, value.ty) {
            return Err(AnalysisError::InvalidIr {
                value: value.id,
                reason: "value still carries a view type after view lowering".to_string(),
            });
        }
    }
    Ok(())
}

fn is_view_type(types: &TypeRegistry, ty: jitir_core::TypeId) -> bool {
    matches!(types.get(ty), Some(JitType::View { .. }))
}

fn check_blocks_nonempty_and_terminated(method: &Method) -> Result<(), AnalysisError> {
    for &block in method.blocks.keys() {
        let bb = method.block(block).expect("block id came from method.blocks");
        if bb.is_empty() {
            return Err(AnalysisError::InvalidIr {
                value: ValueId(0),
                reason: format!("block {block} has no values"),
            });
        }
        let Some(term_id) = bb.terminator() else {
            return Err(AnalysisError::InvalidIr {
                value: ValueId(0),
                reason: format!("block {block} has no terminator"),
            });
        };
        for &value_id in &bb.values {
            let value = method.value(value_id).expect("value id came from block.values");
            if value.kind.is_terminator() && value_id != term_id {
                return Err(AnalysisError::InvalidIr {
                    value: value_id,
                    reason: format!("block {block} has a terminator before its last value"),
                });
            }
        }
    }
    Ok(())
}

fn check_phi_arity(method: &Method) -> Result<(), AnalysisError> {
    for &block in method.blocks.keys() {
        let bb = method.block(block).expect("block id came from method.blocks");
        for phi_id in phis_in_block(method, block) {
            let phi = method.value(phi_id).expect("phi id came from phis_in_block");
            if let jitir_core::ValueKind::Phi { sources } = &phi.kind {
                if sources.len() != bb.predecessors.len() {
                    return Err(AnalysisError::InvalidIr {
                        value: phi_id,
                        reason: format!(
                            "phi has {} sources but block {block} has {} predecessors",
                            sources.len(),
                            bb.predecessors.len()
                        ),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Every non-phi use must be dominated by its definition; a phi's use of
/// `source` need only be dominated along the corresponding incoming edge,
/// which in a well-formed CFG means the source block itself (or a block it
/// dominates) -- checked here as "the source's defining block dominates
/// the predecessor edge's tail".
fn check_dominance(method: &Method, cfg: &Cfg, doms: &DominatorTree) -> Result<(), AnalysisError> {
    for block in reverse_post_order(cfg) {
        for &value_id in &method.block(block).unwrap().values {
            let value = method.value(value_id).unwrap();
            if let jitir_core::ValueKind::Phi { sources } = &value.kind {
                for &(src, pred) in sources {
                    let src_block = method.value(src).map(|v| v.block).unwrap_or(block);
                    if !doms.dominates(src_block, pred) && src_block != pred {
                        return Err(AnalysisError::InvalidIr {
                            value: value_id,
                            reason: format!("phi source {src} does not dominate predecessor edge from {pred}"),
                        });
                    }
                }
                continue;
            }
            for operand in value.operands() {
                let def_block = method.value(operand).map(|v| v.block).unwrap_or(block);
                if def_block != block && !doms.dominates(def_block, block) {
                    return Err(AnalysisError::InvalidIr {
                        value: value_id,
                        reason: format!("use of {operand} is not dominated by its definition"),
                    });
                }
            }
        }
    }
    Ok(())
}

fn check_operands_resolve(method: &Method) -> Result<(), AnalysisError> {
    for value in method.values.values() {
        for operand in value.operands() {
            if method.value(operand).is_none() {
                return Err(AnalysisError::InvalidIr {
                    value: value.id,
                    reason: format!("operand {operand} does not resolve to any value"),
                });
            }
        }
        if let jitir_core::ValueKind::Call { target, .. } = &value.kind {
            let _ = target;
        }
    }
    Ok(())
}

#[allow(dead_code)]
fn unused_basic_block_id_hint(_: BasicBlockId) {}

#[cfg(test)]
mod tests {
    use super::*;
    use jitir_core::{ConstValue, MethodBuilder, MethodId, TypeId, TypeRegistry};

    #[test]
    fn well_formed_method_passes() {
        let mut b = MethodBuilder::new(MethodId(0), "f", vec![], TypeId::I32);
        let entry = b.entry_block();
        b.set_insertion_block(entry);
        let v = b.create_const(TypeId::I32, ConstValue::I32(1)).unwrap();
        b.create_return(TypeId::I32, Some(v)).unwrap();
        let method = b.commit();

        let types = TypeRegistry::new();
        assert!(verify(&method, &types).is_ok());
    }

    #[test]
    fn mismatched_phi_arity_is_rejected() {
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
        b.create_jump(TypeId::UNIT, merge).unwrap();

        b.set_insertion_block(merge);
        // Only one source for a block with two predecessors: malformed.
        let result = b.create_phi(TypeId::I32, merge, vec![(a, pred_a)]);
        assert!(result.is_err());
    }
}
