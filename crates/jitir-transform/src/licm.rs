//! `LoopInvariantCodeMotion` (§4.3 item 3): hoists values that don't change
//! across loop iterations into a materialized preheader.
//!
//! Unlike `LowerPointerViews`/`IntrinsicResolver`, this pass needs to edit
//! control flow (splicing a preheader onto the loop's one entering edge), so
//! it drives `MethodBuilder` directly rather than going through the
//! block-local `Rewriter` trait.

use std::collections::HashSet;

use jitir_analysis::{find_loops, reverse_post_order_excluding, AnalysisError, Cfg, DominatorTree, Loop};
use jitir_core::{BasicBlockId, Method, MethodBuilder, TypeId, ValueId, ValueKind};

use crate::error::TransformError;
use crate::rewriter::Changed;

pub struct LoopInvariantCodeMotion;

impl LoopInvariantCodeMotion {
    /// Run LICM over every single-entry loop in `method`. A method containing
    /// a multi-entry loop is left untouched: `jitir_analysis::find_loops`
    /// fails the whole method rather than reporting partial results, and the
    /// pinned behavior here is to treat that the same way an
    /// unsupported shape elsewhere in this pipeline -- opaque to LICM, not a
    /// hard error (DESIGN.md).
    #[tracing::instrument(skip(method), fields(method = %method.name))]
    pub fn run(method: Method) -> Result<(Method, Changed), TransformError> {
        let cfg = Cfg::build(&method);
        let doms = DominatorTree::forward(&cfg);
        let nest = match find_loops(&method, &cfg, &doms) {
            Ok(nest) => nest,
            Err(AnalysisError::MultiEntryLoop { header }) => {
                tracing::warn!(header = %header, "multi-entry loop; skipping LICM for this method");
                return Ok((method, Changed::No));
            }
            Err(other) => return Err(other.into()),
        };
        if nest.loops.is_empty() {
            return Ok((method, Changed::No));
        }

        let mut builder = MethodBuilder::from_method(method);
        builder.accept_control_flow_updates(true);
        let mut changed = Changed::No;

        for lp in &nest.loops {
            let did = hoist_loop(&mut builder, &cfg, lp)?;
            changed = changed.merge(did);
        }

        Ok((builder.commit(), changed))
    }
}

fn defined_in(method: &Method, body: &HashSet<BasicBlockId>, value: ValueId) -> bool {
    method.value(value).map(|v| body.contains(&v.block)).unwrap_or(false)
}

fn is_const_like(kind: &ValueKind) -> bool {
    matches!(
        kind,
        ValueKind::ConstPrimitive(_) | ValueKind::ConstNullPointer | ValueKind::ConstUndef
    )
}

/// Hoist one loop's invariant values. Returns `Changed::No` (without error)
/// for shapes this pass declines to touch: a header with zero or more than
/// one externally-entering edge, where a single preheader cannot absorb the
/// entering edges without inflating phi arity.
fn hoist_loop(builder: &mut MethodBuilder, cfg: &Cfg, lp: &Loop) -> Result<Changed, TransformError> {
    let header = lp.header;
    let order: Vec<BasicBlockId> = reverse_post_order_excluding(cfg, header)
        .into_iter()
        .filter(|b| lp.contains(*b))
        .collect();

    let invariant = collect_invariant(builder.method(), &order, &lp.body);
    let moved = select_moved(builder.method(), &invariant);
    if moved.is_empty() {
        return Ok(Changed::No);
    }

    let external_preds: Vec<BasicBlockId> = builder
        .method()
        .block(header)
        .map(|bb| bb.predecessors.iter().copied().filter(|p| !lp.body.contains(p)).collect())
        .unwrap_or_default();
    if external_preds.len() != 1 {
        tracing::warn!(
            header = %header,
            external_preds = external_preds.len(),
            "loop header does not have exactly one externally-entering edge; skipping LICM for this loop"
        );
        return Ok(Changed::No);
    }
    let entry_pred = external_preds[0];

    let mut relocate_order: Vec<ValueId> = Vec::new();
    for &block in &order {
        let Some(bb) = builder.method().block(block) else { continue };
        for &vid in &bb.values {
            if moved.contains(&vid) {
                relocate_order.push(vid);
            }
        }
    }

    let preheader = builder.create_block();
    builder.redirect_target(entry_pred, header, preheader)?;
    builder.retarget_phi_sources(header, entry_pred, preheader)?;

    for vid in relocate_order {
        builder.relocate(vid, preheader)?;
    }
    builder.set_insertion_block(preheader);
    builder.create_jump(TypeId::UNIT, header)?;

    Ok(Changed::Yes)
}

/// Invariance as a fixed point (§4.3 item 3): not a side-effect value, not a
/// terminator, not a phi fed by a source defined inside the loop, and every
/// operand either lives outside the loop body or is itself already invariant.
fn collect_invariant(method: &Method, order: &[BasicBlockId], body: &HashSet<BasicBlockId>) -> HashSet<ValueId> {
    let mut invariant = HashSet::new();
    loop {
        let mut progressed = false;
        for &block in order {
            let Some(bb) = method.block(block) else { continue };
            for &vid in &bb.values {
                if invariant.contains(&vid) {
                    continue;
                }
                let value = method.value(vid).unwrap();
                if value.kind.is_side_effect() || value.kind.is_terminator() {
                    continue;
                }
                let eligible = if let ValueKind::Phi { sources } = &value.kind {
                    sources.iter().all(|(src, _)| !defined_in(method, body, *src))
                } else {
                    value
                        .kind
                        .operands()
                        .iter()
                        .all(|op| !defined_in(method, body, *op) || invariant.contains(op))
                };
                if eligible {
                    invariant.insert(vid);
                    progressed = true;
                }
            }
        }
        if !progressed {
            break;
        }
    }
    invariant
}

/// Which invariant values actually move (§4.3 item 3): a non-constant
/// invariant value always moves; a constant moves only if some use of it
/// also moves, computed as a fixed point over the invariant set.
fn select_moved(method: &Method, invariant: &HashSet<ValueId>) -> HashSet<ValueId> {
    let mut moved = HashSet::new();
    for &v in invariant {
        if !is_const_like(&method.value(v).unwrap().kind) {
            moved.insert(v);
        }
    }
    loop {
        let mut progressed = false;
        for &v in invariant {
            if moved.contains(&v) {
                continue;
            }
            let value = method.value(v).unwrap();
            if value.uses.iter().any(|u| moved.contains(u)) {
                moved.insert(v);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use jitir_core::{ArithOp, ConstValue, MethodId, NumKind};

    fn counted_loop() -> (MethodBuilder, BasicBlockId, BasicBlockId, BasicBlockId, BasicBlockId, ValueId) {
        let mut b = MethodBuilder::new(MethodId(0), "f", vec![TypeId::I32, TypeId::I32], TypeId::UNIT);
        let entry = b.entry_block();
        let header = b.create_block();
        let body = b.create_block();
        let exit = b.create_block();
        b.accept_control_flow_updates(true);

        b.set_insertion_block(entry);
        let x = b.create_parameter(0).unwrap();
        let y = b.create_parameter(1).unwrap();
        b.create_jump(TypeId::UNIT, header).unwrap();

        b.set_insertion_block(header);
        let cond = b.create_const(TypeId::BOOL, ConstValue::Bool(true)).unwrap();
        b.create_branch(TypeId::UNIT, cond, body, exit).unwrap();

        b.set_insertion_block(body);
        let t = b.create_binary_arith(TypeId::I32, ArithOp::Mul, NumKind::SignedInt, x, y).unwrap();
        b.create_jump(TypeId::UNIT, header).unwrap();

        b.set_insertion_block(exit);
        b.create_return(TypeId::UNIT, None).unwrap();

        (b, entry, header, body, exit, t)
    }

    /// `while (true) { t = x * y; }` -- `x * y` only depends on parameters
    /// from outside the loop, so it should be hoisted into a fresh preheader
    /// spliced between `entry` and `header`.
    #[test]
    fn hoists_a_literal_x_times_y_out_of_a_counted_loop() {
        let (b, entry, header, body, _exit, t) = counted_loop();
        let method = b.commit();

        let (method, changed) = LoopInvariantCodeMotion::run(method).unwrap();
        assert_eq!(changed, Changed::Yes);

        assert!(!method.block(body).unwrap().values.contains(&t));
        assert_ne!(method.value(t).unwrap().block, body);
        assert_ne!(method.value(t).unwrap().block, header);

        let preheader = method.value(t).unwrap().block;
        assert!(method.block(preheader).unwrap().values.contains(&t));
        assert!(method.block(header).unwrap().predecessors.contains(&preheader));
        assert!(!method.block(header).unwrap().predecessors.contains(&entry));
    }

    /// A loop body whose only values are side-effecting leaves the method
    /// untouched: a `Store` is never a hoisting candidate, and nothing else
    /// in the body is eligible.
    #[test]
    fn reports_no_change_when_nothing_is_invariant() {
        let mut b = MethodBuilder::new(MethodId(0), "f", vec![TypeId::I32], TypeId::UNIT);
        let entry = b.entry_block();
        let header = b.create_block();
        let body = b.create_block();
        let exit = b.create_block();
        b.accept_control_flow_updates(true);

        b.set_insertion_block(entry);
        let x = b.create_parameter(0).unwrap();
        let ptr = b
            .create_alloc(TypeId::I64, TypeId::I32, jitir_core::AddressSpace::Generic)
            .unwrap();
        b.create_jump(TypeId::UNIT, header).unwrap();

        b.set_insertion_block(header);
        let cond = b.create_const(TypeId::BOOL, ConstValue::Bool(true)).unwrap();
        b.create_branch(TypeId::UNIT, cond, body, exit).unwrap();

        b.set_insertion_block(body);
        b.create_store(TypeId::UNIT, ptr, x).unwrap();
        b.create_jump(TypeId::UNIT, header).unwrap();

        b.set_insertion_block(exit);
        b.create_return(TypeId::UNIT, None).unwrap();

        let method = b.commit();
        let block_count_before = method.blocks.len();
        let (method, changed) = LoopInvariantCodeMotion::run(method).unwrap();
        assert_eq!(changed, Changed::No);
        assert_eq!(method.blocks.len(), block_count_before);
    }
}
