//! Pipeline driver (§10 "ambient stack" / §4.3): orchestrates the
//! block-local and control-flow-editing passes into the single ordered run
//! every backend feeds from.
//!
//! Order is pinned: lower pointer views, then resolve intrinsics to a fixed
//! point, then (optionally) hoist loop invariants, then compute phi
//! bindings. LICM runs after intrinsic resolution because an intrinsic
//! implementation can introduce new loop-invariant arithmetic (e.g. the
//! stride computation a vector-load intrinsic expands into) that would
//! otherwise be missed.

use jitir_core::{Method, Program, TypeRegistry};

use crate::error::TransformError;
use crate::intrinsics::{find_unresolved_call, IntrinsicResolver, IntrinsicTable};
use crate::licm::LoopInvariantCodeMotion;
use crate::phi_bindings::{compute_phi_bindings, PhiBindings};
use crate::rewriter::{run_pass, Changed};
use crate::view_lowering::{retype_view_typed_values, LowerPointerViews};

/// Knobs a backend sets before handing a method to [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Whether to run `LoopInvariantCodeMotion` after intrinsic resolution.
    pub licm_enabled: bool,
    /// Upper bound on intrinsic-resolution sweeps before giving up and
    /// reporting the first still-unresolved call as an error. A sweep that
    /// resolves nothing terminates the loop early regardless of this cap.
    pub intrinsic_fixed_point_cap: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            licm_enabled: true,
            intrinsic_fixed_point_cap: 16,
        }
    }
}

/// A method that has been through the full lowering pipeline: no view types
/// remain, every intrinsic call has resolved, loop-invariant code has
/// (optionally) been hoisted, and its phi-destruction bindings are ready for
/// a backend to consume during emission.
pub struct LoweredMethod {
    pub method: Method,
    pub phi_bindings: PhiBindings,
}

/// Run the full lowering pipeline over `method`. `program` is consulted by
/// the intrinsic resolver to classify call targets; `table` is the
/// backend-specific intrinsic implementation set.
#[tracing::instrument(skip(method, types, program, table, options), fields(method = %method.name))]
pub fn run_pipeline(
    mut method: Method,
    types: &mut TypeRegistry,
    program: &Program,
    table: &IntrinsicTable,
    options: &PipelineOptions,
) -> Result<LoweredMethod, TransformError> {
    let (lowered, _) = run_pass(method, types, &mut LowerPointerViews)?;
    method = retype_view_typed_values(lowered, types)?;

    for iteration in 0..options.intrinsic_fixed_point_cap {
        let mut resolver = IntrinsicResolver::new(program, table);
        let (next, changed) = run_pass(method, types, &mut resolver)?;
        method = next;
        if changed == Changed::No {
            tracing::debug!(iteration, "intrinsic resolution reached a fixed point");
            break;
        }
    }
    if let Some((value, target, name)) = find_unresolved_call(&method, program) {
        let _ = value;
        return Err(TransformError::IntrinsicUnresolved { target, name });
    }

    if options.licm_enabled {
        let (next, changed) = LoopInvariantCodeMotion::run(method)?;
        method = next;
        tracing::debug!(changed = ?changed, "licm pass complete");
    }

    let phi_bindings = compute_phi_bindings(&method);
    Ok(LoweredMethod { method, phi_bindings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jitir_core::{ConstValue, MethodBuilder, MethodId, MethodKind, TypeId};

    fn empty_program() -> Program {
        Program::new()
    }

    #[test]
    fn pipeline_is_a_no_op_on_a_method_with_nothing_to_lower() {
        let mut types = TypeRegistry::new();
        let mut b = MethodBuilder::new(MethodId(0), "f", vec![], TypeId::I32);
        let entry = b.entry_block();
        b.set_insertion_block(entry);
        let c = b.create_const(TypeId::I32, ConstValue::I32(7)).unwrap();
        b.create_return(TypeId::I32, Some(c)).unwrap();
        let method = b.commit();

        let program = empty_program();
        let table = IntrinsicTable::new();
        let options = PipelineOptions::default();

        let lowered = run_pipeline(method, &mut types, &program, &table, &options).unwrap();
        assert!(lowered.phi_bindings.is_empty());
        assert_eq!(lowered.method.return_type, TypeId::I32);
    }

    #[test]
    fn unresolved_intrinsic_call_reports_an_error_after_the_cap() {
        let mut types = TypeRegistry::new();
        let mut program = Program::new();

        let intrinsic_id = MethodId(0);
        let mut ib = MethodBuilder::new(intrinsic_id, "gpu.unknown_intrinsic", vec![], TypeId::UNIT);
        ib.set_kind(MethodKind::Intrinsic);
        let ientry = ib.entry_block();
        ib.set_insertion_block(ientry);
        ib.create_return(TypeId::UNIT, None).unwrap();
        program.insert_method(ib.commit());

        let mut b = MethodBuilder::new(MethodId(1), "caller", vec![], TypeId::UNIT);
        let entry = b.entry_block();
        b.set_insertion_block(entry);
        let call = b.create_call(TypeId::UNIT, intrinsic_id, vec![]).unwrap();
        b.create_return(TypeId::UNIT, None).unwrap();
        let _ = call;
        let method = b.commit();

        let table = IntrinsicTable::new();
        let options = PipelineOptions {
            licm_enabled: false,
            intrinsic_fixed_point_cap: 4,
        };

        let err = run_pipeline(method, &mut types, &program, &table, &options).unwrap_err();
        assert!(matches!(err, TransformError::IntrinsicUnresolved { .. }));
    }
}
