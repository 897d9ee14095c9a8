//! `IntrinsicResolver` (§4.3 item 2): walks every call, and if its target is
//! registered as an intrinsic for the chosen backend, substitutes the call
//! with the backend-specific implementation.
//!
//! The table itself is backend territory -- a CPU-IL, PTX, or Velocity
//! backend builds its own [`IntrinsicTable`] and hands it to this pass.
//! Resolution order is pinned (DESIGN.md): entries are scanned from the
//! *last* registered backward to the first, and the first whose predicate
//! matches wins, so a later registration shadows an earlier one with the
//! same name. The PTX backend relies on this to let an SM-gated hardware
//! form replace a software fallback registered earlier for the same name.

use jitir_core::{BasicBlockId, MethodId, Program, TypeId, ValueId, ValueKind};

use crate::error::TransformError;
use crate::rewriter::{Changed, RewriteContext, Rewriter};

/// Everything an intrinsic's predicate or implementation needs to know about
/// the call site it is being asked to resolve.
pub struct IntrinsicCallSite<'a> {
    pub name: &'a str,
    pub call_value: ValueId,
    pub result_type: TypeId,
    pub args: &'a [ValueId],
}

pub type IntrinsicPredicate = Box<dyn Fn(&IntrinsicCallSite) -> bool + Send + Sync>;
pub type IntrinsicImplementation =
    Box<dyn Fn(&mut RewriteContext, &IntrinsicCallSite) -> Result<ValueId, TransformError> + Send + Sync>;

/// One `(name, applicability_predicate, implementation)` registration.
pub struct IntrinsicEntry {
    pub name: String,
    pub predicate: IntrinsicPredicate,
    pub implementation: IntrinsicImplementation,
}

/// An ordered table of intrinsic implementations for one backend.
///
/// Registration order is significant: [`IntrinsicTable::resolve`] scans
/// newest-first, so appending a new entry for a name already present lets
/// it shadow the earlier one whenever its predicate also matches.
#[derive(Default)]
pub struct IntrinsicTable {
    entries: Vec<IntrinsicEntry>,
}

impl IntrinsicTable {
    pub fn new() -> Self {
        IntrinsicTable { entries: Vec::new() }
    }

    pub fn register(&mut self, name: impl Into<String>, predicate: IntrinsicPredicate, implementation: IntrinsicImplementation) {
        self.entries.push(IntrinsicEntry {
            name: name.into(),
            predicate,
            implementation,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn resolve(&self, site: &IntrinsicCallSite) -> Option<&IntrinsicEntry> {
        self.entries.iter().rev().find(|entry| entry.name == site.name && (entry.predicate)(site))
    }
}

/// Disposable per-call "specialization phase" (§4.3 item 2): its lifetime is
/// tied to a single resolution attempt and it is torn down whether that
/// attempt succeeds or fails. Nothing it holds outlives the call, so there is
/// nothing to leak on the error path -- the type exists to make that
/// lifetime an explicit, named thing rather than an implicit stack frame.
struct SpecializationPhase {
    call: ValueId,
    intrinsic: String,
}

impl SpecializationPhase {
    fn begin(call: ValueId, intrinsic: &str) -> Self {
        tracing::trace!(call = %call, intrinsic, "specialization phase opened");
        SpecializationPhase {
            call,
            intrinsic: intrinsic.to_string(),
        }
    }
}

impl Drop for SpecializationPhase {
    fn drop(&mut self) {
        tracing::trace!(call = %self.call, intrinsic = %self.intrinsic, "specialization phase disposed");
    }
}

/// Resolves calls to `Intrinsic`-kind methods against a single backend's
/// [`IntrinsicTable`]. Calls whose target does not resolve this run are left
/// untouched -- the pipeline driver iterates this pass to a fixed point and
/// only raises [`TransformError::IntrinsicUnresolved`] if one survives every
/// iteration (see [`find_unresolved_call`]).
pub struct IntrinsicResolver<'a> {
    program: &'a Program,
    table: &'a IntrinsicTable,
}

impl<'a> IntrinsicResolver<'a> {
    pub fn new(program: &'a Program, table: &'a IntrinsicTable) -> Self {
        IntrinsicResolver { program, table }
    }
}

impl<'a> Rewriter for IntrinsicResolver<'a> {
    fn name(&self) -> &'static str {
        "IntrinsicResolver"
    }

    fn run_on_block(
        &mut self,
        ctx: &mut RewriteContext,
        _block: BasicBlockId,
        snapshot: &[ValueId],
    ) -> Result<Changed, TransformError> {
        let mut changed = Changed::No;
        for &id in snapshot {
            let Some(value) = ctx.builder.method().value(id).cloned() else {
                continue;
            };
            let ValueKind::Call { target, ref args } = value.kind else {
                continue;
            };
            let Some(target_method) = self.program.method(target) else {
                continue;
            };
            if !target_method.is_intrinsic() {
                continue;
            }
            let site = IntrinsicCallSite {
                name: &target_method.name,
                call_value: id,
                result_type: value.ty,
                args,
            };
            let Some(entry) = self.table.resolve(&site) else {
                continue;
            };

            let phase = SpecializationPhase::begin(id, &entry.name);
            let result = (entry.implementation)(ctx, &site);
            drop(phase);

            let replacement = result?;
            ctx.builder.replace(id, replacement)?;
            ctx.builder.remove(id)?;
            changed = Changed::Yes;
        }
        Ok(changed)
    }
}

/// Find the first remaining call to an `Intrinsic`-kind method, if any. The
/// pipeline calls this after the resolution sub-pipeline reaches its
/// fixed-point cap, to turn "still unresolved" into a reported error rather
/// than silently shipping an un-lowered call to codegen.
pub fn find_unresolved_call(method: &jitir_core::Method, program: &Program) -> Option<(ValueId, MethodId, String)> {
    for (id, value) in method.values.iter() {
        let ValueKind::Call { target, .. } = value.kind else {
            continue;
        };
        if let Some(target_method) = program.method(target) {
            if target_method.is_intrinsic() {
                return Some((*id, target, target_method.name.clone()));
            }
        }
    }
    None
}
