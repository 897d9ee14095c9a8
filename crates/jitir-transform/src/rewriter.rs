//! The shared rewriter framework every block-local pass (`LowerPointerViews`,
//! `IntrinsicResolver`) is implemented against (§4.3 "Rewriter framework").
//!
//! A [`Rewriter`] visits blocks in reverse post order; each call receives an
//! immutable snapshot of the block's value sequence taken before the pass
//! touched anything, so a rewrite mid-block never perturbs the iteration it
//! is driven by (§9 "Iterator suspension"). Each pass implements the trait
//! independently rather than being one monolithic per-op emit loop.

use jitir_analysis::{reverse_post_order, Cfg};
use jitir_core::{BasicBlockId, Method, MethodBuilder, TypeRegistry, ValueId};

use crate::error::TransformError;

/// Whether a pass run touched the method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Changed {
    Yes,
    No,
}

impl Changed {
    pub fn merge(self, other: Changed) -> Changed {
        if self == Changed::Yes || other == Changed::Yes {
            Changed::Yes
        } else {
            Changed::No
        }
    }
}

/// The mutable state a block-local pass edits through. `types` is shared
/// because lowering a view type interns a replacement struct type.
pub struct RewriteContext<'a> {
    pub builder: &'a mut MethodBuilder,
    pub types: &'a mut TypeRegistry,
}

impl<'a> RewriteContext<'a> {
    /// The block's value sequence as of the start of this pass's run, not
    /// reflecting any edits the pass itself has made so far.
    pub fn snapshot(&self, block: BasicBlockId, before: &[ValueId]) -> Vec<ValueId> {
        let _ = block;
        before.to_vec()
    }
}

/// A single block-local rewrite pass.
pub trait Rewriter {
    fn name(&self) -> &'static str;

    /// Rewrite `block`, given `snapshot` -- the block's values as they stood
    /// before this pass began (never the live, possibly-already-edited
    /// sequence).
    fn run_on_block(
        &mut self,
        ctx: &mut RewriteContext,
        block: BasicBlockId,
        snapshot: &[ValueId],
    ) -> Result<Changed, TransformError>;
}

/// Drive `rewriter` over every block of `method` in reverse post order,
/// handing each call the pre-pass snapshot of that block's values, and
/// commit the result.
#[tracing::instrument(skip(method, types, rewriter), fields(pass = rewriter.name()))]
pub fn run_pass(method: Method, types: &mut TypeRegistry, rewriter: &mut dyn Rewriter) -> Result<(Method, Changed), TransformError> {
    let cfg = Cfg::build(&method);
    let order = reverse_post_order(&cfg);
    let snapshots: Vec<(BasicBlockId, Vec<ValueId>)> = order
        .into_iter()
        .map(|block| (block, method.block(block).map(|bb| bb.values.clone()).unwrap_or_default()))
        .collect();

    let mut builder = MethodBuilder::from_method(method);
    builder.accept_control_flow_updates(true);
    let mut changed = Changed::No;
    {
        let mut ctx = RewriteContext { builder: &mut builder, types };
        for (block, snapshot) in &snapshots {
            let did = rewriter.run_on_block(&mut ctx, *block, snapshot)?;
            changed = changed.merge(did);
            tracing::trace!(block = %block, changed = ?did, "ran block");
        }
    }
    Ok((builder.commit(), changed))
}
