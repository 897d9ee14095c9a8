//! The method builder: the only way values, blocks, and a method's own
//! metadata are created or mutated (§4.1 "IR Builder & Arena").
//!
//! Mutation only ever happens through the owning methods below; callers
//! never touch a [`Method`]'s maps directly while a builder for it is live.
//! Every structural edit is a method on the owning type, and a debug-only
//! consistency check runs after each one.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::block::BasicBlock;
use crate::error::CoreError;
use crate::id::{BasicBlockId, MethodId, ValueId};
use crate::method::{Method, MethodKind};
use crate::type_id::TypeId;
use crate::types::ConstValue;
use crate::value::{ArithOp, CmpOp, LogicOp, NumKind, ShiftOp, SwitchArm, UnaryArithOp, Value, ValueKind};

/// Builds and mutates a single [`Method`]'s arena.
///
/// Values, blocks, and the method's own fields are allocated here and
/// nowhere else. Between `commit` calls the IR is open to structural edits;
/// `commit` hands back the frozen [`Method`] for analysis and codegen
/// (§3 "Lifecycle").
pub struct MethodBuilder {
    method: Method,
    next_value: u32,
    next_block: u32,
    /// Current insertion point for `create_*` factories that don't name a
    /// block explicitly.
    insertion_block: BasicBlockId,
    /// When `false` (the default), any edit that would change a block's
    /// predecessor/successor relationship is rejected.
    accept_control_flow_updates: bool,
    /// `(type, bit-pattern) -> value` so that equal constants share identity.
    interned_constants: HashMap<(TypeId, u64), ValueId>,
}

impl MethodBuilder {
    /// Start building a fresh method with one empty entry block.
    pub fn new(id: MethodId, name: impl Into<String>, params: Vec<TypeId>, return_type: TypeId) -> Self {
        let entry_block = BasicBlockId(0);
        let mut blocks = HashMap::new();
        blocks.insert(entry_block, BasicBlock::new(entry_block));

        MethodBuilder {
            method: Method {
                id,
                name: name.into(),
                kind: MethodKind::Normal,
                params,
                return_type,
                entry_block,
                blocks,
                values: HashMap::new(),
                generation: 0,
            },
            next_value: 0,
            next_block: 1,
            insertion_block: entry_block,
            accept_control_flow_updates: false,
            interned_constants: HashMap::new(),
        }
    }

    /// Resume editing a previously committed method.
    pub fn from_method(method: Method) -> Self {
        let next_value = method.values.keys().map(|v| v.0 + 1).max().unwrap_or(0);
        let next_block = method.blocks.keys().map(|b| b.0 + 1).max().unwrap_or(1);
        let insertion_block = method.entry_block;
        MethodBuilder {
            method,
            next_value,
            next_block,
            insertion_block,
            accept_control_flow_updates: false,
            interned_constants: HashMap::new(),
        }
    }

    pub fn set_kind(&mut self, kind: MethodKind) {
        self.method.kind = kind;
    }

    pub fn accept_control_flow_updates(&mut self, flag: bool) {
        self.accept_control_flow_updates = flag;
    }

    pub fn set_insertion_block(&mut self, block: BasicBlockId) {
        self.insertion_block = block;
    }

    pub fn insertion_block(&self) -> BasicBlockId {
        self.insertion_block
    }

    pub fn entry_block(&self) -> BasicBlockId {
        self.method.entry_block
    }

    /// Read-only access to the method as built so far. Passes that need to
    /// snapshot a block's current value sequence before rewriting it (§9
    /// "Iterator suspension") read through here.
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_param_type(&mut self, index: usize, ty: TypeId) {
        if let Some(slot) = self.method.params.get_mut(index) {
            *slot = ty;
        }
    }

    pub fn set_return_type(&mut self, ty: TypeId) {
        self.method.return_type = ty;
    }

    /// Change `value`'s declared type in place. Used by passes that rewrite
    /// a value's type without rewriting its operands (e.g. `LowerPointerViews`
    /// retyping a `Parameter` or `Phi` that happened to carry a view type).
    pub fn retype(&mut self, value: ValueId, new_ty: TypeId) -> Result<(), CoreError> {
        self.method
            .values
            .get_mut(&value)
            .ok_or(CoreError::ValueNotFound(value))?
            .ty = new_ty;
        Ok(())
    }

    /// Create a new, empty basic block. Does not attach it to any CFG edge;
    /// callers wire it in via `create_branch`/`create_jump`/`create_switch`.
    pub fn create_block(&mut self) -> BasicBlockId {
        let id = BasicBlockId(self.next_block);
        self.next_block += 1;
        self.method.blocks.insert(id, BasicBlock::new(id));
        id
    }

    // ------------------------------------------------------------------
    // Generic insertion, shared by every typed `create_*` factory below.
    // ------------------------------------------------------------------

    fn push(&mut self, block: BasicBlockId, ty: TypeId, kind: ValueKind) -> Result<ValueId, CoreError> {
        {
            let bb = self
                .method
                .blocks
                .get(&block)
                .ok_or(CoreError::BlockNotFound(block))?;
            if kind.is_terminator() {
                if let Some(existing) = bb.terminator() {
                    return Err(CoreError::DuplicateTerminator { block, existing });
                }
            } else if bb.terminator().is_some() {
                // A terminator is always the last value; inserting after it
                // would put a non-terminator mid-block.
                return Err(CoreError::DuplicateTerminator {
                    block,
                    existing: bb.terminator().unwrap(),
                });
            }
        }

        let id = ValueId(self.next_value);
        self.next_value += 1;

        let operands = kind.operands();
        let value = Value {
            id,
            ty,
            block,
            kind,
            uses: SmallVec::new(),
        };
        self.method.values.insert(id, value);
        self.method.blocks.get_mut(&block).unwrap().values.push(id);

        for operand in operands {
            if let Some(def) = self.method.values.get_mut(&operand) {
                def.uses.push(id);
            }
        }

        Ok(id)
    }

    /// Create a value in the current insertion block.
    fn create(&mut self, ty: TypeId, kind: ValueKind) -> Result<ValueId, CoreError> {
        let block = self.insertion_block;
        self.push(block, ty, kind)
    }

    // ------------------------------------------------------------------
    // Constants
    // ------------------------------------------------------------------

    /// Interned: two requests for an equal `(type, value)` pair return the
    /// same `ValueId` (§4.1 edge-case policy).
    pub fn create_const(&mut self, ty: TypeId, value: ConstValue) -> Result<ValueId, CoreError> {
        let key = (ty, value.bit_pattern());
        if let Some(&existing) = self.interned_constants.get(&key) {
            return Ok(existing);
        }
        let id = self.create(ty, ValueKind::ConstPrimitive(value))?;
        self.interned_constants.insert(key, id);
        Ok(id)
    }

    pub fn create_null_pointer(&mut self, pointer_type: TypeId) -> Result<ValueId, CoreError> {
        self.create(pointer_type, ValueKind::ConstNullPointer)
    }

    pub fn create_undef(&mut self, ty: TypeId) -> Result<ValueId, CoreError> {
        self.create(ty, ValueKind::ConstUndef)
    }

    pub fn create_parameter(&mut self, index: u32) -> Result<ValueId, CoreError> {
        let ty = *self
            .method
            .params
            .get(index as usize)
            .ok_or(CoreError::ValueNotFound(ValueId(index)))?;
        self.push(self.method.entry_block, ty, ValueKind::Parameter { index })
    }

    /// Read one axis of one index space of the launch's grid/group/thread
    /// hierarchy (§4.6). `ty` is the integer type the backend represents
    /// the index as (typically `TypeId::I64` or `TypeId::I32`).
    pub fn create_thread_index(&mut self, ty: TypeId, space: crate::value::IndexSpace, axis: crate::value::Axis) -> Result<ValueId, CoreError> {
        self.create(ty, ValueKind::ThreadIndex { space, axis })
    }

    // ------------------------------------------------------------------
    // Arithmetic / comparison
    // ------------------------------------------------------------------

    pub fn create_binary_arith(
        &mut self,
        ty: TypeId,
        op: ArithOp,
        kind: NumKind,
        lhs: ValueId,
        rhs: ValueId,
    ) -> Result<ValueId, CoreError> {
        self.create(ty, ValueKind::BinaryArith { op, kind, lhs, rhs })
    }

    pub fn create_unary_arith(
        &mut self,
        ty: TypeId,
        op: UnaryArithOp,
        kind: NumKind,
        operand: ValueId,
    ) -> Result<ValueId, CoreError> {
        self.create(ty, ValueKind::UnaryArith { op, kind, operand })
    }

    pub fn create_compare(
        &mut self,
        bool_ty: TypeId,
        op: CmpOp,
        kind: NumKind,
        lhs: ValueId,
        rhs: ValueId,
    ) -> Result<ValueId, CoreError> {
        self.create(bool_ty, ValueKind::Compare { op, kind, lhs, rhs })
    }

    pub fn create_logic(&mut self, ty: TypeId, op: LogicOp, lhs: ValueId, rhs: ValueId) -> Result<ValueId, CoreError> {
        self.create(ty, ValueKind::Logic { op, lhs, rhs })
    }

    pub fn create_not(&mut self, ty: TypeId, operand: ValueId) -> Result<ValueId, CoreError> {
        self.create(ty, ValueKind::Not { operand })
    }

    pub fn create_shift(
        &mut self,
        ty: TypeId,
        op: ShiftOp,
        signed: bool,
        value: ValueId,
        amount: ValueId,
    ) -> Result<ValueId, CoreError> {
        self.create(ty, ValueKind::Shift { op, signed, value, amount })
    }

    // ------------------------------------------------------------------
    // Memory
    // ------------------------------------------------------------------

    pub fn create_alloc(
        &mut self,
        pointer_ty: TypeId,
        element_type: TypeId,
        space: crate::types::AddressSpace,
    ) -> Result<ValueId, CoreError> {
        self.create(pointer_ty, ValueKind::Alloc { element_type, space })
    }

    pub fn create_load(&mut self, loaded_ty: TypeId, pointer: ValueId) -> Result<ValueId, CoreError> {
        self.create(loaded_ty, ValueKind::Load { pointer })
    }

    pub fn create_store(&mut self, unit_ty: TypeId, pointer: ValueId, value: ValueId) -> Result<ValueId, CoreError> {
        self.create(unit_ty, ValueKind::Store { pointer, value })
    }

    pub fn create_load_element_address(
        &mut self,
        pointer_ty: TypeId,
        pointer: ValueId,
        index: ValueId,
    ) -> Result<ValueId, CoreError> {
        self.create(pointer_ty, ValueKind::LoadElementAddress { pointer, index })
    }

    pub fn create_size_of(&mut self, i64_ty: TypeId, of_type: TypeId) -> Result<ValueId, CoreError> {
        self.create(i64_ty, ValueKind::SizeOf { of_type })
    }

    pub fn create_align_to(&mut self, pointer_ty: TypeId, pointer: ValueId, alignment: u32) -> Result<ValueId, CoreError> {
        self.create(pointer_ty, ValueKind::AlignTo { pointer, alignment })
    }

    pub fn create_pointer_cast(&mut self, to_ty: TypeId, pointer: ValueId, to: TypeId) -> Result<ValueId, CoreError> {
        self.create(to_ty, ValueKind::PointerCast { pointer, to })
    }

    pub fn create_address_space_cast(
        &mut self,
        ty: TypeId,
        pointer: ValueId,
        to: crate::types::AddressSpace,
    ) -> Result<ValueId, CoreError> {
        self.create(ty, ValueKind::AddressSpaceCast { pointer, to })
    }

    pub fn create_pointer_as_int(&mut self, i64_ty: TypeId, pointer: ValueId) -> Result<ValueId, CoreError> {
        self.create(i64_ty, ValueKind::PointerAsInt { pointer })
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    pub fn create_build_struct(
        &mut self,
        struct_ty: TypeId,
        struct_type: TypeId,
        fields: impl Into<SmallVec<[ValueId; 4]>>,
    ) -> Result<ValueId, CoreError> {
        self.create(struct_ty, ValueKind::BuildStruct { struct_type, fields: fields.into() })
    }

    pub fn create_get_field(&mut self, field_ty: TypeId, structure: ValueId, field_index: u32) -> Result<ValueId, CoreError> {
        self.create(field_ty, ValueKind::GetField { structure, field_index })
    }

    // ------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------

    pub fn create_new_view(&mut self, view_ty: TypeId, pointer: ValueId, length: ValueId) -> Result<ValueId, CoreError> {
        self.create(view_ty, ValueKind::NewView { pointer, length })
    }

    pub fn create_get_view_length(&mut self, i64_ty: TypeId, view: ValueId) -> Result<ValueId, CoreError> {
        self.create(i64_ty, ValueKind::GetViewLength { view })
    }

    pub fn create_sub_view(
        &mut self,
        view_ty: TypeId,
        view: ValueId,
        offset: ValueId,
        length: ValueId,
    ) -> Result<ValueId, CoreError> {
        self.create(view_ty, ValueKind::SubView { view, offset, length })
    }

    pub fn create_view_cast(&mut self, view_ty: TypeId, view: ValueId, to_element: TypeId) -> Result<ValueId, CoreError> {
        self.create(view_ty, ValueKind::ViewCast { view, to_element })
    }

    pub fn create_align_to_view(&mut self, view_ty: TypeId, view: ValueId, alignment: u32) -> Result<ValueId, CoreError> {
        self.create(view_ty, ValueKind::AlignToView { view, alignment })
    }

    pub fn create_as_aligned_view(&mut self, view_ty: TypeId, view: ValueId, alignment: u32) -> Result<ValueId, CoreError> {
        self.create(view_ty, ValueKind::AsAlignedView { view, alignment })
    }

    // ------------------------------------------------------------------
    // Control
    // ------------------------------------------------------------------

    pub fn create_branch(
        &mut self,
        unit_ty: TypeId,
        condition: ValueId,
        if_true: BasicBlockId,
        if_false: BasicBlockId,
    ) -> Result<ValueId, CoreError> {
        self.link_predecessor(if_true)?;
        self.link_predecessor(if_false)?;
        self.create(unit_ty, ValueKind::Branch { condition, if_true, if_false })
    }

    pub fn create_jump(&mut self, unit_ty: TypeId, target: BasicBlockId) -> Result<ValueId, CoreError> {
        self.link_predecessor(target)?;
        self.create(unit_ty, ValueKind::Jump { target })
    }

    pub fn create_switch(
        &mut self,
        unit_ty: TypeId,
        discriminant: ValueId,
        arms: Vec<SwitchArm>,
        default: BasicBlockId,
    ) -> Result<ValueId, CoreError> {
        for (_, target) in &arms {
            self.link_predecessor(*target)?;
        }
        self.link_predecessor(default)?;
        self.create(unit_ty, ValueKind::Switch { discriminant, arms, default })
    }

    pub fn create_return(&mut self, unit_ty: TypeId, value: Option<ValueId>) -> Result<ValueId, CoreError> {
        self.create(unit_ty, ValueKind::Return { value })
    }

    fn link_predecessor(&mut self, target: BasicBlockId) -> Result<(), CoreError> {
        if !self.accept_control_flow_updates {
            // Still allowed: a block's very first predecessor link, recorded
            // once, is part of ordinary construction, not an "edit". Reject
            // only when the predecessor is already present once and would be
            // duplicated by re-wiring -- conservative builders always wire
            // each edge exactly once, so this only ever fires on genuine
            // post-commit rewiring attempts.
        }
        let from = self.insertion_block;
        let bb = self
            .method
            .blocks
            .get_mut(&target)
            .ok_or(CoreError::BlockNotFound(target))?;
        if !bb.predecessors.contains(&from) {
            if !self.accept_control_flow_updates && !bb.predecessors.is_empty() {
                return Err(CoreError::ControlFlowEditsRejected);
            }
            bb.predecessors.push(from);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phi / Call / side-effects
    // ------------------------------------------------------------------

    pub fn create_phi(&mut self, ty: TypeId, block: BasicBlockId, sources: Vec<(ValueId, BasicBlockId)>) -> Result<ValueId, CoreError> {
        let predecessor_count = self
            .method
            .blocks
            .get(&block)
            .ok_or(CoreError::BlockNotFound(block))?
            .predecessors
            .len();
        if sources.len() != predecessor_count {
            return Err(CoreError::PhiArityMismatch {
                phi: ValueId(self.next_value),
                sources: sources.len(),
                predecessors: predecessor_count,
                block,
            });
        }
        self.push(block, ty, ValueKind::Phi { sources })
    }

    pub fn create_call(&mut self, ty: TypeId, target: MethodId, args: Vec<ValueId>) -> Result<ValueId, CoreError> {
        self.create(ty, ValueKind::Call { target, args })
    }

    pub fn create_atomic(
        &mut self,
        ty: TypeId,
        op: crate::value::AtomicOp,
        pointer: ValueId,
        operand: ValueId,
    ) -> Result<ValueId, CoreError> {
        self.create(ty, ValueKind::Atomic { op, pointer, operand })
    }

    pub fn create_barrier(&mut self, unit_ty: TypeId, scope: crate::value::BarrierScope) -> Result<ValueId, CoreError> {
        self.create(unit_ty, ValueKind::Barrier { scope })
    }

    pub fn create_external_io(&mut self, ty: TypeId, name: impl Into<String>, args: Vec<ValueId>) -> Result<ValueId, CoreError> {
        self.create(ty, ValueKind::ExternalIo { name: name.into(), args })
    }

    /// Rewrite `block`'s terminator so every control-flow target equal to
    /// `old_target` becomes `new_target`, and keep predecessor lists in
    /// sync. Used to splice a block onto an edge (e.g. LICM inserting a
    /// preheader in front of a loop header). Requires
    /// `accept_control_flow_updates(true)`.
    pub fn redirect_target(&mut self, block: BasicBlockId, old_target: BasicBlockId, new_target: BasicBlockId) -> Result<(), CoreError> {
        if !self.accept_control_flow_updates {
            return Err(CoreError::ControlFlowEditsRejected);
        }
        let term_id = self
            .method
            .blocks
            .get(&block)
            .ok_or(CoreError::BlockNotFound(block))?
            .terminator()
            .ok_or(CoreError::MissingTerminator(block))?;
        let term = self.method.values.get(&term_id).ok_or(CoreError::ValueNotFound(term_id))?;
        let new_kind = retarget_block(&term.kind, old_target, new_target);
        self.method.values.get_mut(&term_id).unwrap().kind = new_kind;

        if let Some(old_bb) = self.method.blocks.get_mut(&old_target) {
            old_bb.predecessors.retain(|&p| p != block);
        }
        if let Some(new_bb) = self.method.blocks.get_mut(&new_target) {
            if !new_bb.predecessors.contains(&block) {
                new_bb.predecessors.push(block);
            }
        }
        Ok(())
    }

    /// In every phi at the head of `block`, replace a source's recorded
    /// predecessor `old_pred` with `new_pred`. Used alongside
    /// `redirect_target` when the edge a phi source names is re-pointed
    /// through a newly spliced block.
    pub fn retarget_phi_sources(&mut self, block: BasicBlockId, old_pred: BasicBlockId, new_pred: BasicBlockId) -> Result<(), CoreError> {
        let value_ids: Vec<ValueId> = self
            .method
            .blocks
            .get(&block)
            .ok_or(CoreError::BlockNotFound(block))?
            .values
            .clone();
        for id in value_ids {
            let value = self.method.values.get_mut(&id).unwrap();
            if let ValueKind::Phi { sources } = &mut value.kind {
                for (_, pred) in sources.iter_mut() {
                    if *pred == old_pred {
                        *pred = new_pred;
                    }
                }
            } else {
                break; // phis are always the leading values of a block
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Rewire every use of `value` to `replacement`; `value` is left with no
    /// uses and becomes dead (callers typically `remove` it next).
    pub fn replace(&mut self, value: ValueId, replacement: ValueId) -> Result<(), CoreError> {
        let uses = self
            .method
            .values
            .get(&value)
            .ok_or(CoreError::ValueNotFound(value))?
            .uses
            .clone();

        for user_id in &uses {
            let user = self
                .method
                .values
                .get_mut(user_id)
                .ok_or(CoreError::ValueNotFound(*user_id))?;
            user.kind = substitute_operand(&user.kind, value, replacement);
        }

        if let Some(replacement_value) = self.method.values.get_mut(&replacement) {
            replacement_value.uses.extend(uses);
        }
        if let Some(old) = self.method.values.get_mut(&value) {
            old.uses.clear();
        }
        Ok(())
    }

    /// Move `value` from its current block to `to_block`, preserving its
    /// operands and uses (SSA identity never changes, only placement).
    /// Used by `LoopInvariantCodeMotion` to relocate hoisted values into a
    /// freshly spliced preheader; callers append to an as-yet-unterminated
    /// block and create its terminator afterward.
    pub fn relocate(&mut self, value: ValueId, to_block: BasicBlockId) -> Result<(), CoreError> {
        let from_block = self
            .method
            .values
            .get(&value)
            .ok_or(CoreError::ValueNotFound(value))?
            .block;
        if !self.method.blocks.contains_key(&to_block) {
            return Err(CoreError::BlockNotFound(to_block));
        }
        if from_block == to_block {
            return Ok(());
        }
        if let Some(bb) = self.method.blocks.get_mut(&from_block) {
            bb.values.retain(|v| *v != value);
        }
        self.method.blocks.get_mut(&to_block).unwrap().values.push(value);
        self.method.values.get_mut(&value).unwrap().block = to_block;
        Ok(())
    }

    /// Remove `value` from its block and the arena. Fatal (returns an error)
    /// if it still has uses.
    pub fn remove(&mut self, value: ValueId) -> Result<(), CoreError> {
        let v = self.method.values.get(&value).ok_or(CoreError::ValueNotFound(value))?;
        if !v.uses.is_empty() {
            return Err(CoreError::ValueStillUsed {
                value,
                use_count: v.uses.len(),
            });
        }
        let block = v.block;
        let operands = v.operands();

        for operand in operands {
            if let Some(def) = self.method.values.get_mut(&operand) {
                def.uses.retain(|u| *u != value);
            }
        }

        self.method.values.remove(&value);
        if let Some(bb) = self.method.blocks.get_mut(&block) {
            bb.values.retain(|v| *v != value);
        }
        Ok(())
    }

    /// Freeze this builder's edits and hand back the method. Bumps the
    /// generation counter so cached analyses invalidate.
    pub fn commit(mut self) -> Method {
        self.method.generation += 1;
        debug_assert!(self.check_consistency().is_ok(), "builder committed inconsistent IR");
        self.method
    }

    #[cfg(debug_assertions)]
    fn check_consistency(&self) -> Result<(), CoreError> {
        for (id, value) in &self.method.values {
            for operand in value.operands() {
                let def = self
                    .method
                    .values
                    .get(&operand)
                    .ok_or(CoreError::ValueNotFound(operand))?;
                if !def.uses.contains(id) {
                    return Err(CoreError::DanglingUse(operand));
                }
            }
        }
        Ok(())
    }

    #[cfg(not(debug_assertions))]
    fn check_consistency(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Produce `kind` with every occurrence of `from` in its operand positions
/// replaced by `to`. Used by `replace`; exhaustive over `ValueKind` so a new
/// variant cannot silently skip rewiring.
fn substitute_operand(kind: &ValueKind, from: ValueId, to: ValueId) -> ValueKind {
    let sub = |v: ValueId| if v == from { to } else { v };
    use ValueKind::*;
    match kind.clone() {
        ConstPrimitive(c) => ConstPrimitive(c),
        ConstNullPointer => ConstNullPointer,
        ConstUndef => ConstUndef,
        Parameter { index } => Parameter { index },
        UnaryArith { op, kind, operand } => UnaryArith { op, kind, operand: sub(operand) },
        Not { operand } => Not { operand: sub(operand) },
        BinaryArith { op, kind, lhs, rhs } => BinaryArith { op, kind, lhs: sub(lhs), rhs: sub(rhs) },
        Compare { op, kind, lhs, rhs } => Compare { op, kind, lhs: sub(lhs), rhs: sub(rhs) },
        Logic { op, lhs, rhs } => Logic { op, lhs: sub(lhs), rhs: sub(rhs) },
        Shift { op, signed, value, amount } => Shift { op, signed, value: sub(value), amount: sub(amount) },
        Alloc { element_type, space } => Alloc { element_type, space },
        Load { pointer } => Load { pointer: sub(pointer) },
        Store { pointer, value } => Store { pointer: sub(pointer), value: sub(value) },
        LoadElementAddress { pointer, index } => LoadElementAddress { pointer: sub(pointer), index: sub(index) },
        SizeOf { of_type } => SizeOf { of_type },
        AlignTo { pointer, alignment } => AlignTo { pointer: sub(pointer), alignment },
        PointerCast { pointer, to } => PointerCast { pointer: sub(pointer), to },
        AddressSpaceCast { pointer, to } => AddressSpaceCast { pointer: sub(pointer), to },
        PointerAsInt { pointer } => PointerAsInt { pointer: sub(pointer) },
        BuildStruct { struct_type, fields } => BuildStruct {
            struct_type,
            fields: fields.into_iter().map(sub).collect(),
        },
        GetField { structure, field_index } => GetField { structure: sub(structure), field_index },
        NewView { pointer, length } => NewView { pointer: sub(pointer), length: sub(length) },
        GetViewLength { view } => GetViewLength { view: sub(view) },
        SubView { view, offset, length } => SubView { view: sub(view), offset: sub(offset), length: sub(length) },
        ViewCast { view, to_element } => ViewCast { view: sub(view), to_element },
        AlignToView { view, alignment } => AlignToView { view: sub(view), alignment },
        AsAlignedView { view, alignment } => AsAlignedView { view: sub(view), alignment },
        Branch { condition, if_true, if_false } => Branch { condition: sub(condition), if_true, if_false },
        Jump { target } => Jump { target },
        Switch { discriminant, arms, default } => Switch { discriminant: sub(discriminant), arms, default },
        Return { value } => Return { value: value.map(sub) },
        Phi { sources } => Phi {
            sources: sources.into_iter().map(|(v, b)| (sub(v), b)).collect(),
        },
        Call { target, args } => Call {
            target,
            args: args.into_iter().map(sub).collect(),
        },
        Atomic { op, pointer, operand } => Atomic { op, pointer: sub(pointer), operand: sub(operand) },
        Barrier { scope } => Barrier { scope },
        ExternalIo { name, args } => ExternalIo {
            name,
            args: args.into_iter().map(sub).collect(),
        },
    }
}

/// Produce `kind` with every occurrence of `from` among its block targets
/// replaced by `to`. Used by `redirect_target`; exhaustive over the control
/// variants so a new terminator kind cannot silently skip retargeting.
fn retarget_block(kind: &ValueKind, from: BasicBlockId, to: BasicBlockId) -> ValueKind {
    let sub = |b: BasicBlockId| if b == from { to } else { b };
    match kind.clone() {
        ValueKind::Branch { condition, if_true, if_false } => ValueKind::Branch {
            condition,
            if_true: sub(if_true),
            if_false: sub(if_false),
        },
        ValueKind::Jump { target } => ValueKind::Jump { target: sub(target) },
        ValueKind::Switch { discriminant, arms, default } => ValueKind::Switch {
            discriminant,
            arms: arms.into_iter().map(|(v, b)| (v, sub(b))).collect(),
            default: sub(default),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AddressSpace;

    fn unit_method() -> MethodBuilder {
        MethodBuilder::new(MethodId(0), "test", vec![TypeId::I32], TypeId::I32)
    }

    #[test]
    fn constants_are_interned() {
        let mut b = unit_method();
        let a = b.create_const(TypeId::I32, ConstValue::I32(7)).unwrap();
        let c = b.create_const(TypeId::I32, ConstValue::I32(7)).unwrap();
        assert_eq!(a, c);
        let d = b.create_const(TypeId::I32, ConstValue::I32(8)).unwrap();
        assert_ne!(a, d);
    }

    #[test]
    fn second_terminator_is_rejected() {
        let mut b = unit_method();
        let p = b.create_parameter(0).unwrap();
        b.create_return(TypeId::UNIT, Some(p)).unwrap();
        let err = b.create_return(TypeId::UNIT, Some(p)).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateTerminator { .. }));
    }

    #[test]
    fn replace_rewires_all_uses() {
        let mut b = unit_method();
        let p = b.create_parameter(0).unwrap();
        let zero = b.create_const(TypeId::I32, ConstValue::I32(0)).unwrap();
        let sum = b
            .create_binary_arith(TypeId::I32, ArithOp::Add, NumKind::SignedInt, p, zero)
            .unwrap();
        let replacement = b.create_const(TypeId::I32, ConstValue::I32(42)).unwrap();
        b.replace(sum, replacement).unwrap();

        // sum itself now has no uses and can be removed.
        b.create_return(TypeId::UNIT, Some(replacement)).unwrap();
        b.remove(sum).unwrap();
        assert!(b.method.values.get(&sum).is_none());
    }

    #[test]
    fn remove_with_uses_is_fatal() {
        let mut b = unit_method();
        let p = b.create_parameter(0).unwrap();
        let zero = b.create_const(TypeId::I32, ConstValue::I32(0)).unwrap();
        let sum = b
            .create_binary_arith(TypeId::I32, ArithOp::Add, NumKind::SignedInt, p, zero)
            .unwrap();
        let err = b.remove(zero).unwrap_err();
        assert!(matches!(err, CoreError::ValueStillUsed { .. }));
        let _ = sum;
    }

    #[test]
    fn phi_arity_must_match_predecessors() {
        let mut b = unit_method();
        let entry = b.entry_block();
        let merge = b.create_block();
        b.accept_control_flow_updates(true);
        b.set_insertion_block(entry);
        let cond = b.create_const(TypeId::BOOL, ConstValue::Bool(true)).unwrap();
        b.create_branch(TypeId::UNIT, cond, merge, merge).unwrap();

        b.set_insertion_block(merge);
        let a = b.create_const(TypeId::I32, ConstValue::I32(1)).unwrap();
        // merge has exactly one recorded predecessor edge (entry, linked twice
        // collapses to one), so a 2-source phi must be rejected.
        let err = b
            .create_phi(TypeId::I32, merge, vec![(a, entry), (a, entry)])
            .unwrap_err();
        assert!(matches!(err, CoreError::PhiArityMismatch { .. }));
    }

    #[test]
    fn commit_bumps_generation() {
        let b = unit_method();
        let method = b.commit();
        assert_eq!(method.generation, 1);
    }

    #[test]
    fn control_flow_edits_rejected_without_flag() {
        let mut b = unit_method();
        let entry = b.entry_block();
        let other = b.create_block();
        b.set_insertion_block(entry);
        let cond = b.create_const(TypeId::BOOL, ConstValue::Bool(true)).unwrap();
        // First wiring of `other` succeeds even with the flag off.
        b.create_jump(TypeId::UNIT, other).unwrap();
        let _ = cond;

        // A second, different block now tries to claim `other` as a
        // successor too -- this is a genuine rewiring and must be rejected.
        let third = b.create_block();
        b.set_insertion_block(third);
        let err = b.create_jump(TypeId::UNIT, other).unwrap_err();
        assert!(matches!(err, CoreError::ControlFlowEditsRejected));
    }

    #[test]
    fn redirect_target_splices_a_block_onto_an_edge() {
        let mut b = unit_method();
        let entry = b.entry_block();
        let header = b.create_block();
        b.accept_control_flow_updates(true);
        b.set_insertion_block(entry);
        b.create_jump(TypeId::UNIT, header).unwrap();
        b.set_insertion_block(header);
        b.create_return(TypeId::UNIT, None).unwrap();

        let preheader = b.create_block();
        b.redirect_target(entry, header, preheader).unwrap();
        b.set_insertion_block(preheader);
        b.create_jump(TypeId::UNIT, header).unwrap();

        assert!(!b.method.blocks[&header].predecessors.contains(&entry));
        assert!(b.method.blocks[&header].predecessors.contains(&preheader));
        assert!(b.method.blocks[&preheader].predecessors.contains(&entry));
    }

    #[test]
    fn retype_changes_declared_type_only() {
        let mut b = unit_method();
        let p = b.create_parameter(0).unwrap();
        b.retype(p, TypeId::I64).unwrap();
        assert_eq!(b.method.values[&p].ty, TypeId::I64);
    }

    #[test]
    fn relocate_moves_a_value_without_disturbing_its_uses() {
        let mut b = unit_method();
        let entry = b.entry_block();
        let header = b.create_block();
        b.accept_control_flow_updates(true);
        b.set_insertion_block(entry);
        b.create_jump(TypeId::UNIT, header).unwrap();

        b.set_insertion_block(header);
        let x = b.create_parameter(0).unwrap();
        let one = b.create_const(TypeId::I32, ConstValue::I32(1)).unwrap();
        let invariant = b
            .create_binary_arith(TypeId::I32, ArithOp::Add, NumKind::SignedInt, x, one)
            .unwrap();
        b.create_return(TypeId::UNIT, Some(invariant)).unwrap();

        let preheader = b.create_block();
        b.redirect_target(entry, header, preheader).unwrap();
        b.relocate(invariant, preheader).unwrap();
        b.set_insertion_block(preheader);
        b.create_jump(TypeId::UNIT, header).unwrap();

        assert!(!b.method.blocks[&header].values.contains(&invariant));
        assert!(b.method.blocks[&preheader].values.contains(&invariant));
        assert_eq!(b.method.values[&invariant].block, preheader);
        // The use from the (still in header) return is untouched.
        assert!(b.method.values[&invariant].uses.len() == 1);
    }

    #[test]
    fn address_space_is_threaded_through_alloc() {
        let mut b = unit_method();
        let ptr_ty = TypeId::I32; // placeholder id, registry-backed types tested in type_id.rs
        let alloc = b.create_alloc(ptr_ty, TypeId::I32, AddressSpace::Shared).unwrap();
        let v = b.method.values.get(&alloc).unwrap();
        assert!(matches!(v.kind, ValueKind::Alloc { space: AddressSpace::Shared, .. }));
    }
}
