//! CPU-IL backend (§4.5): lowers a method into a flat per-block `Vec<IlOp>`
//! stack-based bytecode and runs it on an in-process interpreter. The
//! cheapest of the three backends to validate end to end, and the one the
//! cross-backend agreement tests (§8 scenario 6) treat as ground truth.
//!
//! Every value that produces a result pushes it to the evaluation stack and
//! is immediately spilled to its slot (`StoreSlot`); operands are read back
//! with `PushSlot`. This mirrors an ordinary stack-machine calling
//! convention (locals addressed by store/load, not random stack indexing)
//! while keeping cross-block SSA values reachable regardless of how deep the
//! stack got in an intervening block.

use std::collections::HashMap;

use jitir_core::{
    AddressSpace, ArithOp, Axis, BasicBlockId, CmpOp, ConstValue, IndexSpace, JitType, LogicOp, Method, MethodId, NumKind,
    ShiftOp, TypeId, TypeRegistry, UnaryArithOp, ValueId, ValueKind,
};
use jitir_transform::{EdgeBindings, LoweredMethod, PhiBindings};

use crate::error::BackendError;
use crate::moveemitter::{emit_phi_destructions, MoveEmitter};

/// One slot in the interpreter's persistent value store: either a real SSA
/// value or a phi-destruction temporary minted for one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Value(ValueId),
    Temp(ValueId),
}

#[derive(Debug, Clone)]
pub enum IlOp {
    PushConst(ConstValue),
    PushParam(u32),
    /// Pushes the executing lane's position along `axis` in `space`
    /// (§4.6). Resolved from the `ThreadPosition` the driver or the
    /// warp executor hands each lane, not from `params`.
    ThreadIndex(IndexSpace, Axis),
    PushSlot(Slot),
    StoreSlot(Slot),
    Pop,
    UnaryArith(UnaryArithOp, NumKind),
    BinaryArith(ArithOp, NumKind),
    Compare(CmpOp, NumKind),
    Logic(LogicOp),
    Not,
    Shift(ShiftOp, bool),
    /// Reserve `bytes` in the interpreter's linear memory arena; pushes the
    /// resulting base address as a pointer value.
    Alloc { bytes: u32 },
    /// Pops a pointer, pushes the `width`-byte value loaded from it.
    Load { width: u32, float: bool },
    /// Pops `(pointer, value)`, writes `width` bytes of `value` at `pointer`.
    Store { width: u32 },
    /// Pops `(pointer, index)`, pushes `pointer + index * element_size`.
    LoadElementAddress { element_size: u32 },
    PushSizeOf { bytes: u32 },
    /// Pops a pointer, pushes it unchanged (alignment is asserted, not
    /// enforced, by an in-process interpreter with no real memory layout).
    AlignTo { alignment: u32 },
    PointerCast,
    AddressSpaceCast,
    PointerAsInt,
    /// Pops `field_count` values, pushes them as one `IlValue::Struct`.
    BuildStruct { field_count: usize },
    GetField { field_index: u32 },
    Call { target: MethodId, arg_count: usize },
    AtomicAdd,
    Barrier,
    ExternalIo { name: String, arg_count: usize },
    Jump(BasicBlockId),
    Branch(BasicBlockId, BasicBlockId),
    Switch { arms: Vec<(i64, BasicBlockId)>, default: BasicBlockId },
    Return { has_value: bool },
}

/// A lowered method's per-block bytecode, ready for the interpreter.
#[derive(Debug, Clone)]
pub struct CpuIlProgram {
    pub entry: BasicBlockId,
    pub blocks: HashMap<BasicBlockId, Vec<IlOp>>,
}

pub struct CpuIlBackend;

impl CpuIlBackend {
    /// Lower an already-pipelined method (view lowering, intrinsic
    /// resolution, LICM, and phi bindings all complete) into CPU-IL.
    pub fn lower(lowered: &LoweredMethod, types: &TypeRegistry) -> Result<CpuIlProgram, BackendError> {
        let method = &lowered.method;
        let mut blocks = HashMap::new();
        for &block_id in method.block_order().iter() {
            let Some(bb) = method.block(block_id) else { continue };
            let mut ops = Vec::new();
            for &value_id in &bb.values {
                let Some(value) = method.value(value_id) else { continue };
                emit_value(&mut ops, types, method, value_id, value.ty, &value.kind)?;
            }
            let edges = lowered.phi_bindings.bindings_from(block_id);
            splice_phi_destructions(&mut ops, edges)?;
            blocks.insert(block_id, ops);
        }
        Ok(CpuIlProgram { entry: method.entry_block, blocks })
    }
}

pub(crate) fn element_byte_size(types: &TypeRegistry, ty: TypeId) -> u32 {
    match types.get(ty) {
        Some(JitType::Scalar(s)) => s.byte_size(),
        Some(JitType::Pointer { .. }) => 8,
        _ => 8,
    }
}

/// The stride an `LoadElementAddress` on a pointer typed `ty` must use: the
/// byte size of the pointer's pointee, not of the pointer itself (a pointer
/// is always 8 bytes, which is not the stride the index argument counts in).
pub(crate) fn pointee_byte_size(types: &TypeRegistry, ty: TypeId) -> u32 {
    match types.get(ty) {
        Some(JitType::Pointer { pointee, .. }) => element_byte_size(types, *pointee),
        _ => element_byte_size(types, ty),
    }
}

pub(crate) fn is_float(kind: NumKind) -> bool {
    matches!(kind, NumKind::Float)
}

/// Emit the op sequence for one value, consulting `types` for operand
/// byte-width metadata (pointer arithmetic, size-of, struct field access)
/// and `method` for the type of operands not already carried by `kind`.
fn emit_value(
    ops: &mut Vec<IlOp>,
    types: &TypeRegistry,
    method: &Method,
    id: ValueId,
    ty: TypeId,
    kind: &ValueKind,
) -> Result<(), BackendError> {
    match kind {
        ValueKind::ConstPrimitive(c) => ops.push(IlOp::PushConst(c.clone())),
        ValueKind::ConstNullPointer => ops.push(IlOp::PushConst(ConstValue::I64(0))),
        ValueKind::ConstUndef => ops.push(IlOp::PushConst(ConstValue::I64(0))),
        ValueKind::Parameter { index } => ops.push(IlOp::PushParam(*index)),
        ValueKind::ThreadIndex { space, axis } => ops.push(IlOp::ThreadIndex(*space, *axis)),

        ValueKind::UnaryArith { op, kind, operand } => {
            push_slot(ops, *operand);
            ops.push(IlOp::UnaryArith(*op, *kind));
        }
        ValueKind::BinaryArith { op, kind, lhs, rhs } => {
            push_slot(ops, *lhs);
            push_slot(ops, *rhs);
            ops.push(IlOp::BinaryArith(*op, *kind));
        }
        ValueKind::Compare { op, kind, lhs, rhs } => {
            push_slot(ops, *lhs);
            push_slot(ops, *rhs);
            ops.push(IlOp::Compare(*op, *kind));
        }
        ValueKind::Logic { op, lhs, rhs } => {
            push_slot(ops, *lhs);
            push_slot(ops, *rhs);
            ops.push(IlOp::Logic(*op));
        }
        ValueKind::Not { operand } => {
            push_slot(ops, *operand);
            ops.push(IlOp::Not);
        }
        ValueKind::Shift { op, signed, value, amount } => {
            push_slot(ops, *value);
            push_slot(ops, *amount);
            ops.push(IlOp::Shift(*op, *signed));
        }

        ValueKind::Alloc { element_type, space: _ } => {
            let bytes = element_byte_size(types, *element_type);
            ops.push(IlOp::Alloc { bytes });
        }
        ValueKind::Load { pointer } => {
            push_slot(ops, *pointer);
            let width = element_byte_size(types, ty);
            ops.push(IlOp::Load { width, float: is_float_type(types, ty) });
        }
        ValueKind::Store { pointer, value } => {
            push_slot(ops, *pointer);
            push_slot(ops, *value);
            let stored_ty = method.value(*value).map(|v| v.ty).unwrap_or(ty);
            let width = element_byte_size(types, stored_ty);
            ops.push(IlOp::Store { width });
        }
        ValueKind::LoadElementAddress { pointer, index } => {
            push_slot(ops, *pointer);
            push_slot(ops, *index);
            ops.push(IlOp::LoadElementAddress { element_size: pointee_byte_size(types, ty) });
        }
        ValueKind::SizeOf { of_type } => {
            ops.push(IlOp::PushSizeOf { bytes: element_byte_size(types, *of_type) });
        }
        ValueKind::AlignTo { pointer, alignment } => {
            push_slot(ops, *pointer);
            ops.push(IlOp::AlignTo { alignment: *alignment });
        }
        ValueKind::PointerCast { pointer, to: _ } => {
            push_slot(ops, *pointer);
            ops.push(IlOp::PointerCast);
        }
        ValueKind::AddressSpaceCast { pointer, to: _ } => {
            push_slot(ops, *pointer);
            ops.push(IlOp::AddressSpaceCast);
        }
        ValueKind::PointerAsInt { pointer } => {
            push_slot(ops, *pointer);
            ops.push(IlOp::PointerAsInt);
        }

        ValueKind::BuildStruct { fields, .. } => {
            for &f in fields {
                push_slot(ops, f);
            }
            ops.push(IlOp::BuildStruct { field_count: fields.len() });
        }
        ValueKind::GetField { structure, field_index } => {
            push_slot(ops, *structure);
            ops.push(IlOp::GetField { field_index: *field_index });
        }

        ValueKind::NewView { .. }
        | ValueKind::GetViewLength { .. }
        | ValueKind::SubView { .. }
        | ValueKind::ViewCast { .. }
        | ValueKind::AlignToView { .. }
        | ValueKind::AsAlignedView { .. } => {
            return Err(BackendError::UnsupportedOperation { value: id });
        }

        ValueKind::Branch { condition, if_true, if_false } => {
            push_slot(ops, *condition);
            ops.push(IlOp::Branch(*if_true, *if_false));
            return Ok(());
        }
        ValueKind::Jump { target } => {
            ops.push(IlOp::Jump(*target));
            return Ok(());
        }
        ValueKind::Switch { discriminant, arms, default } => {
            push_slot(ops, *discriminant);
            ops.push(IlOp::Switch { arms: arms.clone(), default: *default });
            return Ok(());
        }
        ValueKind::Return { value } => {
            if let Some(v) = value {
                push_slot(ops, *v);
            }
            ops.push(IlOp::Return { has_value: value.is_some() });
            return Ok(());
        }

        ValueKind::Phi { .. } => {
            // A phi's value arrives via a destruction move written into this
            // slot by its predecessor before control reaches here; nothing
            // is emitted at the phi's own position.
            return Ok(());
        }

        ValueKind::Call { target, args } => {
            for &a in args {
                push_slot(ops, a);
            }
            ops.push(IlOp::Call { target: *target, arg_count: args.len() });
        }

        ValueKind::Atomic { op: _, pointer, operand } => {
            push_slot(ops, *pointer);
            push_slot(ops, *operand);
            ops.push(IlOp::AtomicAdd);
        }
        ValueKind::Barrier { .. } => {
            ops.push(IlOp::Barrier);
        }
        ValueKind::ExternalIo { name, args } => {
            for &a in args {
                push_slot(ops, a);
            }
            ops.push(IlOp::ExternalIo { name: name.clone(), arg_count: args.len() });
        }
    }

    if !kind.is_terminator() && !matches!(kind, ValueKind::Phi { .. }) {
        ops.push(IlOp::StoreSlot(Slot::Value(id)));
    }
    Ok(())
}

pub(crate) fn is_float_type(types: &TypeRegistry, ty: TypeId) -> bool {
    matches!(types.get(ty), Some(JitType::Scalar(s)) if s.is_float())
}

fn push_slot(ops: &mut Vec<IlOp>, value: ValueId) {
    ops.push(IlOp::PushSlot(Slot::Value(value)));
}

/// The `MoveEmitter` that turns `PhiBindings` edges into `IlOp`s spliced
/// right before a block's terminator.
struct IlMoveEmitter<'a> {
    ops: &'a mut Vec<IlOp>,
}

impl<'a> MoveEmitter for IlMoveEmitter<'a> {
    type Error = BackendError;

    fn snapshot_to_temporary(&mut self, value: ValueId) -> Result<(), BackendError> {
        self.ops.push(IlOp::PushSlot(Slot::Value(value)));
        self.ops.push(IlOp::StoreSlot(Slot::Temp(value)));
        Ok(())
    }

    fn emit_move(&mut self, dest: ValueId, src: ValueId, src_is_intermediate: bool) -> Result<(), BackendError> {
        let source = if src_is_intermediate { Slot::Temp(src) } else { Slot::Value(src) };
        self.ops.push(IlOp::PushSlot(source));
        self.ops.push(IlOp::StoreSlot(Slot::Value(dest)));
        Ok(())
    }
}

fn splice_phi_destructions(ops: &mut Vec<IlOp>, edges: &[EdgeBindings]) -> Result<(), BackendError> {
    if edges.is_empty() {
        return Ok(());
    }
    // The terminator is always the last emitted op; the destruction moves go
    // immediately before it so they execute on every successor edge this
    // block's terminator can take, consistent with one block potentially
    // feeding bindings to more than one successor (§4.5 item 3).
    let terminator = ops.pop();
    let mut tail = Vec::new();
    {
        let mut emitter = IlMoveEmitter { ops: &mut tail };
        emit_phi_destructions(&mut emitter, edges)?;
    }
    ops.append(&mut tail);
    if let Some(term) = terminator {
        ops.push(term);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

/// A runtime value on the interpreter's evaluation stack or in a slot.
#[derive(Debug, Clone)]
pub enum IlValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Pointer(u64),
    Struct(Vec<IlValue>),
    Unit,
}

impl IlValue {
    pub(crate) fn as_i64(&self) -> i64 {
        match self {
            IlValue::I8(v) => *v as i64,
            IlValue::I16(v) => *v as i64,
            IlValue::I32(v) => *v as i64,
            IlValue::I64(v) => *v,
            IlValue::Bool(b) => *b as i64,
            IlValue::Pointer(p) => *p as i64,
            _ => 0,
        }
    }

    pub(crate) fn as_f64(&self) -> f64 {
        match self {
            IlValue::F32(v) => *v as f64,
            IlValue::F64(v) => *v,
            other => other.as_i64() as f64,
        }
    }

    pub(crate) fn as_bool(&self) -> bool {
        match self {
            IlValue::Bool(b) => *b,
            other => other.as_i64() != 0,
        }
    }

    pub(crate) fn as_pointer(&self) -> u64 {
        match self {
            IlValue::Pointer(p) => *p,
            other => other.as_i64() as u64,
        }
    }

    pub(crate) fn from_const(c: &ConstValue) -> IlValue {
        match c {
            ConstValue::Bool(b) => IlValue::Bool(*b),
            ConstValue::I8(v) => IlValue::I8(*v),
            ConstValue::I16(v) => IlValue::I16(*v),
            ConstValue::I32(v) => IlValue::I32(*v),
            ConstValue::I64(v) => IlValue::I64(*v),
            ConstValue::F16(bits) => IlValue::F32(f32::from_bits(*bits as u32)),
            ConstValue::F32(bits) => IlValue::F32(f32::from_bits(*bits as u32)),
            ConstValue::F64(bits) => IlValue::F64(f64::from_bits(*bits)),
            ConstValue::Unit => IlValue::Unit,
        }
    }
}

/// The executing lane's coordinates in each of the three index spaces
/// (§4.6). Defaults to the origin, which is what `Interpreter::run` uses
/// for backends that never launch more than one logical thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadPosition {
    pub global: [u32; 3],
    pub group: [u32; 3],
    pub local: [u32; 3],
}

impl ThreadPosition {
    fn axis(components: &[u32; 3], axis: Axis) -> i64 {
        match axis {
            Axis::X => components[0] as i64,
            Axis::Y => components[1] as i64,
            Axis::Z => components[2] as i64,
        }
    }

    pub(crate) fn get(&self, space: IndexSpace, axis: Axis) -> i64 {
        match space {
            IndexSpace::Global => Self::axis(&self.global, axis),
            IndexSpace::Group => Self::axis(&self.group, axis),
            IndexSpace::Local => Self::axis(&self.local, axis),
        }
    }
}

/// A single method's interpreter state: parameter list, a linear byte
/// memory arena for `Alloc`/`Load`/`Store`, and the persistent slot map
/// SSA values and phi temporaries are spilled to.
pub struct Interpreter<'p> {
    program: &'p CpuIlProgram,
    memory: Vec<u8>,
    slots: HashMap<Slot, IlValue>,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p CpuIlProgram) -> Self {
        Interpreter {
            program,
            memory: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Run the method to completion, given its parameters, returning the
    /// value of `Return`'s operand if any. Equivalent to [`Self::run_at`]
    /// at the origin thread position, for callers with no index space of
    /// their own.
    pub fn run(&mut self, params: &[IlValue]) -> Result<Option<IlValue>, BackendError> {
        self.run_at(params, ThreadPosition::default())
    }

    /// Run the method to completion as the lane at `pos`, resolving every
    /// `IlOp::ThreadIndex` against it.
    pub fn run_at(&mut self, params: &[IlValue], pos: ThreadPosition) -> Result<Option<IlValue>, BackendError> {
        let mut stack: Vec<IlValue> = Vec::new();
        let mut block = self.program.entry;
        loop {
            let ops = self
                .program
                .blocks
                .get(&block)
                .ok_or_else(|| BackendError::EmissionFailed { reason: format!("missing block {block}") })?;
            let mut next_block: Option<BasicBlockId> = None;
            let mut returned: Option<Option<IlValue>> = None;

            for op in ops {
                match op {
                    IlOp::PushConst(c) => stack.push(IlValue::from_const(c)),
                    IlOp::PushParam(i) => stack.push(params[*i as usize].clone()),
                    IlOp::ThreadIndex(space, axis) => stack.push(IlValue::I64(pos.get(*space, *axis))),
                    IlOp::PushSlot(slot) => {
                        let v = self.slots.get(slot).cloned().unwrap_or(IlValue::Unit);
                        stack.push(v);
                    }
                    IlOp::StoreSlot(slot) => {
                        let v = stack.pop().unwrap_or(IlValue::Unit);
                        self.slots.insert(*slot, v);
                    }
                    IlOp::Pop => {
                        stack.pop();
                    }
                    IlOp::UnaryArith(op, kind) => {
                        let v = stack.pop().unwrap();
                        stack.push(eval_unary(*op, *kind, &v));
                    }
                    IlOp::BinaryArith(op, kind) => {
                        let rhs = stack.pop().unwrap();
                        let lhs = stack.pop().unwrap();
                        stack.push(eval_binary(*op, *kind, &lhs, &rhs));
                    }
                    IlOp::Compare(op, kind) => {
                        let rhs = stack.pop().unwrap();
                        let lhs = stack.pop().unwrap();
                        stack.push(IlValue::Bool(eval_compare(*op, *kind, &lhs, &rhs)));
                    }
                    IlOp::Logic(op) => {
                        let rhs = stack.pop().unwrap();
                        let lhs = stack.pop().unwrap();
                        let result = match op {
                            LogicOp::And => lhs.as_i64() & rhs.as_i64(),
                            LogicOp::Or => lhs.as_i64() | rhs.as_i64(),
                            LogicOp::Xor => lhs.as_i64() ^ rhs.as_i64(),
                        };
                        stack.push(IlValue::I64(result));
                    }
                    IlOp::Not => {
                        let v = stack.pop().unwrap();
                        stack.push(IlValue::Bool(!v.as_bool()));
                    }
                    IlOp::Shift(op, signed) => {
                        let amount = stack.pop().unwrap().as_i64();
                        let value = stack.pop().unwrap().as_i64();
                        let result = match (op, signed) {
                            (ShiftOp::Shl, _) => value.wrapping_shl(amount as u32),
                            (ShiftOp::Shr, true) => value.wrapping_shr(amount as u32),
                            (ShiftOp::Shr, false) => ((value as u64).wrapping_shr(amount as u32)) as i64,
                        };
                        stack.push(IlValue::I64(result));
                    }
                    IlOp::Alloc { bytes } => {
                        let base = self.memory.len();
                        self.memory.resize(base + *bytes as usize, 0);
                        stack.push(IlValue::Pointer(base as u64));
                    }
                    IlOp::Load { width, float } => {
                        let ptr = stack.pop().unwrap().as_pointer() as usize;
                        stack.push(load_from_memory(&self.memory, ptr, *width, *float));
                    }
                    IlOp::Store { width } => {
                        let value = stack.pop().unwrap();
                        let ptr = stack.pop().unwrap().as_pointer() as usize;
                        store_to_memory(&mut self.memory, ptr, *width, &value);
                    }
                    IlOp::LoadElementAddress { element_size } => {
                        let index = stack.pop().unwrap().as_i64();
                        let ptr = stack.pop().unwrap().as_pointer() as i64;
                        stack.push(IlValue::Pointer((ptr + index * *element_size as i64) as u64));
                    }
                    IlOp::PushSizeOf { bytes } => stack.push(IlValue::I64(*bytes as i64)),
                    IlOp::AlignTo { .. } => { /* pointer passes through unchanged */ }
                    IlOp::PointerCast | IlOp::AddressSpaceCast => { /* same bit pattern in-process */ }
                    IlOp::PointerAsInt => {
                        let p = stack.pop().unwrap().as_pointer();
                        stack.push(IlValue::I64(p as i64));
                    }
                    IlOp::BuildStruct { field_count } => {
                        let mut fields = Vec::with_capacity(*field_count);
                        for _ in 0..*field_count {
                            fields.push(stack.pop().unwrap());
                        }
                        fields.reverse();
                        stack.push(IlValue::Struct(fields));
                    }
                    IlOp::GetField { field_index } => {
                        let structure = stack.pop().unwrap();
                        if let IlValue::Struct(fields) = structure {
                            stack.push(fields[*field_index as usize].clone());
                        } else {
                            stack.push(IlValue::Unit);
                        }
                    }
                    IlOp::Call { arg_count, .. } => {
                        for _ in 0..*arg_count {
                            stack.pop();
                        }
                        stack.push(IlValue::Unit);
                    }
                    IlOp::AtomicAdd => {
                        let operand = stack.pop().unwrap();
                        let ptr = stack.pop().unwrap().as_pointer() as usize;
                        let prev = load_from_memory(&self.memory, ptr, 8, false);
                        let updated = prev.as_i64() + operand.as_i64();
                        store_to_memory(&mut self.memory, ptr, 8, &IlValue::I64(updated));
                        stack.push(prev);
                    }
                    IlOp::Barrier => { /* single-threaded interpreter: no-op */ }
                    IlOp::ExternalIo { arg_count, .. } => {
                        for _ in 0..*arg_count {
                            stack.pop();
                        }
                        stack.push(IlValue::Unit);
                    }
                    IlOp::Jump(target) => next_block = Some(*target),
                    IlOp::Branch(if_true, if_false) => {
                        let cond = stack.pop().unwrap().as_bool();
                        next_block = Some(if cond { *if_true } else { *if_false });
                    }
                    IlOp::Switch { arms, default } => {
                        let discriminant = stack.pop().unwrap().as_i64();
                        next_block = Some(
                            arms.iter()
                                .find(|(v, _)| *v == discriminant)
                                .map(|(_, b)| *b)
                                .unwrap_or(*default),
                        );
                    }
                    IlOp::Return { has_value } => {
                        returned = Some(if *has_value { stack.pop() } else { None });
                    }
                }
            }

            if let Some(result) = returned {
                return Ok(result);
            }
            block = next_block.ok_or_else(|| BackendError::EmissionFailed {
                reason: format!("block {block} fell off the end without a terminator"),
            })?;
        }
    }
}

pub(crate) fn eval_unary(op: UnaryArithOp, kind: NumKind, v: &IlValue) -> IlValue {
    if is_float(kind) {
        let x = v.as_f64();
        let r = match op {
            UnaryArithOp::Neg => -x,
            UnaryArithOp::Abs => x.abs(),
        };
        IlValue::F64(r)
    } else {
        let x = v.as_i64();
        let r = match op {
            UnaryArithOp::Neg => x.wrapping_neg(),
            UnaryArithOp::Abs => x.wrapping_abs(),
        };
        IlValue::I64(r)
    }
}

pub(crate) fn eval_binary(op: ArithOp, kind: NumKind, lhs: &IlValue, rhs: &IlValue) -> IlValue {
    if is_float(kind) {
        let a = lhs.as_f64();
        let b = rhs.as_f64();
        let r = match op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
            ArithOp::Rem => a % b,
        };
        IlValue::F64(r)
    } else if matches!(kind, NumKind::UnsignedInt) {
        let a = lhs.as_i64() as u64;
        let b = rhs.as_i64() as u64;
        let r = match op {
            ArithOp::Add => a.wrapping_add(b),
            ArithOp::Sub => a.wrapping_sub(b),
            ArithOp::Mul => a.wrapping_mul(b),
            ArithOp::Div => if b == 0 { 0 } else { a / b },
            ArithOp::Rem => if b == 0 { 0 } else { a % b },
        };
        IlValue::I64(r as i64)
    } else {
        let a = lhs.as_i64();
        let b = rhs.as_i64();
        let r = match op {
            ArithOp::Add => a.wrapping_add(b),
            ArithOp::Sub => a.wrapping_sub(b),
            ArithOp::Mul => a.wrapping_mul(b),
            ArithOp::Div => if b == 0 { 0 } else { a.wrapping_div(b) },
            ArithOp::Rem => if b == 0 { 0 } else { a.wrapping_rem(b) },
        };
        IlValue::I64(r)
    }
}

pub(crate) fn eval_compare(op: CmpOp, kind: NumKind, lhs: &IlValue, rhs: &IlValue) -> bool {
    if is_float(kind) {
        let a = lhs.as_f64();
        let b = rhs.as_f64();
        match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        }
    } else if matches!(kind, NumKind::UnsignedInt) {
        let a = lhs.as_i64() as u64;
        let b = rhs.as_i64() as u64;
        match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        }
    } else {
        let a = lhs.as_i64();
        let b = rhs.as_i64();
        match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        }
    }
}

pub(crate) fn load_from_memory(memory: &[u8], ptr: usize, width: u32, float: bool) -> IlValue {
    let bytes = memory.get(ptr..ptr + width as usize).unwrap_or(&[]);
    match (width, float) {
        (1, _) => IlValue::I8(*bytes.first().unwrap_or(&0) as i8),
        (2, _) => IlValue::I16(i16::from_le_bytes(bytes.try_into().unwrap_or([0; 2]))),
        (4, true) => IlValue::F32(f32::from_le_bytes(bytes.try_into().unwrap_or([0; 4]))),
        (4, false) => IlValue::I32(i32::from_le_bytes(bytes.try_into().unwrap_or([0; 4]))),
        (8, true) => IlValue::F64(f64::from_le_bytes(bytes.try_into().unwrap_or([0; 8]))),
        _ => IlValue::I64(i64::from_le_bytes(bytes.try_into().unwrap_or([0; 8]))),
    }
}

pub(crate) fn store_to_memory(memory: &mut Vec<u8>, ptr: usize, width: u32, value: &IlValue) {
    if memory.len() < ptr + width as usize {
        memory.resize(ptr + width as usize, 0);
    }
    let bytes: Vec<u8> = match value {
        IlValue::F32(v) => v.to_le_bytes().to_vec(),
        IlValue::F64(v) => v.to_le_bytes().to_vec(),
        other => {
            let v = other.as_i64();
            match width {
                1 => vec![v as u8],
                2 => (v as i16).to_le_bytes().to_vec(),
                4 => (v as i32).to_le_bytes().to_vec(),
                _ => v.to_le_bytes().to_vec(),
            }
        }
    };
    memory[ptr..ptr + bytes.len().min(width as usize)].copy_from_slice(&bytes[..bytes.len().min(width as usize)]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use jitir_core::{AddressSpace as AS, MethodBuilder, MethodId as MId, Program, TypeId as TId};
    use jitir_transform::PipelineOptions;

    /// Vector scale (§8 scenario 1): `out[i] = in[i] * 2` for a single
    /// thread index, lowered and interpreted end to end.
    #[test]
    fn vector_scale_single_element() {
        let mut types = TypeRegistry::new();
        let mut b = MethodBuilder::new(MId(0), "scale_one", vec![TId::I64, TId::I64], TId::UNIT);
        let entry = b.entry_block();
        b.set_insertion_block(entry);
        let in_ptr = b.create_parameter(0).unwrap();
        let out_ptr = b.create_parameter(1).unwrap();
        let loaded = b.create_load(TId::I32, in_ptr).unwrap();
        let two = b.create_const(TId::I32, ConstValue::I32(2)).unwrap();
        let scaled = b
            .create_binary_arith(TId::I32, ArithOp::Mul, NumKind::SignedInt, loaded, two)
            .unwrap();
        b.create_store(TId::UNIT, out_ptr, scaled).unwrap();
        b.create_return(TId::UNIT, None).unwrap();
        let method = b.commit();

        let program = Program::new();
        let table = jitir_transform::IntrinsicTable::new();
        let lowered = jitir_transform::run_pipeline(method, &mut types, &program, &table, &PipelineOptions::default()).unwrap();

        let il = CpuIlBackend::lower(&lowered, &types).unwrap();
        let mut interp = Interpreter::new(&il);

        // Two 4-byte cells of interpreter memory: in at 0, out at 4.
        let params = vec![IlValue::Pointer(0), IlValue::Pointer(4)];
        interp.memory = vec![0u8; 8];
        store_to_memory(&mut interp.memory, 0, 4, &IlValue::I32(5));

        interp.run(&params).unwrap();
        let out = load_from_memory(&interp.memory, 4, 4, false);
        assert_eq!(out.as_i64(), 10);
        let _ = AS::Generic;
    }

    #[test]
    fn branch_selects_correct_successor() {
        let mut types = TypeRegistry::new();
        let mut b = MethodBuilder::new(MId(0), "f", vec![], TId::I32);
        let entry = b.entry_block();
        let then_block = b.create_block();
        let else_block = b.create_block();
        b.accept_control_flow_updates(true);

        b.set_insertion_block(entry);
        let cond = b.create_const(TId::BOOL, ConstValue::Bool(true)).unwrap();
        b.create_branch(TId::UNIT, cond, then_block, else_block).unwrap();

        b.set_insertion_block(then_block);
        let one = b.create_const(TId::I32, ConstValue::I32(1)).unwrap();
        b.create_return(TId::I32, Some(one)).unwrap();

        b.set_insertion_block(else_block);
        let zero = b.create_const(TId::I32, ConstValue::I32(0)).unwrap();
        b.create_return(TId::I32, Some(zero)).unwrap();

        let method = b.commit();
        let program = Program::new();
        let table = jitir_transform::IntrinsicTable::new();
        let lowered =
            jitir_transform::run_pipeline(method, &mut types, &program, &table, &PipelineOptions::default()).unwrap();
        let il = CpuIlBackend::lower(&lowered, &types).unwrap();
        let mut interp = Interpreter::new(&il);
        let result = interp.run(&[]).unwrap().unwrap();
        assert_eq!(result.as_i64(), 1);
    }
}
