//! PTX backend (§4.5): emits textual PTX for CUDA consumption.
//!
//! Register allocation is one virtual register per SSA value, typed by its
//! declared [`JitType`]: `%p` predicates, `%r`/`%rd` integers (32/64-bit),
//! `%f`/`%fd` floats (32/64-bit), pointers as 64-bit generic addresses.
//! Structure values (the `{ptr, length}` pairs `LowerPointerViews` produces)
//! never get their own register -- `BuildStruct` records which operand
//! registers back each field, and `GetField` resolves straight through to
//! the operand that produced that field, mirroring how the CPU-IL backend's
//! slot map needs no real memory layout for the same pairs.

use std::collections::HashMap;
use std::fmt::Write as _;

use jitir_core::{
    ArithOp, Axis, CmpOp, ConstValue, IndexSpace, JitType, LogicOp, NumKind, ScalarType, ShiftOp, TypeId, TypeRegistry,
    UnaryArithOp, ValueId, ValueKind,
};
use jitir_analysis::{reverse_post_order, Cfg};
use jitir_transform::{IntrinsicCallSite, IntrinsicTable, LoweredMethod};

use crate::error::BackendError;
use crate::moveemitter::{emit_phi_destructions, MoveEmitter};
use crate::options::BackendOptions;

/// A compiled method's textual PTX body, ready to hand to a driver's module
/// loader (§6 "module load... accepting the emitted artifact bytes + entry
/// point name").
#[derive(Debug, Clone)]
pub struct PtxModule {
    pub entry_point: String,
    pub source: String,
}

pub struct PtxBackend;

impl PtxBackend {
    /// Build this backend's intrinsic table. Software fallbacks are
    /// registered first; when `sm` clears an intrinsic's gate, the
    /// hardware-form entry registered after it is found first by
    /// [`IntrinsicTable`]'s newest-first scan and shadows the fallback
    /// (DESIGN.md: registration-order shadowing).
    pub fn intrinsic_table(sm: Option<u32>) -> IntrinsicTable {
        let mut table = IntrinsicTable::new();

        let unary = [
            ("sqrt", "sqrt.rn.f32", "sqrt.approx.ftz.f32", 20u32),
            ("rcp", "rcp.rn.f32", "rcp.approx.ftz.f32", 20),
            ("sin", "sin.approx.f32", "sin.approx.ftz.f32", 70),
            ("cos", "cos.approx.f32", "cos.approx.ftz.f32", 70),
            ("exp2", "ex2.approx.f32", "ex2.approx.ftz.f32", 70),
            ("log2", "lg2.approx.f32", "lg2.approx.ftz.f32", 70),
            ("tanh", "tanh.approx.f32.soft", "tanh.approx.f32", 75),
        ];
        for (name, soft, hard, gate) in unary {
            register_fallback(&mut table, name, soft);
            register_hardware(&mut table, name, hard, gate, sm);
        }

        register_fallback(&mut table, "ieee_remainder", "rem.f32.soft");

        register_fallback(&mut table, "isnan", "setp.nan.f32");
        register_fallback(&mut table, "isinf", "setp.infinite.f32.soft");

        register_fallback(&mut table, "round_even", "cvt.rni.f32.f32");
        register_fallback(&mut table, "round_away_from_zero", "cvt.rna.f32.f32.soft");
        register_hardware(&mut table, "round_away_from_zero", "cvt.rna.f32.f32", 53, sm);

        // Group/warp intrinsics map to device-supplied extension methods
        // (§4.5): resolved straight through to an `ExternalIo` call rather
        // than a single PTX instruction.
        for name in ["group.barrier", "warp.barrier", "warp.shuffle.broadcast", "warp.shuffle.xor", "warp.shuffle.down", "warp.shuffle.up"] {
            register_passthrough(&mut table, name);
        }

        table
    }

    /// Lower an already-pipelined method into textual PTX.
    pub fn lower(lowered: &LoweredMethod, types: &TypeRegistry, options: &BackendOptions) -> Result<PtxModule, BackendError> {
        let method = &lowered.method;
        let cfg = Cfg::build(method);
        let order = reverse_post_order(&cfg);

        let mut emitter = Emitter {
            types,
            registers: HashMap::new(),
            struct_fields: HashMap::new(),
            next_temp: 0,
            body: String::new(),
        };

        for index in 0..method.params.len() {
            writeln!(emitter.body, "\tld.param.{} {}, [param_{}];", ptx_ty(types, method.params[index]), emitter.param_reg(index), index).ok();
        }

        for &block in &order {
            let Some(bb) = method.block(block) else { continue };
            writeln!(emitter.body, "BB{}:", block.0).ok();
            for &value_id in &bb.values {
                let Some(value) = method.value(value_id) else { continue };
                emitter.emit_value(value_id, value.ty, &value.kind)?;
            }
            let edges = lowered.phi_bindings.bindings_from(block);
            if !edges.is_empty() {
                let mut phi_emitter = PtxMoveEmitter { emitter: &mut emitter };
                emit_phi_destructions(&mut phi_emitter, edges)?;
            }
        }

        let entry_point = method.name.replace(['.', ' '], "_");
        let sm = options.ptx_sm.unwrap_or(0);
        let mut source = String::new();
        writeln!(source, ".version 8.3").ok();
        writeln!(source, ".target sm_{sm}").ok();
        writeln!(source, ".address_size 64").ok();
        writeln!(source).ok();
        writeln!(source, ".visible .entry {entry_point}(").ok();
        for index in 0..method.params.len() {
            let comma = if index + 1 == method.params.len() { "" } else { "," };
            writeln!(source, "\t.param .{} param_{}{}", ptx_param_ty(types, method.params[index]), index, comma).ok();
        }
        writeln!(source, ")\n{{").ok();
        source.push_str(&emitter.body);
        writeln!(source, "}}").ok();

        Ok(PtxModule { entry_point, source })
    }
}

fn register_fallback(table: &mut IntrinsicTable, name: &str, ptx_op: &str) {
    let op = ptx_op.to_string();
    table.register(
        name,
        Box::new(|_site: &IntrinsicCallSite| true),
        Box::new(move |ctx, site| ctx.builder.create_external_io(site.result_type, op.clone(), site.args.to_vec()).map_err(Into::into)),
    );
}

fn register_hardware(table: &mut IntrinsicTable, name: &str, ptx_op: &str, min_sm: u32, sm: Option<u32>) {
    let op = ptx_op.to_string();
    let gate = sm.is_some_and(|v| v >= min_sm);
    table.register(
        name,
        Box::new(move |_site: &IntrinsicCallSite| gate),
        Box::new(move |ctx, site| ctx.builder.create_external_io(site.result_type, op.clone(), site.args.to_vec()).map_err(Into::into)),
    );
}

fn register_passthrough(table: &mut IntrinsicTable, name: &str) {
    let op = name.to_string();
    table.register(
        name,
        Box::new(|_site: &IntrinsicCallSite| true),
        Box::new(move |ctx, site| ctx.builder.create_external_io(site.result_type, op.clone(), site.args.to_vec()).map_err(Into::into)),
    );
}

fn ptx_ty(types: &TypeRegistry, ty: TypeId) -> &'static str {
    match types.get(ty) {
        Some(JitType::Scalar(ScalarType::Bool)) => "pred",
        Some(JitType::Scalar(ScalarType::I8)) | Some(JitType::Scalar(ScalarType::I16)) | Some(JitType::Scalar(ScalarType::I32)) => "s32",
        Some(JitType::Scalar(ScalarType::I64)) => "s64",
        Some(JitType::Scalar(ScalarType::F16)) | Some(JitType::Scalar(ScalarType::F32)) => "f32",
        Some(JitType::Scalar(ScalarType::F64)) => "f64",
        Some(JitType::Pointer { .. }) => "u64",
        _ => "u64",
    }
}

fn ptx_param_ty(types: &TypeRegistry, ty: TypeId) -> &'static str {
    match types.get(ty) {
        Some(JitType::Scalar(ScalarType::I64)) | Some(JitType::Scalar(ScalarType::F64)) | Some(JitType::Pointer { .. }) => "u64",
        _ => "u32",
    }
}

fn reg_prefix(types: &TypeRegistry, ty: TypeId) -> &'static str {
    match types.get(ty) {
        Some(JitType::Scalar(ScalarType::Bool)) => "%p",
        Some(JitType::Scalar(ScalarType::I64)) => "%rd",
        Some(JitType::Scalar(ScalarType::F64)) => "%fd",
        Some(JitType::Scalar(ScalarType::F16)) | Some(JitType::Scalar(ScalarType::F32)) => "%f",
        Some(JitType::Pointer { .. }) => "%rd",
        _ => "%r",
    }
}

/// Shared emission state for one method's PTX body.
struct Emitter<'a> {
    types: &'a TypeRegistry,
    registers: HashMap<ValueId, String>,
    /// `BuildStruct`'s operand list, keyed by the struct value it produced;
    /// `GetField` resolves straight through this rather than allocating a
    /// backing register of its own (no real memory layout for `{ptr, len}`
    /// pairs at this level -- the same approach the CPU-IL backend takes).
    struct_fields: HashMap<ValueId, Vec<ValueId>>,
    next_temp: u32,
    body: String,
}

impl<'a> Emitter<'a> {
    fn param_reg(&mut self, index: usize) -> String {
        format!("%param{index}")
    }

    /// The register name backing `id`, resolving through `struct_fields`
    /// when `id` is itself a struct (so `GetField` lookups transparently
    /// reach the field's own producing value).
    fn reg(&self, id: ValueId) -> String {
        self.registers.get(&id).cloned().unwrap_or_else(|| format!("%v{}", id.0))
    }

    fn fresh_temp(&mut self) -> String {
        let id = self.next_temp;
        self.next_temp += 1;
        format!("%tmp{id}")
    }

    fn bind(&mut self, id: ValueId, ty: TypeId) -> String {
        let name = format!("{}{}", reg_prefix(self.types, ty), id.0);
        self.registers.insert(id, name.clone());
        name
    }

    fn emit_value(&mut self, id: ValueId, ty: TypeId, kind: &ValueKind) -> Result<(), BackendError> {
        match kind {
            ValueKind::ConstPrimitive(c) => {
                let dst = self.bind(id, ty);
                writeln!(self.body, "\tmov.{} {}, {};", ptx_ty(self.types, ty), dst, const_literal(c)).ok();
            }
            ValueKind::ConstNullPointer => {
                let dst = self.bind(id, ty);
                writeln!(self.body, "\tmov.u64 {dst}, 0;").ok();
            }
            ValueKind::ConstUndef => {
                let dst = self.bind(id, ty);
                writeln!(self.body, "\t// undef {dst}").ok();
            }
            ValueKind::Parameter { index } => {
                let dst = self.bind(id, ty);
                writeln!(self.body, "\tmov.{} {}, {};", ptx_ty(self.types, ty), dst, self.param_reg(*index as usize)).ok();
            }
            ValueKind::ThreadIndex { space, axis } => {
                let dst = self.bind(id, ty);
                let a = axis_letter(*axis);
                match space {
                    IndexSpace::Local => {
                        writeln!(self.body, "\tmov.u32 {dst}, %tid.{a};").ok();
                    }
                    IndexSpace::Group => {
                        writeln!(self.body, "\tmov.u32 {dst}, %ctaid.{a};").ok();
                    }
                    IndexSpace::Global => {
                        writeln!(self.body, "\tmad.lo.s32 {dst}, %ctaid.{a}, %ntid.{a}, %tid.{a};").ok();
                    }
                }
            }

            ValueKind::UnaryArith { op, kind, operand } => {
                let src = self.reg(*operand);
                let dst = self.bind(id, ty);
                let mnemonic = match (op, kind) {
                    (UnaryArithOp::Neg, NumKind::Float) => "neg.f32",
                    (UnaryArithOp::Neg, _) => "neg.s32",
                    (UnaryArithOp::Abs, NumKind::Float) => "abs.f32",
                    (UnaryArithOp::Abs, _) => "abs.s32",
                };
                writeln!(self.body, "\t{mnemonic} {dst}, {src};").ok();
            }
            ValueKind::BinaryArith { op, kind, lhs, rhs } => {
                let a = self.reg(*lhs);
                let b = self.reg(*rhs);
                let dst = self.bind(id, ty);
                let mnemonic = binary_mnemonic(*op, *kind, ty, self.types);
                writeln!(self.body, "\t{mnemonic} {dst}, {a}, {b};").ok();
            }
            ValueKind::Compare { op, kind, lhs, rhs } => {
                let a = self.reg(*lhs);
                let b = self.reg(*rhs);
                let dst = self.bind(id, ty);
                writeln!(self.body, "\tsetp.{}.{} {}, {}, {};", cmp_suffix(*op), num_suffix(*kind), dst, a, b).ok();
            }
            ValueKind::Logic { op, lhs, rhs } => {
                let a = self.reg(*lhs);
                let b = self.reg(*rhs);
                let dst = self.bind(id, ty);
                let mnemonic = match op {
                    LogicOp::And => "and.b32",
                    LogicOp::Or => "or.b32",
                    LogicOp::Xor => "xor.b32",
                };
                writeln!(self.body, "\t{mnemonic} {dst}, {a}, {b};").ok();
            }
            ValueKind::Not { operand } => {
                let src = self.reg(*operand);
                let dst = self.bind(id, ty);
                writeln!(self.body, "\tnot.pred {dst}, {src};").ok();
            }
            ValueKind::Shift { op, signed, value, amount } => {
                let v = self.reg(*value);
                let a = self.reg(*amount);
                let dst = self.bind(id, ty);
                let mnemonic = match (op, signed) {
                    (ShiftOp::Shl, _) => "shl.b32",
                    (ShiftOp::Shr, true) => "shr.s32",
                    (ShiftOp::Shr, false) => "shr.u32",
                };
                writeln!(self.body, "\t{mnemonic} {dst}, {v}, {a};").ok();
            }

            ValueKind::Alloc { .. } => {
                let dst = self.bind(id, ty);
                writeln!(self.body, "\t.local .align 8 .b8 alloc_{}[];\n\tmov.u64 {}, alloc_{};", id.0, dst, id.0).ok();
            }
            ValueKind::Load { pointer } => {
                let ptr = self.reg(*pointer);
                let dst = self.bind(id, ty);
                writeln!(self.body, "\tld.{} {}, [{}];", ptx_ty(self.types, ty), dst, ptr).ok();
            }
            ValueKind::Store { pointer, value } => {
                let ptr = self.reg(*pointer);
                let v = self.reg(*value);
                writeln!(self.body, "\tst.global.u64 [{ptr}], {v};").ok();
            }
            ValueKind::LoadElementAddress { pointer, index } => {
                let ptr = self.reg(*pointer);
                let idx = self.reg(*index);
                let dst = self.bind(id, ty);
                writeln!(self.body, "\tmad.wide.s32 {dst}, {idx}, 1, {ptr};").ok();
            }
            ValueKind::SizeOf { of_type } => {
                let dst = self.bind(id, ty);
                writeln!(self.body, "\tmov.u64 {}, {};", dst, scalar_byte_size(self.types, *of_type)).ok();
            }
            ValueKind::AlignTo { pointer, alignment } => {
                let ptr = self.reg(*pointer);
                let dst = self.bind(id, ty);
                writeln!(self.body, "\t// align_to {alignment}\n\tmov.u64 {dst}, {ptr};").ok();
            }
            ValueKind::PointerCast { pointer, .. } | ValueKind::AddressSpaceCast { pointer, .. } => {
                let ptr = self.reg(*pointer);
                let dst = self.bind(id, ty);
                writeln!(self.body, "\tcvta.to.global.u64 {dst}, {ptr};").ok();
            }
            ValueKind::PointerAsInt { pointer } => {
                let ptr = self.reg(*pointer);
                let dst = self.bind(id, ty);
                writeln!(self.body, "\tmov.u64 {dst}, {ptr};").ok();
            }

            ValueKind::BuildStruct { fields, .. } => {
                self.struct_fields.insert(id, fields.to_vec());
            }
            ValueKind::GetField { structure, field_index } => {
                if let Some(fields) = self.struct_fields.get(structure).cloned() {
                    if let Some(&src) = fields.get(*field_index as usize) {
                        let reg = self.reg(src);
                        self.registers.insert(id, reg);
                    }
                }
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
                let cond = self.reg(*condition);
                writeln!(self.body, "\t@{cond} bra BB{};\n\tbra BB{};", if_true.0, if_false.0).ok();
            }
            ValueKind::Jump { target } => {
                writeln!(self.body, "\tbra BB{};", target.0).ok();
            }
            ValueKind::Switch { discriminant, arms, default } => {
                let disc = self.reg(*discriminant);
                for (value, target) in arms {
                    let p = self.fresh_temp();
                    writeln!(self.body, "\tsetp.eq.s64 {p}, {disc}, {value};\n\t@{p} bra BB{};", target.0).ok();
                }
                writeln!(self.body, "\tbra BB{};", default.0).ok();
            }
            ValueKind::Return { value } => {
                if let Some(v) = value {
                    let src = self.reg(*v);
                    writeln!(self.body, "\tst.param.u64 [retval0], {src};").ok();
                }
                writeln!(self.body, "\tret;").ok();
            }

            ValueKind::Phi { .. } => {
                self.bind(id, ty);
            }

            ValueKind::Call { args, .. } => {
                let dst = self.bind(id, ty);
                let arg_regs: Vec<String> = args.iter().map(|a| self.reg(*a)).collect();
                writeln!(self.body, "\tcall.uni ({dst}), callee, ({});", arg_regs.join(", ")).ok();
            }
            ValueKind::Atomic { pointer, operand, .. } => {
                let ptr = self.reg(*pointer);
                let v = self.reg(*operand);
                let dst = self.bind(id, ty);
                writeln!(self.body, "\tatom.global.add.s32 {dst}, [{ptr}], {v};").ok();
            }
            ValueKind::Barrier { .. } => {
                writeln!(self.body, "\tbar.sync 0;").ok();
            }
            ValueKind::ExternalIo { name, args } => {
                let dst = self.bind(id, ty);
                let arg_regs: Vec<String> = args.iter().map(|a| self.reg(*a)).collect();
                if arg_regs.is_empty() {
                    writeln!(self.body, "\t{name} {dst};").ok();
                } else {
                    writeln!(self.body, "\t{name} {dst}, {};", arg_regs.join(", ")).ok();
                }
            }
        }
        Ok(())
    }
}

struct PtxMoveEmitter<'a, 'b> {
    emitter: &'a mut Emitter<'b>,
}

impl<'a, 'b> MoveEmitter for PtxMoveEmitter<'a, 'b> {
    type Error = BackendError;

    fn snapshot_to_temporary(&mut self, value: ValueId) -> Result<(), BackendError> {
        let src = self.emitter.reg(value);
        let tmp = self.emitter.fresh_temp();
        writeln!(self.emitter.body, "\tmov.b64 {tmp}, {src};").ok();
        self.emitter.registers.insert(snapshot_key(value), tmp);
        Ok(())
    }

    fn emit_move(&mut self, dest: ValueId, src: ValueId, src_is_intermediate: bool) -> Result<(), BackendError> {
        let source_reg = if src_is_intermediate {
            self.emitter.reg(snapshot_key(src))
        } else {
            self.emitter.reg(src)
        };
        let dest_reg = self.emitter.reg(dest);
        writeln!(self.emitter.body, "\tmov.b64 {dest_reg}, {source_reg};").ok();
        Ok(())
    }
}

/// Phi-destruction temporaries live in the same register map as ordinary
/// values, keyed by a synthetic id derived from the snapshotted value so it
/// never collides with a real `ValueId`.
fn snapshot_key(value: ValueId) -> ValueId {
    ValueId(value.0 | 0x8000_0000)
}

fn const_literal(c: &ConstValue) -> String {
    match c {
        ConstValue::Bool(b) => (*b as i32).to_string(),
        ConstValue::I8(v) => v.to_string(),
        ConstValue::I16(v) => v.to_string(),
        ConstValue::I32(v) => v.to_string(),
        ConstValue::I64(v) => v.to_string(),
        ConstValue::F16(bits) | ConstValue::F32(bits) => format!("0f{:08X}", *bits as u32),
        ConstValue::F64(bits) => format!("0d{bits:016X}"),
        ConstValue::Unit => "0".to_string(),
    }
}

fn binary_mnemonic(op: ArithOp, kind: NumKind, ty: TypeId, types: &TypeRegistry) -> &'static str {
    let suffix32 = ptx_ty(types, ty);
    match (op, kind) {
        (ArithOp::Add, NumKind::Float) => {
            if suffix32 == "f64" {
                "add.f64"
            } else {
                "add.f32"
            }
        }
        (ArithOp::Add, _) => "add.s32",
        (ArithOp::Sub, NumKind::Float) => "sub.f32",
        (ArithOp::Sub, _) => "sub.s32",
        (ArithOp::Mul, NumKind::Float) => "mul.f32",
        (ArithOp::Mul, _) => "mul.lo.s32",
        (ArithOp::Div, NumKind::Float) => "div.rn.f32",
        (ArithOp::Div, NumKind::UnsignedInt) => "div.u32",
        (ArithOp::Div, _) => "div.s32",
        (ArithOp::Rem, NumKind::Float) => "rem.f32",
        (ArithOp::Rem, NumKind::UnsignedInt) => "rem.u32",
        (ArithOp::Rem, _) => "rem.s32",
    }
}

fn cmp_suffix(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "eq",
        CmpOp::Ne => "ne",
        CmpOp::Lt => "lt",
        CmpOp::Le => "le",
        CmpOp::Gt => "gt",
        CmpOp::Ge => "ge",
    }
}

fn axis_letter(axis: Axis) -> &'static str {
    match axis {
        Axis::X => "x",
        Axis::Y => "y",
        Axis::Z => "z",
    }
}

fn num_suffix(kind: NumKind) -> &'static str {
    match kind {
        NumKind::SignedInt => "s32",
        NumKind::UnsignedInt => "u32",
        NumKind::Float => "f32",
    }
}

fn scalar_byte_size(types: &TypeRegistry, ty: TypeId) -> u32 {
    match types.get(ty) {
        Some(JitType::Scalar(s)) => s.byte_size(),
        Some(JitType::Pointer { .. }) => 8,
        _ => 8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jitir_core::{AddressSpace, ConstValue, MethodBuilder, MethodId, Program, TypeId};
    use jitir_transform::PipelineOptions;

    fn vector_scale_method() -> (Program, TypeRegistry) {
        let mut types = TypeRegistry::new();
        let mut program = Program::new();
        let ptr_ty = types.intern_pointer(TypeId::F32, AddressSpace::Global);
        let mut b = MethodBuilder::new(MethodId(0), "scale", vec![ptr_ty, ptr_ty], TypeId::UNIT);
        let entry = b.entry_block();
        b.set_insertion_block(entry);
        let in_ptr = b.create_parameter(0).unwrap();
        let out_ptr = b.create_parameter(1).unwrap();
        let loaded = b.create_load(TypeId::F32, in_ptr).unwrap();
        let two = b.create_const(TypeId::F32, ConstValue::F32(2.0f32.to_bits() as u64)).unwrap();
        let scaled = b
            .create_binary_arith(TypeId::F32, ArithOp::Mul, NumKind::Float, loaded, two)
            .unwrap();
        b.create_store(TypeId::UNIT, out_ptr, scaled).unwrap();
        b.create_return(TypeId::UNIT, None).unwrap();
        program.insert_method(b.commit());
        (program, types)
    }

    #[test]
    fn lowers_a_scalar_kernel_to_textual_ptx_with_an_entry_label() {
        let (program, mut types) = vector_scale_method();
        let method = program.method(MethodId(0)).unwrap().clone();
        let table = PtxBackend::intrinsic_table(None);
        let lowered = jitir_transform::run_pipeline(method, &mut types, &program, &table, &PipelineOptions::default()).unwrap();
        let options = BackendOptions::for_target(crate::options::BackendTarget::Ptx);
        let module = PtxBackend::lower(&lowered, &types, &options).unwrap();
        assert!(module.source.contains(".visible .entry scale("));
        assert!(module.source.contains("mul.f32"));
        assert!(module.source.contains("ret;"));
    }

    #[test]
    fn hardware_form_shadows_software_fallback_when_sm_gate_clears() {
        let soft_only = PtxBackend::intrinsic_table(None);
        let with_hw = PtxBackend::intrinsic_table(Some(75));
        // Both fallback and hardware form registered for "sqrt"; with no sm
        // only the software entry can ever match.
        assert!(soft_only.len() < with_hw.len());
    }
}
