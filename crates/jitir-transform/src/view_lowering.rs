//! `LowerPointerViews` (§4.3 item 1): replaces every `View<T, AS>` with a
//! two-field `{ptr: Pointer<T, AS>, length: int64}` structure, and rewrites
//! the six view-family operations into the structure-building expressions
//! described below.
//!
//! Width convention: per §3's invariant that every lowered view becomes a
//! `{pointer, int64 length}` pair, every length-producing value in this
//! codebase is already declared `int64`; `get_view_length`'s "convert to the
//! requested width" and `sub_view`'s "convert(len, int64)" are therefore
//! identity conversions here; there is no integer width-cast `ValueKind` in
//! this IR; a frontend requesting a narrower width would need to truncate
//! after the fact with ordinary arithmetic (out of scope for this pass).

use jitir_core::{
    AddressSpace, ArithOp, ConstValue, JitType, LogicOp, Method, MethodBuilder, NumKind, ScalarType, ShiftOp, TypeId, TypeRegistry,
    ValueId, ValueKind,
};

use crate::error::TransformError;
use crate::rewriter::{Changed, RewriteContext, Rewriter};

pub struct LowerPointerViews;

impl Rewriter for LowerPointerViews {
    fn name(&self) -> &'static str {
        "LowerPointerViews"
    }

    fn run_on_block(
        &mut self,
        ctx: &mut RewriteContext,
        _block: jitir_core::BasicBlockId,
        snapshot: &[ValueId],
    ) -> Result<Changed, TransformError> {
        let mut changed = Changed::No;
        for &id in snapshot {
            let Some(value) = ctx.builder.method().value(id).cloned() else {
                continue;
            };
            if !value.kind.is_view_op() {
                continue;
            }
            let replacement = match value.kind {
                ValueKind::NewView { pointer, length } => lower_new_view(ctx, &value, pointer, length)?,
                ValueKind::GetViewLength { view } => lower_get_view_length(ctx, &value, view)?,
                ValueKind::SubView { view, offset, length } => lower_sub_view(ctx, &value, view, offset, length)?,
                ValueKind::ViewCast { view, to_element } => lower_view_cast(ctx, &value, view, to_element)?,
                ValueKind::AlignToView { view, alignment } => lower_align_to_view(ctx, &value, view, alignment)?,
                ValueKind::AsAlignedView { view, alignment } => lower_as_aligned_view(ctx, &value, view, alignment)?,
                _ => unreachable!("is_view_op guards to exactly these variants"),
            };
            ctx.builder.replace(id, replacement)?;
            ctx.builder.remove(id)?;
            changed = Changed::Yes;
        }
        Ok(changed)
    }
}

/// Retype every value (and the method's params/return) whose declared type
/// is a view, so that after this sweep no value carries a view type even if
/// its own computation never was a view-family op (parameters, phis,
/// returns of a view value).
pub fn retype_view_typed_values(method: Method, types: &mut TypeRegistry) -> Result<Method, TransformError> {
    let mut builder = MethodBuilder::from_method(method);
    let ids: Vec<ValueId> = builder.method().values.keys().copied().collect();
    for id in ids {
        let ty = builder.method().value(id).unwrap().ty;
        if let Some(lowered) = lowered_type_of(types, ty) {
            builder.retype(id, lowered)?;
        }
    }
    for i in 0..builder.method().params.len() {
        let ty = builder.method().params[i];
        if let Some(lowered) = lowered_type_of(types, ty) {
            builder.set_param_type(i, lowered);
        }
    }
    let ret = builder.method().return_type;
    if let Some(lowered) = lowered_type_of(types, ret) {
        builder.set_return_type(lowered);
    }
    Ok(builder.commit())
}

fn lowered_type_of(types: &mut TypeRegistry, ty: TypeId) -> Option<TypeId> {
    match types.get(ty)? {
        JitType::View { element, space } => Some(types.view_lowered_struct(*element, *space)),
        _ => None,
    }
}

fn view_shape(types: &TypeRegistry, view_ty: TypeId) -> (TypeId, AddressSpace) {
    match types.get(view_ty) {
        Some(JitType::View { element, space }) => (*element, *space),
        other => panic!("expected view type, found {other:?}"),
    }
}

fn lower_new_view(ctx: &mut RewriteContext, value: &jitir_core::Value, pointer: ValueId, length: ValueId) -> Result<ValueId, TransformError> {
    let (element, space) = view_shape(ctx.types, value.ty);
    let struct_ty = ctx.types.view_lowered_struct(element, space);
    Ok(ctx.builder.create_build_struct(struct_ty, struct_ty, [pointer, length])?)
}

fn lower_get_view_length(ctx: &mut RewriteContext, value: &jitir_core::Value, view: ValueId) -> Result<ValueId, TransformError> {
    Ok(ctx.builder.create_get_field(value.ty, view, 1)?)
}

fn lower_sub_view(
    ctx: &mut RewriteContext,
    value: &jitir_core::Value,
    view: ValueId,
    offset: ValueId,
    length: ValueId,
) -> Result<ValueId, TransformError> {
    let (element, space) = view_shape(ctx.types, value.ty);
    let struct_ty = ctx.types.view_lowered_struct(element, space);
    let ptr_ty = ctx.types.intern_pointer(element, space);
    let ptr = ctx.builder.create_get_field(ptr_ty, view, 0)?;
    let new_ptr = ctx.builder.create_load_element_address(ptr_ty, ptr, offset)?;
    Ok(ctx.builder.create_build_struct(struct_ty, struct_ty, [new_ptr, length])?)
}

fn lower_view_cast(ctx: &mut RewriteContext, value: &jitir_core::Value, view: ValueId, to_element: TypeId) -> Result<ValueId, TransformError> {
    let source_ty = ctx.builder.method().value(view).expect("operand resolves").ty;
    let (from_element, space) = view_shape(ctx.types, source_ty);
    let (result_element, result_space) = view_shape(ctx.types, value.ty);
    debug_assert_eq!(to_element, result_element);
    debug_assert_eq!(space, result_space);

    let struct_ty = ctx.types.view_lowered_struct(to_element, space);
    let ptr_ty = ctx.types.intern_pointer(to_element, space);
    let src_ptr_ty = ctx.types.intern_pointer(from_element, space);

    let src_ptr = ctx.builder.create_get_field(src_ptr_ty, view, 0)?;
    let src_len = ctx.builder.create_get_field(TypeId::I64, view, 1)?;
    let new_ptr = ctx.builder.create_pointer_cast(ptr_ty, src_ptr, to_element)?;

    let from_size = element_byte_size(ctx, from_element)?;
    let to_size = element_byte_size(ctx, to_element)?;
    let len_bytes = ctx
        .builder
        .create_binary_arith(TypeId::I64, ArithOp::Mul, NumKind::SignedInt, src_len, from_size)?;
    let new_len = ctx
        .builder
        .create_binary_arith(TypeId::I64, ArithOp::Div, NumKind::SignedInt, len_bytes, to_size)?;

    Ok(ctx.builder.create_build_struct(struct_ty, struct_ty, [new_ptr, new_len])?)
}

fn lower_as_aligned_view(ctx: &mut RewriteContext, value: &jitir_core::Value, view: ValueId, alignment: u32) -> Result<ValueId, TransformError> {
    let (element, space) = view_shape(ctx.types, value.ty);
    let struct_ty = ctx.types.view_lowered_struct(element, space);
    let ptr_ty = ctx.types.intern_pointer(element, space);
    let ptr = ctx.builder.create_get_field(ptr_ty, view, 0)?;
    let len = ctx.builder.create_get_field(TypeId::I64, view, 1)?;
    let asserted_ptr = ctx.builder.create_align_to(ptr_ty, ptr, alignment)?;
    Ok(ctx.builder.create_build_struct(struct_ty, struct_ty, [asserted_ptr, len])?)
}

fn lower_align_to_view(ctx: &mut RewriteContext, value: &jitir_core::Value, view: ValueId, alignment: u32) -> Result<ValueId, TransformError> {
    let (element, space) = view_shape(ctx.types, value.ty);
    let struct_ty = ctx.types.view_lowered_struct(element, space);
    let ptr_ty = ctx.types.intern_pointer(element, space);

    let ptr = ctx.builder.create_get_field(ptr_ty, view, 0)?;
    let len = ctx.builder.create_get_field(TypeId::I64, view, 1)?;
    let aligned_ptr = ctx.builder.create_align_to(ptr_ty, ptr, alignment)?;

    let ptr_as_int = ctx.builder.create_pointer_as_int(TypeId::I64, ptr)?;
    let aligned_as_int = ctx.builder.create_pointer_as_int(TypeId::I64, aligned_ptr)?;
    let diff_bytes = ctx
        .builder
        .create_binary_arith(TypeId::I64, ArithOp::Sub, NumKind::SignedInt, aligned_as_int, ptr_as_int)?;
    let elem_size = element_byte_size(ctx, element)?;
    let diff_elems = ctx
        .builder
        .create_binary_arith(TypeId::I64, ArithOp::Div, NumKind::SignedInt, diff_bytes, elem_size)?;
    let prefix_len = emit_branchless_min_i64(ctx, diff_elems, len)?;
    let suffix_len = ctx
        .builder
        .create_binary_arith(TypeId::I64, ArithOp::Sub, NumKind::SignedInt, len, prefix_len)?;

    let prefix_view = ctx.builder.create_build_struct(struct_ty, struct_ty, [ptr, prefix_len])?;
    let suffix_view = ctx.builder.create_build_struct(struct_ty, struct_ty, [aligned_ptr, suffix_len])?;

    let split_ty = ctx
        .types
        .intern_struct("AlignedSplit", vec![("prefix".to_string(), struct_ty), ("suffix".to_string(), struct_ty)]);
    Ok(ctx.builder.create_build_struct(split_ty, split_ty, [prefix_view, suffix_view])?)
}

/// `min(x, y)` for `int64` values, computed without branching:
/// `min(x, y) = y + ((x - y) & ((x - y) >> 63))`. The `>> 63` arithmetic
/// shift broadcasts the sign bit of `x - y`, giving an all-ones mask when
/// `x < y` and an all-zeros mask otherwise.
fn emit_branchless_min_i64(ctx: &mut RewriteContext, x: ValueId, y: ValueId) -> Result<ValueId, TransformError> {
    let diff = ctx.builder.create_binary_arith(TypeId::I64, ArithOp::Sub, NumKind::SignedInt, x, y)?;
    let shift_amount = ctx.builder.create_const(TypeId::I64, ConstValue::I64(63))?;
    let mask = ctx.builder.create_shift(TypeId::I64, ShiftOp::Shr, true, diff, shift_amount)?;
    let masked = ctx.builder.create_logic(TypeId::I64, LogicOp::And, diff, mask)?;
    Ok(ctx.builder.create_binary_arith(TypeId::I64, ArithOp::Add, NumKind::SignedInt, y, masked)?)
}

fn element_byte_size(ctx: &mut RewriteContext, element: TypeId) -> Result<ValueId, TransformError> {
    match ctx.types.get(element) {
        Some(JitType::Scalar(s)) => {
            let bytes = scalar_byte_size(*s);
            Ok(ctx.builder.create_const(TypeId::I64, ConstValue::I64(bytes as i64))?)
        }
        _ => Ok(ctx.builder.create_size_of(TypeId::I64, element)?),
    }
}

fn scalar_byte_size(s: ScalarType) -> u32 {
    s.byte_size()
}
