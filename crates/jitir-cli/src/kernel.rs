//! A small in-tree demo kernel registry.
//!
//! No textual frontend is in scope (§1): callers of this crate hand the
//! core a pre-built method directly. This module plays that role for the
//! CLI binary, building the methods `compile`/`inspect`/`run` operate on
//! by hand with [`jitir_core::MethodBuilder`] rather than parsing anything.

use jitir_core::{
    ArithOp, AddressSpace, Axis, ConstValue, IndexSpace, MethodBuilder, MethodId, MethodKind, NumKind, Program, TypeId,
};

/// `for thread i < n { out[i] = in[i] * 2 }` (§8 scenario 1, "Vector scale").
///
/// Two `int32` views, `in` and `out`, each flattened by the argument mapper
/// into a `(pointer, length)` pair; the kernel reads its own position from
/// the global thread index rather than from an explicit index parameter.
pub fn vector_scale() -> (Program, MethodId) {
    let mut program = Program::new();
    let id = program.fresh_method_id();

    let i32_ptr = program.types.intern_pointer(TypeId::I32, AddressSpace::Global);
    let mut b = MethodBuilder::new(id, "vector_scale", vec![i32_ptr, i32_ptr], TypeId::UNIT);
    b.set_kind(MethodKind::Kernel);

    let entry = b.entry_block();
    b.set_insertion_block(entry);
    let in_ptr = b.create_parameter(0).unwrap();
    let out_ptr = b.create_parameter(1).unwrap();

    let i = b.create_thread_index(TypeId::I64, IndexSpace::Global, Axis::X).unwrap();
    let in_elem = b.create_load_element_address(i32_ptr, in_ptr, i).unwrap();
    let loaded = b.create_load(TypeId::I32, in_elem).unwrap();
    let two = b.create_const(TypeId::I32, ConstValue::I32(2)).unwrap();
    let scaled = b.create_binary_arith(TypeId::I32, ArithOp::Mul, NumKind::SignedInt, loaded, two).unwrap();
    let out_elem = b.create_load_element_address(i32_ptr, out_ptr, i).unwrap();
    b.create_store(TypeId::UNIT, out_elem, scaled).unwrap();
    b.create_return(TypeId::UNIT, None).unwrap();

    let method = b.commit();
    program.insert_method(method);
    (program, id)
}

/// Every demo kernel this binary knows how to build, by name.
pub fn by_name(name: &str) -> Option<(Program, MethodId)> {
    match name {
        "vector_scale" => Some(vector_scale()),
        _ => None,
    }
}
