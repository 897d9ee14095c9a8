//! The kernel IR's type system.
//!
//! Provides the complete set of types a value in the IR may carry: scalars
//! (Bool, I8-I64, F16/F32/F64), pointers parameterized by element type and
//! address space, views (`{pointer, length}` pairs prior to lowering),
//! structure types with ordered fields, and fixed-size array types.
//!
//! All types use nominal identity via [`TypeId`]. Structs use [`IndexMap`]
//! for insertion-ordered fields.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::type_id::TypeId;

/// The kernel IR's type system. Each variant represents a distinct kind of type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JitType {
    /// Scalar types with a direct backend mapping on every target.
    Scalar(ScalarType),

    /// Pointer to `pointee`, tagged with the address space it lives in.
    Pointer { pointee: TypeId, space: AddressSpace },

    /// `{pointer, length}` view over a run of `element`-typed values. Lowered
    /// away entirely by `LowerPointerViews`; no value may carry this type
    /// after that pass has run.
    View { element: TypeId, space: AddressSpace },

    /// Named struct with ordered fields (nominal typing).
    Struct(StructDef),

    /// Fixed-size array: `[T; N]`.
    Array { element: TypeId, length: u32 },

    /// Unit type (zero-size; the return type of side-effecting methods).
    Unit,
}

/// Scalar (primitive) types.
///
/// No unsigned integers -- signedness is determined at the operation level
/// (signed vs. unsigned arithmetic/compare kinds), not at the type level,
/// matching how every one of the three backends legalizes integer ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F16,
    F32,
    F64,
}

impl ScalarType {
    /// Size in bytes, used by `size_of`/`view_cast` lowering.
    pub fn byte_size(self) -> u32 {
        match self {
            ScalarType::Bool | ScalarType::I8 => 1,
            ScalarType::I16 | ScalarType::F16 => 2,
            ScalarType::I32 | ScalarType::F32 => 4,
            ScalarType::I64 | ScalarType::F64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, ScalarType::F16 | ScalarType::F32 | ScalarType::F64)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ScalarType::Bool | ScalarType::I8 | ScalarType::I16 | ScalarType::I32 | ScalarType::I64
        )
    }
}

/// Address space a pointer or view refers into.
///
/// Affects which loads/stores/casts are legal on a given backend: `Shared`
/// and `Local` only make sense once a kernel has been lowered for a specific
/// group-execution backend (PTX, Velocity); `Generic` is legal everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressSpace {
    Generic,
    Global,
    Shared,
    Local,
    Constant,
}

/// Named struct definition with insertion-ordered fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    pub type_id: TypeId,
    pub fields: IndexMap<String, TypeId>,
}

/// Constant literal values used by `Const` values.
///
/// `F16`/`F32` store their value as `f64` internally, since `f32` does not
/// implement `Eq` (NaN), which would prevent deriving `Eq`/`Hash` for the
/// constant-interning key in the builder. The narrowing to the declared
/// width happens during backend lowering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F16(u64),
    F32(u64),
    F64(u64),
    Unit,
}

impl ConstValue {
    /// A bit-pattern key suitable for use in the builder's constant-interning
    /// map: equal constants of equal type must share identity.
    pub fn bit_pattern(&self) -> u64 {
        match *self {
            ConstValue::Bool(b) => b as u64,
            ConstValue::I8(v) => v as u8 as u64,
            ConstValue::I16(v) => v as u16 as u64,
            ConstValue::I32(v) => v as u32 as u64,
            ConstValue::I64(v) => v as u64,
            ConstValue::F16(bits) | ConstValue::F32(bits) | ConstValue::F64(bits) => bits,
            ConstValue::Unit => 0,
        }
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ConstValue::Bool(_) => ScalarType::Bool,
            ConstValue::I8(_) => ScalarType::I8,
            ConstValue::I16(_) => ScalarType::I16,
            ConstValue::I32(_) => ScalarType::I32,
            ConstValue::I64(_) => ScalarType::I64,
            ConstValue::F16(_) => ScalarType::F16,
            ConstValue::F32(_) => ScalarType::F32,
            ConstValue::F64(_) => ScalarType::F64,
            ConstValue::Unit => ScalarType::Bool, // unused: Unit constants carry JitType::Unit, not Scalar
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_all_jit_type_variants() {
        let types = vec![
            JitType::Scalar(ScalarType::Bool),
            JitType::Scalar(ScalarType::I32),
            JitType::Scalar(ScalarType::F64),
            JitType::Pointer {
                pointee: TypeId(1),
                space: AddressSpace::Global,
            },
            JitType::View {
                element: TypeId(1),
                space: AddressSpace::Generic,
            },
            JitType::Array {
                element: TypeId(1),
                length: 10,
            },
            JitType::Struct(StructDef {
                name: "View2".into(),
                type_id: TypeId(100),
                fields: IndexMap::from([("ptr".into(), TypeId(2)), ("length".into(), TypeId(3))]),
            }),
            JitType::Unit,
        ];
        assert_eq!(types.len(), 8);
    }

    #[test]
    fn serde_roundtrip_scalar() {
        let ty = JitType::Scalar(ScalarType::I64);
        let json = serde_json::to_string(&ty).unwrap();
        let back: JitType = serde_json::from_str(&json).unwrap();
        assert_eq!(json, serde_json::to_string(&back).unwrap());
    }

    #[test]
    fn serde_roundtrip_pointer_and_view() {
        let ptr = JitType::Pointer {
            pointee: TypeId(3),
            space: AddressSpace::Shared,
        };
        let json = serde_json::to_string(&ptr).unwrap();
        let back: JitType = serde_json::from_str(&json).unwrap();
        assert_eq!(json, serde_json::to_string(&back).unwrap());

        let view = JitType::View {
            element: TypeId(4),
            space: AddressSpace::Global,
        };
        let json = serde_json::to_string(&view).unwrap();
        let back: JitType = serde_json::from_str(&json).unwrap();
        assert_eq!(json, serde_json::to_string(&back).unwrap());
    }

    #[test]
    fn struct_def_preserves_field_order() {
        let mut fields = IndexMap::new();
        fields.insert("z".to_string(), TypeId(1));
        fields.insert("a".to_string(), TypeId(2));
        fields.insert("m".to_string(), TypeId(3));

        let sd = StructDef {
            name: "Ordered".into(),
            type_id: TypeId(200),
            fields,
        };

        let keys: Vec<&str> = sd.fields.keys().map(|s| s.as_str()).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn const_value_bit_pattern_distinguishes_values() {
        assert_ne!(ConstValue::I32(1).bit_pattern(), ConstValue::I32(2).bit_pattern());
        assert_eq!(
            ConstValue::I32(1).bit_pattern(),
            ConstValue::I32(1).bit_pattern()
        );
    }

    #[test]
    fn const_value_variants_roundtrip() {
        let vals = vec![
            ConstValue::Bool(true),
            ConstValue::I8(42),
            ConstValue::I64(1_000_000_000),
            ConstValue::F32(3.14f32.to_bits() as u64),
            ConstValue::F64(2.718281828f64.to_bits()),
            ConstValue::Unit,
        ];
        for val in &vals {
            let json = serde_json::to_string(val).unwrap();
            let back: ConstValue = serde_json::from_str(&json).unwrap();
            assert_eq!(json, serde_json::to_string(&back).unwrap());
        }
    }
}
