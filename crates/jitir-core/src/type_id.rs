//! Nominal type identity and the structural type registry.
//!
//! A [`TypeId`] is a stable handle into a [`TypeRegistry`]; two requests for
//! the same structural shape (e.g. "pointer to i32 in the global address
//! space") return the same id, so type equality throughout the IR reduces to
//! comparing two `u32`s.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{AddressSpace, JitType, ScalarType, StructDef};

/// Stable, interned type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

// Builtin scalar types are registered at fixed, well-known ids so callers
// that only need a primitive never have to round-trip through `intern`.
impl TypeId {
    pub const BOOL: TypeId = TypeId(0);
    pub const I8: TypeId = TypeId(1);
    pub const I16: TypeId = TypeId(2);
    pub const I32: TypeId = TypeId(3);
    pub const I64: TypeId = TypeId(4);
    pub const F16: TypeId = TypeId(5);
    pub const F32: TypeId = TypeId(6);
    pub const F64: TypeId = TypeId(7);
    pub const UNIT: TypeId = TypeId(8);

    const FIRST_DYNAMIC: u32 = 9;
}

/// Structural key used to deduplicate non-builtin type registrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TypeKey {
    Pointer(TypeId, AddressSpace),
    View(TypeId, AddressSpace),
    Array(TypeId, u32),
    Struct(String, Vec<(String, TypeId)>),
}

/// Interning table mapping structural type shapes to stable [`TypeId`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeRegistry {
    types: Vec<JitType>,
    #[serde(skip)]
    by_key: HashMap<TypeKey, TypeId>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        let types = vec![
            JitType::Scalar(ScalarType::Bool),
            JitType::Scalar(ScalarType::I8),
            JitType::Scalar(ScalarType::I16),
            JitType::Scalar(ScalarType::I32),
            JitType::Scalar(ScalarType::I64),
            JitType::Scalar(ScalarType::F16),
            JitType::Scalar(ScalarType::F32),
            JitType::Scalar(ScalarType::F64),
            JitType::Unit,
        ];
        debug_assert_eq!(types.len() as u32, TypeId::FIRST_DYNAMIC);
        TypeRegistry {
            types,
            by_key: HashMap::new(),
        }
    }

    pub fn get(&self, id: TypeId) -> Option<&JitType> {
        self.types.get(id.0 as usize)
    }

    /// Intern a scalar type, returning its builtin id.
    pub fn scalar(&self, scalar: ScalarType) -> TypeId {
        TypeId(scalar as u32 + TypeId::BOOL.0)
    }

    pub fn intern_pointer(&mut self, pointee: TypeId, space: AddressSpace) -> TypeId {
        let key = TypeKey::Pointer(pointee, space);
        self.intern(key, || JitType::Pointer { pointee, space })
    }

    pub fn intern_view(&mut self, element: TypeId, space: AddressSpace) -> TypeId {
        let key = TypeKey::View(element, space);
        self.intern(key, || JitType::View { element, space })
    }

    pub fn intern_array(&mut self, element: TypeId, length: u32) -> TypeId {
        let key = TypeKey::Array(element, length);
        self.intern(key, || JitType::Array { element, length })
    }

    pub fn intern_struct(&mut self, name: impl Into<String>, fields: Vec<(String, TypeId)>) -> TypeId {
        let name = name.into();
        let key = TypeKey::Struct(name.clone(), fields.clone());
        self.intern(key, || {
            JitType::Struct(StructDef {
                name: name.clone(),
                type_id: TypeId(0), // fixed up to the real id by `intern`
                fields: fields.iter().cloned().collect(),
            })
        })
    }

    fn intern(&mut self, key: TypeKey, make: impl FnOnce() -> JitType) -> TypeId {
        if let Some(id) = self.by_key.get(&key) {
            return *id;
        }
        let id = TypeId(self.types.len() as u32);
        let mut ty = make();
        if let JitType::Struct(def) = &mut ty {
            def.type_id = id;
        }
        self.types.push(ty);
        self.by_key.insert(key, id);
        id
    }

    /// The `{pointer, length}` pair a `View` type lowers to. Requires the
    /// view's own pointer type to already be interned.
    pub fn view_lowered_struct(&mut self, element: TypeId, space: AddressSpace) -> TypeId {
        let ptr = self.intern_pointer(element, space);
        let i64_ty = self.scalar(ScalarType::I64);
        self.intern_struct(
            "View",
            vec![("ptr".to_string(), ptr), ("length".to_string(), i64_ty)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_scalars_have_fixed_ids() {
        let reg = TypeRegistry::new();
        assert_eq!(reg.scalar(ScalarType::Bool), TypeId::BOOL);
        assert_eq!(reg.scalar(ScalarType::I32), TypeId::I32);
        assert_eq!(reg.scalar(ScalarType::F64), TypeId::F64);
    }

    #[test]
    fn interning_pointer_is_idempotent() {
        let mut reg = TypeRegistry::new();
        let a = reg.intern_pointer(TypeId::I32, AddressSpace::Global);
        let b = reg.intern_pointer(TypeId::I32, AddressSpace::Global);
        assert_eq!(a, b);

        let c = reg.intern_pointer(TypeId::I32, AddressSpace::Shared);
        assert_ne!(a, c, "different address space must not share identity");
    }

    #[test]
    fn interning_view_is_idempotent() {
        let mut reg = TypeRegistry::new();
        let a = reg.intern_view(TypeId::F32, AddressSpace::Generic);
        let b = reg.intern_view(TypeId::F32, AddressSpace::Generic);
        assert_eq!(a, b);
    }

    #[test]
    fn view_lowered_struct_has_two_fields() {
        let mut reg = TypeRegistry::new();
        let id = reg.view_lowered_struct(TypeId::F32, AddressSpace::Global);
        match reg.get(id) {
            Some(JitType::Struct(def)) => {
                assert_eq!(def.fields.len(), 2);
                assert_eq!(def.fields.keys().collect::<Vec<_>>(), vec!["ptr", "length"]);
            }
            other => panic!("expected struct, got {other:?}"),
        }
    }

    #[test]
    fn serde_roundtrip_preserves_dynamic_types() {
        let mut reg = TypeRegistry::new();
        let id = reg.intern_array(TypeId::I32, 16);
        let json = serde_json::to_string(&reg).unwrap();
        let back: TypeRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(format!("{:?}", back.get(id)), format!("{:?}", reg.get(id)));
    }
}
