//! Argument mapper (§4.4): translates a host-side call-site signature into
//! the canonical kernel signature a backend expects, and hashes the
//! resulting specialization tuple into a cache key.
//!
//! Cache-key hashing feeds a `blake3::Hasher` a sequence of tagged bytes and
//! finalizes it into a `[u8; 32]`, distinguishing compiled kernel
//! specializations the way a content hash distinguishes any other keyed
//! artifact.

use jitir_core::{ConstValue, MethodId};

use crate::options::BackendTarget;

/// One argument at a host call site, already shaped the way the kernel's
/// canonical signature expects it (§4.4): scalars pass through, views
/// become a pointer+length pair, structures flatten recursively, and
/// specialized values are pulled out to participate in the cache key
/// instead of being passed as ordinary runtime arguments.
#[derive(Debug, Clone)]
pub enum HostArg {
    Scalar(ConstValue),
    /// A view argument. `device_ptr` is `None` when the backing buffer is
    /// absent; the mapper materializes that as the null address.
    View { device_ptr: Option<u64>, length: i64 },
    Struct(Vec<HostArg>),
    Specialized(SpecializedValue),
}

/// A mapped argument, flattened into the shape the kernel's entry point
/// reads in parameter order. `Specialized` values never reach this list --
/// they are lifted into the cache key by `map_arguments` instead.
#[derive(Debug, Clone, PartialEq)]
pub enum MappedArg {
    Scalar(ConstValue),
    Pointer(u64),
    Length(i64),
}

/// A comparable primitive lifted to a compile-time constant of the kernel
/// method. Two wrappers are equal iff their underlying value is equal;
/// equal specializations share a compiled artifact (§4.4).
#[derive(Debug, Clone, Copy)]
pub struct SpecializedValue(pub ConstValue);

impl PartialEq for SpecializedValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.scalar_type() == other.0.scalar_type() && self.0.bit_pattern() == other.0.bit_pattern()
    }
}
impl Eq for SpecializedValue {}

impl SpecializedValue {
    fn hash_into(&self, hasher: &mut blake3::Hasher) {
        hasher.update(&[self.0.scalar_type() as u8]);
        hasher.update(&self.0.bit_pattern().to_le_bytes());
    }
}

/// Recursively flatten `args` into the kernel's canonical argument list,
/// returning the mapped arguments alongside every specialized value
/// encountered, in encounter order (the order the cache key is hashed in).
pub fn map_arguments(args: &[HostArg]) -> (Vec<MappedArg>, Vec<SpecializedValue>) {
    let mut mapped = Vec::new();
    let mut specialized = Vec::new();
    flatten_into(args, &mut mapped, &mut specialized);
    (mapped, specialized)
}

fn flatten_into(args: &[HostArg], mapped: &mut Vec<MappedArg>, specialized: &mut Vec<SpecializedValue>) {
    for arg in args {
        match arg {
            HostArg::Scalar(c) => mapped.push(MappedArg::Scalar(c.clone())),
            HostArg::View { device_ptr, length } => {
                mapped.push(MappedArg::Pointer(device_ptr.unwrap_or(0)));
                mapped.push(MappedArg::Length(*length));
            }
            HostArg::Struct(fields) => flatten_into(fields, mapped, specialized),
            HostArg::Specialized(v) => specialized.push(*v),
        }
    }
}

/// The 32-byte key a compiled-kernel cache (§4.6/§6) is keyed by: the
/// `(kernel_method_id, backend_id, specialization_tuple)` triple, hashed
/// with blake3.
pub type CacheKey = [u8; 32];

pub fn cache_key(kernel_id: MethodId, backend: BackendTarget, specialized: &[SpecializedValue]) -> CacheKey {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&kernel_id.0.to_le_bytes());
    hasher.update(&[backend.tag()]);
    hasher.update(&(specialized.len() as u32).to_le_bytes());
    for value in specialized {
        value.hash_into(&mut hasher);
    }
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_and_view_arguments_flatten_in_order() {
        let args = vec![
            HostArg::Scalar(ConstValue::I32(7)),
            HostArg::View {
                device_ptr: Some(0xDEAD_BEEF),
                length: 1024,
            },
        ];
        let (mapped, specialized) = map_arguments(&args);
        assert_eq!(
            mapped,
            vec![
                MappedArg::Scalar(ConstValue::I32(7)),
                MappedArg::Pointer(0xDEAD_BEEF),
                MappedArg::Length(1024),
            ]
        );
        assert!(specialized.is_empty());
    }

    #[test]
    fn absent_view_buffer_maps_to_null_address() {
        let args = vec![HostArg::View { device_ptr: None, length: 0 }];
        let (mapped, _) = map_arguments(&args);
        assert_eq!(mapped, vec![MappedArg::Pointer(0), MappedArg::Length(0)]);
    }

    #[test]
    fn nested_struct_flattens_recursively() {
        let args = vec![HostArg::Struct(vec![
            HostArg::Scalar(ConstValue::I32(1)),
            HostArg::View { device_ptr: Some(5), length: 2 },
        ])];
        let (mapped, _) = map_arguments(&args);
        assert_eq!(mapped.len(), 3);
    }

    #[test]
    fn specialization_cache_key_distinguishes_values_and_collapses_equal_ones() {
        let s3 = vec![SpecializedValue(ConstValue::I32(3))];
        let s3_again = vec![SpecializedValue(ConstValue::I32(3))];
        let s4 = vec![SpecializedValue(ConstValue::I32(4))];

        let kernel = MethodId(1);
        let key_a = cache_key(kernel, BackendTarget::CpuIl, &s3);
        let key_b = cache_key(kernel, BackendTarget::CpuIl, &s3_again);
        let key_c = cache_key(kernel, BackendTarget::CpuIl, &s4);

        assert_eq!(key_a, key_b);
        assert_ne!(key_a, key_c);
    }

    #[test]
    fn cache_key_distinguishes_backend() {
        let kernel = MethodId(1);
        let key_cpu = cache_key(kernel, BackendTarget::CpuIl, &[]);
        let key_ptx = cache_key(kernel, BackendTarget::Ptx, &[]);
        assert_ne!(key_cpu, key_ptx);
    }
}
