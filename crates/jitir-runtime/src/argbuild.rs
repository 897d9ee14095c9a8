//! Builds the per-lane parameter lists a driver's `launch` expects out of
//! the host-side argument list an `Accelerator::launch` caller supplies.
//! Arguments are device-wide (one buffer pointer, one scalar) rather than
//! per-lane, so every lane in the launch's index space receives the same
//! mapped parameter list -- the kernel recovers its own position from the
//! thread index the executor derives from the lane's slot in the group,
//! not from the argument list.

use jitir_backend::{map_arguments, HostArg, IlValue, MappedArg};
use jitir_core::ConstValue;

use crate::dim::Dim3;

fn const_to_il(value: &ConstValue) -> IlValue {
    match value {
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

fn mapped_to_il(value: &MappedArg) -> IlValue {
    match value {
        MappedArg::Scalar(c) => const_to_il(c),
        MappedArg::Pointer(p) => IlValue::Pointer(*p),
        MappedArg::Length(l) => IlValue::I64(*l),
    }
}

/// Flatten `args` through the argument mapper once, then replicate the
/// resulting parameter list across every lane in `grid` x `group`.
pub fn build_lane_params(grid: Dim3, group: Dim3, args: &[HostArg]) -> Vec<Vec<IlValue>> {
    let (mapped, _specialized) = map_arguments(args);
    let params: Vec<IlValue> = mapped.iter().map(mapped_to_il).collect();
    let total_lanes = (grid.volume() * group.volume()) as usize;
    vec![params; total_lanes]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replicates_the_mapped_parameter_list_across_every_lane() {
        let args = vec![HostArg::Scalar(ConstValue::I32(7)), HostArg::View { device_ptr: Some(0x1000), length: 4 }];
        let lanes = build_lane_params(Dim3::new(1, 1, 1), Dim3::new(4, 1, 1), &args);
        assert_eq!(lanes.len(), 4);
        for lane in &lanes {
            assert_eq!(lane.len(), 3);
            assert!(matches!(lane[0], IlValue::I32(7)));
            assert!(matches!(lane[1], IlValue::Pointer(0x1000)));
            assert!(matches!(lane[2], IlValue::I64(4)));
        }
    }
}
