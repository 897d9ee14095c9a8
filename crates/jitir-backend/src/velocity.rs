//! Velocity backend (§4.5): a portable SIMD-vectorized CPU path that
//! simulates a warp of cooperating lanes by replaying the same per-block
//! bytecode [`CpuIlBackend`] already knows how to lower, once per lane, in
//! lockstep -- every lane advances through the same op stream together so
//! that a warp-shuffle intrinsic can read every lane's operand before any
//! lane moves on.
//!
//! Divergent control flow is out of scope (as it is for every warp-shuffle
//! model this backend emulates: a shuffle inside a branch only one lane of
//! the warp takes is undefined on real hardware too). Lane 0's terminator
//! decides the whole warp's next block; every other lane's own terminator
//! is still evaluated (so its return value, if any, is recorded), just not
//! consulted for control flow.

use std::collections::HashMap;

use jitir_core::TypeRegistry;
use jitir_transform::{IntrinsicCallSite, IntrinsicTable, LoweredMethod};

use crate::cpu_il::{
    eval_binary, eval_compare, eval_unary, load_from_memory, store_to_memory, CpuIlBackend, CpuIlProgram, IlOp, IlValue, Slot,
    ThreadPosition,
};
use crate::error::BackendError;
use crate::options::BackendOptions;

/// The four warp-shuffle kinds (§4.5): each decomposes its 64-bit operand
/// into two 32-bit halves, shuffles each half independently by the same
/// source-lane rule, and recombines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleKind {
    Broadcast,
    Xor,
    Down,
    Up,
}

impl ShuffleKind {
    fn from_intrinsic_name(name: &str) -> Option<ShuffleKind> {
        match name {
            "warp.shuffle.broadcast" => Some(ShuffleKind::Broadcast),
            "warp.shuffle.xor" => Some(ShuffleKind::Xor),
            "warp.shuffle.down" => Some(ShuffleKind::Down),
            "warp.shuffle.up" => Some(ShuffleKind::Up),
            _ => None,
        }
    }
}

/// Which lane a shuffle of `kind` with immediate `arg` reads from, for a
/// warp of `lane_count` lanes. `Broadcast`/`Xor` wrap or mask into range;
/// `Down`/`Up` that would walk off either end of the warp return the
/// calling lane's own value unchanged, matching the common hardware
/// "stays in lane" behavior for out-of-range shuffle deltas.
fn source_lane(lane: usize, lane_count: usize, kind: ShuffleKind, arg: u32) -> usize {
    match kind {
        ShuffleKind::Broadcast => (arg as usize).min(lane_count.saturating_sub(1)),
        ShuffleKind::Xor => (lane ^ (arg as usize)) % lane_count.max(1),
        ShuffleKind::Down => {
            let target = lane + arg as usize;
            if target < lane_count {
                target
            } else {
                lane
            }
        }
        ShuffleKind::Up => {
            if (arg as usize) <= lane {
                lane - arg as usize
            } else {
                lane
            }
        }
    }
}

fn shuffle_u32(lane_values: &[u32], lane: usize, kind: ShuffleKind, arg: u32) -> u32 {
    lane_values[source_lane(lane, lane_values.len(), kind, arg)]
}

/// Shuffle a 64-bit lane value: split into low/high 32-bit halves, shuffle
/// each half by the same source-lane rule, recombine (§4.5).
pub fn shuffle_u64(lane_values: &[u64], lane: usize, kind: ShuffleKind, arg: u32) -> u64 {
    let lo: Vec<u32> = lane_values.iter().map(|v| *v as u32).collect();
    let hi: Vec<u32> = lane_values.iter().map(|v| (*v >> 32) as u32).collect();
    let lo_r = shuffle_u32(&lo, lane, kind, arg);
    let hi_r = shuffle_u32(&hi, lane, kind, arg);
    ((hi_r as u64) << 32) | lo_r as u64
}

/// Shuffle a 64-bit float lane value: round-trips through its bit pattern so
/// the same two-half shuffle machinery handles both data types (§4.5).
pub fn shuffle_f64(lane_values: &[f64], lane: usize, kind: ShuffleKind, arg: u32) -> f64 {
    let bits: Vec<u64> = lane_values.iter().map(|v| v.to_bits()).collect();
    f64::from_bits(shuffle_u64(&bits, lane, kind, arg))
}

/// A per-group execution context: two arena pools reset at the start of
/// each group rather than freed (§4.6, §5 "Shared-resource policy") --
/// `shared` is one pool visible to every lane in the group; `local` is one
/// private pool per lane.
#[derive(Debug, Clone)]
pub struct GroupContext {
    pub shared: Vec<u8>,
    pub local: Vec<Vec<u8>>,
}

impl GroupContext {
    pub fn new(lane_width: usize, shared_bytes: usize, local_bytes_per_lane: usize) -> Self {
        GroupContext {
            shared: vec![0u8; shared_bytes],
            local: vec![vec![0u8; local_bytes_per_lane]; lane_width],
        }
    }

    /// Reset both arenas to zero for a new group, without releasing their
    /// backing allocations.
    pub fn reset(&mut self) {
        self.shared.iter_mut().for_each(|b| *b = 0);
        for lane in &mut self.local {
            lane.iter_mut().for_each(|b| *b = 0);
        }
    }
}

/// A lowered method's bytecode plus the lane count the warp simulation
/// replays it over. Reuses [`CpuIlProgram`] -- Velocity and CPU-IL share a
/// lowering, differing only in how many cooperating copies the runtime
/// plays and in the warp-shuffle intrinsics resolved into it.
#[derive(Debug, Clone)]
pub struct VelocityProgram {
    pub program: CpuIlProgram,
    pub lane_width: usize,
}

pub struct VelocityBackend;

impl VelocityBackend {
    /// Build this backend's intrinsic table: group/warp barriers pass
    /// straight through (the lockstep interpreter makes every barrier a
    /// no-op by construction); the four shuffle kinds resolve to an
    /// `ExternalIo` the warp interpreter recognizes and handles specially.
    pub fn intrinsic_table() -> IntrinsicTable {
        let mut table = IntrinsicTable::new();
        for name in ["group.barrier", "warp.barrier"] {
            register_passthrough(&mut table, name);
        }
        for name in ["warp.shuffle.broadcast", "warp.shuffle.xor", "warp.shuffle.down", "warp.shuffle.up"] {
            register_passthrough(&mut table, name);
        }
        table
    }

    /// Lower an already-pipelined method into a [`VelocityProgram`], reusing
    /// [`CpuIlBackend`]'s emission (§4.5: both backends consume the same
    /// lowered IR and phi-binding map).
    pub fn lower(lowered: &LoweredMethod, types: &TypeRegistry, options: &BackendOptions) -> Result<VelocityProgram, BackendError> {
        let program = CpuIlBackend::lower(lowered, types)?;
        Ok(VelocityProgram {
            program,
            lane_width: options.velocity_lane_width,
        })
    }
}

fn register_passthrough(table: &mut IntrinsicTable, name: &str) {
    let op = name.to_string();
    table.register(
        name,
        Box::new(|_site: &IntrinsicCallSite| true),
        Box::new(move |ctx, site| ctx.builder.create_external_io(site.result_type, op.clone(), site.args.to_vec()).map_err(Into::into)),
    );
}

/// A tag bit distinguishing a lane-local pointer (into [`GroupContext::local`])
/// from an ordinary address into the group's shared device memory, so `Load`
/// and `Store` can route to the right arena without a separate pointer type.
const LOCAL_TAG: u64 = 1 << 63;

fn is_local_ptr(ptr: u64) -> bool {
    ptr & LOCAL_TAG != 0
}

fn local_offset(ptr: u64) -> usize {
    (ptr & !LOCAL_TAG) as usize
}

/// One lane's private interpreter state: evaluation stack, slot map, and
/// bump-allocator cursor into its `GroupContext::local` arena.
#[derive(Default)]
struct LaneState {
    stack: Vec<IlValue>,
    slots: HashMap<Slot, IlValue>,
    local_cursor: usize,
}

/// Replays a [`VelocityProgram`] over a warp of cooperating lanes.
pub struct WarpExecutor<'p> {
    program: &'p CpuIlProgram,
    lane_width: usize,
}

impl<'p> WarpExecutor<'p> {
    pub fn new(program: &'p VelocityProgram) -> Self {
        WarpExecutor {
            program: &program.program,
            lane_width: program.lane_width,
        }
    }

    /// Run one group to completion: every lane executes the program against
    /// its own parameter list (typically differing only in its thread
    /// index) and its own `ThreadPosition` in `positions`, sharing `memory`
    /// (the simulated device buffer backing any view arguments) and `ctx`'s
    /// per-group arenas, returning each lane's `Return` value in lane order.
    pub fn run_group(
        &self,
        params_per_lane: &[Vec<IlValue>],
        positions: &[ThreadPosition],
        memory: &mut Vec<u8>,
        ctx: &mut GroupContext,
    ) -> Result<Vec<Option<IlValue>>, BackendError> {
        let lanes = params_per_lane.len();
        if ctx.local.len() < lanes {
            ctx.local.resize(lanes, Vec::new());
        }

        let mut states: Vec<LaneState> = (0..lanes).map(|_| LaneState::default()).collect();
        let mut results: Vec<Option<IlValue>> = vec![None; lanes];
        let mut done = vec![false; lanes];
        let mut block = self.program.entry;

        loop {
            let ops = self
                .program
                .blocks
                .get(&block)
                .ok_or_else(|| BackendError::EmissionFailed { reason: format!("missing block {block}") })?;
            let mut next_block: Option<jitir_core::BasicBlockId> = None;

            for op in ops {
                if let IlOp::ExternalIo { name, arg_count } = op {
                    if let Some(kind) = ShuffleKind::from_intrinsic_name(name) {
                        self.exec_shuffle(&mut states, &done, kind, *arg_count);
                        continue;
                    }
                }

                for lane in 0..lanes {
                    if done[lane] {
                        continue;
                    }
                    let outcome = exec_lane_op(
                        op,
                        &mut states[lane],
                        memory,
                        &mut ctx.local[lane],
                        &params_per_lane[lane],
                        positions.get(lane).copied().unwrap_or_default(),
                    )?;
                    if lane == 0 {
                        if let Some(target) = outcome.next_block {
                            next_block = Some(target);
                        }
                    }
                    if let Some(returned) = outcome.returned {
                        results[lane] = returned;
                        done[lane] = true;
                    }
                }
            }

            if done.iter().all(|d| *d) {
                return Ok(results);
            }
            block = next_block.ok_or_else(|| BackendError::EmissionFailed {
                reason: format!("block {block} fell off the end without a terminator"),
            })?;
        }
    }

    /// Execute one warp-shuffle op across every still-running lane at once:
    /// gather the operand `(value, arg)` pair each lane currently has on top
    /// of its own stack, compute each lane's shuffled result against the
    /// whole warp, and push it back onto that lane's stack.
    fn exec_shuffle(&self, states: &mut [LaneState], done: &[bool], kind: ShuffleKind, arg_count: usize) {
        debug_assert_eq!(arg_count, 2, "shuffle intrinsics take (value, immediate)");
        let lanes = states.len();
        let mut values = vec![0u64; lanes];
        let mut floats = vec![false; lanes];
        let mut args = vec![0u32; lanes];

        for (lane, state) in states.iter_mut().enumerate() {
            if done[lane] {
                continue;
            }
            let index_operand = state.stack.pop().unwrap_or(IlValue::I64(0));
            let value_operand = state.stack.pop().unwrap_or(IlValue::I64(0));
            args[lane] = index_operand.as_i64() as u32;
            match value_operand {
                IlValue::F32(v) => {
                    values[lane] = (v as f64).to_bits();
                    floats[lane] = true;
                }
                IlValue::F64(v) => {
                    values[lane] = v.to_bits();
                    floats[lane] = true;
                }
                other => values[lane] = other.as_i64() as u64,
            }
        }

        for lane in 0..lanes {
            if done[lane] {
                continue;
            }
            let result = if floats[lane] {
                let lane_floats: Vec<f64> = values.iter().map(|bits| f64::from_bits(*bits)).collect();
                IlValue::F64(shuffle_f64(&lane_floats, lane, kind, args[lane]))
            } else {
                IlValue::I64(shuffle_u64(&values, lane, kind, args[lane]) as i64)
            };
            states[lane].stack.push(result);
        }
    }
}

/// What one op did for one lane: whether it decided the warp's next block
/// (only consulted when the lane is lane 0) and whether it returned.
struct LaneOutcome {
    next_block: Option<jitir_core::BasicBlockId>,
    returned: Option<Option<IlValue>>,
}

fn no_outcome() -> LaneOutcome {
    LaneOutcome { next_block: None, returned: None }
}

/// Execute a single [`IlOp`] for one lane. Mirrors `cpu_il::Interpreter`'s
/// op loop, split so the warp executor can interleave it lane by lane
/// instead of running one lane to completion before starting the next.
fn exec_lane_op(
    op: &IlOp,
    state: &mut LaneState,
    memory: &mut Vec<u8>,
    local: &mut Vec<u8>,
    params: &[IlValue],
    position: ThreadPosition,
) -> Result<LaneOutcome, BackendError> {
    let stack = &mut state.stack;
    match op {
        IlOp::PushConst(c) => stack.push(IlValue::from_const(c)),
        IlOp::PushParam(i) => stack.push(params[*i as usize].clone()),
        IlOp::ThreadIndex(space, axis) => stack.push(IlValue::I64(position.get(*space, *axis))),
        IlOp::PushSlot(slot) => stack.push(state.slots.get(slot).cloned().unwrap_or(IlValue::Unit)),
        IlOp::StoreSlot(slot) => {
            let v = stack.pop().unwrap_or(IlValue::Unit);
            state.slots.insert(*slot, v);
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
            let rhs = stack.pop().unwrap().as_i64();
            let lhs = stack.pop().unwrap().as_i64();
            let result = match op {
                jitir_core::LogicOp::And => lhs & rhs,
                jitir_core::LogicOp::Or => lhs | rhs,
                jitir_core::LogicOp::Xor => lhs ^ rhs,
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
                (jitir_core::ShiftOp::Shl, _) => value.wrapping_shl(amount as u32),
                (jitir_core::ShiftOp::Shr, true) => value.wrapping_shr(amount as u32),
                (jitir_core::ShiftOp::Shr, false) => ((value as u64).wrapping_shr(amount as u32)) as i64,
            };
            stack.push(IlValue::I64(result));
        }
        IlOp::Alloc { bytes } => {
            let base = state.local_cursor;
            let needed = base + *bytes as usize;
            if local.len() < needed {
                local.resize(needed, 0);
            }
            state.local_cursor = needed;
            stack.push(IlValue::Pointer(LOCAL_TAG | base as u64));
        }
        IlOp::Load { width, float } => {
            let ptr = stack.pop().unwrap().as_pointer();
            let loaded = if is_local_ptr(ptr) {
                load_from_memory(local, local_offset(ptr), *width, *float)
            } else {
                load_from_memory(memory, ptr as usize, *width, *float)
            };
            stack.push(loaded);
        }
        IlOp::Store { width } => {
            let value = stack.pop().unwrap();
            let ptr = stack.pop().unwrap().as_pointer();
            if is_local_ptr(ptr) {
                store_to_memory(local, local_offset(ptr), *width, &value);
            } else {
                store_to_memory(memory, ptr as usize, *width, &value);
            }
        }
        IlOp::LoadElementAddress { element_size } => {
            let index = stack.pop().unwrap().as_i64();
            let ptr = stack.pop().unwrap().as_pointer();
            if is_local_ptr(ptr) {
                let offset = (local_offset(ptr) as i64 + index * *element_size as i64) as u64;
                stack.push(IlValue::Pointer(LOCAL_TAG | offset));
            } else {
                stack.push(IlValue::Pointer((ptr as i64 + index * *element_size as i64) as u64));
            }
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
            let ptr = stack.pop().unwrap().as_pointer();
            let (prev, target): (IlValue, &mut Vec<u8>) = if is_local_ptr(ptr) {
                (load_from_memory(local, local_offset(ptr), 8, false), local)
            } else {
                (load_from_memory(memory, ptr as usize, 8, false), memory)
            };
            let updated = prev.as_i64() + operand.as_i64();
            let offset = if is_local_ptr(ptr) { local_offset(ptr) } else { ptr as usize };
            store_to_memory(target, offset, 8, &IlValue::I64(updated));
            stack.push(prev);
        }
        IlOp::Barrier => { /* the lockstep executor already synchronizes every lane per op */ }
        IlOp::ExternalIo { arg_count, .. } => {
            for _ in 0..*arg_count {
                stack.pop();
            }
            stack.push(IlValue::Unit);
        }
        IlOp::Jump(target) => return Ok(LaneOutcome { next_block: Some(*target), returned: None }),
        IlOp::Branch(if_true, if_false) => {
            let cond = stack.pop().unwrap().as_bool();
            let target = if cond { *if_true } else { *if_false };
            return Ok(LaneOutcome { next_block: Some(target), returned: None });
        }
        IlOp::Switch { arms, default } => {
            let discriminant = stack.pop().unwrap().as_i64();
            let target = arms.iter().find(|(v, _)| *v == discriminant).map(|(_, b)| *b).unwrap_or(*default);
            return Ok(LaneOutcome { next_block: Some(target), returned: None });
        }
        IlOp::Return { has_value } => {
            let value = if *has_value { stack.pop() } else { None };
            return Ok(LaneOutcome { next_block: None, returned: Some(value) });
        }
    }
    Ok(no_outcome())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_as_int_then_int_as_float_is_identity_on_normal_floats() {
        for v in [0.0f64, 1.0, -3.5, 1024.25, f64::MIN_POSITIVE, 123456.789] {
            assert_eq!(f64::from_bits(v.to_bits()), v);
        }
    }

    /// §8: "shuffle-broadcast with lane index i returns the value held by
    /// lane i unchanged".
    #[test]
    fn broadcast_returns_the_value_held_by_the_named_lane() {
        let lanes: Vec<u64> = (0..32).map(|i| i * 17).collect();
        for i in 0..32u32 {
            for reader in 0..32usize {
                let got = shuffle_u64(&lanes, reader, ShuffleKind::Broadcast, i);
                assert_eq!(got, lanes[i as usize]);
            }
        }
    }

    #[test]
    fn broadcast_float_round_trips_through_bit_reinterpret() {
        let lanes: Vec<f64> = vec![1.5, -2.25, 0.0, 100.125, -7.0];
        for i in 0..lanes.len() as u32 {
            let got = shuffle_f64(&lanes, 0, ShuffleKind::Broadcast, i);
            assert_eq!(got, lanes[i as usize]);
        }
    }

    #[test]
    fn xor_shuffle_is_its_own_inverse_within_the_warp() {
        let lanes: Vec<u64> = (0..8).collect();
        for mask in 0..8u32 {
            for lane in 0..8usize {
                let once = shuffle_u64(&lanes, lane, ShuffleKind::Xor, mask);
                // shuffling the shuffled warp by the same mask returns to lane's own value
                let shuffled_warp: Vec<u64> = (0..8).map(|l| shuffle_u64(&lanes, l, ShuffleKind::Xor, mask)).collect();
                let twice = shuffle_u64(&shuffled_warp, lane, ShuffleKind::Xor, mask);
                assert_eq!(once, lanes[lane ^ (mask as usize % 8)]);
                assert_eq!(twice, lanes[lane]);
            }
        }
    }

    #[test]
    fn down_shuffle_past_the_last_lane_stays_in_lane() {
        let lanes: Vec<u64> = (0..4).collect();
        assert_eq!(shuffle_u64(&lanes, 3, ShuffleKind::Down, 1), lanes[3]);
        assert_eq!(shuffle_u64(&lanes, 0, ShuffleKind::Down, 1), lanes[1]);
    }

    #[test]
    fn up_shuffle_before_the_first_lane_stays_in_lane() {
        let lanes: Vec<u64> = (0..4).collect();
        assert_eq!(shuffle_u64(&lanes, 0, ShuffleKind::Up, 1), lanes[0]);
        assert_eq!(shuffle_u64(&lanes, 2, ShuffleKind::Up, 1), lanes[1]);
    }

    #[test]
    fn group_context_reset_clears_both_arenas_without_freeing_them() {
        let mut ctx = GroupContext::new(4, 16, 8);
        ctx.shared[0] = 9;
        ctx.local[2][3] = 5;
        let shared_cap = ctx.shared.capacity();
        ctx.reset();
        assert_eq!(ctx.shared[0], 0);
        assert_eq!(ctx.local[2][3], 0);
        assert_eq!(ctx.shared.capacity(), shared_cap);
    }

    /// §8 scenario 1, replayed across a warp of 8 lanes instead of one:
    /// `out[i] = in[i] * 2` for thread indices 0..8.
    #[test]
    fn vector_scale_across_a_warp_of_eight_lanes() {
        use jitir_core::{ArithOp, AddressSpace, ConstValue, MethodBuilder, MethodId, NumKind, Program, TypeId};
        use jitir_transform::PipelineOptions;

        let mut types = TypeRegistry::new();
        let i32_ptr = types.intern_pointer(TypeId::I32, AddressSpace::Global);
        let mut b = MethodBuilder::new(MethodId(0), "scale_warp", vec![TypeId::I64, TypeId::I64, TypeId::I64], TypeId::UNIT);
        let entry = b.entry_block();
        b.set_insertion_block(entry);
        let in_ptr = b.create_parameter(0).unwrap();
        let out_ptr = b.create_parameter(1).unwrap();
        let lane_index = b.create_parameter(2).unwrap();
        let in_elem = b.create_load_element_address(i32_ptr, in_ptr, lane_index).unwrap();
        let loaded = b.create_load(TypeId::I32, in_elem).unwrap();
        let two = b.create_const(TypeId::I32, ConstValue::I32(2)).unwrap();
        let scaled = b.create_binary_arith(TypeId::I32, ArithOp::Mul, NumKind::SignedInt, loaded, two).unwrap();
        let out_elem = b.create_load_element_address(i32_ptr, out_ptr, lane_index).unwrap();
        b.create_store(TypeId::UNIT, out_elem, scaled).unwrap();
        b.create_return(TypeId::UNIT, None).unwrap();
        let method = b.commit();

        let program = Program::new();
        let table = VelocityBackend::intrinsic_table();
        let lowered = jitir_transform::run_pipeline(method, &mut types, &program, &table, &PipelineOptions::default()).unwrap();
        let options = crate::options::BackendOptions {
            velocity_lane_width: 8,
            ..crate::options::BackendOptions::for_target(crate::options::BackendTarget::Velocity)
        };
        let velocity = VelocityBackend::lower(&lowered, &types, &options).unwrap();
        let executor = WarpExecutor::new(&velocity);

        let mut memory = vec![0u8; 64];
        for i in 0..8i64 {
            store_to_memory(&mut memory, i as usize * 4, 4, &IlValue::I32(i as i32));
        }
        let out_base = 32usize;
        let params_per_lane: Vec<Vec<IlValue>> = (0..8i64)
            .map(|i| vec![IlValue::Pointer(0), IlValue::Pointer(out_base as u64), IlValue::I64(i)])
            .collect();
        // LoadElementAddress derives its stride from the pointer's pointee
        // type (i32, 4 bytes), so in/out must already sit at byte offset
        // 0 / out_base, matching the addresses LEA will compute as
        // `pointer + index * 4`.
        let mut ctx = GroupContext::new(8, 0, 0);
        let positions = vec![ThreadPosition::default(); 8];

        executor.run_group(&params_per_lane, &positions, &mut memory, &mut ctx).unwrap();

        for i in 0..8usize {
            let out = load_from_memory(&memory, out_base + i * 4, 4, false);
            assert_eq!(out.as_i64(), (i as i64) * 2);
        }
    }
}
