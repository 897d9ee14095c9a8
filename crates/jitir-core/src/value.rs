//! Value kinds: the sum type every IR value's operation is drawn from.
//!
//! Organized around the kernel IR's actual value kinds (§3): constants,
//! arithmetic/comparison, memory, structure, view, control, phi, call, and
//! side-effecting values. Dispatch is exhaustive on this tag everywhere a
//! visitor needs it -- no wildcard arms.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{BasicBlockId, MethodId, ValueId};
use crate::type_id::TypeId;
use crate::types::{AddressSpace, ConstValue};

/// Binary arithmetic kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Unary arithmetic kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryArithOp {
    Neg,
    Abs,
}

/// Comparison kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Bitwise logic kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

/// Shift kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftOp {
    Shl,
    Shr,
}

/// Disambiguates signed/unsigned integer arithmetic from floating-point
/// arithmetic at the value level, per §3 ("explicit signed/unsigned and
/// floating/integer disambiguation").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumKind {
    SignedInt,
    UnsignedInt,
    Float,
}

/// Atomic read-modify-write kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtomicOp {
    Add,
    Exchange,
    CompareExchange,
    Min,
    Max,
}

/// Barrier scope: a group-wide or warp-wide synchronization point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarrierScope {
    Group,
    Warp,
}

/// A switch arm: constant discriminant value paired with a target block.
pub type SwitchArm = (i64, BasicBlockId);

/// Which of the three index spaces a [`ValueKind::ThreadIndex`] reads from
/// (§4.6 "the kernel receives a per-thread global index, a group index, and
/// a thread-in-group index").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexSpace {
    /// This thread's position in the whole launch's flattened index space.
    Global,
    /// Which group (block) this thread belongs to.
    Group,
    /// This thread's position within its own group.
    Local,
}

/// One axis of a `Dim3` index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// The operation a [`crate::value::Value`] performs, and the operands it
/// reads. Operand `ValueId`s are the single owning direction for use-def
/// edges (§9 design note): uses are a derived, lazily rebuilt index, never
/// an embedded back-pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ValueKind {
    // ---- Constants ----
    ConstPrimitive(ConstValue),
    ConstNullPointer,
    ConstUndef,
    /// Read of the `index`-th formal parameter of the owning method.
    Parameter { index: u32 },
    /// Read of one axis of one of the three index spaces a launch hands an
    /// implicitly-grouped kernel (§4.6). Has no operands; a fixed point for
    /// a given thread across its whole execution, so LICM's invariance
    /// fixed point hoists it like a parameter.
    ThreadIndex { space: IndexSpace, axis: Axis },

    // ---- Arithmetic / Comparison ----
    UnaryArith {
        op: UnaryArithOp,
        kind: NumKind,
        operand: ValueId,
    },
    BinaryArith {
        op: ArithOp,
        kind: NumKind,
        lhs: ValueId,
        rhs: ValueId,
    },
    Compare {
        op: CmpOp,
        kind: NumKind,
        lhs: ValueId,
        rhs: ValueId,
    },
    Logic {
        op: LogicOp,
        lhs: ValueId,
        rhs: ValueId,
    },
    Not {
        operand: ValueId,
    },
    Shift {
        op: ShiftOp,
        signed: bool,
        value: ValueId,
        amount: ValueId,
    },

    // ---- Memory ----
    Alloc {
        element_type: TypeId,
        space: AddressSpace,
    },
    Load {
        pointer: ValueId,
    },
    Store {
        pointer: ValueId,
        value: ValueId,
    },
    /// Pointer arithmetic on a typed pointer: `pointer + index * size_of(element)`.
    LoadElementAddress {
        pointer: ValueId,
        index: ValueId,
    },
    SizeOf {
        of_type: TypeId,
    },
    AlignTo {
        pointer: ValueId,
        alignment: u32,
    },
    PointerCast {
        pointer: ValueId,
        to: TypeId,
    },
    AddressSpaceCast {
        pointer: ValueId,
        to: AddressSpace,
    },
    PointerAsInt {
        pointer: ValueId,
    },

    // ---- Structure ----
    BuildStruct {
        struct_type: TypeId,
        fields: SmallVec<[ValueId; 4]>,
    },
    GetField {
        structure: ValueId,
        field_index: u32,
    },

    // ---- View ----
    NewView {
        pointer: ValueId,
        length: ValueId,
    },
    GetViewLength {
        view: ValueId,
    },
    SubView {
        view: ValueId,
        offset: ValueId,
        length: ValueId,
    },
    ViewCast {
        view: ValueId,
        to_element: TypeId,
    },
    AlignToView {
        view: ValueId,
        alignment: u32,
    },
    AsAlignedView {
        view: ValueId,
        alignment: u32,
    },

    // ---- Control ----
    Branch {
        condition: ValueId,
        if_true: BasicBlockId,
        if_false: BasicBlockId,
    },
    Jump {
        target: BasicBlockId,
    },
    Switch {
        discriminant: ValueId,
        arms: Vec<SwitchArm>,
        default: BasicBlockId,
    },
    Return {
        value: Option<ValueId>,
    },

    // ---- Phi ----
    /// `sources[i]` is paired with `predecessors(parent_block)[i]` (§3 phi arity).
    Phi {
        sources: Vec<(ValueId, BasicBlockId)>,
    },

    // ---- Call ----
    Call {
        target: MethodId,
        args: Vec<ValueId>,
    },

    // ---- Side-effecting ----
    Atomic {
        op: AtomicOp,
        pointer: ValueId,
        operand: ValueId,
    },
    Barrier {
        scope: BarrierScope,
    },
    /// An I/O-like external call the backend cannot reorder or eliminate.
    ExternalIo {
        name: String,
        args: Vec<ValueId>,
    },
}

impl ValueKind {
    /// Every `ValueId` this value reads, in operand order. The single
    /// source of truth the builder's use-index is rebuilt from.
    pub fn operands(&self) -> SmallVec<[ValueId; 4]> {
        use ValueKind::*;
        match self {
            ConstPrimitive(_) | ConstNullPointer | ConstUndef | Parameter { .. } | ThreadIndex { .. } => SmallVec::new(),
            UnaryArith { operand, .. } | Not { operand } => SmallVec::from_slice(&[*operand]),
            BinaryArith { lhs, rhs, .. } | Compare { lhs, rhs, .. } | Logic { lhs, rhs, .. } => {
                SmallVec::from_slice(&[*lhs, *rhs])
            }
            Shift { value, amount, .. } => SmallVec::from_slice(&[*value, *amount]),
            Alloc { .. } | SizeOf { .. } => SmallVec::new(),
            Load { pointer } | AlignTo { pointer, .. } | PointerCast { pointer, .. }
            | AddressSpaceCast { pointer, .. } | PointerAsInt { pointer } => {
                SmallVec::from_slice(&[*pointer])
            }
            Store { pointer, value } => SmallVec::from_slice(&[*pointer, *value]),
            LoadElementAddress { pointer, index } => SmallVec::from_slice(&[*pointer, *index]),
            BuildStruct { fields, .. } => fields.clone(),
            GetField { structure, .. } => SmallVec::from_slice(&[*structure]),
            NewView { pointer, length } => SmallVec::from_slice(&[*pointer, *length]),
            GetViewLength { view } | AlignToView { view, .. } | AsAlignedView { view, .. }
            | ViewCast { view, .. } => SmallVec::from_slice(&[*view]),
            SubView { view, offset, length } => SmallVec::from_slice(&[*view, *offset, *length]),
            Branch { condition, .. } => SmallVec::from_slice(&[*condition]),
            Jump { .. } => SmallVec::new(),
            Switch { discriminant, .. } => SmallVec::from_slice(&[*discriminant]),
            Return { value } => value.iter().copied().collect(),
            Phi { sources } => sources.iter().map(|(v, _)| *v).collect(),
            Call { args, .. } => args.iter().copied().collect(),
            Atomic { pointer, operand, .. } => SmallVec::from_slice(&[*pointer, *operand]),
            Barrier { .. } => SmallVec::new(),
            ExternalIo { args, .. } => args.iter().copied().collect(),
        }
    }

    /// `true` for the single value that may terminate a block (§3 "Terminator").
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            ValueKind::Branch { .. } | ValueKind::Jump { .. } | ValueKind::Switch { .. } | ValueKind::Return { .. }
        )
    }

    pub fn is_phi(&self) -> bool {
        matches!(self, ValueKind::Phi { .. })
    }

    /// Side-effecting values are never hoisted or eliminated by LICM/rewrites.
    pub fn is_side_effect(&self) -> bool {
        matches!(
            self,
            ValueKind::Store { .. }
                | ValueKind::Atomic { .. }
                | ValueKind::Barrier { .. }
                | ValueKind::ExternalIo { .. }
                | ValueKind::Call { .. }
        )
    }

    /// `true` for the view-family values `LowerPointerViews` rewrites away.
    pub fn is_view_op(&self) -> bool {
        matches!(
            self,
            ValueKind::NewView { .. }
                | ValueKind::GetViewLength { .. }
                | ValueKind::SubView { .. }
                | ValueKind::ViewCast { .. }
                | ValueKind::AlignToView { .. }
                | ValueKind::AsAlignedView { .. }
        )
    }
}

/// A single IR value: its identity, type, owning block, operation, and the
/// derived set of uses (§3 "Value").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Value {
    pub id: ValueId,
    pub ty: TypeId,
    pub block: BasicBlockId,
    pub kind: ValueKind,
    /// Derived back-edges: every value whose operand list contains `id`.
    /// Rebuilt by the builder, never mutated directly by a pass.
    pub uses: SmallVec<[ValueId; 4]>,
}

impl Value {
    pub fn operands(&self) -> SmallVec<[ValueId; 4]> {
        self.kind.operands()
    }
}
