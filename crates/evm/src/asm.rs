use crate::ids::MarkId;
use crate::opcodes::Opcode;

/// One step of an unplaced assembly stream.
///
/// `MarkRef`/`MarkDeltaRef` reserve space for a `PUSH` whose width isn't known
/// until layout; everything else has a fixed size from the moment it's
/// produced by macro expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asm {
    Op(Opcode),
    Mark(MarkId),
    MarkRef(MarkId),
    MarkDeltaRef(MarkId, MarkId),
    /// A raw `width`-byte offset, not preceded by a `PUSH` opcode and exempt
    /// from the shortening pass -- used for jump-table entries, which must
    /// stay a fixed size so the table can be indexed by multiplication.
    FixedRef(RefTarget, u8),
    Data(Vec<u8>),
}

impl Asm {
    pub fn mref(mid: MarkId) -> Asm {
        Asm::MarkRef(mid)
    }

    pub fn delta_ref(start: MarkId, end: MarkId) -> Asm {
        Asm::MarkDeltaRef(start, end)
    }

    /// The reference target this step resolves, if any -- used by validation
    /// to check every reference names a mark that was actually defined.
    pub fn ref_target(&self) -> Option<RefTarget> {
        match self {
            Asm::MarkRef(mid) => Some(RefTarget::Direct(mid.clone())),
            Asm::MarkDeltaRef(start, end) => Some(RefTarget::Delta(start.clone(), end.clone())),
            Asm::FixedRef(target, _) => Some(target.clone()),
            _ => None,
        }
    }

    /// Lower bound on the size this step can contribute: for a reference this
    /// is the opcode byte alone, before the operand width has been decided.
    pub fn min_static_size(&self) -> usize {
        match self {
            Asm::Op(op) => op.size(),
            Asm::Data(d) => d.len(),
            Asm::MarkRef(_) | Asm::MarkDeltaRef(_, _) => 1,
            Asm::FixedRef(_, width) => *width as usize,
            Asm::Mark(_) => 0,
        }
    }
}

/// A reference whose operand width has been fixed to `width` bytes, pending
/// the fixed-point shortening pass that may shrink it further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizedRef {
    pub target: RefTarget,
    pub width: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    Direct(MarkId),
    Delta(MarkId, MarkId),
}

/// One step of the solidified assembly stream: every reference now carries an
/// explicit operand width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolidAsm {
    Op(Opcode),
    Mark(MarkId),
    Ref(SizedRef),
    FixedRef(RefTarget, u8),
    Data(Vec<u8>),
}

impl SolidAsm {
    pub fn size(&self) -> usize {
        match self {
            SolidAsm::Op(op) => op.size(),
            SolidAsm::Data(d) => d.len(),
            SolidAsm::Ref(r) => 1 + r.width as usize,
            SolidAsm::FixedRef(_, width) => *width as usize,
            SolidAsm::Mark(_) => 0,
        }
    }
}
