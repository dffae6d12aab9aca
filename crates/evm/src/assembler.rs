use crate::asm::{Asm, RefTarget, SizedRef, SolidAsm};
use crate::ids::MarkId;
use crate::opcodes::Opcode;
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

/// Assembly is a four-stage pipeline: validate -> solidify -> shorten -> emit.
/// See the module-level algorithm this mirrors in the macro expander's output.
#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum AssembleError {
    #[error("duplicate mark {0:?}")]
    DuplicateMark(MarkId),
    #[error("reference to undefined mark {0:?}")]
    UndefinedReference(MarkId),
    #[error("delta reference end {end:?} does not strictly follow start {start:?}")]
    InvertedDelta { start: MarkId, end: MarkId },
    #[error("required reference width {0} exceeds the 6-byte ceiling")]
    CodeTooLarge(usize),
    #[error("fixed-width reference needs {needed} bytes but its table entry width is only {width}")]
    FixedRefOverflow { needed: usize, width: u8 },
}

/// Smallest number of bytes needed to represent `x` in big-endian, at least 1.
pub fn needed_bytes(x: u64) -> usize {
    let bits = 64 - x.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

/// Verifies every `Mark` id is unique and every reference resolves to a mark
/// that precedes it appropriately (for deltas: strictly precedes).
fn validate_asm(asm: &[Asm]) -> Result<BTreeMap<MarkId, usize>, AssembleError> {
    let mut indices: BTreeMap<MarkId, usize> = BTreeMap::new();
    for (i, step) in asm.iter().enumerate() {
        if let Asm::Mark(mid) = step {
            if indices.insert(mid.clone(), i).is_some() {
                return Err(AssembleError::DuplicateMark(mid.clone()));
            }
        }
    }

    for step in asm {
        match step.ref_target() {
            Some(RefTarget::Direct(mid)) => {
                if !indices.contains_key(&mid) {
                    return Err(AssembleError::UndefinedReference(mid));
                }
            }
            Some(RefTarget::Delta(start, end)) => {
                let start_idx = indices
                    .get(&start)
                    .ok_or_else(|| AssembleError::UndefinedReference(start.clone()))?;
                let end_idx = indices
                    .get(&end)
                    .ok_or_else(|| AssembleError::UndefinedReference(end.clone()))?;
                if end_idx <= start_idx {
                    return Err(AssembleError::InvertedDelta { start, end });
                }
            }
            None => {}
        }
    }

    Ok(indices)
}

/// Computes the minimum uniform reference width `W` such that the maximum
/// possible code size (every reference at width `W`) still fits in `W` bytes.
fn initial_width(asm: &[Asm]) -> Result<u8, AssembleError> {
    let ref_count = asm
        .iter()
        .filter(|s| matches!(s, Asm::MarkRef(_) | Asm::MarkDeltaRef(_, _)))
        .count();
    let min_static_total: usize = asm.iter().map(Asm::min_static_size).sum();

    let mut width: usize = 1;
    while ((1u128 << (8 * width)) - 1) < (min_static_total + width * ref_count) as u128 {
        width += 1;
        if width > 6 {
            return Err(AssembleError::CodeTooLarge(width));
        }
    }
    if width > 6 {
        return Err(AssembleError::CodeTooLarge(width));
    }
    Ok(width as u8)
}

fn asm_to_solid(asm: &[Asm], width: u8) -> Vec<SolidAsm> {
    asm.iter()
        .map(|step| match step {
            Asm::Op(op) => SolidAsm::Op(op.clone()),
            Asm::Data(d) => SolidAsm::Data(d.clone()),
            Asm::Mark(mid) => SolidAsm::Mark(mid.clone()),
            Asm::MarkRef(mid) => SolidAsm::Ref(SizedRef {
                target: RefTarget::Direct(mid.clone()),
                width,
            }),
            Asm::MarkDeltaRef(start, end) => SolidAsm::Ref(SizedRef {
                target: RefTarget::Delta(start.clone(), end.clone()),
                width,
            }),
            Asm::FixedRef(target, fixed_width) => SolidAsm::FixedRef(target.clone(), *fixed_width),
        })
        .collect()
}

fn solid_offsets(asm: &[SolidAsm]) -> BTreeMap<MarkId, usize> {
    let mut offsets = BTreeMap::new();
    let mut offset = 0usize;
    for step in asm {
        if let SolidAsm::Mark(mid) = step {
            offsets.insert(mid.clone(), offset);
        }
        offset += step.size();
    }
    offsets
}

fn ref_value(target: &RefTarget, offsets: &BTreeMap<MarkId, usize>) -> u64 {
    match target {
        RefTarget::Direct(mid) => offsets[mid] as u64,
        RefTarget::Delta(start, end) => (offsets[end] - offsets[start]) as u64,
    }
}

/// Runs the shortening fixed point: shrinking one reference can only shrink
/// subsequent offsets, which can only shrink further references, so this
/// terminates at the pointwise-minimum width assignment.
fn shorten(mut asm: Vec<SolidAsm>) -> Vec<SolidAsm> {
    loop {
        let offsets = solid_offsets(&asm);
        let mut changed = false;
        for step in asm.iter_mut() {
            if let SolidAsm::Ref(r) = step {
                let value = ref_value(&r.target, &offsets);
                let req = needed_bytes(value) as u8;
                if req != r.width {
                    r.width = req;
                    changed = true;
                }
            }
        }
        if !changed {
            return asm;
        }
    }
}

fn emit(asm: &[SolidAsm]) -> Result<Vec<u8>, AssembleError> {
    let offsets = solid_offsets(asm);
    let mut out = Vec::new();
    for step in asm {
        match step {
            SolidAsm::Op(op) => {
                out.push(op.byte());
                out.extend_from_slice(op.immediate());
            }
            SolidAsm::Data(d) => out.extend_from_slice(d),
            SolidAsm::Mark(_) => {}
            SolidAsm::Ref(r) => {
                let value = ref_value(&r.target, &offsets);
                let bytes = value.to_be_bytes();
                let data = &bytes[bytes.len() - r.width as usize..];
                let push = Opcode::push(r.width, data).expect("width computed from needed_bytes");
                out.push(push.byte());
                out.extend_from_slice(push.immediate());
            }
            SolidAsm::FixedRef(target, width) => {
                let value = ref_value(target, &offsets);
                let needed = needed_bytes(value);
                if needed > *width as usize {
                    return Err(AssembleError::FixedRefOverflow {
                        needed,
                        width: *width,
                    });
                }
                let bytes = value.to_be_bytes();
                out.extend_from_slice(&bytes[bytes.len() - *width as usize..]);
            }
        }
    }
    Ok(out)
}

/// Runs the full validate -> solidify -> shorten -> emit pipeline over one
/// assembly stream, producing its final flat bytecode.
pub fn assemble(asm: &[Asm]) -> Result<Vec<u8>, AssembleError> {
    validate_asm(asm)?;
    let width = initial_width(asm)?;
    let solid = asm_to_solid(asm, width);
    let solid = shorten(solid);
    emit(&solid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{MarkPurpose, ObjectId};

    fn mid(sub_id: u32, purpose: MarkPurpose) -> MarkId {
        MarkId::new(
            ObjectId {
                ctx_id: Box::new([]),
                sub_id,
            },
            purpose,
        )
    }

    #[test]
    fn needed_bytes_examples() {
        assert_eq!(needed_bytes(0), 1);
        assert_eq!(needed_bytes(255), 1);
        assert_eq!(needed_bytes(256), 2);
        assert_eq!(needed_bytes(65535), 2);
        assert_eq!(needed_bytes(65536), 3);
    }

    #[test]
    fn duplicate_mark_rejected() {
        let m = mid(0, MarkPurpose::Label);
        let asm = vec![Asm::Mark(m.clone()), Asm::Mark(m.clone())];
        assert_eq!(assemble(&asm), Err(AssembleError::DuplicateMark(m)));
    }

    #[test]
    fn inverted_delta_rejected() {
        let start = mid(0, MarkPurpose::Start);
        let end = mid(1, MarkPurpose::End);
        let asm = vec![
            Asm::MarkDeltaRef(start.clone(), end.clone()),
            Asm::Mark(end.clone()),
            Asm::Mark(start.clone()),
        ];
        assert_eq!(
            assemble(&asm),
            Err(AssembleError::InvertedDelta { start, end })
        );
    }

    #[test]
    fn shortening_finds_minimum_width() {
        // A mark referenced immediately after a single near-start jump: the
        // reference's target offset is small, so it should collapse to width 1
        // even though three consecutive refs to it were laid out.
        let target = mid(0, MarkPurpose::Label);
        let asm = vec![
            Asm::MarkRef(target.clone()),
            Asm::Op(Opcode::JUMP),
            Asm::Mark(target),
            Asm::Op(Opcode::JUMPDEST),
        ];
        let bytes = assemble(&asm).unwrap();
        // PUSH1 0x03, JUMP, JUMPDEST
        assert_eq!(bytes, vec![0x60, 0x03, 0x56, 0x5b]);
    }
}
