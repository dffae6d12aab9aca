use alloy_primitives::keccak256;
use huff_ast::{SolArg, SolError, SolEvent, SolFunction};
use huff_evm::Opcode;

fn arg_types(args: &[SolArg]) -> String {
    args.iter()
        .map(|a| a.ty.canonical_fragment())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn function_signature(f: &SolFunction) -> String {
    format!("{}({})", f.name.0, arg_types(&f.inputs))
}

pub fn error_signature(e: &SolError) -> String {
    format!("{}({})", e.name.0, arg_types(&e.inputs))
}

pub fn event_signature(e: &SolEvent) -> String {
    format!("{}({})", e.name.0, arg_types(&e.inputs))
}

/// The 4-byte selector, left-padded into a 32-byte word and wrapped as a
/// `PUSH4` -- `__FUNC_SIG` leaves the low 28 bytes zero, matching how a
/// selector is compared against `calldataload(0) >> 224` on the stack.
pub fn func_selector_push(f: &SolFunction) -> Opcode {
    selector_push(&function_signature(f))
}

pub fn error_selector_push(e: &SolError) -> Opcode {
    selector_push(&error_signature(e))
}

fn selector_push(signature: &str) -> Opcode {
    let hash = keccak256(signature.as_bytes());
    Opcode::PUSH4([hash[0], hash[1], hash[2], hash[3]])
}

/// The full 32-byte event topic hash, as a `PUSH32`.
pub fn event_topic_push(e: &SolEvent) -> Opcode {
    let hash = keccak256(event_signature(e).as_bytes());
    Opcode::PUSH32(hash.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use huff_ast::{Span, SolType, StateMutability};

    #[test]
    fn transfer_selector_matches_known_value() {
        let f = SolFunction {
            name: ("transfer", Span::new(0, 0)),
            inputs: vec![
                SolArg { name: Some("to"), indexed: false, ty: SolType::Address },
                SolArg { name: Some("amount"), indexed: false, ty: SolType::Uint(256) },
            ]
            .into_boxed_slice(),
            outputs: vec![SolArg { name: None, indexed: false, ty: SolType::Bool }].into_boxed_slice(),
            mutability: StateMutability::NonPayable,
        };
        assert_eq!(function_signature(&f), "transfer(address,uint256)");
        assert_eq!(func_selector_push(&f), Opcode::PUSH4([0xa9, 0x05, 0x9c, 0xbb]));
    }
}
