use thiserror::Error as ThisError;

/// A single EVM instruction plus, for `PUSHn`, its inline immediate data.
///
/// Opcode names and user identifiers share a namespace in Huff source; an
/// identifier that collides with one of these mnemonics can never be used as
/// a label, constant, or macro name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Opcode {
    STOP,
    ADD,
    MUL,
    SUB,
    DIV,
    SDIV,
    MOD,
    SMOD,
    ADDMOD,
    MULMOD,
    EXP,
    SIGNEXTEND,
    LT,
    GT,
    SLT,
    SGT,
    EQ,
    ISZERO,
    AND,
    OR,
    XOR,
    NOT,
    BYTE,
    SHL,
    SHR,
    SAR,
    SHA3,
    ADDRESS,
    BALANCE,
    ORIGIN,
    CALLER,
    CALLVALUE,
    CALLDATALOAD,
    CALLDATASIZE,
    CALLDATACOPY,
    CODESIZE,
    CODECOPY,
    GASPRICE,
    EXTCODESIZE,
    EXTCODECOPY,
    RETURNDATASIZE,
    RETURNDATACOPY,
    EXTCODEHASH,
    BLOCKHASH,
    COINBASE,
    TIMESTAMP,
    NUMBER,
    DIFFICULTY,
    GASLIMIT,
    CHAINID,
    SELFBALANCE,
    BASEFEE,
    POP,
    MLOAD,
    MSTORE,
    MSTORE8,
    SLOAD,
    SSTORE,
    JUMP,
    JUMPI,
    PC,
    MSIZE,
    GAS,
    JUMPDEST,
    TLOAD,
    TSTORE,
    PUSH0,
    PUSH1([u8; 1]),
    PUSH2([u8; 2]),
    PUSH3([u8; 3]),
    PUSH4([u8; 4]),
    PUSH5([u8; 5]),
    PUSH6([u8; 6]),
    PUSH7([u8; 7]),
    PUSH8([u8; 8]),
    PUSH9([u8; 9]),
    PUSH10([u8; 10]),
    PUSH11([u8; 11]),
    PUSH12([u8; 12]),
    PUSH13([u8; 13]),
    PUSH14([u8; 14]),
    PUSH15([u8; 15]),
    PUSH16([u8; 16]),
    PUSH17([u8; 17]),
    PUSH18([u8; 18]),
    PUSH19([u8; 19]),
    PUSH20([u8; 20]),
    PUSH21([u8; 21]),
    PUSH22([u8; 22]),
    PUSH23([u8; 23]),
    PUSH24([u8; 24]),
    PUSH25([u8; 25]),
    PUSH26([u8; 26]),
    PUSH27([u8; 27]),
    PUSH28([u8; 28]),
    PUSH29([u8; 29]),
    PUSH30([u8; 30]),
    PUSH31([u8; 31]),
    PUSH32([u8; 32]),
    DUP1,
    DUP2,
    DUP3,
    DUP4,
    DUP5,
    DUP6,
    DUP7,
    DUP8,
    DUP9,
    DUP10,
    DUP11,
    DUP12,
    DUP13,
    DUP14,
    DUP15,
    DUP16,
    SWAP1,
    SWAP2,
    SWAP3,
    SWAP4,
    SWAP5,
    SWAP6,
    SWAP7,
    SWAP8,
    SWAP9,
    SWAP10,
    SWAP11,
    SWAP12,
    SWAP13,
    SWAP14,
    SWAP15,
    SWAP16,
    LOG0,
    LOG1,
    LOG2,
    LOG3,
    LOG4,
    CREATE,
    CALL,
    CALLCODE,
    RETURN,
    DELEGATECALL,
    CREATE2,
    STATICCALL,
    REVERT,
    INVALID,
    SELFDESTRUCT,
}

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum OpcodeError {
    #[error("no PUSH of width {0} (must be 1..=32)")]
    InvalidPushWidth(usize),
    #[error("expected data no longer than {width} bytes, got {found}")]
    DataTooLong { width: usize, found: usize },
    #[error("unrecognized opcode mnemonic \"{0}\"")]
    UnknownMnemonic(String),
}

impl Opcode {
    /// The single opcode byte, as it appears in emitted bytecode.
    pub fn byte(&self) -> u8 {
        use Opcode::*;
        match self {
            STOP => 0x00,
            ADD => 0x01,
            MUL => 0x02,
            SUB => 0x03,
            DIV => 0x04,
            SDIV => 0x05,
            MOD => 0x06,
            SMOD => 0x07,
            ADDMOD => 0x08,
            MULMOD => 0x09,
            EXP => 0x0a,
            SIGNEXTEND => 0x0b,
            LT => 0x10,
            GT => 0x11,
            SLT => 0x12,
            SGT => 0x13,
            EQ => 0x14,
            ISZERO => 0x15,
            AND => 0x16,
            OR => 0x17,
            XOR => 0x18,
            NOT => 0x19,
            BYTE => 0x1a,
            SHL => 0x1b,
            SHR => 0x1c,
            SAR => 0x1d,
            SHA3 => 0x20,
            ADDRESS => 0x30,
            BALANCE => 0x31,
            ORIGIN => 0x32,
            CALLER => 0x33,
            CALLVALUE => 0x34,
            CALLDATALOAD => 0x35,
            CALLDATASIZE => 0x36,
            CALLDATACOPY => 0x37,
            CODESIZE => 0x38,
            CODECOPY => 0x39,
            GASPRICE => 0x3a,
            EXTCODESIZE => 0x3b,
            EXTCODECOPY => 0x3c,
            RETURNDATASIZE => 0x3d,
            RETURNDATACOPY => 0x3e,
            EXTCODEHASH => 0x3f,
            BLOCKHASH => 0x40,
            COINBASE => 0x41,
            TIMESTAMP => 0x42,
            NUMBER => 0x43,
            DIFFICULTY => 0x44,
            GASLIMIT => 0x45,
            CHAINID => 0x46,
            SELFBALANCE => 0x47,
            BASEFEE => 0x48,
            POP => 0x50,
            MLOAD => 0x51,
            MSTORE => 0x52,
            MSTORE8 => 0x53,
            SLOAD => 0x54,
            SSTORE => 0x55,
            JUMP => 0x56,
            JUMPI => 0x57,
            PC => 0x58,
            MSIZE => 0x59,
            GAS => 0x5a,
            JUMPDEST => 0x5b,
            TLOAD => 0x5c,
            TSTORE => 0x5d,
            PUSH0 => 0x5f,
            PUSH1(_) => 0x60,
            PUSH2(_) => 0x61,
            PUSH3(_) => 0x62,
            PUSH4(_) => 0x63,
            PUSH5(_) => 0x64,
            PUSH6(_) => 0x65,
            PUSH7(_) => 0x66,
            PUSH8(_) => 0x67,
            PUSH9(_) => 0x68,
            PUSH10(_) => 0x69,
            PUSH11(_) => 0x6a,
            PUSH12(_) => 0x6b,
            PUSH13(_) => 0x6c,
            PUSH14(_) => 0x6d,
            PUSH15(_) => 0x6e,
            PUSH16(_) => 0x6f,
            PUSH17(_) => 0x70,
            PUSH18(_) => 0x71,
            PUSH19(_) => 0x72,
            PUSH20(_) => 0x73,
            PUSH21(_) => 0x74,
            PUSH22(_) => 0x75,
            PUSH23(_) => 0x76,
            PUSH24(_) => 0x77,
            PUSH25(_) => 0x78,
            PUSH26(_) => 0x79,
            PUSH27(_) => 0x7a,
            PUSH28(_) => 0x7b,
            PUSH29(_) => 0x7c,
            PUSH30(_) => 0x7d,
            PUSH31(_) => 0x7e,
            PUSH32(_) => 0x7f,
            DUP1 => 0x80,
            DUP2 => 0x81,
            DUP3 => 0x82,
            DUP4 => 0x83,
            DUP5 => 0x84,
            DUP6 => 0x85,
            DUP7 => 0x86,
            DUP8 => 0x87,
            DUP9 => 0x88,
            DUP10 => 0x89,
            DUP11 => 0x8a,
            DUP12 => 0x8b,
            DUP13 => 0x8c,
            DUP14 => 0x8d,
            DUP15 => 0x8e,
            DUP16 => 0x8f,
            SWAP1 => 0x90,
            SWAP2 => 0x91,
            SWAP3 => 0x92,
            SWAP4 => 0x93,
            SWAP5 => 0x94,
            SWAP6 => 0x95,
            SWAP7 => 0x96,
            SWAP8 => 0x97,
            SWAP9 => 0x98,
            SWAP10 => 0x99,
            SWAP11 => 0x9a,
            SWAP12 => 0x9b,
            SWAP13 => 0x9c,
            SWAP14 => 0x9d,
            SWAP15 => 0x9e,
            SWAP16 => 0x9f,
            LOG0 => 0xa0,
            LOG1 => 0xa1,
            LOG2 => 0xa2,
            LOG3 => 0xa3,
            LOG4 => 0xa4,
            CREATE => 0xf0,
            CALL => 0xf1,
            CALLCODE => 0xf2,
            RETURN => 0xf3,
            DELEGATECALL => 0xf4,
            CREATE2 => 0xf5,
            STATICCALL => 0xfa,
            REVERT => 0xfd,
            INVALID => 0xfe,
            SELFDESTRUCT => 0xff,
        }
    }

    /// The immediate bytes following the opcode byte (non-empty only for `PUSHn`).
    pub fn immediate(&self) -> &[u8] {
        use Opcode::*;
        match self {
            PUSH1(d) => d,
            PUSH2(d) => d,
            PUSH3(d) => d,
            PUSH4(d) => d,
            PUSH5(d) => d,
            PUSH6(d) => d,
            PUSH7(d) => d,
            PUSH8(d) => d,
            PUSH9(d) => d,
            PUSH10(d) => d,
            PUSH11(d) => d,
            PUSH12(d) => d,
            PUSH13(d) => d,
            PUSH14(d) => d,
            PUSH15(d) => d,
            PUSH16(d) => d,
            PUSH17(d) => d,
            PUSH18(d) => d,
            PUSH19(d) => d,
            PUSH20(d) => d,
            PUSH21(d) => d,
            PUSH22(d) => d,
            PUSH23(d) => d,
            PUSH24(d) => d,
            PUSH25(d) => d,
            PUSH26(d) => d,
            PUSH27(d) => d,
            PUSH28(d) => d,
            PUSH29(d) => d,
            PUSH30(d) => d,
            PUSH31(d) => d,
            PUSH32(d) => d,
            _ => &[],
        }
    }

    /// Total encoded length: one opcode byte plus any immediate.
    pub fn size(&self) -> usize {
        1 + self.immediate().len()
    }

    pub fn is_push(&self) -> bool {
        self.byte() >= 0x60 && self.byte() <= 0x7f
    }

    /// Builds `PUSHwidth` from big-endian `data`, left-padding with zeroes up to `width`.
    pub fn push(width: u8, data: &[u8]) -> Result<Opcode, OpcodeError> {
        if data.len() > width as usize {
            return Err(OpcodeError::DataTooLong {
                width: width as usize,
                found: data.len(),
            });
        }
        let mut padded = vec![0u8; width as usize];
        let start = padded.len() - data.len();
        padded[start..].copy_from_slice(data);
        push_from_padded(width, &padded)
    }

    /// Looks up a bare mnemonic (e.g. `add`, `jumpdest`, `push0`). Rejects
    /// standalone `pushN` (N != 0): those always need an explicit operand.
    pub fn from_mnemonic(name: &str) -> Option<Opcode> {
        use Opcode::*;
        Some(match name {
            "stop" => STOP,
            "add" => ADD,
            "mul" => MUL,
            "sub" => SUB,
            "div" => DIV,
            "sdiv" => SDIV,
            "mod" => MOD,
            "smod" => SMOD,
            "addmod" => ADDMOD,
            "mulmod" => MULMOD,
            "exp" => EXP,
            "signextend" => SIGNEXTEND,
            "lt" => LT,
            "gt" => GT,
            "slt" => SLT,
            "sgt" => SGT,
            "eq" => EQ,
            "iszero" => ISZERO,
            "and" => AND,
            "or" => OR,
            "xor" => XOR,
            "not" => NOT,
            "byte" => BYTE,
            "shl" => SHL,
            "shr" => SHR,
            "sar" => SAR,
            "sha3" => SHA3,
            "address" => ADDRESS,
            "balance" => BALANCE,
            "origin" => ORIGIN,
            "caller" => CALLER,
            "callvalue" => CALLVALUE,
            "calldataload" => CALLDATALOAD,
            "calldatasize" => CALLDATASIZE,
            "calldatacopy" => CALLDATACOPY,
            "codesize" => CODESIZE,
            "codecopy" => CODECOPY,
            "gasprice" => GASPRICE,
            "extcodesize" => EXTCODESIZE,
            "extcodecopy" => EXTCODECOPY,
            "returndatasize" => RETURNDATASIZE,
            "returndatacopy" => RETURNDATACOPY,
            "extcodehash" => EXTCODEHASH,
            "blockhash" => BLOCKHASH,
            "coinbase" => COINBASE,
            "timestamp" => TIMESTAMP,
            "number" => NUMBER,
            "difficulty" => DIFFICULTY,
            "prevrandao" => DIFFICULTY,
            "gaslimit" => GASLIMIT,
            "chainid" => CHAINID,
            "selfbalance" => SELFBALANCE,
            "basefee" => BASEFEE,
            "pop" => POP,
            "mload" => MLOAD,
            "mstore" => MSTORE,
            "mstore8" => MSTORE8,
            "sload" => SLOAD,
            "sstore" => SSTORE,
            "jump" => JUMP,
            "jumpi" => JUMPI,
            "pc" => PC,
            "msize" => MSIZE,
            "gas" => GAS,
            "jumpdest" => JUMPDEST,
            "tload" => TLOAD,
            "tstore" => TSTORE,
            "push0" => PUSH0,
            "dup1" => DUP1,
            "dup2" => DUP2,
            "dup3" => DUP3,
            "dup4" => DUP4,
            "dup5" => DUP5,
            "dup6" => DUP6,
            "dup7" => DUP7,
            "dup8" => DUP8,
            "dup9" => DUP9,
            "dup10" => DUP10,
            "dup11" => DUP11,
            "dup12" => DUP12,
            "dup13" => DUP13,
            "dup14" => DUP14,
            "dup15" => DUP15,
            "dup16" => DUP16,
            "swap1" => SWAP1,
            "swap2" => SWAP2,
            "swap3" => SWAP3,
            "swap4" => SWAP4,
            "swap5" => SWAP5,
            "swap6" => SWAP6,
            "swap7" => SWAP7,
            "swap8" => SWAP8,
            "swap9" => SWAP9,
            "swap10" => SWAP10,
            "swap11" => SWAP11,
            "swap12" => SWAP12,
            "swap13" => SWAP13,
            "swap14" => SWAP14,
            "swap15" => SWAP15,
            "swap16" => SWAP16,
            "log0" => LOG0,
            "log1" => LOG1,
            "log2" => LOG2,
            "log3" => LOG3,
            "log4" => LOG4,
            "create" => CREATE,
            "call" => CALL,
            "callcode" => CALLCODE,
            "return" => RETURN,
            "delegatecall" => DELEGATECALL,
            "create2" => CREATE2,
            "staticcall" => STATICCALL,
            "revert" => REVERT,
            "invalid" => INVALID,
            "selfdestruct" => SELFDESTRUCT,
            _ => return None,
        })
    }

    /// True for any identifier that names an opcode (bare mnemonic form, `pushN`
    /// included) -- used to enforce that identifiers and opcodes share a namespace.
    pub fn names_opcode(name: &str) -> bool {
        if Self::from_mnemonic(name).is_some() {
            return true;
        }
        matches!(
            name,
            "push1"
                | "push2"
                | "push3"
                | "push4"
                | "push5"
                | "push6"
                | "push7"
                | "push8"
                | "push9"
                | "push10"
                | "push11"
                | "push12"
                | "push13"
                | "push14"
                | "push15"
                | "push16"
                | "push17"
                | "push18"
                | "push19"
                | "push20"
                | "push21"
                | "push22"
                | "push23"
                | "push24"
                | "push25"
                | "push26"
                | "push27"
                | "push28"
                | "push29"
                | "push30"
                | "push31"
                | "push32"
        )
    }
}

fn push_from_padded(width: u8, data: &[u8]) -> Result<Opcode, OpcodeError> {
    use Opcode::*;
    macro_rules! arr {
        ($n:expr) => {{
            let mut a = [0u8; $n];
            a.copy_from_slice(data);
            a
        }};
    }
    Ok(match width {
        1 => PUSH1(arr!(1)),
        2 => PUSH2(arr!(2)),
        3 => PUSH3(arr!(3)),
        4 => PUSH4(arr!(4)),
        5 => PUSH5(arr!(5)),
        6 => PUSH6(arr!(6)),
        7 => PUSH7(arr!(7)),
        8 => PUSH8(arr!(8)),
        9 => PUSH9(arr!(9)),
        10 => PUSH10(arr!(10)),
        11 => PUSH11(arr!(11)),
        12 => PUSH12(arr!(12)),
        13 => PUSH13(arr!(13)),
        14 => PUSH14(arr!(14)),
        15 => PUSH15(arr!(15)),
        16 => PUSH16(arr!(16)),
        17 => PUSH17(arr!(17)),
        18 => PUSH18(arr!(18)),
        19 => PUSH19(arr!(19)),
        20 => PUSH20(arr!(20)),
        21 => PUSH21(arr!(21)),
        22 => PUSH22(arr!(22)),
        23 => PUSH23(arr!(23)),
        24 => PUSH24(arr!(24)),
        25 => PUSH25(arr!(25)),
        26 => PUSH26(arr!(26)),
        27 => PUSH27(arr!(27)),
        28 => PUSH28(arr!(28)),
        29 => PUSH29(arr!(29)),
        30 => PUSH30(arr!(30)),
        31 => PUSH31(arr!(31)),
        32 => PUSH32(arr!(32)),
        _ => return Err(OpcodeError::InvalidPushWidth(width as usize)),
    })
}

/// Builds the minimum-width `PUSH` that represents `data`, stripping leading
/// zero bytes (keeping at least one byte of payload). Mirrors the "explicit
/// width" `pushN 0x..` form when `width` is `Some`.
pub fn minimal_push(data: &[u8], width: Option<u8>) -> Result<Opcode, OpcodeError> {
    match width {
        Some(w) => Opcode::push(w, data),
        None => {
            let mut trimmed = data;
            while trimmed.len() > 1 && trimmed[0] == 0 {
                trimmed = &trimmed[1..];
            }
            let width = trimmed.len().max(1) as u8;
            Opcode::push(width, trimmed)
        }
    }
}

/// `bytes_to_push` from the constant-resolution algorithm: the single zero
/// byte lowers to `PUSH0` unless the caller asked to avoid it.
pub fn bytes_to_push(data: &[u8], avoid_push0: bool) -> Result<Opcode, OpcodeError> {
    if data.len() == 1 && data[0] == 0 && !avoid_push0 {
        return Ok(Opcode::PUSH0);
    }
    minimal_push(data, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_trims_leading_zeroes() {
        assert_eq!(minimal_push(&[0x00, 0x82], None).unwrap(), Opcode::PUSH1([0x82]));
    }

    #[test]
    fn push_rejects_oversized_width() {
        assert_eq!(
            Opcode::push(1, &[0x01, 0x02]),
            Err(OpcodeError::DataTooLong { width: 1, found: 2 })
        );
    }

    #[test]
    fn bytes_to_push_zero_is_push0_by_default() {
        assert_eq!(bytes_to_push(&[0x00], false).unwrap(), Opcode::PUSH0);
        assert_eq!(bytes_to_push(&[0x00], true).unwrap(), Opcode::PUSH1([0x00]));
    }

    #[test]
    fn mnemonic_lookup_excludes_bare_push_n() {
        assert_eq!(Opcode::from_mnemonic("push0"), Some(Opcode::PUSH0));
        assert_eq!(Opcode::from_mnemonic("push1"), None);
        assert!(Opcode::names_opcode("push1"));
        assert_eq!(Opcode::from_mnemonic("add"), Some(Opcode::ADD));
    }
}
