use crate::error::Error;

/// A Solidity ABI type tree, as used in `function`/`event`/`error` signatures.
///
/// Array and tuple nesting is recursive; the canonical signature fragment for
/// a type is computed bottom-up by [`SolType::canonical_fragment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolType<'src> {
    Address,
    Bool,
    String,
    Bytes,
    FixedBytes(u16),
    Uint(u16),
    Int(u16),
    Tuple(Box<[SolArg<'src>]>),
    Array(Box<SolType<'src>>),
    FixedArray(Box<SolType<'src>>, u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolArg<'src> {
    pub name: Option<&'src str>,
    pub indexed: bool,
    pub ty: SolType<'src>,
}

impl<'src> SolType<'src> {
    /// The textual fragment used as input to keccak256 when building a
    /// function/event/error selector: tuples expand their components
    /// recursively, `uint`/`int` are always written with an explicit width.
    pub fn canonical_fragment(&self) -> String {
        match self {
            SolType::Address => "address".to_string(),
            SolType::Bool => "bool".to_string(),
            SolType::String => "string".to_string(),
            SolType::Bytes => "bytes".to_string(),
            SolType::FixedBytes(n) => format!("bytes{n}"),
            SolType::Uint(n) => format!("uint{n}"),
            SolType::Int(n) => format!("int{n}"),
            SolType::Tuple(args) => {
                let inner: Vec<String> = args.iter().map(|a| a.ty.canonical_fragment()).collect();
                format!("({})", inner.join(","))
            }
            SolType::Array(inner) => format!("{}[]", inner.canonical_fragment()),
            SolType::FixedArray(inner, k) => format!("{}[{k}]", inner.canonical_fragment()),
        }
    }

    /// The `"type"` field used in ABI JSON: tuples render as the literal
    /// string `"tuple"` (with their members placed in a separate
    /// `"components"` array) instead of being expanded inline.
    pub fn abi_type_name(&self) -> String {
        match self {
            SolType::Tuple(_) => "tuple".to_string(),
            SolType::Array(inner) => format!("{}[]", inner.abi_type_name()),
            SolType::FixedArray(inner, k) => format!("{}[{k}]", inner.abi_type_name()),
            other => other.canonical_fragment(),
        }
    }

    pub fn components(&self) -> Option<&[SolArg<'src>]> {
        match self {
            SolType::Tuple(args) => Some(args),
            SolType::Array(inner) | SolType::FixedArray(inner, _) => inner.components(),
            _ => None,
        }
    }
}

/// Parses a base type name (no array suffix) such as `"uint"`, `"uint256"`,
/// `"bytes32"`, or `"address"`.
pub fn parse_base_type(name: &str) -> Result<SolType<'static>, Error> {
    if name == "uint" {
        return Ok(SolType::Uint(256));
    }
    if name == "int" {
        return Ok(SolType::Int(256));
    }
    if let Some(n) = name.strip_prefix("uint") {
        if let Ok(n) = n.parse::<u16>() {
            return validate_int_width(n).map(SolType::Uint);
        }
    }
    if let Some(n) = name.strip_prefix("int") {
        if let Ok(n) = n.parse::<u16>() {
            return validate_int_width(n).map(SolType::Int);
        }
    }
    if let Some(n) = name.strip_prefix("bytes") {
        if !n.is_empty() {
            if let Ok(n) = n.parse::<u16>() {
                return validate_bytes_width(n).map(SolType::FixedBytes);
            }
        }
    }
    match name {
        "address" => Ok(SolType::Address),
        "bool" => Ok(SolType::Bool),
        "string" => Ok(SolType::String),
        "bytes" => Ok(SolType::Bytes),
        _ => Err(Error::UnknownSolType(name.to_string())),
    }
}

fn validate_int_width(n: u16) -> Result<u16, Error> {
    if n >= 8 && n <= 256 && n % 8 == 0 {
        Ok(n)
    } else {
        Err(Error::InvalidIntWidth(n))
    }
}

fn validate_bytes_width(n: u16) -> Result<u16, Error> {
    if (1..=32).contains(&n) {
        Ok(n)
    } else {
        Err(Error::InvalidBytesWidth(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_uint_is_uint256() {
        assert_eq!(parse_base_type("uint").unwrap(), SolType::Uint(256));
    }

    #[test]
    fn rejects_misaligned_uint_width() {
        assert!(parse_base_type("uint9").is_err());
        assert!(parse_base_type("uint264").is_err());
    }

    #[test]
    fn rejects_oversized_bytesn() {
        assert!(parse_base_type("bytes33").is_err());
        assert!(parse_base_type("bytes0").is_err());
    }

    #[test]
    fn tuple_canonical_fragment_expands_recursively() {
        let inner = SolType::Tuple(Box::new([
            SolArg {
                name: Some("to"),
                indexed: false,
                ty: SolType::Address,
            },
            SolArg {
                name: Some("amount"),
                indexed: false,
                ty: SolType::Uint(256),
            },
        ]));
        assert_eq!(inner.canonical_fragment(), "(address,uint256)");
        assert_eq!(inner.abi_type_name(), "tuple");
    }
}
