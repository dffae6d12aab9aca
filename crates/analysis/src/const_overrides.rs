use alloy_primitives::U256;

/// A `--constant NAME=0xHEX` CLI override, parsed but not yet matched
/// against a known constant (that check needs the resolved constant table
/// and lives in the compilation driver).
#[derive(Debug, Clone)]
pub struct ConstantOverride {
    pub name: String,
    pub value: U256,
}

pub fn parse_constant_override(s: &str) -> Result<ConstantOverride, String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected override in the form NAME=0xHEX, got {s:?}"))?;

    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| format!("constant override value must be hex (0x...), got {value:?}"))?;

    if digits.is_empty() || digits.len() > 64 {
        return Err(format!(
            "constant override hex must be 1..=64 digits, got {} in {value:?}",
            digits.len()
        ));
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("invalid hex digits in constant override value {value:?}"));
    }

    let value = U256::from_str_radix(digits, 16)
        .map_err(|_| format!("constant override value {value:?} does not fit in 256 bits"))?;

    Ok(ConstantOverride {
        name: name.to_uppercase(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_override() {
        let o = parse_constant_override("owner=0x1234").unwrap();
        assert_eq!(o.name, "OWNER");
        assert_eq!(o.value, U256::from(0x1234u64));
    }

    #[test]
    fn rejects_decimal_value() {
        assert!(parse_constant_override("OWNER=42").is_err());
    }

    #[test]
    fn rejects_missing_equals() {
        assert!(parse_constant_override("OWNER").is_err());
    }

    #[test]
    fn rejects_oversized_hex() {
        let too_long = format!("X=0x{}", "1".repeat(65));
        assert!(parse_constant_override(&too_long).is_err());
    }
}
