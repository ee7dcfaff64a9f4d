//! Parsing of 256-bit amounts as reported by the node

use primitive_types::U256;
use thiserror::Error;

/// Amount parsing error
#[derive(Debug, Error)]
pub enum AmountError {
    /// Empty input
    #[error("empty amount string")]
    Empty,
    /// Not a valid decimal or hex number, or out of 256-bit range
    #[error("invalid amount {input:?}: {reason}")]
    Invalid {
        /// The rejected input
        input: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Parse a balance or amount string.
///
/// Accepts decimal (`"1000"`) or `0x`-prefixed hex (`"0x3e8"`). Anything else,
/// including values wider than 256 bits, is an error; nothing is coerced to zero.
pub fn parse_u256(s: &str) -> Result<U256, AmountError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let invalid = |reason: String| AmountError::Invalid {
        input: s.to_string(),
        reason,
    };

    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid("not a hex number".to_string()));
        }
        let digits = hex.trim_start_matches('0');
        if digits.len() > 64 {
            return Err(invalid("exceeds 256 bits".to_string()));
        }
        if digits.is_empty() {
            return Ok(U256::zero());
        }
        return U256::from_str_radix(digits, 16).map_err(|e| invalid(format!("{:?}", e)));
    }

    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("not a decimal number".to_string()));
    }
    U256::from_dec_str(trimmed).map_err(|e| invalid(format!("{:?}", e)))
}
