//! ABI encoding

use tessera_primitives::U256;

use super::types::{ParamType, Token};
use crate::SdkError;

/// Encode `tokens` as a tuple of `types`.
///
/// Every token is checked against its declared type first; nothing is
/// coerced or padded to fit.
pub fn encode(types: &[ParamType], tokens: &[Token]) -> Result<Vec<u8>, SdkError> {
    if types.len() != tokens.len() {
        return Err(SdkError::AbiEncode(format!(
            "Expected {} arguments, got {}",
            types.len(),
            tokens.len()
        )));
    }
    for (i, (param_type, token)) in types.iter().zip(tokens).enumerate() {
        if !param_type.matches(token) {
            return Err(SdkError::AbiEncode(format!(
                "Argument {} is not a {}: {:?}",
                i, param_type, token
            )));
        }
    }
    encode_tuple(types, tokens)
}

/// Encode function call (selector + params)
pub fn encode_function_call(
    selector: [u8; 4],
    types: &[ParamType],
    tokens: &[Token],
) -> Result<Vec<u8>, SdkError> {
    let mut result = selector.to_vec();
    result.extend(encode(types, tokens)?);
    Ok(result)
}

/// Compute function selector (first 4 bytes of keccak256(signature))
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = tessera_crypto::keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash.as_bytes()[..4]);
    selector
}

fn encode_tuple(types: &[ParamType], tokens: &[Token]) -> Result<Vec<u8>, SdkError> {
    let head_size: usize = types.iter().map(ParamType::head_len).sum();

    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for (param_type, token) in types.iter().zip(tokens) {
        let encoded = encode_value(param_type, token)?;
        if param_type.is_dynamic() {
            head.extend(word(&U256::from(head_size + tail.len())));
            tail.extend(encoded);
        } else {
            head.extend(encoded);
        }
    }

    head.extend(tail);
    Ok(head)
}

fn encode_value(param_type: &ParamType, token: &Token) -> Result<Vec<u8>, SdkError> {
    let encoded = match (param_type, token) {
        (ParamType::Address, Token::Address(addr)) => {
            let mut buf = vec![0u8; 32];
            buf[12..].copy_from_slice(addr.as_bytes());
            buf
        }
        (ParamType::Uint(bits), Token::Uint(value)) => {
            if value.bits() > *bits {
                return Err(SdkError::AbiEncode(format!("{} overflows uint{}", value, bits)));
            }
            word(value)
        }
        (ParamType::Int(_), Token::Int(value)) => word(&value.into_raw()),
        (ParamType::Bool, Token::Bool(b)) => word(&U256::from(*b as u8)),
        (ParamType::FixedBytes(_), Token::FixedBytes(data)) => {
            let mut buf = vec![0u8; 32];
            buf[..data.len()].copy_from_slice(data);
            buf
        }
        (ParamType::Bytes, Token::Bytes(data)) => encode_bytes(data),
        (ParamType::String, Token::String(s)) => encode_bytes(s.as_bytes()),
        (ParamType::Array(inner), Token::Array(items)) => {
            let mut result = word(&U256::from(items.len()));
            result.extend(encode_tuple(&vec![(**inner).clone(); items.len()], items)?);
            result
        }
        (ParamType::FixedArray(inner, _), Token::FixedArray(items)) => {
            encode_tuple(&vec![(**inner).clone(); items.len()], items)?
        }
        (ParamType::Tuple(types), Token::Tuple(items)) => encode_tuple(types, items)?,
        _ => {
            return Err(SdkError::AbiEncode(format!(
                "{:?} is not a {}",
                token, param_type
            )))
        }
    };
    Ok(encoded)
}

/// 32-byte big-endian word
fn word(value: &U256) -> Vec<u8> {
    let mut bytes = vec![0u8; 32];
    value.to_big_endian(&mut bytes);
    bytes
}

/// Length word followed by the data, right-padded to a word boundary
fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let mut result = word(&U256::from(data.len()));
    let padded_len = data.len().div_ceil(32) * 32;
    let start = result.len();
    result.resize(start + padded_len, 0);
    result[start..start + data.len()].copy_from_slice(data);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::I256;
    use tessera_primitives::Address;

    #[test]
    fn test_encode_address() {
        let addr = Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d").unwrap();
        let encoded = encode(&[ParamType::Address], &[Token::Address(addr)]).unwrap();

        assert_eq!(encoded.len(), 32);
        assert_eq!(&encoded[..12], &[0u8; 12]);
        assert_eq!(&encoded[12..32], addr.as_bytes());
    }

    #[test]
    fn test_encode_negative_int() {
        let encoded = encode(&[ParamType::Int(256)], &[Token::Int(I256::from_i128(-1))]).unwrap();
        assert_eq!(encoded, vec![0xff; 32]);
    }

    #[test]
    fn test_encode_dynamic_bytes() {
        let data = vec![0x01, 0x02, 0x03];
        let encoded = encode(&[ParamType::Bytes], &[Token::Bytes(data.clone())]).unwrap();

        // offset + length + one padded word
        assert_eq!(encoded.len(), 96);
        assert_eq!(encoded[31], 32);
        assert_eq!(encoded[63], 3);
        assert_eq!(&encoded[64..67], &data[..]);
    }

    #[test]
    fn test_encode_mixed_static_and_dynamic() {
        // f(uint256, string, bool): head is three words, the string lives in the tail
        let encoded = encode(
            &[ParamType::Uint(256), ParamType::String, ParamType::Bool],
            &[Token::uint(7), Token::string("hi"), Token::Bool(true)],
        )
        .unwrap();

        assert_eq!(encoded.len(), 32 * 5);
        assert_eq!(encoded[31], 7);
        assert_eq!(encoded[63], 96);
        assert_eq!(encoded[95], 1);
        assert_eq!(encoded[127], 2);
        assert_eq!(&encoded[128..130], b"hi");
    }

    #[test]
    fn test_encode_dynamic_array() {
        let encoded = encode(
            &[ParamType::Array(Box::new(ParamType::Uint(256)))],
            &[Token::Array(vec![Token::uint(1), Token::uint(2)])],
        )
        .unwrap();

        // offset, length, two elements
        assert_eq!(encoded.len(), 128);
        assert_eq!(encoded[31], 32);
        assert_eq!(encoded[63], 2);
        assert_eq!(encoded[95], 1);
        assert_eq!(encoded[127], 2);
    }

    #[test]
    fn test_encode_rejects_type_mismatch() {
        let err = encode(&[ParamType::Address], &[Token::Bool(true)]).unwrap_err();
        assert!(matches!(err, SdkError::AbiEncode(_)));

        let err = encode(&[ParamType::Address], &[]).unwrap_err();
        assert!(err.to_string().contains("Expected 1 arguments"));
    }

    #[test]
    fn test_encode_rejects_uint_overflow() {
        assert!(encode(&[ParamType::Uint(8)], &[Token::uint(256)]).is_err());
        assert!(encode(&[ParamType::Uint(8)], &[Token::uint(255)]).is_ok());
    }

    #[test]
    fn test_function_selector() {
        assert_eq!(function_selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(function_selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
    }

    #[test]
    fn test_encode_function_call() {
        let selector = function_selector("transfer(address,uint256)");
        let encoded = encode_function_call(
            selector,
            &[ParamType::Address, ParamType::Uint(256)],
            &[Token::Address(Address::ZERO), Token::uint(1000)],
        )
        .unwrap();

        assert_eq!(encoded.len(), 68);
        assert_eq!(&encoded[..4], &selector);
    }
}
