//! ABI decoding

use tessera_primitives::{Address, U256};

use super::types::{ParamType, Token, I256};
use crate::SdkError;

/// Decode a tuple of `types` from ABI-encoded data.
///
/// Offsets inside dynamic values are relative to the start of their enclosing
/// tuple. Trailing bytes are ignored.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, SdkError> {
    decode_tuple(types, data)
}

fn decode_tuple(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, SdkError> {
    let mut tokens = Vec::with_capacity(types.len());
    let mut pos = 0;

    for param_type in types {
        if param_type.is_dynamic() {
            let offset = read_len(data, pos)?;
            let tail = data.get(offset..).ok_or_else(|| short(offset, data.len()))?;
            tokens.push(decode_value(param_type, tail)?);
            pos += 32;
        } else {
            let head = data.get(pos..).ok_or_else(|| short(pos, data.len()))?;
            tokens.push(decode_value(param_type, head)?);
            pos += param_type.head_len();
        }
    }

    Ok(tokens)
}

/// Decode one value whose encoding starts at `data[0]`
fn decode_value(param_type: &ParamType, data: &[u8]) -> Result<Token, SdkError> {
    match param_type {
        ParamType::Address => {
            let w = read_word(data, 0)?;
            Ok(Token::Address(Address::from_slice(&w[12..])?))
        }
        ParamType::Uint(_) => Ok(Token::Uint(U256::from_big_endian(read_word(data, 0)?))),
        ParamType::Int(_) => Ok(Token::Int(I256::from_raw(U256::from_big_endian(read_word(
            data, 0,
        )?)))),
        ParamType::Bool => {
            let w = read_word(data, 0)?;
            if w[..31].iter().any(|b| *b != 0) || w[31] > 1 {
                return Err(SdkError::AbiDecode("Invalid bool encoding".to_string()));
            }
            Ok(Token::Bool(w[31] == 1))
        }
        ParamType::FixedBytes(size) => {
            let w = read_word(data, 0)?;
            Ok(Token::FixedBytes(w[..*size].to_vec()))
        }
        ParamType::Bytes => Ok(Token::Bytes(read_bytes(data)?.to_vec())),
        ParamType::String => {
            let s = String::from_utf8(read_bytes(data)?.to_vec())
                .map_err(|e| SdkError::AbiDecode(format!("Invalid UTF-8: {}", e)))?;
            Ok(Token::String(s))
        }
        ParamType::Array(inner) => {
            let len = read_len(data, 0)?;
            let items = &data[32..];
            // every element takes at least one word
            if len > items.len() / 32 {
                return Err(short(32 + len * 32, data.len()));
            }
            let types = vec![(**inner).clone(); len];
            Ok(Token::Array(decode_tuple(&types, items)?))
        }
        ParamType::FixedArray(inner, size) => {
            let types = vec![(**inner).clone(); *size];
            Ok(Token::FixedArray(decode_tuple(&types, data)?))
        }
        ParamType::Tuple(types) => Ok(Token::Tuple(decode_tuple(types, data)?)),
    }
}

fn read_word(data: &[u8], pos: usize) -> Result<&[u8], SdkError> {
    data.get(pos..pos + 32).ok_or_else(|| short(pos + 32, data.len()))
}

/// Read a length or offset word, bounded by the data size
fn read_len(data: &[u8], pos: usize) -> Result<usize, SdkError> {
    let value = U256::from_big_endian(read_word(data, pos)?);
    if value > U256::from(data.len()) {
        return Err(SdkError::AbiDecode(format!(
            "Length or offset {} exceeds data size {}",
            value,
            data.len()
        )));
    }
    Ok(value.as_usize())
}

fn read_bytes(data: &[u8]) -> Result<&[u8], SdkError> {
    let len = read_len(data, 0)?;
    data.get(32..32 + len).ok_or_else(|| short(32 + len, data.len()))
}

fn short(required: usize, have: usize) -> SdkError {
    SdkError::AbiDecode(format!(
        "Insufficient data: need {} bytes, have {}",
        required, have
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::encode;

    #[test]
    fn test_decode_address() {
        let addr = Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d").unwrap();
        let mut encoded = [0u8; 32];
        encoded[12..32].copy_from_slice(addr.as_bytes());

        let tokens = decode(&[ParamType::Address], &encoded).unwrap();
        assert_eq!(tokens, vec![Token::Address(addr)]);
    }

    #[test]
    fn test_decode_negative_int() {
        let tokens = decode(&[ParamType::Int(256)], &[0xff; 32]).unwrap();
        match &tokens[0] {
            Token::Int(v) => assert_eq!(v.to_i128(), Some(-1)),
            other => panic!("unexpected token {:?}", other),
        }
    }

    #[test]
    fn test_decode_string_output() {
        // name() returning "Token"
        let mut data = vec![0u8; 96];
        data[31] = 32;
        data[63] = 5;
        data[64..69].copy_from_slice(b"Token");

        let tokens = decode(&[ParamType::String], &data).unwrap();
        assert_eq!(tokens[0].as_str(), Some("Token"));
    }

    #[test]
    fn test_decode_nested_dynamic() {
        let types = vec![
            ParamType::Uint(256),
            ParamType::Array(Box::new(ParamType::String)),
            ParamType::Tuple(vec![ParamType::Bool, ParamType::Bytes]),
        ];
        let tokens = vec![
            Token::uint(42),
            Token::Array(vec![Token::string("a"), Token::string("bcd")]),
            Token::Tuple(vec![Token::Bool(true), Token::Bytes(vec![9; 40])]),
        ];
        let data = encode(&types, &tokens).unwrap();
        assert_eq!(decode(&types, &data).unwrap(), tokens);
    }

    #[test]
    fn test_decode_insufficient_data() {
        let err = decode(&[ParamType::Uint(256)], &[0u8; 16]).unwrap_err();
        assert!(matches!(err, SdkError::AbiDecode(_)));
    }

    #[test]
    fn test_decode_rejects_oversized_offset() {
        let mut data = vec![0u8; 64];
        data[0] = 0xff;
        assert!(decode(&[ParamType::Bytes], &data).is_err());
    }

    #[test]
    fn test_decode_rejects_bad_bool() {
        let mut data = [0u8; 32];
        data[31] = 2;
        assert!(decode(&[ParamType::Bool], &data).is_err());
    }
}
