//! ABI type definitions

use std::fmt;

use tessera_primitives::{Address, H256, U256};

use crate::SdkError;

/// A decoded or to-be-encoded ABI value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Address (20 bytes)
    Address(Address),
    /// Unsigned integer (8-256 bits)
    Uint(U256),
    /// Signed integer (8-256 bits)
    Int(I256),
    /// Boolean
    Bool(bool),
    /// Dynamic bytes
    Bytes(Vec<u8>),
    /// Fixed-size bytes (1-32)
    FixedBytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Dynamic array
    Array(Vec<Token>),
    /// Fixed-size array
    FixedArray(Vec<Token>),
    /// Tuple (struct)
    Tuple(Vec<Token>),
}

/// Signed 256-bit integer stored as its two's complement bit pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct I256(U256);

impl I256 {
    /// Wrap a raw two's complement word
    pub fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// The raw two's complement word
    pub fn into_raw(self) -> U256 {
        self.0
    }

    /// Convert from i128
    pub fn from_i128(value: i128) -> Self {
        if value >= 0 {
            Self(U256::from(value as u128))
        } else {
            // !(|v| - 1), written so that i128::MIN does not overflow
            Self(U256::MAX - U256::from((-(value + 1)) as u128))
        }
    }

    /// Convert to i128 if the value fits
    pub fn to_i128(&self) -> Option<i128> {
        if self.is_negative() {
            let magnitude_minus_one = U256::MAX - self.0;
            if magnitude_minus_one > U256::from(i128::MAX as u128) {
                return None;
            }
            Some(-(magnitude_minus_one.as_u128() as i128) - 1)
        } else if self.0 > U256::from(i128::MAX as u128) {
            None
        } else {
            Some(self.0.as_u128() as i128)
        }
    }

    /// Sign bit set
    pub fn is_negative(&self) -> bool {
        self.0.bit(255)
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

/// Solidity parameter types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// Address
    Address,
    /// Unsigned integer with bit size (8, 16, ..., 256)
    Uint(usize),
    /// Signed integer with bit size
    Int(usize),
    /// Boolean
    Bool,
    /// Dynamic bytes
    Bytes,
    /// Fixed-size bytes (size 1-32)
    FixedBytes(usize),
    /// UTF-8 string
    String,
    /// Dynamic array
    Array(Box<ParamType>),
    /// Fixed-size array
    FixedArray(Box<ParamType>, usize),
    /// Tuple
    Tuple(Vec<ParamType>),
}

impl ParamType {
    /// Check if this type is dynamic (variable length)
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::Bytes | ParamType::String | ParamType::Array(_) => true,
            ParamType::FixedArray(inner, _) => inner.is_dynamic(),
            ParamType::Tuple(types) => types.iter().any(|t| t.is_dynamic()),
            _ => false,
        }
    }

    /// Bytes this type occupies in the head of an enclosing tuple
    pub(crate) fn head_len(&self) -> usize {
        if self.is_dynamic() {
            return 32;
        }
        match self {
            ParamType::FixedArray(inner, size) => inner.head_len() * size,
            ParamType::Tuple(types) => types.iter().map(ParamType::head_len).sum(),
            _ => 32,
        }
    }

    /// Whether `token` is a value of this type
    pub fn matches(&self, token: &Token) -> bool {
        match (self, token) {
            (ParamType::Address, Token::Address(_))
            | (ParamType::Uint(_), Token::Uint(_))
            | (ParamType::Int(_), Token::Int(_))
            | (ParamType::Bool, Token::Bool(_))
            | (ParamType::Bytes, Token::Bytes(_))
            | (ParamType::String, Token::String(_)) => true,
            (ParamType::FixedBytes(size), Token::FixedBytes(b)) => b.len() == *size,
            (ParamType::Array(inner), Token::Array(items)) => items.iter().all(|t| inner.matches(t)),
            (ParamType::FixedArray(inner, size), Token::FixedArray(items)) => {
                items.len() == *size && items.iter().all(|t| inner.matches(t))
            }
            (ParamType::Tuple(types), Token::Tuple(items)) => {
                types.len() == items.len() && types.iter().zip(items).all(|(p, t)| p.matches(t))
            }
            _ => false,
        }
    }
}

/// Canonical type name, as used in function signatures
impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Address => write!(f, "address"),
            ParamType::Uint(bits) => write!(f, "uint{}", bits),
            ParamType::Int(bits) => write!(f, "int{}", bits),
            ParamType::Bool => write!(f, "bool"),
            ParamType::Bytes => write!(f, "bytes"),
            ParamType::FixedBytes(size) => write!(f, "bytes{}", size),
            ParamType::String => write!(f, "string"),
            ParamType::Array(inner) => write!(f, "{}[]", inner),
            ParamType::FixedArray(inner, size) => write!(f, "{}[{}]", inner, size),
            ParamType::Tuple(types) => {
                write!(f, "(")?;
                for (i, t) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Parse a type name such as `uint256`, `address[]` or `bytes32[4]`.
///
/// Tuples are not written inline in ABI descriptors; `components` carry them,
/// so pass the already parsed members as `components` for a `tuple` type.
pub fn parse_type(s: &str, components: Option<Vec<ParamType>>) -> Result<ParamType, SdkError> {
    let s = s.trim();

    if let Some(stripped) = s.strip_suffix(']') {
        let open = stripped
            .rfind('[')
            .ok_or_else(|| SdkError::AbiEncode(format!("Unbalanced brackets in type: {}", s)))?;
        let inner = parse_type(&stripped[..open], components)?;
        let size = &stripped[open + 1..];
        if size.is_empty() {
            return Ok(ParamType::Array(Box::new(inner)));
        }
        let size: usize = size
            .parse()
            .map_err(|_| SdkError::AbiEncode(format!("Invalid array size: {}", size)))?;
        return Ok(ParamType::FixedArray(Box::new(inner), size));
    }

    match s {
        "address" => return Ok(ParamType::Address),
        "bool" => return Ok(ParamType::Bool),
        "string" => return Ok(ParamType::String),
        "bytes" => return Ok(ParamType::Bytes),
        "tuple" => {
            return components
                .map(ParamType::Tuple)
                .ok_or_else(|| SdkError::AbiEncode("tuple without components".to_string()))
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("uint") {
        return Ok(ParamType::Uint(int_bits(rest)?));
    }
    if let Some(rest) = s.strip_prefix("int") {
        return Ok(ParamType::Int(int_bits(rest)?));
    }
    if let Some(rest) = s.strip_prefix("bytes") {
        let size: usize = rest
            .parse()
            .map_err(|_| SdkError::AbiEncode(format!("Invalid bytes size: {}", rest)))?;
        if size == 0 || size > 32 {
            return Err(SdkError::AbiEncode(format!("Invalid bytes size: {}", size)));
        }
        return Ok(ParamType::FixedBytes(size));
    }

    Err(SdkError::AbiEncode(format!("Unknown type: {}", s)))
}

fn int_bits(rest: &str) -> Result<usize, SdkError> {
    if rest.is_empty() {
        return Ok(256);
    }
    let bits: usize = rest
        .parse()
        .map_err(|_| SdkError::AbiEncode(format!("Invalid integer size: {}", rest)))?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(SdkError::AbiEncode(format!("Invalid integer size: {}", bits)));
    }
    Ok(bits)
}

impl Token {
    /// Create a uint256 from u128
    pub fn uint(value: u128) -> Self {
        Token::Uint(U256::from(value))
    }

    /// Create an int256 from i128
    pub fn int(value: i128) -> Self {
        Token::Int(I256::from_i128(value))
    }

    /// Create a string token
    pub fn string(s: impl Into<String>) -> Self {
        Token::String(s.into())
    }

    /// Create a bytes32 token
    pub fn bytes32(data: H256) -> Self {
        Token::FixedBytes(data.as_bytes().to_vec())
    }

    /// The address, if this is an address token
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Token::Address(a) => Some(*a),
            _ => None,
        }
    }

    /// The value, if this is a uint token
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Token::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// The value, if this is a bool token
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Token::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value, if this is a string token
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Token::String(s) => Some(s),
            _ => None,
        }
    }
}
