//! Hex-rendered byte strings

use std::fmt;
use std::ops::Deref;

/// Byte string that the node renders as upper-case hex in JSON
/// (public keys, contract code, query keys).
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct HexBytes(Vec<u8>);

impl HexBytes {
    /// Wrap raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        HexBytes(bytes.into())
    }

    /// Parse from hex (either case, optional 0x prefix)
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(s).map(HexBytes)
    }

    /// Borrow the bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Take the bytes
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for HexBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for HexBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(v: Vec<u8>) -> Self {
        HexBytes(v)
    }
}

impl From<&[u8]> for HexBytes {
    fn from(v: &[u8]) -> Self {
        HexBytes(v.to_vec())
    }
}

impl fmt::Debug for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HexBytes({})", hex::encode_upper(&self.0))
    }
}

impl fmt::Display for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(&self.0))
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for HexBytes {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&hex::encode_upper(&self.0))
        }
    }

    impl<'de> Deserialize<'de> for HexBytes {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
            HexBytes::from_hex(&s).map_err(de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_bytes_display() {
        let b = HexBytes::new(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(b.to_string(), "DEADBEEF");
        assert_eq!(b.len(), 4);
    }

    #[test]
    fn test_hex_bytes_parse() {
        assert_eq!(HexBytes::from_hex("0xdeadBEEF").unwrap().as_slice(), &[0xde, 0xad, 0xbe, 0xef]);
        assert!(HexBytes::from_hex("").unwrap().is_empty());
        assert!(HexBytes::from_hex("abc").is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_hex_bytes_null_is_empty() {
        let b: HexBytes = serde_json::from_str("null").unwrap();
        assert!(b.is_empty());
    }
}
