//! SDK error types

use thiserror::Error;

/// Coarse failure class, for callers that only need to know what went wrong
/// at the level of "retry", "fix the request" or "unlock the wallet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection or HTTP failure
    Transport,
    /// The node answered with a JSON-RPC level error
    Protocol,
    /// The node processed the request and rejected it with a non-zero code
    Application,
    /// A response could not be decoded into the expected shape
    Decode,
    /// The object is in the wrong state for the operation
    State,
    /// Wrong secret or locked key
    Authentication,
}

/// SDK error type
#[derive(Debug, Error)]
pub enum SdkError {
    /// Transport/network error
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON-RPC error object returned by the node
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Non-zero result code from the node
    #[error("Application error: code {code}: {log}")]
    Application {
        /// Result code
        code: u32,
        /// Log message accompanying the code
        log: String,
    },

    /// Response decoding error
    #[error("Decode error: {0}")]
    Decode(String),

    /// Operation not valid in the current state
    #[error("Invalid state: {0}")]
    State(String),

    /// Wallet locked or wrong secret
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Invalid address format
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid private key
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Signing failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// ABI encoding error
    #[error("ABI encoding error: {0}")]
    AbiEncode(String),

    /// ABI decoding error
    #[error("ABI decoding error: {0}")]
    AbiDecode(String),

    /// Invalid hex string
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Malformed key file
    #[error("Keystore error: {0}")]
    Keystore(String),

    /// Bad configuration
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SdkError {
    /// Failure class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SdkError::Transport(_) | SdkError::Io(_) => ErrorKind::Transport,
            SdkError::Protocol(_) => ErrorKind::Protocol,
            SdkError::Application { .. } => ErrorKind::Application,
            SdkError::Decode(_)
            | SdkError::AbiDecode(_)
            | SdkError::InvalidHex(_)
            | SdkError::Keystore(_) => ErrorKind::Decode,
            SdkError::Authentication(_) => ErrorKind::Authentication,
            SdkError::State(_)
            | SdkError::InvalidAddress(_)
            | SdkError::InvalidPrivateKey(_)
            | SdkError::Signing(_)
            | SdkError::AbiEncode(_)
            | SdkError::Config(_) => ErrorKind::State,
        }
    }

    /// Whether the failure happened before the node saw the request
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}

impl From<hex::FromHexError> for SdkError {
    fn from(e: hex::FromHexError) -> Self {
        SdkError::InvalidHex(e.to_string())
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(e: serde_json::Error) -> Self {
        SdkError::Decode(e.to_string())
    }
}

impl From<base64::DecodeError> for SdkError {
    fn from(e: base64::DecodeError) -> Self {
        SdkError::Decode(format!("base64: {}", e))
    }
}

impl From<tessera_crypto::CryptoError> for SdkError {
    fn from(e: tessera_crypto::CryptoError) -> Self {
        SdkError::Signing(e.to_string())
    }
}

impl From<tessera_types::CodecError> for SdkError {
    fn from(e: tessera_types::CodecError) -> Self {
        match e {
            tessera_types::CodecError::EmptyChainId | tessera_types::CodecError::AlreadySigned => {
                SdkError::State(e.to_string())
            }
            other => SdkError::Decode(other.to_string()),
        }
    }
}

impl From<tessera_primitives::PrimitiveError> for SdkError {
    fn from(e: tessera_primitives::PrimitiveError) -> Self {
        SdkError::InvalidAddress(e.to_string())
    }
}

impl From<tessera_primitives::AddressError> for SdkError {
    fn from(e: tessera_primitives::AddressError) -> Self {
        SdkError::InvalidAddress(e.to_string())
    }
}

impl From<tessera_primitives::AmountError> for SdkError {
    fn from(e: tessera_primitives::AmountError) -> Self {
        SdkError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(SdkError::Transport("x".into()).kind(), ErrorKind::Transport);
        assert_eq!(
            SdkError::Application { code: 7, log: "nope".into() }.kind(),
            ErrorKind::Application
        );
        assert_eq!(SdkError::Authentication("locked".into()).kind(), ErrorKind::Authentication);
        assert_eq!(SdkError::State("no address".into()).kind(), ErrorKind::State);
    }

    #[test]
    fn test_application_display_carries_log() {
        let e = SdkError::Application { code: 12, log: "insufficient fund".into() };
        assert_eq!(e.to_string(), "Application error: code 12: insufficient fund");
    }

    #[test]
    fn test_json_error_is_decode() {
        let err = serde_json::from_str::<u64>("\"x\"").unwrap_err();
        assert_eq!(SdkError::from(err).kind(), ErrorKind::Decode);
    }
}
