//! # tessera-crypto
//!
//! Cryptographic primitives for the Tessera client.
//!
//! - Keccak-256 and SHA-256 hashing
//! - ECDSA signing/verification over secp256k1 (low-s normalized)
//! - Public key recovery
//! - Address derivation

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod hash;
mod signature;

pub use error::CryptoError;
pub use hash::{keccak256, sha256};
pub use signature::{
    compressed_public_key, public_key_from_bytes, public_key_to_address, recover_public_key,
    sign, verify, PrivateKey, PublicKey, Signature,
};
