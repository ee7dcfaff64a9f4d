//! ABI encoding and decoding for Solidity contracts
//!
//! This module provides functionality for:
//! - Parsing JSON ABI descriptors from build artifacts
//! - Encoding function calls and constructor arguments
//! - Decoding function return values
//!
//! # Example
//!
//! ```rust
//! use tessera_sdk::abi::{decode, encode, function_selector, ParamType, Token};
//! use tessera_sdk::{Address, U256};
//!
//! let selector = function_selector("transfer(address,uint256)");
//! let args = encode(
//!     &[ParamType::Address, ParamType::Uint(256)],
//!     &[Token::Address(Address::ZERO), Token::Uint(U256::from(1000u64))],
//! )
//! .unwrap();
//! assert_eq!(args.len(), 64);
//!
//! let balance = decode(&[ParamType::Uint(256)], &[0u8; 32]).unwrap();
//! assert_eq!(balance, vec![Token::Uint(U256::zero())]);
//! # let _ = selector;
//! ```

mod decode;
mod descriptor;
mod encode;
mod types;

pub use decode::decode;
pub use descriptor::{Abi, Constructor, Function, Param};
pub use encode::{encode, encode_function_call, function_selector};
pub use types::{parse_type, ParamType, Token, I256};
