#![allow(clippy::needless_range_loop)]
#![allow(clippy::len_zero)]
// src/lib.rs
//! Multi-chain HD key derivation and address encoding.
//!
//! Seed bytes in, keyrings and display addresses out. Covers BIP32 on
//! secp256k1, SLIP-0010 ed25519, Substrate sr25519/ed25519 hard derivation,
//! Base58Check, WIF, SS58 and Solana program derived addresses.

pub mod core;
pub mod crypto;
pub mod encoding;
pub mod keyring;
pub mod security;

pub use crate::core::{HdKeyNode, KeyringConfig, KeyringError, Result};
pub use crate::keyring::{ChainKeyring, Keyring};
