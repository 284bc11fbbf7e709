//! Text encodings: Base58/Base58Check, SS58 and per-chain display addresses.

pub mod address;
pub mod base58;
pub mod ss58;

pub use ss58::Ss58Address;
