//! Per-chain-family keyrings and Solana program derived addresses.

pub mod bip32_keyring;
pub mod pda;
pub mod polkadot;
pub mod solana;
pub mod substrate;
pub mod traits;

pub use bip32_keyring::{Bip32Coin, Bip32Keyring};
pub use pda::ProgramDerivedAddress;
pub use polkadot::PolkadotKeyring;
pub use solana::SolanaKeyring;
pub use substrate::SubstrateKeyring;
pub use traits::{ChainKeyring, Keyring};
