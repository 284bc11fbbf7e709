pub mod bip32;
pub mod config;
pub mod derivation_path;
pub mod errors;
pub mod keystore;

pub use bip32::{ExtendedKeyVersion, HdKeyNode, WifKey};
pub use config::KeyringConfig;
pub use derivation_path::{ChildNumber, DerivationPath, HARDENED_OFFSET};
pub use errors::{KeyringError, Result};
pub use keystore::{generate_from_v3_utc, generate_from_v3_utc_with_limits};
