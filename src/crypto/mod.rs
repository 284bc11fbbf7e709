pub mod hdkd;
pub mod kdf;

pub use self::hdkd::{DeriveJunction, Ed25519HdNode};
pub use self::kdf::{KdfAlgorithm, KdfLimits, KeyDerivation};
