use thiserror::Error;

/// Result alias used across the keyring crate.
pub type Result<T> = std::result::Result<T, KeyringError>;

/// Error type for key derivation, codec and keyring operations.
///
/// No variant ever carries key material. `DecryptionFailed` is deliberately
/// opaque: wrong password, corrupt keystore and MAC mismatch look the same.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyringError {
    /// Input buffer has the wrong size.
    #[error("Invalid input length: expected {expected}, got {actual}")]
    InvalidInputLength { expected: usize, actual: usize },

    /// Seed outside the accepted 16..=64 byte range.
    #[error("Invalid seed length: {0}")]
    InvalidSeedLength(usize),

    /// Seed expands to an unusable master key.
    #[error("Seed produced an invalid master key")]
    InvalidSeed,

    /// Derivation path string failed to parse.
    #[error("Invalid derivation path")]
    InvalidPath,

    /// Child index outside the 31-bit range.
    #[error("Invalid child index: {0}")]
    InvalidChildIndex(u32),

    /// Hardened child requested from a public-only node.
    #[error("Cannot derive a hardened child from a public key")]
    PublicDerivationOfHardenedChild,

    /// Operation requires a private key the node does not hold.
    #[error("Private key unavailable")]
    PrivateKeyUnavailable,

    /// Private key bytes are not a valid scalar for the curve.
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Public key bytes do not decode to a curve point.
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Public key buffer has an unsupported length.
    #[error("Invalid public key length: {0}")]
    InvalidPublicKeyLength(usize),

    /// Base58 text contains a character outside the alphabet.
    #[error("Invalid base58 character {character:?} at index {index}")]
    InvalidCharacter { character: char, index: usize },

    /// Decoded payload has the wrong size.
    #[error("Decoded length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Trailing checksum does not match the payload.
    #[error("Checksum mismatch")]
    ChecksumMismatch,

    /// Extended key version magic is unknown or not valid for the operation.
    #[error("Unrecognized extended key version: {0:#010x}")]
    UnrecognizedVersion(u32),

    /// Extended key payload is structurally inconsistent.
    #[error("Invalid extended key: {0}")]
    InvalidExtendedKey(&'static str),

    /// SS58 prefix above the 14-bit range.
    #[error("Invalid SS58 prefix: {0}")]
    InvalidSs58Prefix(u16),

    /// SS58 first byte uses a reserved prefix encoding.
    #[error("Unsupported SS58 prefix encoding")]
    UnsupportedSs58Prefix,

    /// Keystore could not be decrypted.
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Address or index is not managed by the keyring.
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    /// Address is already present in the keyring.
    #[error("Account already exists: {0}")]
    DuplicateAccount(String),

    /// Keyring has no root key yet.
    #[error("Keyring is locked")]
    KeyringLocked,

    /// Account index that this keyring variant refuses to derive.
    #[error("Unsupported account index: {0}")]
    UnsupportedAccountIndex(u32),

    /// Program derived address candidate lies on the ed25519 curve.
    #[error("Derived address lies on the ed25519 curve")]
    AddressOnCurve,

    /// No bump seed in 255..=0 produced an off-curve address.
    #[error("No viable bump seed")]
    NoViableBumpSeed,

    /// Too many seeds or a seed longer than 32 bytes.
    #[error("Seed or account limit exceeded")]
    SeedOrAccountLimitExceeded,

    /// Signature bytes could not be produced or parsed.
    #[error("Signature failed")]
    SignatureFailed,

    /// Configuration rejected by validation.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl KeyringError {
    /// True for the keystore failure the UI may report as a wrong password.
    pub fn is_decryption_failure(&self) -> bool {
        matches!(self, KeyringError::DecryptionFailed)
    }

    /// True for errors raised by the text codecs.
    pub fn is_codec_error(&self) -> bool {
        matches!(
            self,
            KeyringError::InvalidCharacter { .. }
                | KeyringError::LengthMismatch { .. }
                | KeyringError::ChecksumMismatch
                | KeyringError::InvalidSs58Prefix(_)
                | KeyringError::UnsupportedSs58Prefix
        )
    }

    /// Message safe to show to an end user.
    pub fn user_facing_message(&self) -> &'static str {
        match self {
            KeyringError::DecryptionFailed => "Wrong password",
            _ => "Operation failed",
        }
    }
}

impl From<toml::de::Error> for KeyringError {
    fn from(err: toml::de::Error) -> Self {
        KeyringError::ConfigError(err.to_string())
    }
}
