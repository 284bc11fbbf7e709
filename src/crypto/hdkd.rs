//! Hardened-only key derivation for the ed25519 and sr25519 families.
//!
//! * [`Ed25519HdNode`]: SLIP-0010 ed25519 tree (`"ed25519 seed"`), used by
//!   Solana style keyrings. Only hardened children exist on this curve.
//! * [`DeriveJunction`]: Substrate `//hard` junctions. The junction id is the
//!   SCALE encoding of the junction data, zero padded to 32 bytes or
//!   Blake2b-256 hashed when longer.
//! * [`substrate_ed25519_derive_hard`] / [`sr25519_derive_hard`]: the two
//!   Substrate hard derivation functions.

use std::fmt;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ed25519_dalek::{SigningKey, VerifyingKey};
use hmac::{Hmac, Mac};
use schnorrkel::derive::ChainCode;
use schnorrkel::{ExpansionMode, Keypair as Sr25519Keypair, MiniSecretKey};
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::core::derivation_path::{ChildNumber, DerivationPath, HARDENED_OFFSET};
use crate::core::errors::{KeyringError, Result};
use crate::security::SecretBytes;

type HmacSha512 = Hmac<Sha512>;

fn finalize_wide(mac: HmacSha512) -> Zeroizing<[u8; 64]> {
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

type Blake2b256 = Blake2b<U32>;

const ED25519_CURVE_SEED: &[u8] = b"ed25519 seed";
const SUBSTRATE_ED25519_HDKD: &str = "Ed25519HDKD";
pub const JUNCTION_ID_LEN: usize = 32;

/// Blake2b with a 32-byte digest.
pub fn blake2_256(data: &[u8]) -> [u8; 32] {
    Blake2b256::digest(data).into()
}

/// SCALE compact encoding of an unsigned integer.
pub fn scale_compact(value: u64, out: &mut Vec<u8>) {
    match value {
        0..=0x3f => out.push((value as u8) << 2),
        0x40..=0x3fff => out.extend_from_slice(&(((value as u16) << 2) | 0b01).to_le_bytes()),
        0x4000..=0x3fff_ffff => out.extend_from_slice(&(((value as u32) << 2) | 0b10).to_le_bytes()),
        _ => {
            let bytes = value.to_le_bytes();
            let used = 8 - (value.leading_zeros() / 8) as usize;
            out.push((((used - 4) as u8) << 2) | 0b11);
            out.extend_from_slice(&bytes[..used]);
        }
    }
}

/// SCALE encoding of a byte string: compact length then the bytes.
pub fn scale_bytes(data: &[u8], out: &mut Vec<u8>) {
    scale_compact(data.len() as u64, out);
    out.extend_from_slice(data);
}

/// A Substrate hard junction (`//label` or `//index`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeriveJunction([u8; JUNCTION_ID_LEN]);

impl DeriveJunction {
    /// Junction from already SCALE encoded data.
    pub fn hard_from_encoded(encoded: &[u8]) -> Self {
        if encoded.len() > JUNCTION_ID_LEN {
            return Self(blake2_256(encoded));
        }
        let mut id = [0u8; JUNCTION_ID_LEN];
        id[..encoded.len()].copy_from_slice(encoded);
        Self(id)
    }

    /// `//label`, encoded as a SCALE string.
    pub fn hard_from_label(label: &str) -> Self {
        let mut encoded = Vec::with_capacity(label.len() + 4);
        scale_bytes(label.as_bytes(), &mut encoded);
        Self::hard_from_encoded(&encoded)
    }

    /// `//index`, encoded as a SCALE `u64`.
    pub fn hard_from_index(index: u64) -> Self {
        Self::hard_from_encoded(&index.to_le_bytes())
    }

    pub fn chain_code(&self) -> [u8; JUNCTION_ID_LEN] {
        self.0
    }
}

impl fmt::Debug for DeriveJunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeriveJunction({})", hex::encode(self.0))
    }
}

/// sr25519 keypair from a 32-byte mini secret, Ed25519 expansion mode.
pub fn sr25519_from_seed(seed: &[u8]) -> Result<Sr25519Keypair> {
    let mini = MiniSecretKey::from_bytes(seed).map_err(|_| KeyringError::InvalidInputLength {
        expected: 32,
        actual: seed.len(),
    })?;
    Ok(mini.expand_to_keypair(ExpansionMode::Ed25519))
}

/// sr25519 hard derivation along one junction.
pub fn sr25519_derive_hard(parent: &Sr25519Keypair, junction: &DeriveJunction) -> Sr25519Keypair {
    let (mini, _) = parent
        .secret
        .hard_derive_mini_secret_key(Some(ChainCode(junction.chain_code())), b"");
    mini.expand_to_keypair(ExpansionMode::Ed25519)
}

/// Substrate ed25519 hard derivation:
/// `Blake2b-256(SCALE(("Ed25519HDKD", seed, chain_code)))`.
pub fn substrate_ed25519_derive_hard(seed: &SecretBytes<32>, junction: &DeriveJunction) -> SecretBytes<32> {
    let mut preimage = Zeroizing::new(Vec::with_capacity(12 + 64));
    scale_bytes(SUBSTRATE_ED25519_HDKD.as_bytes(), &mut preimage);
    seed.with_secret(|bytes| preimage.extend_from_slice(bytes));
    preimage.extend_from_slice(&junction.chain_code());
    SecretBytes::new(blake2_256(&preimage))
}

/// SLIP-0010 ed25519 node. Children are hardened only.
#[derive(Clone)]
pub struct Ed25519HdNode {
    private_key: SecretBytes<32>,
    chain_code: SecretBytes<32>,
    depth: u8,
    path: String,
}

impl Ed25519HdNode {
    /// Master node from a 16..=64 byte seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        if !(16..=64).contains(&seed.len()) {
            return Err(KeyringError::InvalidSeedLength(seed.len()));
        }
        let mut mac = HmacSha512::new_from_slice(ED25519_CURVE_SEED).map_err(|_| KeyringError::InvalidSeed)?;
        mac.update(seed);
        Self::from_digest(mac, 0, "m".to_string())
    }

    fn from_digest(mac: HmacSha512, depth: u8, path: String) -> Result<Self> {
        let digest = finalize_wide(mac);
        Ok(Self {
            private_key: SecretBytes::try_from_slice(&digest[..32])?,
            chain_code: SecretBytes::try_from_slice(&digest[32..])?,
            depth,
            path,
        })
    }

    pub fn derive_hardened_child(&self, index: u32) -> Result<Self> {
        if index >= HARDENED_OFFSET {
            return Err(KeyringError::InvalidChildIndex(index));
        }
        let mut mac =
            HmacSha512::new_from_slice(self.chain_code.expose()).map_err(|_| KeyringError::InvalidSeed)?;
        mac.update(&[0x00]);
        self.private_key.with_secret(|bytes| mac.update(bytes));
        mac.update(&(index | HARDENED_OFFSET).to_be_bytes());
        let depth = self.depth.checked_add(1).ok_or(KeyringError::InvalidPath)?;
        Self::from_digest(mac, depth, format!("{}/{}'", self.path, index))
    }

    /// Follow a fully hardened `m/...` path from this node.
    pub fn derive_from_path(&self, path: &str) -> Result<Self> {
        let parsed = DerivationPath::parse(path)?;
        self.derive_along(&parsed)
    }

    pub(crate) fn derive_along(&self, path: &DerivationPath) -> Result<Self> {
        let mut node = self.clone();
        for child in path.children() {
            match child {
                ChildNumber::Hardened(index) => node = node.derive_hardened_child(*index)?,
                ChildNumber::Normal(_) => return Err(KeyringError::InvalidPath),
            }
        }
        Ok(node)
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn chain_code(&self) -> [u8; 32] {
        *self.chain_code.expose()
    }

    pub fn signing_key(&self) -> SigningKey {
        self.private_key.with_secret(SigningKey::from_bytes)
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.verifying_key().to_bytes()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key().verifying_key()
    }
}

impl fmt::Debug for Ed25519HdNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519HdNode")
            .field("public_key", &hex::encode(self.public_key()))
            .field("depth", &self.depth)
            .field("path", &self.path)
            .finish()
    }
}
