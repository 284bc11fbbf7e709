//! BIP32 HD key tree over secp256k1
//!
//! Implements standard BIP32 Hierarchical Deterministic key nodes:
//! - seed expansion with HMAC-SHA512("Bitcoin seed", seed)
//! - normal and hardened child derivation (CKDpriv / CKDpub)
//! - extended key serialization (xprv/xpub and the SLIP-0132 variants)
//! - WIF import/export
//! - compact (recoverable) and DER ECDSA signatures
//!
//! Nodes are immutable; every derivation returns a new node.

use std::fmt;

use bitcoin::hashes::{hash160, Hash};
use hmac::{Hmac, Mac};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use secp256k1::{Message, PublicKey, Scalar, Secp256k1, SecretKey};
use sha2::Sha512;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::core::derivation_path::{ChildNumber, DerivationPath, HARDENED_OFFSET};
use crate::core::errors::{KeyringError, Result};
use crate::encoding::base58;
use crate::security::SecretBytes;

type HmacSha512 = Hmac<Sha512>;

fn finalize_wide(mac: HmacSha512) -> Zeroizing<[u8; 64]> {
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

const MASTER_SECRET: &[u8] = b"Bitcoin seed";
/// Serialized extended key length before the Base58Check checksum.
pub const EXTENDED_KEY_LEN: usize = 78;
pub const MIN_SEED_LEN: usize = 16;
pub const MAX_SEED_LEN: usize = 64;
const WIF_COMPRESSED_FLAG: u8 = 0x01;

/// Four-byte magic at the head of a serialized extended key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ExtendedKeyVersion {
    /// Mainnet legacy (P2PKH)
    Xprv = 0x0488_ade4,
    Xpub = 0x0488_b21e,
    /// Mainnet nested SegWit (P2WPKH-in-P2SH)
    Yprv = 0x049d_7878,
    Ypub = 0x049d_7cb2,
    /// Mainnet native SegWit (P2WPKH)
    Zprv = 0x04b2_430c,
    Zpub = 0x04b2_4746,
    /// Testnet legacy
    Tprv = 0x0435_8394,
    Tpub = 0x0435_87cf,
    /// Testnet nested SegWit
    Uprv = 0x044a_4e28,
    Upub = 0x044a_5262,
    /// Testnet native SegWit
    Vprv = 0x045f_18bc,
    Vpub = 0x045f_1cf6,
}

impl ExtendedKeyVersion {
    pub fn from_u32(value: u32) -> Result<Self> {
        use ExtendedKeyVersion::*;
        let version = match value {
            0x0488_ade4 => Xprv,
            0x0488_b21e => Xpub,
            0x049d_7878 => Yprv,
            0x049d_7cb2 => Ypub,
            0x04b2_430c => Zprv,
            0x04b2_4746 => Zpub,
            0x0435_8394 => Tprv,
            0x0435_87cf => Tpub,
            0x044a_4e28 => Uprv,
            0x044a_5262 => Upub,
            0x045f_18bc => Vprv,
            0x045f_1cf6 => Vpub,
            other => return Err(KeyringError::UnrecognizedVersion(other)),
        };
        Ok(version)
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn is_private(self) -> bool {
        use ExtendedKeyVersion::*;
        matches!(self, Xprv | Yprv | Zprv | Tprv | Uprv | Vprv)
    }

    pub fn is_testnet(self) -> bool {
        use ExtendedKeyVersion::*;
        matches!(self, Tprv | Tpub | Uprv | Upub | Vprv | Vpub)
    }

    /// Public counterpart of a private version (identity for public ones).
    pub fn to_public(self) -> Self {
        use ExtendedKeyVersion::*;
        match self {
            Xprv => Xpub,
            Yprv => Ypub,
            Zprv => Zpub,
            Tprv => Tpub,
            Uprv => Upub,
            Vprv => Vpub,
            public => public,
        }
    }
}

/// Result of parsing a WIF string.
#[derive(Debug, Clone)]
pub struct WifKey {
    pub version: u8,
    pub compressed: bool,
    pub node: HdKeyNode,
}

/// Immutable BIP32 node.
#[derive(Clone)]
pub struct HdKeyNode {
    private_key: Option<SecretBytes<32>>,
    public_key: PublicKey,
    chain_code: SecretBytes<32>,
    depth: u8,
    parent_fingerprint: u32,
    child_index: u32,
    path: String,
}

impl HdKeyNode {
    /// Master node from a 16..=64 byte seed.
    pub fn generate_from_seed(seed: &[u8]) -> Result<Self> {
        if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&seed.len()) {
            return Err(KeyringError::InvalidSeedLength(seed.len()));
        }

        let mut mac = HmacSha512::new_from_slice(MASTER_SECRET)
            .map_err(|_| KeyringError::InvalidSeed)?;
        mac.update(seed);
        let digest = finalize_wide(mac);

        let secret = SecretKey::from_slice(&digest[..32]).map_err(|_| KeyringError::InvalidSeed)?;
        let chain_code = SecretBytes::try_from_slice(&digest[32..])?;
        debug!("generated BIP32 master node");
        Ok(Self::from_parts(secret, chain_code, 0, 0, 0, "m".to_string()))
    }

    /// Signing-only node around a raw 32-byte private key.
    pub fn generate_from_private_key(private_key: &[u8]) -> Result<Self> {
        if private_key.len() != 32 {
            return Err(KeyringError::InvalidInputLength {
                expected: 32,
                actual: private_key.len(),
            });
        }
        let secret = SecretKey::from_slice(private_key).map_err(|_| KeyringError::InvalidPrivateKey)?;
        Ok(Self::from_parts(
            secret,
            SecretBytes::new([0u8; 32]),
            0,
            0,
            0,
            String::new(),
        ))
    }

    /// Takes ownership of `secret` and wipes it once copied into the node.
    fn from_parts(
        mut secret: SecretKey,
        chain_code: SecretBytes<32>,
        depth: u8,
        parent_fingerprint: u32,
        child_index: u32,
        path: String,
    ) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret);
        let private_key = SecretBytes::new(secret.secret_bytes());
        secret.non_secure_erase();
        Self {
            private_key: Some(private_key),
            public_key,
            chain_code,
            depth,
            parent_fingerprint,
            child_index,
            path,
        }
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn parent_fingerprint(&self) -> u32 {
        self.parent_fingerprint
    }

    /// Wire child index, hardened bit included.
    pub fn child_index(&self) -> u32 {
        self.child_index
    }

    /// Display path such as `m/44'/0'/0'`; empty when lineage is unknown.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// 33-byte compressed public key.
    pub fn public_key(&self) -> [u8; 33] {
        self.public_key.serialize()
    }

    /// 65-byte uncompressed public key.
    pub fn uncompressed_public_key(&self) -> [u8; 65] {
        self.public_key.serialize_uncompressed()
    }

    pub fn chain_code(&self) -> [u8; 32] {
        *self.chain_code.expose()
    }

    /// HASH160 of the compressed public key.
    pub fn identifier(&self) -> [u8; 20] {
        hash160::Hash::hash(&self.public_key.serialize()).to_byte_array()
    }

    /// First four bytes of the identifier, big endian.
    pub fn fingerprint(&self) -> u32 {
        let id = self.identifier();
        u32::from_be_bytes([id[0], id[1], id[2], id[3]])
    }

    /// Public-only copy of this node.
    pub fn neuter(&self) -> Self {
        Self {
            private_key: None,
            ..self.clone()
        }
    }

    pub(crate) fn secret_key(&self) -> Result<SecretKey> {
        let secret = self.private_key.as_ref().ok_or(KeyringError::PrivateKeyUnavailable)?;
        secret.with_secret(|bytes| SecretKey::from_slice(bytes).map_err(|_| KeyringError::InvalidPrivateKey))
    }

    pub fn derive_normal_child(&self, index: u32) -> Result<Self> {
        self.derive_child(ChildNumber::Normal(index))
    }

    pub fn derive_hardened_child(&self, index: u32) -> Result<Self> {
        self.derive_child(ChildNumber::Hardened(index))
    }

    /// BIP32 CKD. An index whose tweak is invalid is skipped in favour of
    /// `index + 1`, as BIP32 prescribes.
    pub fn derive_child(&self, child: ChildNumber) -> Result<Self> {
        let hardened = child.is_hardened();
        let mut index = child.index();
        loop {
            if index >= HARDENED_OFFSET {
                return Err(KeyringError::InvalidChildIndex(index));
            }
            let number = if hardened {
                ChildNumber::Hardened(index)
            } else {
                ChildNumber::Normal(index)
            };
            match self.ckd(number)? {
                Some(node) => return Ok(node),
                None => {
                    warn!("BIP32 child {} produced an invalid key, skipping to next index", number);
                    index += 1;
                }
            }
        }
    }

    /// Returns `Ok(None)` when IL >= n or the derived key is the point at infinity.
    fn ckd(&self, child: ChildNumber) -> Result<Option<Self>> {
        let mut mac = HmacSha512::new_from_slice(self.chain_code.expose())
            .map_err(|_| KeyringError::InvalidSeed)?;
        if child.is_hardened() {
            let secret = self
                .private_key
                .as_ref()
                .ok_or(KeyringError::PublicDerivationOfHardenedChild)?;
            mac.update(&[0x00]);
            secret.with_secret(|bytes| mac.update(bytes));
        } else {
            mac.update(&self.public_key.serialize());
        }
        mac.update(&child.to_u32().to_be_bytes());
        let digest = finalize_wide(mac);

        let mut il = Zeroizing::new([0u8; 32]);
        il.copy_from_slice(&digest[..32]);
        let tweak = match Scalar::from_be_bytes(*il) {
            Ok(tweak) => tweak,
            Err(_) => return Ok(None),
        };
        let chain_code = SecretBytes::try_from_slice(&digest[32..])?;
        let path = if self.path.is_empty() {
            String::new()
        } else {
            format!("{}/{}", self.path, child)
        };
        let depth = self.depth.checked_add(1).ok_or(KeyringError::InvalidPath)?;

        match &self.private_key {
            Some(_) => {
                let mut parent = self.secret_key()?;
                let tweaked = parent.add_tweak(&tweak);
                parent.non_secure_erase();
                let secret = match tweaked {
                    Ok(secret) => secret,
                    Err(_) => return Ok(None),
                };
                Ok(Some(Self::from_parts(
                    secret,
                    chain_code,
                    depth,
                    self.fingerprint(),
                    child.to_u32(),
                    path,
                )))
            }
            None => {
                let secp = Secp256k1::verification_only();
                let public_key = match self.public_key.add_exp_tweak(&secp, &tweak) {
                    Ok(pk) => pk,
                    Err(_) => return Ok(None),
                };
                Ok(Some(Self {
                    private_key: None,
                    public_key,
                    chain_code,
                    depth,
                    parent_fingerprint: self.fingerprint(),
                    child_index: child.to_u32(),
                    path,
                }))
            }
        }
    }

    /// Derive from the master node along `m/...`.
    pub fn derive_child_from_path(&self, path: &str) -> Result<Self> {
        if self.path != "m" {
            debug!("path derivation requested from a non-master node");
            return Err(KeyringError::InvalidPath);
        }
        let parsed = DerivationPath::parse(path)?;
        let mut node = self.clone();
        for child in parsed.children() {
            node = node.derive_child(*child)?;
        }
        Ok(node)
    }

    fn serialize(&self, version: ExtendedKeyVersion, key_data: &[u8; 33]) -> String {
        let mut buf = Zeroizing::new(Vec::with_capacity(EXTENDED_KEY_LEN));
        buf.extend_from_slice(&version.as_u32().to_be_bytes());
        buf.push(self.depth);
        buf.extend_from_slice(&self.parent_fingerprint.to_be_bytes());
        buf.extend_from_slice(&self.child_index.to_be_bytes());
        buf.extend_from_slice(self.chain_code.expose());
        buf.extend_from_slice(key_data);
        base58::encode_with_check(&buf)
    }

    /// Serialize as an extended private key (`xprv`, `zprv`, ...).
    pub fn private_extended_key(&self, version: ExtendedKeyVersion) -> Result<Zeroizing<String>> {
        if !version.is_private() {
            return Err(KeyringError::UnrecognizedVersion(version.as_u32()));
        }
        let secret = self.private_key.as_ref().ok_or(KeyringError::PrivateKeyUnavailable)?;
        let mut key_data = Zeroizing::new([0u8; 33]);
        secret.with_secret(|bytes| key_data[1..].copy_from_slice(bytes));
        Ok(Zeroizing::new(self.serialize(version, &key_data)))
    }

    /// Serialize as an extended public key (`xpub`, `zpub`, ...).
    pub fn public_extended_key(&self, version: ExtendedKeyVersion) -> Result<String> {
        if version.is_private() {
            return Err(KeyringError::UnrecognizedVersion(version.as_u32()));
        }
        Ok(self.serialize(version, &self.public_key.serialize()))
    }

    /// Parse a Base58Check extended key.
    pub fn generate_from_extended_key(text: &str) -> Result<(ExtendedKeyVersion, Self)> {
        let data = Zeroizing::new(base58::decode_with_check(text, EXTENDED_KEY_LEN)?);
        let version = ExtendedKeyVersion::from_u32(u32::from_be_bytes([data[0], data[1], data[2], data[3]]))?;
        let depth = data[4];
        let parent_fingerprint = u32::from_be_bytes([data[5], data[6], data[7], data[8]]);
        let child_index = u32::from_be_bytes([data[9], data[10], data[11], data[12]]);
        if depth == 0 && (parent_fingerprint != 0 || child_index != 0) {
            return Err(KeyringError::InvalidExtendedKey("master key with parent data"));
        }
        let chain_code = SecretBytes::try_from_slice(&data[13..45])?;
        let key_data = &data[45..78];
        let path = if depth == 0 { "m".to_string() } else { String::new() };

        let node = if version.is_private() {
            if key_data[0] != 0x00 {
                return Err(KeyringError::InvalidExtendedKey("private key without zero prefix"));
            }
            let secret = SecretKey::from_slice(&key_data[1..]).map_err(|_| KeyringError::InvalidPrivateKey)?;
            Self::from_parts(secret, chain_code, depth, parent_fingerprint, child_index, path)
        } else {
            let public_key = PublicKey::from_slice(key_data).map_err(|_| KeyringError::InvalidPublicKey)?;
            Self {
                private_key: None,
                public_key,
                chain_code,
                depth,
                parent_fingerprint,
                child_index,
                path,
            }
        };
        Ok((version, node))
    }

    /// Wallet Import Format: `version || key || [0x01] || checksum`.
    pub fn export_wif(&self, version: u8, compressed: bool) -> Result<Zeroizing<String>> {
        let secret = self.private_key.as_ref().ok_or(KeyringError::PrivateKeyUnavailable)?;
        let mut payload = Zeroizing::new(Vec::with_capacity(34));
        payload.push(version);
        secret.with_secret(|bytes| payload.extend_from_slice(bytes));
        if compressed {
            payload.push(WIF_COMPRESSED_FLAG);
        }
        Ok(Zeroizing::new(base58::encode_with_check(&payload)))
    }

    pub fn from_wif(text: &str) -> Result<WifKey> {
        let payload = Zeroizing::new(base58::decode_with_check_up_to(text, 34)?);
        let compressed = match payload.len() {
            33 => false,
            34 if payload[33] == WIF_COMPRESSED_FLAG => true,
            34 => return Err(KeyringError::InvalidPrivateKey),
            other => {
                return Err(KeyringError::LengthMismatch {
                    expected: 34,
                    actual: other,
                })
            }
        };
        let node = Self::generate_from_private_key(&payload[1..33])?;
        Ok(WifKey {
            version: payload[0],
            compressed,
            node,
        })
    }

    fn message(msg_hash: &[u8]) -> Result<Message> {
        if msg_hash.len() != 32 {
            return Err(KeyringError::InvalidInputLength {
                expected: 32,
                actual: msg_hash.len(),
            });
        }
        Message::from_slice(msg_hash).map_err(|_| KeyringError::SignatureFailed)
    }

    /// Recoverable ECDSA signature: 64-byte `r || s` (low-S) plus recovery id.
    pub fn sign_compact(&self, msg_hash: &[u8]) -> Result<([u8; 64], u8)> {
        let message = Self::message(msg_hash)?;
        let mut secret = self.secret_key()?;
        let secp = Secp256k1::signing_only();
        let recoverable = secp.sign_ecdsa_recoverable(&message, &secret);
        secret.non_secure_erase();
        let (recovery_id, signature) = recoverable.serialize_compact();
        Ok((signature, recovery_id.to_i32() as u8))
    }

    /// DER encoded ECDSA signature.
    pub fn sign_der(&self, msg_hash: &[u8]) -> Result<Vec<u8>> {
        let message = Self::message(msg_hash)?;
        let mut secret = self.secret_key()?;
        let secp = Secp256k1::signing_only();
        let signature = secp.sign_ecdsa(&message, &secret);
        secret.non_secure_erase();
        Ok(signature.serialize_der().to_vec())
    }

    /// Verify a 64-byte compact signature against this node's public key.
    pub fn verify(&self, msg_hash: &[u8], signature: &[u8]) -> bool {
        let Ok(message) = Self::message(msg_hash) else {
            return false;
        };
        let Ok(mut signature) = Signature::from_compact(signature) else {
            return false;
        };
        // libsecp256k1 only verifies low-S; accept the malleated twin too.
        signature.normalize_s();
        let secp = Secp256k1::verification_only();
        secp.verify_ecdsa(&message, &signature, &self.public_key).is_ok()
    }

    /// Recover the signer's public key; empty on any malformed input.
    pub fn recover_compact(compressed: bool, msg_hash: &[u8], signature: &[u8], recovery_id: u8) -> Vec<u8> {
        if msg_hash.len() != 32 || signature.len() != 64 || recovery_id > 3 {
            return Vec::new();
        }
        let recovered = RecoveryId::from_i32(recovery_id as i32)
            .and_then(|id| RecoverableSignature::from_compact(signature, id))
            .and_then(|sig| {
                let message = Message::from_slice(msg_hash)?;
                Secp256k1::verification_only().recover_ecdsa(&message, &sig)
            });
        match recovered {
            Ok(pk) if compressed => pk.serialize().to_vec(),
            Ok(pk) => pk.serialize_uncompressed().to_vec(),
            Err(_) => Vec::new(),
        }
    }
}

impl fmt::Debug for HdKeyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HdKeyNode")
            .field("has_private_key", &self.private_key.is_some())
            .field("public_key", &hex::encode(self.public_key.serialize()))
            .field("depth", &self.depth)
            .field("parent_fingerprint", &format_args!("{:#010x}", self.parent_fingerprint))
            .field("child_index", &self.child_index)
            .field("path", &self.path)
            .finish()
    }
}
