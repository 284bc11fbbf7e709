//! V3 UTC/JSON keystore import.
//!
//! Every failure (malformed JSON, unsupported cipher, bad KDF parameters,
//! wrong password, MAC mismatch) is reported as
//! [`KeyringError::DecryptionFailed`] so callers cannot tell them apart.

use aes::cipher::{KeyIvInit, StreamCipher};
use serde::Deserialize;
use sha3::{Digest, Keccak256};
use subtle::ConstantTimeEq;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::core::bip32::HdKeyNode;
use crate::core::errors::{KeyringError, Result};
use crate::crypto::kdf::{KdfLimits, KeyDerivation};

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;

const SUPPORTED_CIPHER: &str = "aes-128-ctr";
const SUPPORTED_PRF: &str = "hmac-sha256";
const DERIVED_KEY_LEN: usize = 32;
const PRIVATE_KEY_LEN: usize = 32;

#[derive(Debug, Deserialize)]
struct V3Keystore {
    #[serde(alias = "Crypto")]
    crypto: CryptoSection,
}

#[derive(Debug, Deserialize)]
struct CryptoSection {
    cipher: String,
    cipherparams: CipherParams,
    ciphertext: String,
    kdf: String,
    kdfparams: serde_json::Value,
    mac: String,
}

#[derive(Debug, Deserialize)]
struct CipherParams {
    iv: String,
}

#[derive(Debug)]
enum KdfSection {
    Scrypt(ScryptParams),
    Pbkdf2(Pbkdf2Params),
}

#[derive(Debug, Deserialize)]
struct ScryptParams {
    dklen: usize,
    n: u64,
    r: u32,
    p: u32,
    salt: String,
}

#[derive(Debug, Deserialize)]
struct Pbkdf2Params {
    dklen: usize,
    c: u32,
    prf: String,
    salt: String,
}

impl KdfSection {
    fn parse(kdf: &str, params: serde_json::Value) -> Result<Self> {
        let section = match kdf {
            "scrypt" => serde_json::from_value(params).map(KdfSection::Scrypt),
            "pbkdf2" => serde_json::from_value(params).map(KdfSection::Pbkdf2),
            _ => {
                debug!("unsupported keystore kdf");
                return Err(KeyringError::DecryptionFailed);
            }
        };
        section.map_err(|_| KeyringError::DecryptionFailed)
    }

    fn key_derivation(&self) -> Result<(KeyDerivation, &str, usize)> {
        match self {
            KdfSection::Scrypt(params) => Ok((
                KeyDerivation::scrypt(params.n, params.r, params.p),
                params.salt.as_str(),
                params.dklen,
            )),
            KdfSection::Pbkdf2(params) => {
                if params.prf != SUPPORTED_PRF {
                    debug!("unsupported pbkdf2 prf");
                    return Err(KeyringError::DecryptionFailed);
                }
                Ok((
                    KeyDerivation::pbkdf2(params.c),
                    params.salt.as_str(),
                    params.dklen,
                ))
            }
        }
    }
}

fn decode_hex(field: &str) -> Result<Vec<u8>> {
    hex::decode(field.trim_start_matches("0x")).map_err(|_| KeyringError::DecryptionFailed)
}

/// Decrypt a V3 keystore with the default resource limits.
pub fn generate_from_v3_utc(password: &str, json: &str) -> Result<HdKeyNode> {
    generate_from_v3_utc_with_limits(password, json, &KdfLimits::default())
}

/// Decrypt a V3 keystore, refusing KDF parameters beyond `limits`.
pub fn generate_from_v3_utc_with_limits(
    password: &str,
    json: &str,
    limits: &KdfLimits,
) -> Result<HdKeyNode> {
    let keystore: V3Keystore = serde_json::from_str(json).map_err(|_| {
        debug!("keystore json rejected");
        KeyringError::DecryptionFailed
    })?;
    let crypto = keystore.crypto;

    if crypto.cipher != SUPPORTED_CIPHER {
        debug!("unsupported keystore cipher");
        return Err(KeyringError::DecryptionFailed);
    }
    let section = KdfSection::parse(&crypto.kdf, crypto.kdfparams)?;
    let (kdf, salt, dklen) = section.key_derivation()?;
    if dklen != DERIVED_KEY_LEN {
        return Err(KeyringError::DecryptionFailed);
    }
    let salt = decode_hex(salt)?;
    let iv = decode_hex(&crypto.cipherparams.iv)?;
    let ciphertext = decode_hex(&crypto.ciphertext)?;
    let mac = decode_hex(&crypto.mac)?;
    if ciphertext.len() != PRIVATE_KEY_LEN {
        return Err(KeyringError::DecryptionFailed);
    }

    info!("Decrypting keystore using {:?}", kdf.algorithm());
    let derived = kdf.derive_key(password.as_bytes(), &salt, dklen, limits)?;

    let mut hasher = Keccak256::new();
    hasher.update(&derived[16..32]);
    hasher.update(&ciphertext);
    let expected_mac = hasher.finalize();
    if !bool::from(expected_mac.as_slice().ct_eq(mac.as_slice())) {
        debug!("keystore mac mismatch");
        return Err(KeyringError::DecryptionFailed);
    }

    let mut plaintext = Zeroizing::new(ciphertext);
    let mut cipher =
        Aes128Ctr::new_from_slices(&derived[..16], &iv).map_err(|_| KeyringError::DecryptionFailed)?;
    cipher.apply_keystream(&mut plaintext);

    HdKeyNode::generate_from_private_key(&plaintext).map_err(|_| KeyringError::DecryptionFailed)
}
