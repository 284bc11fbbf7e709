//! SS58 address encoding used by Substrate based chains.
//!
//! Layout: `prefix(1|2) || public_key(32) || checksum(2)`, Base58 encoded.
//! The checksum is the first two bytes of `Blake2b-512("SS58PRE" || body)`.

use blake2::{Blake2b512, Digest};

use crate::core::errors::{KeyringError, Result};
use crate::encoding::base58;

/// Largest network identifier expressible in the two-byte form.
pub const SS58_PREFIX_MAX: u16 = 16383;
pub const SS58_PUBLIC_KEY_LEN: usize = 32;
pub const SS58_CHECKSUM_LEN: usize = 2;

const SS58_HASH_PREFIX: &[u8] = b"SS58PRE";
const SS58_SIMPLE_PREFIX_LIMIT: u16 = 64;
const SS58_MAX_DECODED_LEN: usize = 2 + SS58_PUBLIC_KEY_LEN + SS58_CHECKSUM_LEN;

/// Network prefix plus public key. Built on demand, never cached as identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ss58Address {
    pub prefix: u16,
    pub public_key: [u8; SS58_PUBLIC_KEY_LEN],
}

impl Ss58Address {
    pub fn new(prefix: u16, public_key: [u8; SS58_PUBLIC_KEY_LEN]) -> Self {
        Self { prefix, public_key }
    }

    pub fn encode(&self) -> Result<String> {
        encode(self.prefix, &self.public_key)
    }

    pub fn decode(text: &str) -> Result<Self> {
        decode(text)
    }
}

fn checksum(body: &[u8]) -> [u8; SS58_CHECKSUM_LEN] {
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_HASH_PREFIX);
    hasher.update(body);
    let digest = hasher.finalize();
    [digest[0], digest[1]]
}

fn encode_prefix(prefix: u16) -> Result<Vec<u8>> {
    if prefix > SS58_PREFIX_MAX {
        return Err(KeyringError::InvalidSs58Prefix(prefix));
    }
    if prefix < SS58_SIMPLE_PREFIX_LIMIT {
        return Ok(vec![prefix as u8]);
    }
    // 0b01 marker, then the 14-bit identifier split across both bytes.
    let first = (((prefix & 0b0000_0000_1111_1100) >> 2) as u8) | 0b0100_0000;
    let second = ((prefix >> 8) as u8) | (((prefix & 0b0000_0000_0000_0011) as u8) << 6);
    Ok(vec![first, second])
}

fn decode_prefix(data: &[u8]) -> Result<(u16, usize)> {
    match data.first() {
        None => Err(KeyringError::LengthMismatch {
            expected: 1 + SS58_PUBLIC_KEY_LEN + SS58_CHECKSUM_LEN,
            actual: 0,
        }),
        Some(&b) if b < 64 => Ok((b as u16, 1)),
        Some(&b) if b < 128 => {
            let second = *data.get(1).ok_or(KeyringError::LengthMismatch {
                expected: 2 + SS58_PUBLIC_KEY_LEN + SS58_CHECKSUM_LEN,
                actual: data.len(),
            })?;
            let lower = (b << 2) | (second >> 6);
            let upper = second & 0b0011_1111;
            Ok(((lower as u16) | ((upper as u16) << 8), 2))
        }
        Some(_) => Err(KeyringError::UnsupportedSs58Prefix),
    }
}

/// Encode a 32-byte public key under the given network prefix.
pub fn encode(prefix: u16, public_key: &[u8]) -> Result<String> {
    if public_key.len() != SS58_PUBLIC_KEY_LEN {
        return Err(KeyringError::InvalidPublicKeyLength(public_key.len()));
    }
    let mut body = encode_prefix(prefix)?;
    body.extend_from_slice(public_key);
    let check = checksum(&body);
    body.extend_from_slice(&check);
    Ok(base58::encode(&body))
}

/// Decode and verify an SS58 address string.
pub fn decode(text: &str) -> Result<Ss58Address> {
    let data = base58::decode(text, SS58_MAX_DECODED_LEN, false)?;
    let (prefix, offset) = decode_prefix(&data)?;
    let expected = offset + SS58_PUBLIC_KEY_LEN + SS58_CHECKSUM_LEN;
    if data.len() != expected {
        return Err(KeyringError::LengthMismatch {
            expected,
            actual: data.len(),
        });
    }
    let body_len = offset + SS58_PUBLIC_KEY_LEN;
    if checksum(&data[..body_len]) != data[body_len..] {
        return Err(KeyringError::ChecksumMismatch);
    }
    let mut public_key = [0u8; SS58_PUBLIC_KEY_LEN];
    public_key.copy_from_slice(&data[offset..body_len]);
    Ok(Ss58Address { prefix, public_key })
}

/// True when `text` decodes as a well-formed SS58 address.
pub fn is_valid_ss58(text: &str) -> bool {
    decode(text).is_ok()
}
