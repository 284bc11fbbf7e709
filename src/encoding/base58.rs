//! Base58 and Base58Check text encoding (Bitcoin alphabet).
//!
//! Leading zero bytes map to leading `'1'` characters. Base58Check appends
//! the first four bytes of `SHA256(SHA256(payload))` before encoding.

use sha2::{Digest, Sha256};

use crate::core::errors::{KeyringError, Result};

/// Number of checksum bytes appended by Base58Check.
pub const CHECKSUM_LEN: usize = 4;

/// SHA256 applied twice.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// Encode raw bytes as Base58.
pub fn encode(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Decode Base58 text.
///
/// With `strict` the decoded length must equal `expected_len`; otherwise
/// `expected_len` is an upper bound on the decoded length.
pub fn decode(text: &str, expected_len: usize, strict: bool) -> Result<Vec<u8>> {
    let bytes = bs58::decode(text).into_vec().map_err(map_bs58_error)?;
    let length_ok = if strict {
        bytes.len() == expected_len
    } else {
        bytes.len() <= expected_len
    };
    if !length_ok {
        return Err(KeyringError::LengthMismatch {
            expected: expected_len,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Encode bytes with a 4-byte double-SHA256 checksum.
pub fn encode_with_check(bytes: &[u8]) -> String {
    let checksum = double_sha256(bytes);
    let mut payload = Vec::with_capacity(bytes.len() + CHECKSUM_LEN);
    payload.extend_from_slice(bytes);
    payload.extend_from_slice(&checksum[..CHECKSUM_LEN]);
    encode(&payload)
}

/// Decode Base58Check text whose payload must be exactly `expected_len` bytes.
pub fn decode_with_check(text: &str, expected_len: usize) -> Result<Vec<u8>> {
    let payload = decode_with_check_up_to(text, expected_len)?;
    if payload.len() != expected_len {
        return Err(KeyringError::LengthMismatch {
            expected: expected_len,
            actual: payload.len(),
        });
    }
    Ok(payload)
}

/// Decode Base58Check text whose payload is at most `max_len` bytes.
pub fn decode_with_check_up_to(text: &str, max_len: usize) -> Result<Vec<u8>> {
    let mut raw = decode(text, max_len + CHECKSUM_LEN, false)?;
    if raw.len() < CHECKSUM_LEN {
        return Err(KeyringError::LengthMismatch {
            expected: CHECKSUM_LEN,
            actual: raw.len(),
        });
    }
    let body_len = raw.len() - CHECKSUM_LEN;
    let checksum = double_sha256(&raw[..body_len]);
    if checksum[..CHECKSUM_LEN] != raw[body_len..] {
        return Err(KeyringError::ChecksumMismatch);
    }
    raw.truncate(body_len);
    Ok(raw)
}

fn map_bs58_error(err: bs58::decode::Error) -> KeyringError {
    match err {
        bs58::decode::Error::InvalidCharacter { character, index } => {
            KeyringError::InvalidCharacter { character, index }
        }
        bs58::decode::Error::NonAsciiCharacter { index } => KeyringError::InvalidCharacter {
            character: char::REPLACEMENT_CHARACTER,
            index,
        },
        _ => KeyringError::LengthMismatch { expected: 0, actual: 0 },
    }
}
