//! Solana program derived addresses (PDAs).
//!
//! A PDA is `SHA256(seeds || program_id || "ProgramDerivedAddress")` and is
//! only valid when the digest is not a point on the ed25519 curve, so no
//! private key can exist for it. [`find_program_derived_address`] appends a
//! bump byte from 255 down to 0 until that holds.

use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::core::errors::{KeyringError, Result};
use crate::encoding::base58;

pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";
pub const ASSOCIATED_TOKEN_PROGRAM_ID: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";
pub const METADATA_PROGRAM_ID: &str = "metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s";

pub const METADATA_SEED: &[u8] = b"metadata";
pub const EDITION_SEED: &[u8] = b"edition";
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

pub const MAX_SEED_LEN: usize = 32;
pub const MAX_SEEDS: usize = 16;
pub const PUBKEY_LEN: usize = 32;

/// Address found by [`find_program_derived_address`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramDerivedAddress {
    pub address: String,
    pub public_key: [u8; PUBKEY_LEN],
    pub bump_seed: u8,
}

/// True when `bytes` decompress to an ed25519 point.
pub fn is_on_curve(bytes: &[u8; PUBKEY_LEN]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

fn decode_pubkey(text: &str) -> Result<[u8; PUBKEY_LEN]> {
    let bytes = base58::decode(text, PUBKEY_LEN, true)?;
    let mut out = [0u8; PUBKEY_LEN];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// PDA bytes for an exact seed list.
pub fn create_program_address(seeds: &[&[u8]], program_id: &[u8; PUBKEY_LEN]) -> Result<[u8; PUBKEY_LEN]> {
    if seeds.len() > MAX_SEEDS || seeds.iter().any(|seed| seed.len() > MAX_SEED_LEN) {
        return Err(KeyringError::SeedOrAccountLimitExceeded);
    }
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(program_id);
    hasher.update(PDA_MARKER);
    let digest: [u8; PUBKEY_LEN] = hasher.finalize().into();
    if is_on_curve(&digest) {
        return Err(KeyringError::AddressOnCurve);
    }
    Ok(digest)
}

/// Base58 PDA for an exact seed list; `program_id` is a Base58 address.
pub fn create_program_derived_address(seeds: &[&[u8]], program_id: &str) -> Result<String> {
    let program = decode_pubkey(program_id)?;
    create_program_address(seeds, &program).map(|key| base58::encode(&key))
}

/// Try bumps 255..=0 in order; only `AddressOnCurve` moves on to the next one.
pub(crate) fn search_bump<T, F>(mut attempt: F) -> Result<(T, u8)>
where
    F: FnMut(u8) -> Result<T>,
{
    for bump in (0..=u8::MAX).rev() {
        match attempt(bump) {
            Ok(found) => return Ok((found, bump)),
            Err(KeyringError::AddressOnCurve) => continue,
            Err(other) => return Err(other),
        }
    }
    Err(KeyringError::NoViableBumpSeed)
}

pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &[u8; PUBKEY_LEN],
) -> Result<([u8; PUBKEY_LEN], u8)> {
    // The bump byte counts against the seed limit.
    if seeds.len() >= MAX_SEEDS {
        return Err(KeyringError::SeedOrAccountLimitExceeded);
    }
    let result = search_bump(|bump| {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        with_bump.extend_from_slice(seeds);
        with_bump.push(&bump_seed);
        create_program_address(&with_bump, program_id)
    });
    match &result {
        Ok((_, bump)) => debug!("program address found with bump {}", bump),
        Err(KeyringError::NoViableBumpSeed) => warn!("no viable bump seed for program address"),
        Err(_) => {}
    }
    result
}

/// Search for the canonical bump and return the address with it.
pub fn find_program_derived_address(seeds: &[&[u8]], program_id: &str) -> Result<ProgramDerivedAddress> {
    let program = decode_pubkey(program_id)?;
    let (public_key, bump_seed) = find_program_address(seeds, &program)?;
    Ok(ProgramDerivedAddress {
        address: base58::encode(&public_key),
        public_key,
        bump_seed,
    })
}

/// Associated token account of `wallet` for `mint` under the classic token program.
pub fn get_associated_token_account(wallet: &str, mint: &str) -> Result<String> {
    get_associated_token_account_for_program(wallet, mint, TOKEN_PROGRAM_ID)
}

/// Associated token account for an explicit token program (e.g. Token-2022).
pub fn get_associated_token_account_for_program(
    wallet: &str,
    mint: &str,
    token_program_id: &str,
) -> Result<String> {
    let wallet = decode_pubkey(wallet)?;
    let token_program = decode_pubkey(token_program_id)?;
    let mint = decode_pubkey(mint)?;
    let seeds: [&[u8]; 3] = [&wallet, &token_program, &mint];
    Ok(find_program_derived_address(&seeds, ASSOCIATED_TOKEN_PROGRAM_ID)?.address)
}

/// Token metadata account: `["metadata", metadata_program, mint]`.
pub fn get_associated_metadata_account(mint: &str) -> Result<String> {
    let metadata_program = decode_pubkey(METADATA_PROGRAM_ID)?;
    let mint = decode_pubkey(mint)?;
    let seeds: [&[u8]; 3] = [METADATA_SEED, &metadata_program, &mint];
    Ok(find_program_derived_address(&seeds, METADATA_PROGRAM_ID)?.address)
}

/// Master edition account: `["metadata", metadata_program, mint, "edition"]`.
pub fn get_associated_edition_account(mint: &str) -> Result<String> {
    let metadata_program = decode_pubkey(METADATA_PROGRAM_ID)?;
    let mint = decode_pubkey(mint)?;
    let seeds: [&[u8]; 4] = [METADATA_SEED, &metadata_program, &mint, EDITION_SEED];
    Ok(find_program_derived_address(&seeds, METADATA_PROGRAM_ID)?.address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    const MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn wallet() -> String {
        base58::encode(&SigningKey::from_bytes(&[5u8; 32]).verifying_key().to_bytes())
    }

    fn program() -> [u8; 32] {
        decode_pubkey(ASSOCIATED_TOKEN_PROGRAM_ID).unwrap()
    }

    #[test]
    fn test_constants_are_32_byte_keys() {
        for id in [
            TOKEN_PROGRAM_ID,
            TOKEN_2022_PROGRAM_ID,
            ASSOCIATED_TOKEN_PROGRAM_ID,
            METADATA_PROGRAM_ID,
        ] {
            assert!(decode_pubkey(id).is_ok(), "{}", id);
        }
    }

    #[test]
    fn test_found_bump_is_canonical() {
        let seeds: [&[u8]; 2] = [b"vault", b"alice"];
        let (key, bump) = find_program_address(&seeds, &program()).unwrap();
        assert!(!is_on_curve(&key));

        let bump_seed = [bump];
        let replay: [&[u8]; 3] = [b"vault", b"alice", &bump_seed];
        assert_eq!(create_program_address(&replay, &program()).unwrap(), key);

        // Every larger bump must have landed on the curve.
        for higher in (u16::from(bump) + 1)..=255 {
            let seed = [higher as u8];
            let candidate: [&[u8]; 3] = [b"vault", b"alice", &seed];
            assert_eq!(
                create_program_address(&candidate, &program()).unwrap_err(),
                KeyringError::AddressOnCurve
            );
        }
    }

    #[test]
    fn test_seed_limits() {
        let long = [0u8; 33];
        assert_eq!(
            create_program_address(&[long.as_slice()], &program()).unwrap_err(),
            KeyringError::SeedOrAccountLimitExceeded
        );
        let seed = [1u8; 1];
        let sixteen: Vec<&[u8]> = vec![seed.as_slice(); 16];
        assert_eq!(
            find_program_address(&sixteen, &program()).unwrap_err(),
            KeyringError::SeedOrAccountLimitExceeded
        );
        let fifteen: Vec<&[u8]> = vec![seed.as_slice(); 15];
        assert!(find_program_address(&fifteen, &program()).is_ok());
        let max_len = [7u8; 32];
        assert!(find_program_address(&[max_len.as_slice()], &program()).is_ok());
    }

    #[test]
    fn test_search_exhaustion_is_reachable() {
        let mut tried = Vec::new();
        let result: Result<((), u8)> = search_bump(|bump| {
            tried.push(bump);
            Err(KeyringError::AddressOnCurve)
        });
        assert_eq!(result.unwrap_err(), KeyringError::NoViableBumpSeed);
        assert_eq!(tried.len(), 256);
        assert_eq!(tried.first(), Some(&255));
        assert_eq!(tried.last(), Some(&0));
    }

    #[test]
    fn test_search_stops_on_other_errors() {
        let result: Result<((), u8)> = search_bump(|_| Err(KeyringError::SeedOrAccountLimitExceeded));
        assert_eq!(result.unwrap_err(), KeyringError::SeedOrAccountLimitExceeded);
        let found = search_bump(|bump| if bump == 0 { Ok("zero") } else { Err(KeyringError::AddressOnCurve) });
        assert_eq!(found.unwrap(), ("zero", 0));
    }

    #[test]
    fn test_real_public_keys_are_on_curve() {
        let key = SigningKey::from_bytes(&[3u8; 32]).verifying_key().to_bytes();
        assert!(is_on_curve(&key));
    }

    #[test]
    fn test_associated_accounts_are_deterministic_and_distinct() {
        let wallet = wallet();
        let classic = get_associated_token_account(&wallet, MINT).unwrap();
        let again = get_associated_token_account(&wallet, MINT).unwrap();
        let token_2022 = get_associated_token_account_for_program(&wallet, MINT, TOKEN_2022_PROGRAM_ID).unwrap();
        assert_eq!(classic, again);
        assert_ne!(classic, token_2022);

        let metadata = get_associated_metadata_account(MINT).unwrap();
        let edition = get_associated_edition_account(MINT).unwrap();
        assert_ne!(metadata, edition);
        assert!(!is_on_curve(&decode_pubkey(&metadata).unwrap()));
    }

    #[test]
    fn test_bad_program_id() {
        assert!(matches!(
            create_program_derived_address(&[b"x".as_slice()], "not-base58-0OIl"),
            Err(KeyringError::InvalidCharacter { .. })
        ));
        assert!(matches!(
            get_associated_metadata_account("2g"),
            Err(KeyringError::LengthMismatch { .. })
        ));
    }
}
