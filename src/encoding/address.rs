//! Display address encoders
//!
//! Pure functions from a public key to a chain specific address string:
//! - Bitcoin Legacy (P2PKH) and SegWit (P2WPKH)
//! - ZCash transparent (`t1` / `tm`)
//! - Ethereum (EIP-55 checksummed hex)
//! - Solana (Base58 ed25519 key) and SS58
//!
//! The only failure these add over the codecs is a malformed public key.

use bitcoin::address::Address;
use bitcoin::hashes::{hash160, Hash};
use bitcoin::PublicKey as BitcoinPublicKey;
use sha3::{Digest, Keccak256};

use crate::core::errors::{KeyringError, Result};
use crate::encoding::{base58, ss58};

const COMPRESSED_KEY_LEN: usize = 33;
const UNCOMPRESSED_KEY_LEN: usize = 65;
const ED25519_KEY_LEN: usize = 32;

const ZCASH_MAINNET_T1: [u8; 2] = [0x1c, 0xb8];
const ZCASH_TESTNET_TM: [u8; 2] = [0x1d, 0x25];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    fn bitcoin(self) -> bitcoin::Network {
        match self {
            Network::Mainnet => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
        }
    }
}

fn secp256k1_key(public_key: &[u8]) -> Result<BitcoinPublicKey> {
    if public_key.len() != COMPRESSED_KEY_LEN && public_key.len() != UNCOMPRESSED_KEY_LEN {
        return Err(KeyringError::InvalidPublicKeyLength(public_key.len()));
    }
    BitcoinPublicKey::from_slice(public_key).map_err(|_| KeyringError::InvalidPublicKey)
}

/// RIPEMD160(SHA256(data)).
pub fn hash160(data: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(data).to_byte_array()
}

/// Legacy P2PKH address (`1...` / `m...`).
pub fn p2pkh_address(public_key: &[u8], network: Network) -> Result<String> {
    let key = secp256k1_key(public_key)?;
    Ok(Address::p2pkh(&key, network.bitcoin()).to_string())
}

/// Native SegWit P2WPKH address (`bc1q...` / `tb1q...`). Compressed keys only.
pub fn segwit_address(public_key: &[u8], network: Network) -> Result<String> {
    if public_key.len() != COMPRESSED_KEY_LEN {
        return Err(KeyringError::InvalidPublicKeyLength(public_key.len()));
    }
    let key = secp256k1_key(public_key)?;
    let address = Address::p2wpkh(&key, network.bitcoin()).map_err(|_| KeyringError::InvalidPublicKey)?;
    Ok(address.to_string())
}

/// ZCash transparent P2PKH address: Base58Check(version(2) || hash160).
pub fn zcash_transparent_address(public_key: &[u8], network: Network) -> Result<String> {
    if public_key.len() != COMPRESSED_KEY_LEN {
        return Err(KeyringError::InvalidPublicKeyLength(public_key.len()));
    }
    let version = match network {
        Network::Mainnet => ZCASH_MAINNET_T1,
        Network::Testnet => ZCASH_TESTNET_TM,
    };
    let mut payload = Vec::with_capacity(22);
    payload.extend_from_slice(&version);
    payload.extend_from_slice(&hash160(public_key));
    Ok(base58::encode_with_check(&payload))
}

/// `0x` + EIP-55 checksummed address. Accepts compressed or uncompressed keys.
pub fn ethereum_address(public_key: &[u8]) -> Result<String> {
    let key = secp256k1_key(public_key)?;
    let uncompressed = key.inner.serialize_uncompressed();
    let digest = Keccak256::digest(&uncompressed[1..]);
    Ok(to_checksum_address(&digest[12..]))
}

/// EIP-55 mixed case encoding of a 20-byte address.
pub fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = Keccak256::digest(lower.as_bytes());
    let mut out = String::with_capacity(2 + lower.len());
    out.push_str("0x");
    for (i, ch) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (4 * (1 - (i % 2)))) & 0x0f;
        if ch.is_ascii_alphabetic() && nibble >= 8 {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Solana address: Base58 of the 32-byte ed25519 public key.
pub fn solana_address(public_key: &[u8]) -> Result<String> {
    if public_key.len() != ED25519_KEY_LEN {
        return Err(KeyringError::InvalidPublicKeyLength(public_key.len()));
    }
    Ok(base58::encode(public_key))
}

/// SS58 address under `prefix`.
pub fn ss58_address(public_key: &[u8], prefix: u16) -> Result<String> {
    ss58::encode(prefix, public_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{PublicKey, Secp256k1, SecretKey};

    fn key_one() -> PublicKey {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        let secret = SecretKey::from_slice(&bytes).unwrap();
        PublicKey::from_secret_key(&Secp256k1::new(), &secret)
    }

    #[test]
    fn test_bitcoin_addresses_for_generator_point() {
        let compressed = key_one().serialize();
        assert_eq!(
            p2pkh_address(&compressed, Network::Mainnet).unwrap(),
            "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"
        );
        assert_eq!(
            segwit_address(&compressed, Network::Mainnet).unwrap(),
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"
        );
        assert!(segwit_address(&compressed, Network::Testnet).unwrap().starts_with("tb1q"));
    }

    #[test]
    fn test_ethereum_address_for_generator_point() {
        let expected = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";
        assert_eq!(ethereum_address(&key_one().serialize_uncompressed()).unwrap(), expected);
        assert_eq!(ethereum_address(&key_one().serialize()).unwrap(), expected);
    }

    #[test]
    fn test_zcash_transparent_prefixes() {
        let compressed = key_one().serialize();
        let t1 = zcash_transparent_address(&compressed, Network::Mainnet).unwrap();
        let tm = zcash_transparent_address(&compressed, Network::Testnet).unwrap();
        assert!(t1.starts_with("t1"), "{}", t1);
        assert!(tm.starts_with("tm"), "{}", tm);
        let decoded = base58::decode_with_check(&t1, 22).unwrap();
        assert_eq!(&decoded[2..], &hash160(&compressed));
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert_eq!(
            segwit_address(&[2u8; 32], Network::Mainnet).unwrap_err(),
            KeyringError::InvalidPublicKeyLength(32)
        );
        assert_eq!(
            segwit_address(&key_one().serialize_uncompressed(), Network::Mainnet).unwrap_err(),
            KeyringError::InvalidPublicKeyLength(65)
        );
        assert_eq!(
            ethereum_address(&[4u8; 64]).unwrap_err(),
            KeyringError::InvalidPublicKeyLength(64)
        );
        assert_eq!(solana_address(&[1u8; 33]).unwrap_err(), KeyringError::InvalidPublicKeyLength(33));
        assert_eq!(
            ss58_address(&[1u8; 31], 42).unwrap_err(),
            KeyringError::InvalidPublicKeyLength(31)
        );
    }

    #[test]
    fn test_invalid_point() {
        assert_eq!(
            p2pkh_address(&[0x05u8; 33], Network::Mainnet).unwrap_err(),
            KeyringError::InvalidPublicKey
        );
    }
}
