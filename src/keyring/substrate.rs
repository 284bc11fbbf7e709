//! Substrate ed25519 keyring
//!
//! Single-account variant: only index 0 (`seed//<label>//0`) exists. Any
//! other index is refused with `UnsupportedAccountIndex` rather than being
//! folded onto index 0.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use tracing::info;

use crate::core::config::SubstrateNetwork;
use crate::core::errors::{KeyringError, Result};
use crate::crypto::hdkd::{substrate_ed25519_derive_hard, DeriveJunction};
use crate::encoding::ss58;
use crate::keyring::traits::ChainKeyring;
use crate::security::SecretBytes;

pub const SUPPORTED_ACCOUNT_INDEX: u32 = 0;

pub struct SubstrateKeyring {
    network: SubstrateNetwork,
    signing_key: Option<SigningKey>,
    account_added: bool,
}

impl SubstrateKeyring {
    pub fn from_seed(seed: &[u8], network: SubstrateNetwork) -> Result<Self> {
        let root = match seed.len() {
            32 | 64 => SecretBytes::<32>::try_from_slice(&seed[..32])?,
            other => {
                return Err(KeyringError::InvalidInputLength {
                    expected: 32,
                    actual: other,
                })
            }
        };
        let network_seed = substrate_ed25519_derive_hard(&root, &DeriveJunction::hard_from_label(&network.label));
        let account_seed = substrate_ed25519_derive_hard(
            &network_seed,
            &DeriveJunction::hard_from_index(u64::from(SUPPORTED_ACCOUNT_INDEX)),
        );
        info!("Substrate ed25519 keyring constructed for //{}", network.label);
        Ok(Self {
            network,
            signing_key: Some(account_seed.with_secret(SigningKey::from_bytes)),
            account_added: false,
        })
    }

    fn key(&self, index: u32) -> Result<&SigningKey> {
        if index != SUPPORTED_ACCOUNT_INDEX {
            return Err(KeyringError::UnsupportedAccountIndex(index));
        }
        self.signing_key.as_ref().ok_or(KeyringError::KeyringLocked)
    }

    pub fn get_public_key(&self, index: u32) -> Result<[u8; 32]> {
        Ok(self.key(index)?.verifying_key().to_bytes())
    }

    pub fn sign_message(&self, message: &[u8], index: u32) -> Result<[u8; 64]> {
        Ok(self.key(index)?.sign(message).to_bytes())
    }

    pub fn verify_message(&self, signature: &[u8], message: &[u8], index: u32) -> bool {
        let Ok(key) = self.key(index) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verifying_key().verify(message, &signature).is_ok()
    }

    pub fn get_address(&self, index: u32, prefix: u16) -> Result<String> {
        ss58::encode(prefix, &self.get_public_key(index)?)
    }
}

impl ChainKeyring for SubstrateKeyring {
    fn add_accounts(&mut self, count: usize) -> Result<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        // Either path would need index 1.
        if self.account_added || count > 1 {
            return Err(KeyringError::UnsupportedAccountIndex(SUPPORTED_ACCOUNT_INDEX + 1));
        }
        let address = self.get_address(SUPPORTED_ACCOUNT_INDEX, self.network.ss58_prefix)?;
        self.account_added = true;
        Ok(vec![address])
    }

    fn remove_account(&mut self) -> Option<String> {
        if !self.account_added {
            return None;
        }
        let address = self.address_at(SUPPORTED_ACCOUNT_INDEX);
        self.account_added = false;
        address
    }

    fn accounts(&self) -> Vec<String> {
        self.address_at(SUPPORTED_ACCOUNT_INDEX).into_iter().collect()
    }

    fn address_at(&self, index: u32) -> Option<String> {
        if !self.account_added || index != SUPPORTED_ACCOUNT_INDEX {
            return None;
        }
        self.get_address(index, self.network.ss58_prefix).ok()
    }

    fn sign_message(&self, address: &str, message: &[u8]) -> Result<Vec<u8>> {
        if self.address_at(SUPPORTED_ACCOUNT_INDEX).as_deref() != Some(address) {
            return Err(KeyringError::UnknownAccount(address.to_string()));
        }
        SubstrateKeyring::sign_message(self, message, SUPPORTED_ACCOUNT_INDEX).map(|sig| sig.to_vec())
    }

    fn lock(&mut self) {
        self.signing_key = None;
        self.account_added = false;
        info!("Substrate ed25519 keyring locked");
    }

    fn is_locked(&self) -> bool {
        self.signing_key.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PolkadotConfig;

    fn keyring() -> SubstrateKeyring {
        SubstrateKeyring::from_seed(&[0x33u8; 32], PolkadotConfig::default().testnet).unwrap()
    }

    #[test]
    fn test_non_zero_index_is_explicitly_unsupported() {
        let k = keyring();
        assert!(k.get_public_key(0).is_ok());
        assert_eq!(k.get_public_key(1).unwrap_err(), KeyringError::UnsupportedAccountIndex(1));
        assert_eq!(k.get_address(7, 42).unwrap_err(), KeyringError::UnsupportedAccountIndex(7));
        assert!(!k.verify_message(&[0u8; 64], b"x", 1));
    }

    #[test]
    fn test_derivation_chain() {
        let root = SecretBytes::new([0x33u8; 32]);
        let westend = substrate_ed25519_derive_hard(&root, &DeriveJunction::hard_from_label("westend"));
        let account = substrate_ed25519_derive_hard(&westend, &DeriveJunction::hard_from_index(0));
        let expected = account.with_secret(SigningKey::from_bytes).verifying_key().to_bytes();
        assert_eq!(keyring().get_public_key(0).unwrap(), expected);
    }

    #[test]
    fn test_single_account_through_trait() {
        let mut k = keyring();
        let added = k.add_accounts(1).unwrap();
        assert_eq!(k.accounts(), added);
        assert_eq!(k.add_accounts(1).unwrap_err(), KeyringError::UnsupportedAccountIndex(1));

        let signature = ChainKeyring::sign_message(&k, &added[0], b"hi").unwrap();
        assert!(k.verify_message(&signature, b"hi", 0));
        assert_eq!(k.remove_account(), Some(added[0].clone()));
        assert!(k.accounts().is_empty());

        let mut fresh = keyring();
        assert_eq!(fresh.add_accounts(2).unwrap_err(), KeyringError::UnsupportedAccountIndex(1));
    }
}
