//! Solana ed25519 keyring
//!
//! Root is a SLIP-0010 node at the configured hardened path (default
//! `m/44'/501'`); account `i` lives at `root/i'/0'`. Imported keypairs are
//! kept apart from the derived tree and identified by their address.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::core::errors::{KeyringError, Result};
use crate::crypto::hdkd::Ed25519HdNode;
use crate::encoding::{address, base58};
use crate::keyring::traits::ChainKeyring;

pub const DEFAULT_SOLANA_PATH: &str = "m/44'/501'";
const SECRET_KEY_LEN: usize = 32;
const KEYPAIR_LEN: usize = 64;

struct SolanaAccount {
    address: String,
    signing_key: SigningKey,
}

impl SolanaAccount {
    fn new(signing_key: SigningKey) -> Result<Self> {
        let address = address::solana_address(signing_key.verifying_key().as_bytes())?;
        Ok(Self { address, signing_key })
    }
}

#[derive(Default)]
pub struct SolanaKeyring {
    root: Option<Ed25519HdNode>,
    accounts: Vec<SolanaAccount>,
    imported: Vec<SolanaAccount>,
}

impl SolanaKeyring {
    /// Keyring rooted at `path` below the SLIP-0010 master of `seed`.
    pub fn from_seed(seed: &[u8], path: &str) -> Result<Self> {
        let mut keyring = Self::default();
        keyring.construct_root_from_seed(seed, path)?;
        Ok(keyring)
    }

    /// Replace the root. Existing derived accounts are discarded.
    pub fn construct_root_from_seed(&mut self, seed: &[u8], path: &str) -> Result<()> {
        let root = Ed25519HdNode::from_seed(seed)?.derive_from_path(path)?;
        info!("Solana keyring root constructed at {}", root.path());
        self.root = Some(root);
        self.accounts.clear();
        Ok(())
    }

    fn root(&self) -> Result<&Ed25519HdNode> {
        self.root.as_ref().ok_or(KeyringError::KeyringLocked)
    }

    fn derive_account(&self, index: u32) -> Result<SolanaAccount> {
        let node = self.root()?.derive_hardened_child(index)?.derive_hardened_child(0)?;
        SolanaAccount::new(node.signing_key())
    }

    fn contains(&self, address: &str) -> bool {
        self.find(address).is_some()
    }

    fn find(&self, address: &str) -> Option<&SolanaAccount> {
        self.accounts
            .iter()
            .chain(self.imported.iter())
            .find(|account| account.address == address)
    }

    /// Import a raw 32-byte secret or a 64-byte `secret || public` keypair.
    pub fn import_account(&mut self, private_key: &[u8]) -> Result<String> {
        let signing_key = match private_key.len() {
            SECRET_KEY_LEN => {
                let mut secret = Zeroizing::new([0u8; SECRET_KEY_LEN]);
                secret.copy_from_slice(private_key);
                SigningKey::from_bytes(&secret)
            }
            KEYPAIR_LEN => {
                let mut keypair = Zeroizing::new([0u8; KEYPAIR_LEN]);
                keypair.copy_from_slice(private_key);
                SigningKey::from_keypair_bytes(&keypair).map_err(|_| KeyringError::InvalidPrivateKey)?
            }
            other => {
                return Err(KeyringError::InvalidInputLength {
                    expected: KEYPAIR_LEN,
                    actual: other,
                })
            }
        };
        let account = SolanaAccount::new(signing_key)?;
        if self.contains(&account.address) {
            return Err(KeyringError::DuplicateAccount(account.address));
        }
        info!("Imported Solana account {}", account.address);
        let address = account.address.clone();
        self.imported.push(account);
        Ok(address)
    }

    pub fn remove_imported_account(&mut self, address: &str) -> bool {
        let before = self.imported.len();
        self.imported.retain(|account| account.address != address);
        before != self.imported.len()
    }

    pub fn get_address(&self, index: u32) -> Option<String> {
        self.accounts.get(index as usize).map(|a| a.address.clone())
    }

    pub fn get_accounts(&self) -> Vec<String> {
        self.accounts
            .iter()
            .chain(self.imported.iter())
            .map(|account| account.address.clone())
            .collect()
    }

    pub fn imported_accounts(&self) -> Vec<String> {
        self.imported.iter().map(|a| a.address.clone()).collect()
    }

    /// Base58 of the 64-byte keypair, or `None` for an unknown address.
    pub fn encode_private_key_for_export(&self, address: &str) -> Option<Zeroizing<String>> {
        let account = self.find(address)?;
        let keypair = Zeroizing::new(account.signing_key.to_keypair_bytes());
        Some(Zeroizing::new(base58::encode(&*keypair)))
    }

    pub fn sign_message(&self, address: &str, message: &[u8]) -> Result<[u8; 64]> {
        let account = self
            .find(address)
            .ok_or_else(|| KeyringError::UnknownAccount(address.to_string()))?;
        Ok(account.signing_key.sign(message).to_bytes())
    }

    /// Verify against any Solana address, managed or not.
    pub fn verify_message(address: &str, message: &[u8], signature: &[u8]) -> bool {
        let Ok(key_bytes) = base58::decode(address, 32, true) else {
            return false;
        };
        let Ok(key_bytes) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        verifying_key.verify(message, &signature).is_ok()
    }
}

impl ChainKeyring for SolanaKeyring {
    fn add_accounts(&mut self, count: usize) -> Result<Vec<String>> {
        let mut added = Vec::with_capacity(count);
        for _ in 0..count {
            let index = u32::try_from(self.accounts.len()).map_err(|_| KeyringError::SeedOrAccountLimitExceeded)?;
            let account = self.derive_account(index)?;
            let before = self.imported.len();
            self.imported.retain(|imported| imported.address != account.address);
            if self.imported.len() != before {
                info!("Solana account {} now derived, dropping imported copy", account.address);
            }
            debug!("Solana account {} derived", index);
            added.push(account.address.clone());
            self.accounts.push(account);
        }
        Ok(added)
    }

    fn remove_account(&mut self) -> Option<String> {
        let removed = self.accounts.pop().map(|account| account.address.clone());
        if let Some(address) = &removed {
            debug!("Solana account {} removed", address);
        }
        removed
    }

    fn accounts(&self) -> Vec<String> {
        self.get_accounts()
    }

    fn address_at(&self, index: u32) -> Option<String> {
        self.get_address(index)
    }

    fn sign_message(&self, address: &str, message: &[u8]) -> Result<Vec<u8>> {
        SolanaKeyring::sign_message(self, address, message).map(|sig| sig.to_vec())
    }

    fn lock(&mut self) {
        self.root = None;
        self.accounts.clear();
        self.imported.clear();
        info!("Solana keyring locked");
    }

    fn is_locked(&self) -> bool {
        self.root.is_none()
    }
}
