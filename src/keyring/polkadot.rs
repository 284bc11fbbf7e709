//! Polkadot sr25519 keyring
//!
//! Account `i` is `seed//<network label>//<i>`: two hard junctions below the
//! sr25519 root. Derived keypairs are cached per index behind a read-write
//! lock so concurrent readers never race two different entries into place.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use schnorrkel::{Keypair, PublicKey, Signature};
use tracing::{debug, info};

use crate::core::config::SubstrateNetwork;
use crate::core::errors::{KeyringError, Result};
use crate::crypto::hdkd::{sr25519_derive_hard, sr25519_from_seed, DeriveJunction};
use crate::encoding::ss58;
use crate::keyring::traits::ChainKeyring;

/// Signing context used by Substrate runtimes.
pub const SUBSTRATE_SIGNING_CONTEXT: &[u8] = b"substrate";
pub const MINI_SECRET_LEN: usize = 32;

pub struct PolkadotKeyring {
    network: SubstrateNetwork,
    /// Root after the network junction.
    network_root: Option<Keypair>,
    keypairs: RwLock<HashMap<u32, Arc<Keypair>>>,
    accounts: Vec<u32>,
}

impl PolkadotKeyring {
    /// Build from a 32-byte mini secret. A 64-byte BIP39 seed is accepted
    /// and truncated to its first 32 bytes, as Substrate tooling does.
    pub fn from_seed(seed: &[u8], network: SubstrateNetwork) -> Result<Self> {
        let mini = match seed.len() {
            MINI_SECRET_LEN | 64 => &seed[..MINI_SECRET_LEN],
            other => {
                return Err(KeyringError::InvalidInputLength {
                    expected: MINI_SECRET_LEN,
                    actual: other,
                })
            }
        };
        let root = sr25519_from_seed(mini)?;
        let network_root = sr25519_derive_hard(&root, &DeriveJunction::hard_from_label(&network.label));
        info!("Polkadot keyring constructed for //{}", network.label);
        Ok(Self {
            network,
            network_root: Some(network_root),
            keypairs: RwLock::new(HashMap::new()),
            accounts: Vec::new(),
        })
    }

    pub fn network(&self) -> &SubstrateNetwork {
        &self.network
    }

    /// Cached keypair for `index`, deriving it on first use.
    pub fn ensure_keypair(&self, index: u32) -> Result<Arc<Keypair>> {
        if let Some(keypair) = self.keypairs.read().get(&index) {
            return Ok(Arc::clone(keypair));
        }
        let root = self.network_root.as_ref().ok_or(KeyringError::KeyringLocked)?;
        let mut cache = self.keypairs.write();
        // Another writer may have won the race while we waited for the lock.
        let keypair = cache.entry(index).or_insert_with(|| {
            debug!("sr25519 keypair {} derived", index);
            Arc::new(sr25519_derive_hard(root, &DeriveJunction::hard_from_index(u64::from(index))))
        });
        Ok(Arc::clone(keypair))
    }

    pub fn get_public_key(&self, index: u32) -> Result<[u8; 32]> {
        Ok(self.ensure_keypair(index)?.public.to_bytes())
    }

    pub fn sign_message(&self, message: &[u8], index: u32) -> Result<[u8; 64]> {
        let keypair = self.ensure_keypair(index)?;
        Ok(keypair.sign_simple(SUBSTRATE_SIGNING_CONTEXT, message).to_bytes())
    }

    pub fn verify_message(&self, signature: &[u8], message: &[u8], index: u32) -> bool {
        let Ok(keypair) = self.ensure_keypair(index) else {
            return false;
        };
        verify_sr25519(&keypair.public, signature, message)
    }

    pub fn get_address(&self, index: u32, prefix: u16) -> Result<String> {
        ss58::encode(prefix, &self.get_public_key(index)?)
    }

    fn index_of(&self, address: &str) -> Option<u32> {
        self.accounts
            .iter()
            .copied()
            .find(|&index| self.address_at(index).as_deref() == Some(address))
    }
}

fn verify_sr25519(public: &PublicKey, signature: &[u8], message: &[u8]) -> bool {
    let Ok(signature) = Signature::from_bytes(signature) else {
        return false;
    };
    public
        .verify_simple(SUBSTRATE_SIGNING_CONTEXT, message, &signature)
        .is_ok()
}

impl ChainKeyring for PolkadotKeyring {
    fn add_accounts(&mut self, count: usize) -> Result<Vec<String>> {
        let mut added = Vec::with_capacity(count);
        for _ in 0..count {
            let index = u32::try_from(self.accounts.len()).map_err(|_| KeyringError::SeedOrAccountLimitExceeded)?;
            let address = self.get_address(index, self.network.ss58_prefix)?;
            self.accounts.push(index);
            added.push(address);
        }
        Ok(added)
    }

    fn remove_account(&mut self) -> Option<String> {
        let index = self.accounts.last().copied()?;
        let address = self.address_at(index);
        self.accounts.pop();
        self.keypairs.write().remove(&index);
        address
    }

    fn accounts(&self) -> Vec<String> {
        self.accounts.iter().filter_map(|&index| self.address_at(index)).collect()
    }

    fn address_at(&self, index: u32) -> Option<String> {
        if !self.accounts.contains(&index) {
            return None;
        }
        self.get_address(index, self.network.ss58_prefix).ok()
    }

    fn sign_message(&self, address: &str, message: &[u8]) -> Result<Vec<u8>> {
        let index = self
            .index_of(address)
            .ok_or_else(|| KeyringError::UnknownAccount(address.to_string()))?;
        PolkadotKeyring::sign_message(self, message, index).map(|sig| sig.to_vec())
    }

    fn lock(&mut self) {
        self.network_root = None;
        self.keypairs.write().clear();
        self.accounts.clear();
        info!("Polkadot keyring locked");
    }

    fn is_locked(&self) -> bool {
        self.network_root.is_none()
    }
}
