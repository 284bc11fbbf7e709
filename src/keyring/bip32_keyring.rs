//! secp256k1 account keyring for Bitcoin, ZCash and Ethereum.
//!
//! UTXO chains put account `i` at `root/i'/0/0` (first receive address);
//! Ethereum puts it at `root/i`, with the root at `m/44'/60'/0'/0`.

use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::core::bip32::HdKeyNode;
use crate::core::config::DerivationConfig;
use crate::core::derivation_path::ChildNumber;
use crate::core::errors::{KeyringError, Result};
use crate::encoding::address::{self, Network};
use crate::keyring::traits::ChainKeyring;

const WIF_MAINNET: u8 = 0x80;
const WIF_TESTNET: u8 = 0xef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bip32Coin {
    Bitcoin(Network),
    ZCash(Network),
    Ethereum,
}

impl Bip32Coin {
    /// Root path for this coin from the configured defaults.
    pub fn root_path(self, config: &DerivationConfig) -> &str {
        match self {
            Bip32Coin::Bitcoin(Network::Mainnet) => &config.bitcoin,
            Bip32Coin::Bitcoin(Network::Testnet) => &config.bitcoin_testnet,
            Bip32Coin::ZCash(Network::Mainnet) => &config.zcash,
            Bip32Coin::ZCash(Network::Testnet) => &config.zcash_testnet,
            Bip32Coin::Ethereum => &config.ethereum,
        }
    }

    fn account_path(self, index: u32) -> Vec<ChildNumber> {
        match self {
            Bip32Coin::Ethereum => vec![ChildNumber::Normal(index)],
            _ => vec![ChildNumber::Hardened(index), ChildNumber::Normal(0), ChildNumber::Normal(0)],
        }
    }

    pub fn address(self, node: &HdKeyNode) -> Result<String> {
        match self {
            Bip32Coin::Bitcoin(network) => address::segwit_address(&node.public_key(), network),
            Bip32Coin::ZCash(network) => address::zcash_transparent_address(&node.public_key(), network),
            Bip32Coin::Ethereum => address::ethereum_address(&node.uncompressed_public_key()),
        }
    }

    fn wif_version(self) -> u8 {
        match self {
            Bip32Coin::Bitcoin(Network::Testnet) | Bip32Coin::ZCash(Network::Testnet) => WIF_TESTNET,
            _ => WIF_MAINNET,
        }
    }

    fn same_address(self, a: &str, b: &str) -> bool {
        match self {
            Bip32Coin::Ethereum => a.eq_ignore_ascii_case(b),
            _ => a == b,
        }
    }
}

struct Bip32Account {
    address: String,
    node: HdKeyNode,
}

pub struct Bip32Keyring {
    coin: Bip32Coin,
    root: Option<HdKeyNode>,
    accounts: Vec<Bip32Account>,
    imported: Vec<Bip32Account>,
}

impl Bip32Keyring {
    pub fn from_seed(seed: &[u8], coin: Bip32Coin, root_path: &str) -> Result<Self> {
        let root = HdKeyNode::generate_from_seed(seed)?.derive_child_from_path(root_path)?;
        info!("BIP32 keyring root constructed at {} for {:?}", root.path(), coin);
        Ok(Self {
            coin,
            root: Some(root),
            accounts: Vec::new(),
            imported: Vec::new(),
        })
    }

    /// Root node of the account tree, if unlocked.
    pub fn root(&self) -> Option<&HdKeyNode> {
        self.root.as_ref()
    }

    pub fn coin(&self) -> Bip32Coin {
        self.coin
    }

    fn derive_account(&self, index: u32) -> Result<Bip32Account> {
        let mut node = self.root.as_ref().ok_or(KeyringError::KeyringLocked)?.clone();
        for child in self.coin.account_path(index) {
            node = node.derive_child(child)?;
        }
        Ok(Bip32Account {
            address: self.coin.address(&node)?,
            node,
        })
    }

    fn find(&self, address: &str) -> Option<&Bip32Account> {
        self.accounts
            .iter()
            .chain(self.imported.iter())
            .find(|account| self.coin.same_address(&account.address, address))
    }

    pub fn import_account(&mut self, private_key: &[u8]) -> Result<String> {
        let node = HdKeyNode::generate_from_private_key(private_key)?;
        self.insert_imported(node)
    }

    fn insert_imported(&mut self, node: HdKeyNode) -> Result<String> {
        let address = self.coin.address(&node)?;
        if self.find(&address).is_some() {
            return Err(KeyringError::DuplicateAccount(address));
        }
        info!("Imported {:?} account {}", self.coin, address);
        self.imported.push(Bip32Account {
            address: address.clone(),
            node,
        });
        Ok(address)
    }

    /// Import from WIF; the version byte must match this keyring's network.
    pub fn import_wif(&mut self, wif: &str) -> Result<String> {
        let parsed = HdKeyNode::from_wif(wif)?;
        if parsed.version != self.coin.wif_version() {
            return Err(KeyringError::UnrecognizedVersion(u32::from(parsed.version)));
        }
        self.insert_imported(parsed.node)
    }

    pub fn remove_imported_account(&mut self, address: &str) -> bool {
        let coin = self.coin;
        let before = self.imported.len();
        self.imported.retain(|account| !coin.same_address(&account.address, address));
        before != self.imported.len()
    }

    /// WIF for UTXO coins, lowercase hex for Ethereum. `None` for unknown addresses.
    pub fn export_private_key(&self, address: &str) -> Option<Zeroizing<String>> {
        let account = self.find(address)?;
        match self.coin {
            Bip32Coin::Ethereum => {
                let mut secret = account.node.secret_key().ok()?;
                let bytes = Zeroizing::new(secret.secret_bytes());
                secret.non_secure_erase();
                Some(Zeroizing::new(hex::encode(*bytes)))
            }
            coin => account.node.export_wif(coin.wif_version(), true).ok(),
        }
    }

    pub fn public_key(&self, address: &str) -> Option<[u8; 33]> {
        self.find(address).map(|account| account.node.public_key())
    }

    /// Recoverable signature over a 32-byte hash: `r || s || recovery_id`.
    pub fn sign_message(&self, address: &str, msg_hash: &[u8]) -> Result<[u8; 65]> {
        let account = self
            .find(address)
            .ok_or_else(|| KeyringError::UnknownAccount(address.to_string()))?;
        let (signature, recovery_id) = account.node.sign_compact(msg_hash)?;
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature);
        out[64] = recovery_id;
        Ok(out)
    }
}

impl ChainKeyring for Bip32Keyring {
    fn add_accounts(&mut self, count: usize) -> Result<Vec<String>> {
        let mut added = Vec::with_capacity(count);
        for _ in 0..count {
            let index = u32::try_from(self.accounts.len()).map_err(|_| KeyringError::SeedOrAccountLimitExceeded)?;
            let account = self.derive_account(index)?;
            if self.accounts.iter().any(|a| self.coin.same_address(&a.address, &account.address)) {
                return Err(KeyringError::DuplicateAccount(account.address));
            }
            let coin = self.coin;
            let before = self.imported.len();
            self.imported.retain(|a| !coin.same_address(&a.address, &account.address));
            if self.imported.len() != before {
                info!("{:?} account {} now derived, dropping imported copy", coin, account.address);
            }
            debug!("{:?} account {} derived", self.coin, index);
            added.push(account.address.clone());
            self.accounts.push(account);
        }
        Ok(added)
    }

    fn remove_account(&mut self) -> Option<String> {
        self.accounts.pop().map(|account| account.address.clone())
    }

    fn accounts(&self) -> Vec<String> {
        self.accounts
            .iter()
            .chain(self.imported.iter())
            .map(|account| account.address.clone())
            .collect()
    }

    fn address_at(&self, index: u32) -> Option<String> {
        self.accounts.get(index as usize).map(|account| account.address.clone())
    }

    fn sign_message(&self, address: &str, message: &[u8]) -> Result<Vec<u8>> {
        Bip32Keyring::sign_message(self, address, message).map(|sig| sig.to_vec())
    }

    fn lock(&mut self) {
        self.root = None;
        self.accounts.clear();
        self.imported.clear();
        info!("{:?} keyring locked", self.coin);
    }

    fn is_locked(&self) -> bool {
        self.root.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: [u8; 32] = [0x42; 32];

    fn keyring(coin: Bip32Coin) -> Bip32Keyring {
        let config = DerivationConfig::default();
        Bip32Keyring::from_seed(&SEED, coin, coin.root_path(&config)).unwrap()
    }

    #[test]
    fn test_bitcoin_account_layout() {
        let mut k = keyring(Bip32Coin::Bitcoin(Network::Mainnet));
        let added = k.add_accounts(2).unwrap();
        let node = HdKeyNode::generate_from_seed(&SEED)
            .unwrap()
            .derive_child_from_path("m/84'/0'/1'/0/0")
            .unwrap();
        assert_eq!(added[1], address::segwit_address(&node.public_key(), Network::Mainnet).unwrap());
        assert!(added[0].starts_with("bc1q"));
    }

    #[test]
    fn test_ethereum_account_layout() {
        let mut k = keyring(Bip32Coin::Ethereum);
        let added = k.add_accounts(1).unwrap();
        let node = HdKeyNode::generate_from_seed(&SEED)
            .unwrap()
            .derive_child_from_path("m/44'/60'/0'/0/0")
            .unwrap();
        assert_eq!(added[0], address::ethereum_address(&node.public_key()).unwrap());
        assert_eq!(k.public_key(&added[0].to_lowercase()), Some(node.public_key()));
    }

    #[test]
    fn test_zcash_addresses() {
        let mut k = keyring(Bip32Coin::ZCash(Network::Mainnet));
        assert!(k.add_accounts(1).unwrap()[0].starts_with("t1"));
    }

    #[test]
    fn test_import_export_wif() {
        let mut k = keyring(Bip32Coin::Bitcoin(Network::Mainnet));
        let address = k.import_account(&[0x07u8; 32]).unwrap();
        let wif = k.export_private_key(&address).unwrap();

        let mut other = keyring(Bip32Coin::Bitcoin(Network::Mainnet));
        assert_eq!(other.import_wif(&wif).unwrap(), address);
        assert_eq!(
            other.import_wif(&wif).unwrap_err(),
            KeyringError::DuplicateAccount(address.clone())
        );

        let mut testnet = keyring(Bip32Coin::Bitcoin(Network::Testnet));
        assert_eq!(
            testnet.import_wif(&wif).unwrap_err(),
            KeyringError::UnrecognizedVersion(0x80)
        );
        assert!(k.remove_imported_account(&address));
        assert!(k.export_private_key(&address).is_none());
    }

    #[test]
    fn test_imported_wif_keeps_key() {
        let mut source = keyring(Bip32Coin::Bitcoin(Network::Mainnet));
        let address = source.import_account(&[0x09u8; 32]).unwrap();
        let wif = source.export_private_key(&address).unwrap();

        let mut k = keyring(Bip32Coin::Bitcoin(Network::Mainnet));
        assert_eq!(k.import_wif(&wif).unwrap(), address);
        assert_eq!(k.public_key(&address), source.public_key(&address));
        let hash = [0x33u8; 32];
        assert_eq!(
            k.sign_message(&address, &hash).unwrap(),
            source.sign_message(&address, &hash).unwrap()
        );
        assert_eq!(k.export_private_key(&address).unwrap().as_str(), wif.as_str());
    }

    #[test]
    fn test_zcash_networks_use_distinct_coin_types() {
        let mut mainnet = keyring(Bip32Coin::ZCash(Network::Mainnet));
        let mut testnet = keyring(Bip32Coin::ZCash(Network::Testnet));
        assert_eq!(mainnet.root().unwrap().path(), "m/44'/133'");
        assert_eq!(testnet.root().unwrap().path(), "m/44'/1'");

        let main_address = mainnet.add_accounts(1).unwrap().remove(0);
        let test_address = testnet.add_accounts(1).unwrap().remove(0);
        assert!(test_address.starts_with("tm"));
        assert_ne!(mainnet.public_key(&main_address), testnet.public_key(&test_address));

        let expected = HdKeyNode::generate_from_seed(&SEED)
            .unwrap()
            .derive_child_from_path("m/44'/1'/0'/0/0")
            .unwrap();
        assert_eq!(testnet.public_key(&test_address), Some(expected.public_key()));
    }

    #[test]
    fn test_derived_account_replaces_imported_copy() {
        let node = HdKeyNode::generate_from_seed(&SEED)
            .unwrap()
            .derive_child_from_path("m/84'/0'/0'/0/0")
            .unwrap();
        let secret = node.secret_key().unwrap().secret_bytes();

        let mut k = keyring(Bip32Coin::Bitcoin(Network::Mainnet));
        let imported = k.import_account(&secret).unwrap();
        let added = k.add_accounts(1).unwrap();
        assert_eq!(added, vec![imported.clone()]);
        assert_eq!(k.accounts(), vec![imported.clone()]);
        assert!(!k.remove_imported_account(&imported));
        assert_eq!(k.address_at(0), Some(imported));
    }

    #[test]
    fn test_ethereum_export_is_hex() {
        let mut k = keyring(Bip32Coin::Ethereum);
        let address = k.import_account(&[0x07u8; 32]).unwrap();
        assert_eq!(k.export_private_key(&address).unwrap().as_str(), hex::encode([0x07u8; 32]));
    }

    #[test]
    fn test_sign_recovers_to_account_key() {
        let mut k = keyring(Bip32Coin::Ethereum);
        let address = k.add_accounts(1).unwrap().remove(0);
        let hash = [0xabu8; 32];
        let sig = k.sign_message(&address, &hash).unwrap();
        let recovered = HdKeyNode::recover_compact(true, &hash, &sig[..64], sig[64]);
        assert_eq!(recovered, k.public_key(&address).unwrap().to_vec());
        assert_eq!(
            k.sign_message(&address, &[0u8; 31]).unwrap_err(),
            KeyringError::InvalidInputLength { expected: 32, actual: 31 }
        );
        assert!(matches!(
            k.sign_message("0xdead", &hash),
            Err(KeyringError::UnknownAccount(_))
        ));
    }
}
