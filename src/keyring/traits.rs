use crate::core::config::{KeyringConfig, SubstrateNetwork};
use crate::core::errors::Result;
use crate::encoding::address::Network;
use crate::keyring::bip32_keyring::{Bip32Coin, Bip32Keyring};
use crate::keyring::polkadot::PolkadotKeyring;
use crate::keyring::solana::SolanaKeyring;
use crate::keyring::substrate::SubstrateKeyring;

/// Account management shared by every chain family.
///
/// Mutating calls must be serialized by the caller. Read-only calls may run
/// concurrently once the account set is stable.
pub trait ChainKeyring {
    /// Derive the next `count` sequential accounts and return their addresses.
    fn add_accounts(&mut self, count: usize) -> Result<Vec<String>>;

    /// Drop the most recently derived account. Imported accounts are untouched.
    fn remove_account(&mut self) -> Option<String>;

    /// Derived accounts in creation order, then imported ones.
    fn accounts(&self) -> Vec<String>;

    fn address_at(&self, index: u32) -> Option<String>;

    /// Sign with the account owning `address`.
    fn sign_message(&self, address: &str, message: &[u8]) -> Result<Vec<u8>>;

    /// Wipe all key material. Later operations fail with `KeyringLocked`.
    fn lock(&mut self);

    fn is_locked(&self) -> bool;
}

/// One keyring per chain family, owned by the wallet session.
pub enum Keyring {
    Bip32(Bip32Keyring),
    SolanaEd25519(SolanaKeyring),
    PolkadotSr25519(PolkadotKeyring),
    SubstrateEd25519(SubstrateKeyring),
}

impl Keyring {
    pub fn bip32(seed: &[u8], coin: Bip32Coin, config: &KeyringConfig) -> Result<Self> {
        Bip32Keyring::from_seed(seed, coin, coin.root_path(&config.derivation)).map(Keyring::Bip32)
    }

    pub fn solana(seed: &[u8], config: &KeyringConfig) -> Result<Self> {
        SolanaKeyring::from_seed(seed, &config.derivation.solana).map(Keyring::SolanaEd25519)
    }

    pub fn polkadot(seed: &[u8], network: Network, config: &KeyringConfig) -> Result<Self> {
        PolkadotKeyring::from_seed(seed, substrate_network(network, config)).map(Keyring::PolkadotSr25519)
    }

    pub fn substrate_ed25519(seed: &[u8], network: Network, config: &KeyringConfig) -> Result<Self> {
        SubstrateKeyring::from_seed(seed, substrate_network(network, config)).map(Keyring::SubstrateEd25519)
    }

    fn inner(&self) -> &dyn ChainKeyring {
        match self {
            Keyring::Bip32(k) => k as &dyn ChainKeyring,
            Keyring::SolanaEd25519(k) => k as &dyn ChainKeyring,
            Keyring::PolkadotSr25519(k) => k as &dyn ChainKeyring,
            Keyring::SubstrateEd25519(k) => k as &dyn ChainKeyring,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ChainKeyring {
        match self {
            Keyring::Bip32(k) => k as &mut dyn ChainKeyring,
            Keyring::SolanaEd25519(k) => k as &mut dyn ChainKeyring,
            Keyring::PolkadotSr25519(k) => k as &mut dyn ChainKeyring,
            Keyring::SubstrateEd25519(k) => k as &mut dyn ChainKeyring,
        }
    }
}

fn substrate_network(network: Network, config: &KeyringConfig) -> SubstrateNetwork {
    match network {
        Network::Mainnet => config.polkadot.mainnet.clone(),
        Network::Testnet => config.polkadot.testnet.clone(),
    }
}

impl ChainKeyring for Keyring {
    fn add_accounts(&mut self, count: usize) -> Result<Vec<String>> {
        self.inner_mut().add_accounts(count)
    }

    fn remove_account(&mut self) -> Option<String> {
        self.inner_mut().remove_account()
    }

    fn accounts(&self) -> Vec<String> {
        self.inner().accounts()
    }

    fn address_at(&self, index: u32) -> Option<String> {
        self.inner().address_at(index)
    }

    fn sign_message(&self, address: &str, message: &[u8]) -> Result<Vec<u8>> {
        self.inner().sign_message(address, message)
    }

    fn lock(&mut self) {
        self.inner_mut().lock()
    }

    fn is_locked(&self) -> bool {
        self.inner().is_locked()
    }
}

impl From<Bip32Keyring> for Keyring {
    fn from(k: Bip32Keyring) -> Self {
        Keyring::Bip32(k)
    }
}

impl From<SolanaKeyring> for Keyring {
    fn from(k: SolanaKeyring) -> Self {
        Keyring::SolanaEd25519(k)
    }
}

impl From<PolkadotKeyring> for Keyring {
    fn from(k: PolkadotKeyring) -> Self {
        Keyring::PolkadotSr25519(k)
    }
}

impl From<SubstrateKeyring> for Keyring {
    fn from(k: SubstrateKeyring) -> Self {
        Keyring::SubstrateEd25519(k)
    }
}
