use serde::{Deserialize, Serialize};

use crate::core::derivation_path::DerivationPath;
use crate::core::errors::{KeyringError, Result};
use crate::crypto::kdf::KdfLimits;
use crate::encoding::ss58::SS58_PREFIX_MAX;

/// Root derivation paths per chain family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationConfig {
    #[serde(default = "DerivationConfig::default_bitcoin")]
    pub bitcoin: String,

    #[serde(default = "DerivationConfig::default_bitcoin_testnet")]
    pub bitcoin_testnet: String,

    #[serde(default = "DerivationConfig::default_zcash")]
    pub zcash: String,

    #[serde(default = "DerivationConfig::default_zcash_testnet")]
    pub zcash_testnet: String,

    #[serde(default = "DerivationConfig::default_ethereum")]
    pub ethereum: String,

    /// SLIP-0010 root; every segment must be hardened.
    #[serde(default = "DerivationConfig::default_solana")]
    pub solana: String,
}

impl DerivationConfig {
    fn default_bitcoin() -> String { "m/84'/0'".to_string() }
    fn default_bitcoin_testnet() -> String { "m/84'/1'".to_string() }
    fn default_zcash() -> String { "m/44'/133'".to_string() }
    fn default_zcash_testnet() -> String { "m/44'/1'".to_string() }
    fn default_ethereum() -> String { "m/44'/60'/0'/0".to_string() }
    fn default_solana() -> String { "m/44'/501'".to_string() }
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            bitcoin: Self::default_bitcoin(),
            bitcoin_testnet: Self::default_bitcoin_testnet(),
            zcash: Self::default_zcash(),
            zcash_testnet: Self::default_zcash_testnet(),
            ethereum: Self::default_ethereum(),
            solana: Self::default_solana(),
        }
    }
}

/// Substrate network label and SS58 prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstrateNetwork {
    /// First hard junction below the root, e.g. `//polkadot`.
    pub label: String,
    pub ss58_prefix: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolkadotConfig {
    #[serde(default = "PolkadotConfig::default_mainnet")]
    pub mainnet: SubstrateNetwork,

    #[serde(default = "PolkadotConfig::default_testnet")]
    pub testnet: SubstrateNetwork,
}

impl PolkadotConfig {
    fn default_mainnet() -> SubstrateNetwork {
        SubstrateNetwork { label: "polkadot".to_string(), ss58_prefix: 0 }
    }

    fn default_testnet() -> SubstrateNetwork {
        SubstrateNetwork { label: "westend".to_string(), ss58_prefix: 42 }
    }
}

impl Default for PolkadotConfig {
    fn default() -> Self {
        Self {
            mainnet: Self::default_mainnet(),
            testnet: Self::default_testnet(),
        }
    }
}

/// Resource caps for keystore KDFs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystoreConfig {
    #[serde(default = "KeystoreConfig::default_max_scrypt_memory_bytes")]
    pub max_scrypt_memory_bytes: u64,

    #[serde(default = "KeystoreConfig::default_max_scrypt_parallelism")]
    pub max_scrypt_parallelism: u32,

    #[serde(default = "KeystoreConfig::default_max_pbkdf2_iterations")]
    pub max_pbkdf2_iterations: u32,
}

impl KeystoreConfig {
    fn default_max_scrypt_memory_bytes() -> u64 { 256 * 1024 * 1024 }
    fn default_max_scrypt_parallelism() -> u32 { 16 }
    fn default_max_pbkdf2_iterations() -> u32 { 10_000_000 }

    pub fn limits(&self) -> KdfLimits {
        KdfLimits {
            max_scrypt_memory_bytes: self.max_scrypt_memory_bytes,
            max_scrypt_parallelism: self.max_scrypt_parallelism,
            max_pbkdf2_iterations: self.max_pbkdf2_iterations,
        }
    }
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            max_scrypt_memory_bytes: Self::default_max_scrypt_memory_bytes(),
            max_scrypt_parallelism: Self::default_max_scrypt_parallelism(),
            max_pbkdf2_iterations: Self::default_max_pbkdf2_iterations(),
        }
    }
}

/// Keyring configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyringConfig {
    #[serde(default)]
    pub derivation: DerivationConfig,

    #[serde(default)]
    pub polkadot: PolkadotConfig,

    #[serde(default)]
    pub keystore: KeystoreConfig,
}

impl KeyringConfig {
    /// Parse and validate a TOML document. Missing sections take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.derivation;
        for (name, path) in [
            ("bitcoin", &d.bitcoin),
            ("bitcoin_testnet", &d.bitcoin_testnet),
            ("zcash", &d.zcash),
            ("zcash_testnet", &d.zcash_testnet),
            ("ethereum", &d.ethereum),
            ("solana", &d.solana),
        ] {
            let parsed = DerivationPath::parse(path)
                .map_err(|_| KeyringError::ConfigError(format!("derivation.{} is not a valid path", name)))?;
            if name == "solana" && !parsed.is_fully_hardened() {
                return Err(KeyringError::ConfigError(
                    "derivation.solana must be fully hardened".to_string(),
                ));
            }
        }

        for (name, network) in [("mainnet", &self.polkadot.mainnet), ("testnet", &self.polkadot.testnet)] {
            if network.label.is_empty() {
                return Err(KeyringError::ConfigError(format!("polkadot.{}.label is empty", name)));
            }
            if network.ss58_prefix > SS58_PREFIX_MAX {
                return Err(KeyringError::ConfigError(format!(
                    "polkadot.{}.ss58_prefix out of range",
                    name
                )));
            }
        }

        let k = &self.keystore;
        if k.max_scrypt_memory_bytes == 0 || k.max_scrypt_parallelism == 0 || k.max_pbkdf2_iterations == 0 {
            return Err(KeyringError::ConfigError("keystore limits must be non-zero".to_string()));
        }
        Ok(())
    }
}
