use multichain_keyring::core::bip32::HdKeyNode;
use multichain_keyring::encoding::address::{self, Network};
use multichain_keyring::keyring::Bip32Coin;
use multichain_keyring::{ChainKeyring, Keyring, KeyringConfig, KeyringError};
use pretty_assertions::assert_eq;
use test_case::test_case;

const SEED: [u8; 64] = [0x2au8; 64];

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}

fn all_keyrings(config: &KeyringConfig) -> Vec<Keyring> {
    vec![
        Keyring::bip32(&SEED, Bip32Coin::Bitcoin(Network::Mainnet), config).unwrap(),
        Keyring::bip32(&SEED, Bip32Coin::ZCash(Network::Testnet), config).unwrap(),
        Keyring::bip32(&SEED, Bip32Coin::Ethereum, config).unwrap(),
        Keyring::solana(&SEED, config).unwrap(),
        Keyring::polkadot(&SEED, Network::Mainnet, config).unwrap(),
        Keyring::substrate_ed25519(&SEED, Network::Testnet, config).unwrap(),
    ]
}

#[test]
fn test_every_family_adds_signs_and_locks() {
    init_logging();
    let config = KeyringConfig::default();
    for mut keyring in all_keyrings(&config) {
        let added = keyring.add_accounts(1).unwrap();
        assert_eq!(keyring.accounts(), added);
        assert_eq!(keyring.address_at(0), Some(added[0].clone()));

        let signature = keyring.sign_message(&added[0], &[0x11u8; 32]).unwrap();
        assert!(signature.len() == 64 || signature.len() == 65);

        keyring.lock();
        assert!(keyring.is_locked());
        assert!(keyring.accounts().is_empty());
        assert_eq!(keyring.add_accounts(1).unwrap_err(), KeyringError::KeyringLocked);
    }
}

#[test]
fn test_derivation_is_deterministic() {
    let config = KeyringConfig::default();
    let first: Vec<_> = all_keyrings(&config)
        .into_iter()
        .map(|mut k| k.add_accounts(1).unwrap())
        .collect();
    let second: Vec<_> = all_keyrings(&config)
        .into_iter()
        .map(|mut k| k.add_accounts(1).unwrap())
        .collect();
    assert_eq!(first, second);
}

#[test_case(Bip32Coin::Bitcoin(Network::Mainnet), "bc1q")]
#[test_case(Bip32Coin::Bitcoin(Network::Testnet), "tb1q")]
#[test_case(Bip32Coin::ZCash(Network::Mainnet), "t1")]
#[test_case(Bip32Coin::ZCash(Network::Testnet), "tm")]
#[test_case(Bip32Coin::Ethereum, "0x")]
fn test_address_prefixes(coin: Bip32Coin, prefix: &str) {
    let mut keyring = Keyring::bip32(&SEED, coin, &KeyringConfig::default()).unwrap();
    let address = keyring.add_accounts(1).unwrap().remove(0);
    assert!(address.starts_with(prefix), "{address} should start with {prefix}");
}

#[test]
fn test_configured_root_path_is_used() {
    init_logging();
    let config = KeyringConfig::from_toml_str(
        r#"
        [derivation]
        bitcoin = "m/44'/0'"
        "#,
    )
    .unwrap();
    let mut keyring = Keyring::bip32(&SEED, Bip32Coin::Bitcoin(Network::Mainnet), &config).unwrap();
    let address = keyring.add_accounts(1).unwrap().remove(0);

    let node = HdKeyNode::generate_from_seed(&SEED)
        .unwrap()
        .derive_child_from_path("m/44'/0'/0'/0/0")
        .unwrap();
    assert_eq!(address, address::segwit_address(&node.public_key(), Network::Mainnet).unwrap());
}

#[test]
fn test_invalid_config_rejected() {
    let err = KeyringConfig::from_toml_str(
        r#"
        [derivation]
        solana = "m/44'/501'/0"
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, KeyringError::ConfigError(_)));

    assert!(matches!(
        KeyringConfig::from_toml_str("derivation = 5"),
        Err(KeyringError::ConfigError(_))
    ));
}

#[test]
fn test_remove_account_then_unknown() {
    let mut keyring = Keyring::solana(&SEED, &KeyringConfig::default()).unwrap();
    let added = keyring.add_accounts(2).unwrap();
    assert_eq!(keyring.remove_account(), Some(added[1].clone()));
    assert_eq!(
        keyring.sign_message(&added[1], b"x").unwrap_err(),
        KeyringError::UnknownAccount(added[1].clone())
    );
}

#[test]
fn test_checksum_address_known_key() {
    let node = HdKeyNode::generate_from_private_key(&{
        let mut key = [0u8; 32];
        key[31] = 1;
        key
    })
    .unwrap();
    assert_eq!(
        address::ethereum_address(&node.uncompressed_public_key()).unwrap(),
        "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
    );
    assert_eq!(
        address::p2pkh_address(&node.public_key(), Network::Mainnet).unwrap(),
        "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"
    );
}
