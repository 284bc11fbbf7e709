use std::sync::Arc;
use std::thread;

use multichain_keyring::core::config::PolkadotConfig;
use multichain_keyring::encoding::ss58;
use multichain_keyring::keyring::polkadot::{PolkadotKeyring, SUBSTRATE_SIGNING_CONTEXT};
use multichain_keyring::keyring::substrate::SubstrateKeyring;
use multichain_keyring::{ChainKeyring, KeyringError};
use pretty_assertions::assert_eq;

const SEED: [u8; 32] = [0x7du8; 32];

#[test]
fn test_concurrent_readers_share_one_keypair() {
    let keyring = Arc::new(PolkadotKeyring::from_seed(&SEED, PolkadotConfig::default().mainnet).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let keyring = Arc::clone(&keyring);
            thread::spawn(move || keyring.ensure_keypair(5).unwrap())
        })
        .collect();
    let keypairs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for keypair in &keypairs[1..] {
        assert!(Arc::ptr_eq(&keypairs[0], keypair));
    }
    assert!(Arc::ptr_eq(&keypairs[0], &keyring.ensure_keypair(5).unwrap()));
}

#[test]
fn test_addresses_decode_to_account_keys() {
    let mut keyring = PolkadotKeyring::from_seed(&SEED, PolkadotConfig::default().mainnet).unwrap();
    let accounts = keyring.add_accounts(2).unwrap();
    for (index, address) in accounts.iter().enumerate() {
        let decoded = ss58::decode(address).unwrap();
        assert_eq!(decoded.prefix, 0);
        assert_eq!(decoded.public_key, keyring.get_public_key(index as u32).unwrap());
    }
    assert_eq!(keyring.get_address(0, 2).unwrap(), ss58::encode(2, &keyring.get_public_key(0).unwrap()).unwrap());
}

#[test]
fn test_signature_verifies_with_schnorrkel() {
    let keyring = PolkadotKeyring::from_seed(&SEED, PolkadotConfig::default().testnet).unwrap();
    let signature = keyring.sign_message(b"payload", 0).unwrap();

    let public = schnorrkel::PublicKey::from_bytes(&keyring.get_public_key(0).unwrap()).unwrap();
    let signature = schnorrkel::Signature::from_bytes(&signature).unwrap();
    assert!(public
        .verify_simple(SUBSTRATE_SIGNING_CONTEXT, b"payload", &signature)
        .is_ok());
}

#[test]
fn test_sign_by_address_requires_managed_account() {
    let mut keyring = PolkadotKeyring::from_seed(&SEED, PolkadotConfig::default().testnet).unwrap();
    let accounts = keyring.add_accounts(1).unwrap();
    assert!(ChainKeyring::sign_message(&keyring, &accounts[0], b"m").is_ok());

    let stranger = keyring.get_address(9, 42).unwrap();
    assert_eq!(
        ChainKeyring::sign_message(&keyring, &stranger, b"m").unwrap_err(),
        KeyringError::UnknownAccount(stranger)
    );
}

#[test]
fn test_sr25519_and_ed25519_keyrings_disagree() {
    let network = PolkadotConfig::default().testnet;
    let sr = PolkadotKeyring::from_seed(&SEED, network.clone()).unwrap();
    let ed = SubstrateKeyring::from_seed(&SEED, network).unwrap();
    assert!(ed.get_address(0, 42).unwrap().starts_with('5'));
    assert_ne!(sr.get_address(0, 42).unwrap(), ed.get_address(0, 42).unwrap());
}
