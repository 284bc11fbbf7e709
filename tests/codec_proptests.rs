use multichain_keyring::core::bip32::{ExtendedKeyVersion, HdKeyNode};
use multichain_keyring::core::derivation_path::{ChildNumber, DerivationPath};
use multichain_keyring::encoding::{base58, ss58};
use multichain_keyring::KeyringError;
use proptest::prelude::*;

proptest! {
    #[test]
    fn base58_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let encoded = base58::encode(&bytes);
        prop_assert_eq!(base58::decode(&encoded, bytes.len(), true).unwrap(), bytes);
    }

    #[test]
    fn base58_preserves_leading_zeros(zeros in 0usize..8, tail in proptest::collection::vec(1u8..=255, 0..16)) {
        let mut bytes = vec![0u8; zeros];
        bytes.extend_from_slice(&tail);
        let encoded = base58::encode(&bytes);
        prop_assert!(encoded.starts_with(&"1".repeat(zeros)));
        prop_assert_eq!(base58::decode(&encoded, 64, false).unwrap(), bytes);
    }

    #[test]
    fn base58check_round_trip(bytes in proptest::collection::vec(any::<u8>(), 1..80)) {
        let encoded = base58::encode_with_check(&bytes);
        prop_assert_eq!(base58::decode_with_check(&encoded, bytes.len()).unwrap(), bytes);
    }

    #[test]
    fn ss58_round_trip(prefix in 0u16..=ss58::SS58_PREFIX_MAX, key in any::<[u8; 32]>()) {
        let encoded = ss58::encode(prefix, &key).unwrap();
        let decoded = ss58::decode(&encoded).unwrap();
        prop_assert_eq!(decoded.prefix, prefix);
        prop_assert_eq!(decoded.public_key, key);
    }

    #[test]
    fn ss58_corrupted_checksum_rejected(prefix in 0u16..64, key in any::<[u8; 32]>()) {
        let encoded = ss58::encode(prefix, &key).unwrap();
        let mut raw = base58::decode(&encoded, 35, true).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let corrupted = base58::encode(&raw);
        prop_assert_eq!(ss58::decode(&corrupted).unwrap_err(), KeyringError::ChecksumMismatch);
    }

    #[test]
    fn path_display_round_trip(indices in proptest::collection::vec((0u32..0x8000_0000, any::<bool>()), 0..6)) {
        let mut path = DerivationPath::master();
        for (index, hardened) in indices {
            let child = if hardened { ChildNumber::Hardened(index) } else { ChildNumber::Normal(index) };
            path = path.child(child);
        }
        let reparsed = DerivationPath::parse(&path.to_string()).unwrap();
        prop_assert_eq!(reparsed, path);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn extended_key_round_trip(
        seed in proptest::collection::vec(any::<u8>(), 16..=64),
        account in 0u32..1000,
        address in 0u32..1000,
    ) {
        let node = HdKeyNode::generate_from_seed(&seed)
            .unwrap()
            .derive_hardened_child(account)
            .unwrap()
            .derive_normal_child(address)
            .unwrap();

        let xprv = node.private_extended_key(ExtendedKeyVersion::Xprv).unwrap();
        let (version, parsed) = HdKeyNode::generate_from_extended_key(&xprv).unwrap();
        prop_assert_eq!(version, ExtendedKeyVersion::Xprv);
        prop_assert_eq!(parsed.public_key(), node.public_key());
        prop_assert_eq!(parsed.chain_code(), node.chain_code());
        prop_assert_eq!(parsed.child_index(), address);

        let xpub = node.public_extended_key(ExtendedKeyVersion::Xpub).unwrap();
        let (_, public) = HdKeyNode::generate_from_extended_key(&xpub).unwrap();
        prop_assert_eq!(
            public.derive_normal_child(3).unwrap().public_key(),
            node.derive_normal_child(3).unwrap().public_key()
        );
    }
}
