use std::sync::Arc;

use proptest::prelude::*;

use crate::asymmetric::{AsymmetricKeyManager, DEFAULT_KEY_PAIR_ALIAS};
use crate::envelope::{decode_envelope, encode_envelope, EnvelopeProducer};
use crate::error::CryptoError;
use crate::key_encoding::{AsymmetricPublicKey, KeyEncoder};
use crate::keystore::{AliasLocks, InMemoryKeyStore};
use crate::symmetric::SymmetricKeyManager;
use crate::test_support::{install_key_pair, rsa_key};

fn producer() -> (EnvelopeProducer, Arc<SymmetricKeyManager>, String) {
    let store = Arc::new(InMemoryKeyStore::new());
    install_key_pair(&store, DEFAULT_KEY_PAIR_ALIAS, rsa_key(0));
    let locks = Arc::new(AliasLocks::new());
    let asym = Arc::new(AsymmetricKeyManager::new(store.clone(), locks.clone()));
    let sym = Arc::new(SymmetricKeyManager::new(store, locks));

    let public = AsymmetricPublicKey::from_rsa(rsa_key(0).to_public_key()).unwrap();
    let encoded = KeyEncoder::default().encode_public_key(&public);
    (EnvelopeProducer::new(asym, sym.clone()), sym, encoded)
}

proptest! {
    // RSA operations dominate; keep the case count modest.
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_envelope_round_trip(plaintext in any::<String>()) {
        let (p, _, public) = producer();
        let envelope = p.prepare_request_payload(&plaintext, &public).unwrap();
        prop_assert_eq!(p.parse_response_payload(&envelope).unwrap(), plaintext);
    }

    #[test]
    fn test_ciphertext_bit_flip_never_succeeds(
        plaintext in "[ -~]{0,64}",
        byte in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let (p, _, public) = producer();
        let mut env = decode_envelope(&p.prepare_request_payload(&plaintext, &public).unwrap()).unwrap();
        let i = byte.index(env.ciphertext.len());
        env.ciphertext[i] ^= 1 << bit;

        prop_assert_eq!(
            p.parse_response_payload(&encode_envelope(&env)),
            Err(CryptoError::AuthenticationFailed)
        );
    }

    #[test]
    fn test_encrypted_key_bit_flip_never_succeeds(
        byte in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let (p, _, public) = producer();
        let mut env = decode_envelope(&p.prepare_request_payload("{}", &public).unwrap()).unwrap();
        let i = byte.index(env.encrypted_key.len());
        env.encrypted_key[i] ^= 1 << bit;

        let result = p.parse_response_payload(&encode_envelope(&env));
        prop_assert!(matches!(
            result,
            Err(CryptoError::DecryptionFailed) | Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_nonce_unique_per_encryption(plaintext in any::<Vec<u8>>()) {
        let (_, sym, _) = producer();
        let key = sym.generate_ephemeral_key().unwrap();
        let (n1, c1) = sym.encrypt(&plaintext, &key).unwrap();
        let (n2, c2) = sym.encrypt(&plaintext, &key).unwrap();
        prop_assert_ne!(n1, n2);
        prop_assert_ne!(c1, c2);
    }

    #[test]
    fn test_parse_arbitrary_input_never_panics(input in any::<String>()) {
        let (p, _, _) = producer();
        prop_assert!(p.parse_response_payload(&input).is_err());
    }

    #[test]
    fn test_public_key_decode_arbitrary_bytes(bytes in any::<Vec<u8>>()) {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        let encoded = STANDARD.encode(&bytes);
        prop_assert!(KeyEncoder::default().decode_public_key(&encoded).is_err());
    }
}
