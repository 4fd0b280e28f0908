use proptest::prelude::*;
use prost::Message;

use crate::v1::{CipherSuiteV1, CmtEnvelopeV1, KeyWrapAlgorithmV1, ENVELOPE_VERSION};
use crate::validation::{MAX_ENCRYPTED_KEY_LEN, MIN_ENCRYPTED_KEY_LEN, NONCE_LEN, TAG_LEN};

prop_compose! {
    fn any_well_formed_envelope()(
        encrypted_key in prop::collection::vec(any::<u8>(), MIN_ENCRYPTED_KEY_LEN..=MAX_ENCRYPTED_KEY_LEN),
        nonce in prop::collection::vec(any::<u8>(), NONCE_LEN),
        ciphertext in prop::collection::vec(any::<u8>(), TAG_LEN..512),
    ) -> CmtEnvelopeV1 {
        CmtEnvelopeV1 {
            version: ENVELOPE_VERSION,
            key_wrap: KeyWrapAlgorithmV1::RsaOaepSha256 as i32,
            cipher: CipherSuiteV1::Aes256Gcm as i32,
            encrypted_key,
            nonce,
            ciphertext,
        }
    }
}

proptest! {
    // Arbitrary input must decode to an error or to something validation can judge.
    #[test]
    fn test_decode_arbitrary_bytes_never_panics(bytes in any::<Vec<u8>>()) {
        if let Ok(env) = CmtEnvelopeV1::decode(bytes.as_slice()) {
            let _ = env.validate();
        }
    }

    #[test]
    fn test_well_formed_envelope_survives_wire(env in any_well_formed_envelope()) {
        let bytes = env.encode_to_vec();
        let decoded = CmtEnvelopeV1::decode(bytes.as_slice()).unwrap();
        prop_assert!(decoded.validate().is_ok());
        prop_assert_eq!(decoded, env);
    }

    // Cutting the encoding anywhere inside the last field must not yield a valid envelope.
    #[test]
    fn test_truncated_envelope_rejected(env in any_well_formed_envelope(), cut in 1usize..TAG_LEN) {
        let bytes = env.encode_to_vec();
        let truncated = &bytes[..bytes.len() - cut];
        let valid = CmtEnvelopeV1::decode(truncated)
            .map(|e| e.validate().is_ok())
            .unwrap_or(false);
        prop_assert!(!valid);
    }
}
