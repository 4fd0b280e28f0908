//! Hybrid request/response envelopes.
//!
//! A fresh AES-256-GCM key encrypts the payload; that key is wrapped with
//! RSA-OAEP under the recipient's public key. The header fields and the
//! wrapped key are bound into the AEAD associated data, so the envelope can
//! only be opened as produced.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use cmt_proto::v1::{CipherSuiteV1, CmtEnvelopeV1, KeyWrapAlgorithmV1, ENVELOPE_VERSION};
use cmt_proto::validation::{MAX_ENCRYPTED_KEY_LEN, MAX_ENVELOPE_LEN};
use prost::Message;
use tracing::{debug, warn};

use crate::asymmetric::AsymmetricKeyManager;
use crate::error::CryptoError;
use crate::key_encoding::{strip_ascii_whitespace, AsymmetricPublicKey, KeyEncoder};
use crate::symmetric::SymmetricKeyManager;
use crate::transcript::{tags, Transcript};

/// Headroom for protobuf framing, nonce and tag.
const ENVELOPE_OVERHEAD: usize = MAX_ENCRYPTED_KEY_LEN + 512;

/// Largest plaintext that still fits in an envelope.
pub const MAX_PAYLOAD_LEN: usize = MAX_ENVELOPE_LEN - ENVELOPE_OVERHEAD;

/// Deterministic AAD for CmtEnvelopeV1.
/// Covers everything in the envelope except the nonce and the ciphertext.
pub fn envelope_aad_v1(env: &CmtEnvelopeV1) -> Vec<u8> {
    let mut t = Transcript::new("cmt_env_aad_v1");
    t.append_u32(tags::VERSION, env.version);
    t.append_u32(tags::KEY_WRAP, env.key_wrap as u32);
    t.append_u32(tags::CIPHER, env.cipher as u32);
    t.append_bytes(tags::ENCRYPTED_KEY, &env.encrypted_key);
    t.as_bytes().to_vec()
}

/// Serialize an envelope to its transport string.
pub fn encode_envelope(env: &CmtEnvelopeV1) -> String {
    STANDARD.encode(env.encode_to_vec())
}

/// Parse and structurally validate a transport string.
///
/// Every failure here is `MalformedEnvelope`; no cryptographic work happens.
/// Only the canonical encoding is accepted: unknown, repeated or reordered
/// fields are rejected.
pub fn decode_envelope(encoded: &str) -> Result<CmtEnvelopeV1, CryptoError> {
    // Base64 plus line breaks never needs twice the decoded size
    if encoded.len() > 2 * MAX_ENVELOPE_LEN {
        return Err(CryptoError::MalformedEnvelope("envelope too large".to_string()));
    }
    let compact = strip_ascii_whitespace(encoded);
    if compact.is_empty() {
        return Err(CryptoError::MalformedEnvelope("empty envelope".to_string()));
    }
    // Reject before allocating for the decoded form
    if compact.len() / 4 * 3 > MAX_ENVELOPE_LEN + 3 {
        return Err(CryptoError::MalformedEnvelope("envelope too large".to_string()));
    }

    let bytes = STANDARD.decode(compact.as_bytes())?;
    if bytes.len() > MAX_ENVELOPE_LEN {
        return Err(CryptoError::MalformedEnvelope("envelope too large".to_string()));
    }

    let env = CmtEnvelopeV1::decode(bytes.as_slice())?;
    if env.encode_to_vec() != bytes {
        return Err(CryptoError::MalformedEnvelope(
            "non-canonical envelope encoding".to_string(),
        ));
    }
    env.validate()?;
    Ok(env)
}

/// Builds request envelopes and opens response envelopes.
///
/// Holds no state of its own; safe to share across threads.
pub struct EnvelopeProducer {
    asymmetric: Arc<AsymmetricKeyManager>,
    symmetric: Arc<SymmetricKeyManager>,
    encoder: KeyEncoder,
}

impl EnvelopeProducer {
    pub fn new(asymmetric: Arc<AsymmetricKeyManager>, symmetric: Arc<SymmetricKeyManager>) -> Self {
        Self {
            asymmetric,
            symmetric,
            encoder: KeyEncoder::default(),
        }
    }

    pub fn with_encoder(mut self, encoder: KeyEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// Encrypt `plaintext` for the holder of `counterparty_public_key`
    /// (base64 DER SubjectPublicKeyInfo) and return the envelope string.
    pub fn prepare_request_payload(
        &self,
        plaintext: &str,
        counterparty_public_key: &str,
    ) -> Result<String, CryptoError> {
        let recipient = self
            .encoder
            .decode_public_key(counterparty_public_key)
            .map_err(|e| {
                warn!(reason = %e, "rejected counterparty public key");
                CryptoError::InvalidCounterpartyKey
            })?;

        let env = self.seal(plaintext.as_bytes(), &recipient)?;
        let encoded = encode_envelope(&env);
        debug!(
            recipient = %recipient.fingerprint(),
            key_wrap = KeyWrapAlgorithmV1::RsaOaepSha256.as_str_name(),
            cipher = CipherSuiteV1::Aes256Gcm.as_str_name(),
            payload_len = plaintext.len(),
            envelope_len = encoded.len(),
            "prepared request envelope"
        );
        Ok(encoded)
    }

    /// Open an envelope addressed to this client's key pair.
    pub fn parse_response_payload(&self, envelope: &str) -> Result<String, CryptoError> {
        let result = decode_envelope(envelope)
            .and_then(|env| {
                debug!(
                    key_wrap = env.key_wrap_algorithm().map(|a| a.as_str_name()).unwrap_or("UNKNOWN"),
                    cipher = env.cipher_suite().map(|c| c.as_str_name()).unwrap_or("UNKNOWN"),
                    encrypted_key_len = env.encrypted_key.len(),
                    "opening response envelope"
                );
                self.open(&env)
            })
            .and_then(|plaintext| String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidEncoding));

        match &result {
            Ok(plaintext) => debug!(
                envelope_len = envelope.len(),
                payload_len = plaintext.len(),
                "parsed response envelope"
            ),
            Err(e) => warn!(code = e.code(), "failed to parse response envelope"),
        }
        result
    }

    /// Seal raw bytes into an envelope under a fresh ephemeral key.
    pub fn seal(
        &self,
        plaintext: &[u8],
        recipient: &AsymmetricPublicKey,
    ) -> Result<CmtEnvelopeV1, CryptoError> {
        if plaintext.len() > MAX_PAYLOAD_LEN {
            return Err(CryptoError::PayloadTooLarge {
                len: plaintext.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }

        let key = self.symmetric.generate_ephemeral_key()?;
        let encrypted_key = {
            let key_bytes = self.symmetric.export_key_bytes(&key)?;
            self.asymmetric.encrypt_with_public_key(&key_bytes[..], recipient)?
        };

        let mut env = CmtEnvelopeV1 {
            version: ENVELOPE_VERSION,
            key_wrap: KeyWrapAlgorithmV1::RsaOaepSha256 as i32,
            cipher: CipherSuiteV1::Aes256Gcm as i32,
            encrypted_key,
            nonce: Vec::new(),
            ciphertext: Vec::new(),
        };

        let aad = envelope_aad_v1(&env);
        let (nonce, ciphertext) = self.symmetric.encrypt_with_aad(plaintext, &aad, &key)?;
        env.nonce = nonce.to_vec();
        env.ciphertext = ciphertext;
        Ok(env)
    }

    /// Unwrap the symmetric key with the managed private key and decrypt.
    ///
    /// Expects an envelope that already passed structural validation.
    pub fn open(&self, env: &CmtEnvelopeV1) -> Result<Vec<u8>, CryptoError> {
        let key_bytes = self.asymmetric.decrypt_with_private_key(&env.encrypted_key)?;
        let key = self
            .symmetric
            .import_key(&key_bytes)
            .map_err(|_| CryptoError::DecryptionFailed)?;

        let aad = envelope_aad_v1(env);
        self.symmetric
            .decrypt_with_aad(&env.nonce, &env.ciphertext, &aad, &key)
    }
}
