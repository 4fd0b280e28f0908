//! Error taxonomy for key management and envelope operations.
//!
//! Messages are safe to surface to the host runtime: they never carry key
//! material, plaintext or raw cipher state.

use thiserror::Error;

/// Errors raised by the crypto core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(&'static str),

    #[error("invalid counterparty public key")]
    InvalidCounterpartyKey,

    #[error("payload too large: {len} bytes exceeds limit of {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("encryption failed")]
    EncryptionFailed,

    /// Deliberately carries no detail: padding and wrong-key failures must
    /// look identical to the caller.
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("no key initialized under alias '{alias}'")]
    UninitializedKey { alias: String },

    #[error("decrypted payload is not valid UTF-8")]
    InvalidEncoding,

    #[error("secure key store unavailable: {0}")]
    KeyStoreUnavailable(String),

    #[error("key encoding failed")]
    Encoding,

    #[error("key generation failed")]
    KeyGeneration,
}

impl CryptoError {
    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidKeyFormat(_) => "ERR_INVALID_KEY_FORMAT",
            Self::InvalidCounterpartyKey => "ERR_INVALID_COUNTERPARTY_KEY",
            Self::PayloadTooLarge { .. } => "ERR_PAYLOAD_TOO_LARGE",
            Self::EncryptionFailed => "ERR_ENCRYPTION_FAILED",
            Self::DecryptionFailed => "ERR_DECRYPTION_FAILED",
            Self::AuthenticationFailed => "ERR_AUTHENTICATION_FAILED",
            Self::MalformedEnvelope(_) => "ERR_MALFORMED_ENVELOPE",
            Self::UninitializedKey { .. } => "ERR_UNINITIALIZED_KEY",
            Self::InvalidEncoding => "ERR_INVALID_ENCODING",
            Self::KeyStoreUnavailable(_) => "ERR_KEYSTORE_UNAVAILABLE",
            Self::Encoding => "ERR_ENCODING",
            Self::KeyGeneration => "ERR_KEY_GENERATION",
        }
    }

    /// Whether the same call may succeed if simply retried.
    ///
    /// `UninitializedKey` needs key generation first.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::UninitializedKey { .. })
    }
}

impl From<cmt_proto::validation::ValidationError> for CryptoError {
    fn from(e: cmt_proto::validation::ValidationError) -> Self {
        CryptoError::MalformedEnvelope(e.to_string())
    }
}

impl From<prost::DecodeError> for CryptoError {
    fn from(_: prost::DecodeError) -> Self {
        CryptoError::MalformedEnvelope("undecodable envelope structure".to_string())
    }
}

impl From<base64::DecodeError> for CryptoError {
    fn from(_: base64::DecodeError) -> Self {
        CryptoError::MalformedEnvelope("invalid base64".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            CryptoError::InvalidKeyFormat("x"),
            CryptoError::InvalidCounterpartyKey,
            CryptoError::PayloadTooLarge { len: 2, max: 1 },
            CryptoError::EncryptionFailed,
            CryptoError::DecryptionFailed,
            CryptoError::AuthenticationFailed,
            CryptoError::MalformedEnvelope("x".into()),
            CryptoError::UninitializedKey { alias: "a".into() },
            CryptoError::InvalidEncoding,
            CryptoError::KeyStoreUnavailable("x".into()),
            CryptoError::Encoding,
            CryptoError::KeyGeneration,
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_only_uninitialized_key_is_not_retryable() {
        assert!(!CryptoError::UninitializedKey { alias: "a".into() }.is_retryable());
        assert!(CryptoError::DecryptionFailed.is_retryable());
        assert!(CryptoError::KeyStoreUnavailable("busy".into()).is_retryable());
    }

    #[test]
    fn test_decryption_failed_message_is_opaque() {
        assert_eq!(CryptoError::DecryptionFailed.to_string(), "decryption failed");
    }
}
