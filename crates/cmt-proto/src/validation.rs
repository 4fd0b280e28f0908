//! Structural validation for decoded envelopes.
//!
//! Validation only checks shape: versions, algorithm identifiers and field
//! sizes. It runs before any cryptographic work so malformed input is
//! rejected cheaply.

use crate::v1::*;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// AES-GCM tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Wrapped key length for a 2048-bit modulus.
pub const MIN_ENCRYPTED_KEY_LEN: usize = 256;

/// Wrapped key length for a 4096-bit modulus.
pub const MAX_ENCRYPTED_KEY_LEN: usize = 512;

/// Upper bound on a serialized envelope (after base64 decoding).
pub const MAX_ENVELOPE_LEN: usize = 1024 * 1024;

/// Validation error types for envelope messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Envelope version is not supported
    UnsupportedVersion { version: u32 },
    /// Algorithm identifier is unknown or unspecified
    UnknownAlgorithm { field: &'static str, value: i32 },
    /// Field has invalid size (expected, actual)
    InvalidSize { field: &'static str, expected: usize, actual: usize },
    /// Field size is out of allowed range
    SizeOutOfRange { field: &'static str, min: usize, max: usize, actual: usize },
    /// Required field is empty
    EmptyField { field: &'static str },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedVersion { version } => {
                write!(f, "unsupported envelope version {}", version)
            }
            Self::UnknownAlgorithm { field, value } => {
                write!(f, "field '{}' has unknown algorithm identifier {}", field, value)
            }
            Self::InvalidSize { field, expected, actual } => {
                write!(f, "field '{}' has invalid size: expected {}, got {}", field, expected, actual)
            }
            Self::SizeOutOfRange { field, min, max, actual } => {
                write!(f, "field '{}' size {} is out of range [{}, {}]", field, actual, min, max)
            }
            Self::EmptyField { field } => {
                write!(f, "required field '{}' is empty", field)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check that `data` has exactly `expected` bytes.
pub fn validate_exact_size(field: &'static str, data: &[u8], expected: usize) -> Result<(), ValidationError> {
    if data.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    if data.len() != expected {
        return Err(ValidationError::InvalidSize { field, expected, actual: data.len() });
    }
    Ok(())
}

/// Check that `data` has between `min` and `max` bytes inclusive.
pub fn validate_size_range(
    field: &'static str,
    data: &[u8],
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    if data.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    if data.len() < min || data.len() > max {
        return Err(ValidationError::SizeOutOfRange { field, min, max, actual: data.len() });
    }
    Ok(())
}

impl CmtEnvelopeV1 {
    /// Validate every field of the envelope.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version != ENVELOPE_VERSION {
            return Err(ValidationError::UnsupportedVersion { version: self.version });
        }
        self.key_wrap_algorithm()?;
        self.cipher_suite()?;
        validate_size_range(
            "encrypted_key",
            &self.encrypted_key,
            MIN_ENCRYPTED_KEY_LEN,
            MAX_ENCRYPTED_KEY_LEN,
        )?;
        validate_exact_size("nonce", &self.nonce, NONCE_LEN)?;
        validate_size_range("ciphertext", &self.ciphertext, TAG_LEN, MAX_ENVELOPE_LEN)?;
        Ok(())
    }

    /// The key-wrap algorithm, rejecting unknown and unspecified values.
    pub fn key_wrap_algorithm(&self) -> Result<KeyWrapAlgorithmV1, ValidationError> {
        match KeyWrapAlgorithmV1::try_from(self.key_wrap) {
            Ok(KeyWrapAlgorithmV1::Unspecified) | Err(_) => Err(ValidationError::UnknownAlgorithm {
                field: "key_wrap",
                value: self.key_wrap,
            }),
            Ok(alg) => Ok(alg),
        }
    }

    /// The payload cipher suite, rejecting unknown and unspecified values.
    pub fn cipher_suite(&self) -> Result<CipherSuiteV1, ValidationError> {
        match CipherSuiteV1::try_from(self.cipher) {
            Ok(CipherSuiteV1::Unspecified) | Err(_) => Err(ValidationError::UnknownAlgorithm {
                field: "cipher",
                value: self.cipher,
            }),
            Ok(suite) => Ok(suite),
        }
    }
}
