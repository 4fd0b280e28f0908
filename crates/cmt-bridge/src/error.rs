//! Error types surfaced to the host runtime

use serde::Serialize;
use thiserror::Error;

use cmt_crypto::{CryptoError, KeyStoreError};

use crate::config::ConfigError;

/// Errors returned by every bridge operation
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Missing parameter: '{0}'")]
    MissingParameter(&'static str),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Key store error: {0}")]
    KeyStore(#[from] KeyStoreError),
}

impl BridgeError {
    /// Stable machine-readable code; crypto errors keep their own code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "ERR_MISSING_PARAMETER",
            Self::InvalidParameter(_) => "ERR_INVALID_PARAMETER",
            Self::Crypto(e) => e.code(),
            Self::Config(_) => "ERR_CONFIG",
            Self::KeyStore(_) => "ERR_KEYSTORE_UNAVAILABLE",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Crypto(e) => e.is_retryable(),
            Self::KeyStore(_) => true,
            Self::MissingParameter(_) | Self::InvalidParameter(_) | Self::Config(_) => false,
        }
    }

    /// Shape handed to the host when rejecting a call.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::InvalidParameter(format!("JSON error: {}", e))
    }
}

/// Serializable rejection carrying a code and a non-sensitive message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub code: &'static str,
    pub message: String,
}
