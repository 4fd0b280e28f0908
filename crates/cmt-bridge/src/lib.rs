#![forbid(unsafe_code)]

//! CMT bridge - host-facing surface of the secure payload envelope
//!
//! Exposes key generation and request/response envelope handling as
//! synchronous calls returning serde records, plus the configuration,
//! logging and file-backed key storage a host needs to run them.

pub mod config;
mod core;
mod error;
pub mod file_store;
mod logging;

#[cfg(test)]
mod proptests;

pub use crate::core::{AesSecret, CmtCore, ParsedResponse, PreparedRequest, RequestPayload, RsaKeyPair};
pub use config::{BridgeConfig, ConfigError, KeyStoreConfig, KeysConfig, LoggingConfig};
pub use error::{BridgeError, ErrorReport};
pub use file_store::FileKeyStore;
pub use logging::init_logging;
