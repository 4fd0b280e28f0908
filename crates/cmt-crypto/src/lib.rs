#![forbid(unsafe_code)]

//! Key management and hybrid envelope encryption for CMT payloads.
//!
//! The component graph is built explicitly: one [`SecureKeyStore`] and one
//! [`AliasLocks`] are shared by the two key managers, and an
//! [`EnvelopeProducer`] orchestrates them.
//!
//! ```no_run
//! use std::sync::Arc;
//! use cmt_crypto::{
//!     AliasLocks, AsymmetricKeyManager, EnvelopeProducer, InMemoryKeyStore, KeyEncoder,
//!     SymmetricKeyManager,
//! };
//!
//! # fn main() -> Result<(), cmt_crypto::CryptoError> {
//! let store = Arc::new(InMemoryKeyStore::new());
//! let locks = Arc::new(AliasLocks::new());
//! let asymmetric = Arc::new(AsymmetricKeyManager::new(store.clone(), locks.clone()));
//! let symmetric = Arc::new(SymmetricKeyManager::new(store, locks));
//!
//! let public = asymmetric.generate_key_pair()?;
//! let public_b64 = KeyEncoder::default().encode_public_key(&public);
//!
//! let producer = EnvelopeProducer::new(asymmetric, symmetric);
//! let envelope = producer.prepare_request_payload("{}", &public_b64)?;
//! assert_eq!(producer.parse_response_payload(&envelope)?, "{}");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod hash;
pub mod transcript;
pub mod keystore;
pub mod key_encoding;

pub mod asymmetric;
pub mod symmetric;
pub mod envelope;

pub use asymmetric::{AsymmetricKeyManager, KeyHandle, KeyPair, DEFAULT_KEY_PAIR_ALIAS};
pub use envelope::{decode_envelope, encode_envelope, EnvelopeProducer, MAX_PAYLOAD_LEN};
pub use error::CryptoError;
pub use key_encoding::{AsymmetricPublicKey, KeyEncoder, KeyPolicy};
pub use keystore::{AliasLocks, InMemoryKeyStore, KeyMaterial, KeyStoreError, SecureKeyStore};
pub use symmetric::{
    SymmetricAlgorithm, SymmetricKey, SymmetricKeyManager, SymmetricKeyPolicy,
    DEFAULT_SYMMETRIC_KEY_ALIAS, SYMMETRIC_KEY_LEN,
};

#[cfg(test)]
mod proptests;
