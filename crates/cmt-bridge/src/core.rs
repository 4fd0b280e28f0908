//! Bridge core: the operations exposed to the host runtime.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use cmt_crypto::{
    AliasLocks, AsymmetricKeyManager, EnvelopeProducer, InMemoryKeyStore, KeyEncoder,
    SecureKeyStore, SymmetricKeyManager,
};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::file_store::FileKeyStore;

/// Result of `generate_rsa_key_pair`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsaKeyPair {
    /// Base64 DER SubjectPublicKeyInfo
    pub public_key: String,
}

/// Result of `generate_aes_key`. Wiped on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct AesSecret {
    pub aes_string_key: String,
}

impl std::fmt::Debug for AesSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AesSecret(..)")
    }
}

/// Parameters of `prepare_request_payload`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    /// CMT message JSON, opaque to the bridge
    pub cmt: String,
    /// Counterparty public key, base64 DER SubjectPublicKeyInfo
    pub bridge_ra_public_key: String,
}

/// Result of `prepare_request_payload`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedRequest {
    pub request_data: String,
}

/// Result of `parse_response_payload`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedResponse {
    pub response_data: String,
}

/// Shared component graph behind the host-facing operations.
///
/// All methods take `&self`; one instance can serve concurrent callers.
pub struct CmtCore {
    asymmetric: Arc<AsymmetricKeyManager>,
    symmetric: Arc<SymmetricKeyManager>,
    producer: EnvelopeProducer,
    encoder: KeyEncoder,
}

impl CmtCore {
    /// Build the core with the key store selected by `config`
    pub fn new(config: &BridgeConfig) -> Result<Self, BridgeError> {
        config.validate()?;

        let store: Arc<dyn SecureKeyStore> = match (config.keystore.backend.as_str(), &config.keystore.dir) {
            ("file", Some(dir)) => Arc::new(FileKeyStore::new(dir.clone())?),
            _ => Arc::new(InMemoryKeyStore::new()),
        };
        info!(backend = %config.keystore.backend, "initialized key store");

        Self::with_store(config, store)
    }

    /// Build the core around an injected key store
    pub fn with_store(config: &BridgeConfig, store: Arc<dyn SecureKeyStore>) -> Result<Self, BridgeError> {
        config.validate()?;

        let locks = Arc::new(AliasLocks::new());
        let asymmetric = Arc::new(
            AsymmetricKeyManager::new(store.clone(), locks.clone())
                .with_alias(config.keys.key_pair_alias.clone())
                .with_modulus_bits(config.keys.rsa_bits),
        );
        let symmetric = Arc::new(
            SymmetricKeyManager::new(store, locks).with_policy(config.symmetric_policy()),
        );
        let encoder = KeyEncoder::default();
        let producer = EnvelopeProducer::new(asymmetric.clone(), symmetric.clone()).with_encoder(encoder);

        Ok(Self {
            asymmetric,
            symmetric,
            producer,
            encoder,
        })
    }

    /// Generate (or replace) the client key pair and return its public key
    pub fn generate_rsa_key_pair(&self) -> Result<RsaKeyPair, BridgeError> {
        let public = self.asymmetric.generate_key_pair()?;
        Ok(RsaKeyPair {
            public_key: self.encoder.encode_public_key(&public),
        })
    }

    /// Generate a symmetric key per the configured policy and return it base64-encoded
    pub fn generate_aes_key(&self) -> Result<AesSecret, BridgeError> {
        let key = self.symmetric.generate_key()?;
        Ok(AesSecret {
            aes_string_key: self.symmetric.encode_key(&key)?,
        })
    }

    /// Encrypt the CMT message for the bridge's public key
    pub fn prepare_request_payload(&self, request: &RequestPayload) -> Result<PreparedRequest, BridgeError> {
        if request.bridge_ra_public_key.trim().is_empty() {
            return Err(BridgeError::MissingParameter("bridgeRaPublicKey"));
        }

        let request_data = self
            .producer
            .prepare_request_payload(&request.cmt, &request.bridge_ra_public_key)?;
        Ok(PreparedRequest { request_data })
    }

    /// Same as [`prepare_request_payload`](Self::prepare_request_payload), taking
    /// the host's parameter map as a JSON object.
    pub fn prepare_request_payload_json(&self, params: &str) -> Result<PreparedRequest, BridgeError> {
        let value: serde_json::Value = serde_json::from_str(params)?;
        let map = value
            .as_object()
            .ok_or_else(|| BridgeError::InvalidParameter("parameters must be a JSON object".to_string()))?;

        let field = |name: &'static str| -> Result<String, BridgeError> {
            match map.get(name) {
                None => Err(BridgeError::MissingParameter(name)),
                Some(v) => v
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| BridgeError::InvalidParameter(format!("'{}' must be a string", name))),
            }
        };

        let request = RequestPayload {
            cmt: field("cmt")?,
            bridge_ra_public_key: field("bridgeRaPublicKey")?,
        };
        self.prepare_request_payload(&request)
    }

    /// Decrypt an envelope addressed to this client's key pair
    pub fn parse_response_payload(&self, envelope: &str) -> Result<ParsedResponse, BridgeError> {
        let response_data = self.producer.parse_response_payload(envelope)?;
        Ok(ParsedResponse { response_data })
    }

    /// Current public key without regenerating
    pub fn public_key(&self) -> Result<RsaKeyPair, BridgeError> {
        let public = self.asymmetric.public_key()?;
        Ok(RsaKeyPair {
            public_key: self.encoder.encode_public_key(&public),
        })
    }

    /// Delete the key pair and any persisted symmetric key
    pub fn clear_key_pair(&self) -> Result<(), BridgeError> {
        self.asymmetric.clear()?;
        self.symmetric.clear_persistent_key()?;
        debug!("cleared stored keys");
        Ok(())
    }
}
