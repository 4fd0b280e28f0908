//! Symmetric keys and AES-256-GCM bulk encryption.

use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cmt_proto::validation::{NONCE_LEN, TAG_LEN};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::keystore::{AliasLocks, KeyMaterial, SecureKeyStore};

/// AES-256 key length in bytes.
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// Well-known alias for a persisted symmetric key.
pub const DEFAULT_SYMMETRIC_KEY_ALIAS: &str = "cmt.client.aes";

/// Where keys produced by [`SymmetricKeyManager::generate_key`] live.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SymmetricKeyPolicy {
    /// In memory only, dropped with the key.
    #[default]
    Ephemeral,
    /// Written to the key store under `alias`, replacing any previous key.
    Persistent { alias: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymmetricAlgorithm {
    Aes256Gcm,
}

#[derive(Clone)]
enum Handle {
    Ephemeral(Zeroizing<[u8; SYMMETRIC_KEY_LEN]>),
    Stored { alias: String },
}

/// A symmetric key: raw bytes held in memory, or an alias into the key store.
#[derive(Clone)]
pub struct SymmetricKey {
    handle: Handle,
    algorithm: SymmetricAlgorithm,
}

impl SymmetricKey {
    fn ephemeral(bytes: Zeroizing<[u8; SYMMETRIC_KEY_LEN]>) -> Self {
        Self {
            handle: Handle::Ephemeral(bytes),
            algorithm: SymmetricAlgorithm::Aes256Gcm,
        }
    }

    fn stored(alias: &str) -> Self {
        Self {
            handle: Handle::Stored { alias: alias.to_string() },
            algorithm: SymmetricAlgorithm::Aes256Gcm,
        }
    }

    pub fn algorithm(&self) -> SymmetricAlgorithm {
        self.algorithm
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self.handle, Handle::Ephemeral(_))
    }

    /// Key store alias for persisted keys.
    pub fn alias(&self) -> Option<&str> {
        match &self.handle {
            Handle::Ephemeral(_) => None,
            Handle::Stored { alias } => Some(alias),
        }
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("SymmetricKey");
        s.field("algorithm", &self.algorithm);
        match &self.handle {
            Handle::Ephemeral(_) => s.field("handle", &"ephemeral"),
            Handle::Stored { alias } => s.field("alias", alias),
        };
        s.finish()
    }
}

/// Generates symmetric keys and performs authenticated encryption with them.
pub struct SymmetricKeyManager {
    store: Arc<dyn SecureKeyStore>,
    locks: Arc<AliasLocks>,
    policy: SymmetricKeyPolicy,
}

impl SymmetricKeyManager {
    pub fn new(store: Arc<dyn SecureKeyStore>, locks: Arc<AliasLocks>) -> Self {
        Self {
            store,
            locks,
            policy: SymmetricKeyPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SymmetricKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &SymmetricKeyPolicy {
        &self.policy
    }

    /// Generate a key according to the configured policy.
    pub fn generate_key(&self) -> Result<SymmetricKey, CryptoError> {
        match &self.policy {
            SymmetricKeyPolicy::Ephemeral => self.generate_ephemeral_key(),
            SymmetricKeyPolicy::Persistent { alias } => {
                let bytes = random_key()?;
                self.locks.write(alias, || {
                    self.store.put(alias, &KeyMaterial::from_slice(&bytes[..]))?;
                    debug!(alias = alias.as_str(), "generated persistent symmetric key");
                    Ok(SymmetricKey::stored(alias))
                })
            }
        }
    }

    /// Generate an in-memory key regardless of policy.
    pub fn generate_ephemeral_key(&self) -> Result<SymmetricKey, CryptoError> {
        Ok(SymmetricKey::ephemeral(random_key()?))
    }

    /// Handle to the persisted key, if the policy stores one.
    pub fn persistent_key(&self) -> Result<SymmetricKey, CryptoError> {
        match &self.policy {
            SymmetricKeyPolicy::Ephemeral => Err(CryptoError::UninitializedKey {
                alias: DEFAULT_SYMMETRIC_KEY_ALIAS.to_string(),
            }),
            SymmetricKeyPolicy::Persistent { alias } => self.locks.read(alias, || {
                match self.store.get(alias)? {
                    Some(_) => Ok(SymmetricKey::stored(alias)),
                    None => Err(CryptoError::UninitializedKey { alias: alias.clone() }),
                }
            }),
        }
    }

    /// Delete the persisted key. A no-op for the ephemeral policy.
    pub fn clear_persistent_key(&self) -> Result<(), CryptoError> {
        if let SymmetricKeyPolicy::Persistent { alias } = &self.policy {
            self.locks.write(alias, || self.store.delete(alias))?;
            debug!(alias = alias.as_str(), "cleared persistent symmetric key");
        }
        Ok(())
    }

    /// Rebuild an in-memory key from raw bytes.
    pub fn import_key(&self, bytes: &[u8]) -> Result<SymmetricKey, CryptoError> {
        let raw = key_buffer(bytes)
            .ok_or(CryptoError::InvalidKeyFormat("symmetric key must be 32 bytes"))?;
        Ok(SymmetricKey::ephemeral(raw))
    }

    /// Raw key bytes, zeroized when the returned buffer is dropped.
    pub fn export_key_bytes(
        &self,
        key: &SymmetricKey,
    ) -> Result<Zeroizing<[u8; SYMMETRIC_KEY_LEN]>, CryptoError> {
        match &key.handle {
            Handle::Ephemeral(bytes) => Ok(bytes.clone()),
            Handle::Stored { alias } => self.locks.read(alias, || self.load(alias)),
        }
    }

    /// Base64 of the raw key bytes.
    pub fn encode_key(&self, key: &SymmetricKey) -> Result<String, CryptoError> {
        let bytes = self.export_key_bytes(key)?;
        Ok(STANDARD.encode(&bytes[..]))
    }

    /// Encrypt with a fresh random nonce. The tag is appended to the ciphertext.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        key: &SymmetricKey,
    ) -> Result<([u8; NONCE_LEN], Vec<u8>), CryptoError> {
        self.encrypt_with_aad(plaintext, &[], key)
    }

    pub fn encrypt_with_aad(
        &self,
        plaintext: &[u8],
        aad: &[u8],
        key: &SymmetricKey,
    ) -> Result<([u8; NONCE_LEN], Vec<u8>), CryptoError> {
        let bytes = self.export_key_bytes(key)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&bytes[..]));

        let mut nonce = [0u8; NONCE_LEN];
        getrandom::getrandom(&mut nonce).map_err(|_| CryptoError::EncryptionFailed)?;

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad })
            .map_err(|_| CryptoError::EncryptionFailed)?;
        Ok((nonce, ciphertext))
    }

    pub fn decrypt(
        &self,
        nonce: &[u8],
        ciphertext: &[u8],
        key: &SymmetricKey,
    ) -> Result<Vec<u8>, CryptoError> {
        self.decrypt_with_aad(nonce, ciphertext, &[], key)
    }

    /// Structurally invalid input is `DecryptionFailed`; a tag mismatch is
    /// `AuthenticationFailed`.
    pub fn decrypt_with_aad(
        &self,
        nonce: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
        key: &SymmetricKey,
    ) -> Result<Vec<u8>, CryptoError> {
        if nonce.len() != NONCE_LEN || ciphertext.len() < TAG_LEN {
            return Err(CryptoError::DecryptionFailed);
        }

        let bytes = self.export_key_bytes(key)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&bytes[..]));
        cipher
            .decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext, aad })
            .map_err(|_| CryptoError::AuthenticationFailed)
    }

    fn load(&self, alias: &str) -> Result<Zeroizing<[u8; SYMMETRIC_KEY_LEN]>, CryptoError> {
        let material = self
            .store
            .get(alias)?
            .ok_or_else(|| CryptoError::UninitializedKey { alias: alias.to_string() })?;
        key_buffer(material.as_bytes())
            .ok_or_else(|| CryptoError::KeyStoreUnavailable("stored symmetric key is unreadable".into()))
    }
}

/// Copy key bytes straight into a zeroizing buffer.
fn key_buffer(bytes: &[u8]) -> Option<Zeroizing<[u8; SYMMETRIC_KEY_LEN]>> {
    if bytes.len() != SYMMETRIC_KEY_LEN {
        return None;
    }
    let mut raw = Zeroizing::new([0u8; SYMMETRIC_KEY_LEN]);
    raw.copy_from_slice(bytes);
    Some(raw)
}

fn random_key() -> Result<Zeroizing<[u8; SYMMETRIC_KEY_LEN]>, CryptoError> {
    let mut bytes = Zeroizing::new([0u8; SYMMETRIC_KEY_LEN]);
    getrandom::getrandom(&mut bytes[..]).map_err(|_| CryptoError::KeyGeneration)?;
    Ok(bytes)
}
