//! Asymmetric key pair management.
//!
//! The private key lives in the [`SecureKeyStore`] as PKCS#8 DER under the
//! key-pair alias; the public key is stored next to it under `<alias>.pub`.
//! The manager only holds the alias. Private key bytes are loaded for the
//! duration of a single decryption and zeroized when dropped.

use std::sync::Arc;

use rand_core::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::key_encoding::{AsymmetricPublicKey, KeyPolicy, DEFAULT_RSA_BITS};
use crate::keystore::{AliasLocks, KeyMaterial, SecureKeyStore};

/// Well-known alias for the client's key pair.
pub const DEFAULT_KEY_PAIR_ALIAS: &str = "cmt.client.rsa";

/// Reference to a private key held in the key store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyHandle {
    alias: String,
}

impl KeyHandle {
    pub fn new(alias: impl Into<String>) -> Self {
        Self { alias: alias.into() }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Alias under which the matching public key is stored.
    pub fn public_alias(&self) -> String {
        format!("{}.pub", self.alias)
    }
}

/// Public half of the key pair plus a handle to the private half.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub public_key: AsymmetricPublicKey,
    pub private_key_handle: KeyHandle,
}

/// Owns the lifecycle of one RSA key pair in the key store.
pub struct AsymmetricKeyManager {
    store: Arc<dyn SecureKeyStore>,
    locks: Arc<AliasLocks>,
    handle: KeyHandle,
    modulus_bits: usize,
    policy: KeyPolicy,
}

impl AsymmetricKeyManager {
    pub fn new(store: Arc<dyn SecureKeyStore>, locks: Arc<AliasLocks>) -> Self {
        Self {
            store,
            locks,
            handle: KeyHandle::new(DEFAULT_KEY_PAIR_ALIAS),
            modulus_bits: DEFAULT_RSA_BITS,
            policy: KeyPolicy::default(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.handle = KeyHandle::new(alias);
        self
    }

    pub fn with_modulus_bits(mut self, bits: usize) -> Self {
        self.modulus_bits = bits;
        self
    }

    pub fn with_policy(mut self, policy: KeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn handle(&self) -> &KeyHandle {
        &self.handle
    }

    /// Generate a fresh key pair under the manager's alias, replacing any
    /// previous pair. Returns only the public key.
    pub fn generate_key_pair(&self) -> Result<AsymmetricPublicKey, CryptoError> {
        if self.modulus_bits < self.policy.min_modulus_bits
            || self.modulus_bits > self.policy.max_modulus_bits
        {
            return Err(CryptoError::KeyGeneration);
        }

        let alias = self.handle.alias();
        self.locks.write(alias, || {
            let private = RsaPrivateKey::new(&mut OsRng, self.modulus_bits)
                .map_err(|_| CryptoError::KeyGeneration)?;
            let public = AsymmetricPublicKey::from_rsa(private.to_public_key())?;

            let pkcs8 = private.to_pkcs8_der().map_err(|_| CryptoError::Encoding)?;
            let private_material = KeyMaterial::from_slice(pkcs8.as_bytes());
            let public_material = KeyMaterial::from_slice(public.to_der());

            self.store.put(alias, &private_material)?;
            if let Err(e) = self.store.put(&self.handle.public_alias(), &public_material) {
                // Leave the alias empty rather than holding a mismatched pair.
                let _ = self.store.delete(alias);
                let _ = self.store.delete(&self.handle.public_alias());
                warn!(alias, error = %e, "failed to persist public key, key pair discarded");
                return Err(e.into());
            }

            debug!(
                alias,
                bits = self.modulus_bits,
                fingerprint = %public.fingerprint(),
                "generated key pair"
            );
            Ok(public)
        })
    }

    /// Current public key, without regenerating.
    pub fn public_key(&self) -> Result<AsymmetricPublicKey, CryptoError> {
        let alias = self.handle.alias();
        self.locks.read(alias, || {
            let material = self
                .store
                .get(&self.handle.public_alias())?
                .ok_or_else(|| self.uninitialized())?;
            let key = RsaPublicKey::from_public_key_der(material.as_bytes())
                .map_err(|_| CryptoError::KeyStoreUnavailable("stored public key is unreadable".into()))?;
            AsymmetricPublicKey::from_rsa(key)
        })
    }

    pub fn key_pair(&self) -> Result<KeyPair, CryptoError> {
        Ok(KeyPair {
            public_key: self.public_key()?,
            private_key_handle: self.handle.clone(),
        })
    }

    pub fn has_key_pair(&self) -> Result<bool, CryptoError> {
        let alias = self.handle.alias();
        self.locks.read(alias, || Ok(self.store.get(alias)?.is_some()))
    }

    /// Delete both halves of the key pair.
    pub fn clear(&self) -> Result<(), CryptoError> {
        let alias = self.handle.alias();
        self.locks.write(alias, || {
            self.store.delete(alias)?;
            self.store.delete(&self.handle.public_alias())?;
            debug!(alias, "cleared key pair");
            Ok(())
        })
    }

    /// Encrypt a short payload for `recipient` with RSA-OAEP-SHA256.
    ///
    /// Only used to wrap symmetric keys. Payloads longer than the padding
    /// scheme allows are refused before any encryption happens.
    pub fn encrypt_with_public_key(
        &self,
        plaintext: &[u8],
        recipient: &AsymmetricPublicKey,
    ) -> Result<Vec<u8>, CryptoError> {
        self.policy.check(recipient.rsa())?;

        let max = recipient.max_wrap_len();
        if plaintext.len() > max {
            return Err(CryptoError::PayloadTooLarge { len: plaintext.len(), max });
        }

        recipient
            .rsa()
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)
    }

    /// Decrypt with the managed private key.
    ///
    /// Every failure past key loading is reported as `DecryptionFailed`, with
    /// no indication of whether padding, length or key was wrong.
    pub fn decrypt_with_private_key(
        &self,
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let alias = self.handle.alias();
        let private = self.locks.read(alias, || self.load_private_key())?;

        if ciphertext.len() != private.size() {
            return Err(CryptoError::DecryptionFailed);
        }

        private
            .decrypt_blinded(&mut OsRng, Oaep::new::<Sha256>(), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::DecryptionFailed)
    }

    fn load_private_key(&self) -> Result<RsaPrivateKey, CryptoError> {
        let material = self
            .store
            .get(self.handle.alias())?
            .ok_or_else(|| self.uninitialized())?;
        RsaPrivateKey::from_pkcs8_der(material.as_bytes())
            .map_err(|_| CryptoError::KeyStoreUnavailable("stored private key is unreadable".into()))
    }

    fn uninitialized(&self) -> CryptoError {
        CryptoError::UninitializedKey {
            alias: self.handle.alias().to_string(),
        }
    }
}
