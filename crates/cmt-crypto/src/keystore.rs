//! Secure key store capability.
//!
//! The key managers never own durable storage themselves. They are handed a
//! [`SecureKeyStore`] and address key material by alias. Production hosts plug
//! in a platform keystore; [`InMemoryKeyStore`] serves tests and hosts that
//! only need process-lifetime keys.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Errors reported by key store backends.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("key store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid alias: {0}")]
    InvalidAlias(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<KeyStoreError> for CryptoError {
    fn from(e: KeyStoreError) -> Self {
        CryptoError::KeyStoreUnavailable(e.to_string())
    }
}

/// Secret bytes held by a key store. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    data: Vec<u8>,
}

impl KeyMaterial {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        Self { data: data.to_vec() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyMaterial({} bytes)", self.data.len())
    }
}

/// Storage for key material, keyed by alias.
///
/// Implementations must make each `put` atomic: a concurrent `get` sees
/// either the old or the new material, never a mix.
pub trait SecureKeyStore: Send + Sync {
    /// Store material under `alias`, replacing any previous entry.
    fn put(&self, alias: &str, material: &KeyMaterial) -> Result<(), KeyStoreError>;

    /// Load material under `alias`, or `None` when nothing is stored.
    fn get(&self, alias: &str) -> Result<Option<KeyMaterial>, KeyStoreError>;

    /// Remove `alias`. Deleting a missing alias is not an error.
    fn delete(&self, alias: &str) -> Result<(), KeyStoreError>;
}

/// Process-local key store.
#[derive(Default)]
pub struct InMemoryKeyStore {
    entries: RwLock<HashMap<String, KeyMaterial>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.read().contains_key(alias)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SecureKeyStore for InMemoryKeyStore {
    fn put(&self, alias: &str, material: &KeyMaterial) -> Result<(), KeyStoreError> {
        self.entries.write().insert(alias.to_string(), material.clone());
        Ok(())
    }

    fn get(&self, alias: &str) -> Result<Option<KeyMaterial>, KeyStoreError> {
        Ok(self.entries.read().get(alias).cloned())
    }

    fn delete(&self, alias: &str) -> Result<(), KeyStoreError> {
        // Dropping the entry zeroizes it.
        self.entries.write().remove(alias);
        Ok(())
    }
}

/// Per-alias reader/writer locks.
///
/// Writers (generate, clear) are exclusive per alias; readers (encrypt,
/// decrypt with an existing key) run concurrently. Locks for different
/// aliases never contend.
#[derive(Default)]
pub struct AliasLocks {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl AliasLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, alias: &str) -> Arc<RwLock<()>> {
        self.locks
            .lock()
            .entry(alias.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Run `f` holding the shared side of the alias lock.
    pub fn read<T>(&self, alias: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(alias);
        let _guard = lock.read();
        f()
    }

    /// Run `f` holding the exclusive side of the alias lock.
    pub fn write<T>(&self, alias: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(alias);
        let _guard = lock.write();
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_put_get_delete() {
        let store = InMemoryKeyStore::new();
        assert!(store.get("a").unwrap().is_none());

        store.put("a", &KeyMaterial::from_slice(b"secret")).unwrap();
        assert_eq!(store.get("a").unwrap().unwrap().as_bytes(), b"secret");

        store.put("a", &KeyMaterial::from_slice(b"rotated")).unwrap();
        assert_eq!(store.get("a").unwrap().unwrap().as_bytes(), b"rotated");

        store.delete("a").unwrap();
        assert!(store.get("a").unwrap().is_none());
        // Deleting twice is fine
        store.delete("a").unwrap();
    }

    #[test]
    fn test_key_material_debug_hides_bytes() {
        let material = KeyMaterial::from_slice(&[0xAA; 4]);
        assert_eq!(format!("{:?}", material), "KeyMaterial(4 bytes)");
    }

    #[test]
    fn test_store_error_maps_to_keystore_unavailable() {
        let err: CryptoError = KeyStoreError::Unavailable("locked".into()).into();
        assert!(matches!(err, CryptoError::KeyStoreUnavailable(_)));
    }

    #[test]
    fn test_writers_are_exclusive_per_alias() {
        let locks = Arc::new(AliasLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                let max_seen = max_seen.clone();
                thread::spawn(move || {
                    locks.write("alias", || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_different_aliases_do_not_block() {
        let locks = AliasLocks::new();
        let result = locks.write("a", || locks.write("b", || 42));
        assert_eq!(result, 42);
    }
}
