//! File-backed key store for hosts without a platform keystore.
//!
//! One file per alias under the key directory. Writes go to a temporary file
//! that is renamed over the target, so readers never see a partial key.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;
use zeroize::Zeroizing;

use cmt_crypto::{KeyMaterial, KeyStoreError, SecureKeyStore};

const KEY_FILE_EXT: &str = "key";
const MAX_ALIAS_LEN: usize = 128;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Check that `alias` is safe to use as a file name.
///
/// Allowed: ASCII letters, digits, `.`, `_` and `-`, not starting with `.`.
pub fn validate_alias(alias: &str) -> Result<(), KeyStoreError> {
    if alias.is_empty() || alias.len() > MAX_ALIAS_LEN {
        return Err(KeyStoreError::InvalidAlias(format!(
            "alias must be 1 to {} characters",
            MAX_ALIAS_LEN
        )));
    }
    if alias.starts_with('.') {
        return Err(KeyStoreError::InvalidAlias(format!("'{}' starts with '.'", alias)));
    }
    if !alias
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
    {
        return Err(KeyStoreError::InvalidAlias(format!(
            "'{}' contains characters outside [A-Za-z0-9._-]",
            alias
        )));
    }
    Ok(())
}

/// Key store keeping one owner-only file per alias
#[derive(Debug)]
pub struct FileKeyStore {
    key_dir: PathBuf,
}

impl FileKeyStore {
    /// Open the store, creating the key directory if needed
    pub fn new(key_dir: impl Into<PathBuf>) -> Result<Self, KeyStoreError> {
        let key_dir = key_dir.into();
        fs::create_dir_all(&key_dir)?;
        restrict_dir_permissions(&key_dir)?;
        Ok(Self { key_dir })
    }

    pub fn key_dir(&self) -> &Path {
        &self.key_dir
    }

    fn key_path(&self, alias: &str) -> Result<PathBuf, KeyStoreError> {
        validate_alias(alias)?;
        Ok(self.key_dir.join(format!("{}.{}", alias, KEY_FILE_EXT)))
    }

    fn tmp_path(&self, alias: &str) -> PathBuf {
        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.key_dir
            .join(format!(".{}.{}.{}.tmp", alias, std::process::id(), n))
    }
}

impl SecureKeyStore for FileKeyStore {
    fn put(&self, alias: &str, material: &KeyMaterial) -> Result<(), KeyStoreError> {
        let path = self.key_path(alias)?;
        let tmp = self.tmp_path(alias);

        let written = (|| {
            let mut file = open_owner_only(&tmp)?;
            file.write_all(material.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &path)
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            warn!(alias, error = %e, "failed to write key file");
            return Err(e.into());
        }
        Ok(())
    }

    fn get(&self, alias: &str) -> Result<Option<KeyMaterial>, KeyStoreError> {
        let path = self.key_path(alias)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(KeyMaterial::new(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, alias: &str) -> Result<(), KeyStoreError> {
        let path = self.key_path(alias)?;

        // Overwrite with zeros before unlinking
        match OpenOptions::new().write(true).open(&path) {
            Ok(mut file) => {
                let size = file.metadata()?.len() as usize;
                let zeros = Zeroizing::new(vec![0u8; size]);
                file.write_all(&zeros)?;
                file.sync_all()?;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        match fs::remove_file(&path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(unix)]
fn open_owner_only(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_owner_only(path: &Path) -> std::io::Result<fs::File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

#[cfg(unix)]
fn restrict_dir_permissions(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn restrict_dir_permissions(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
