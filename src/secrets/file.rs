//! File-backed secret store.
//!
//! Secrets live in a single JSON map with owner-only permissions. Every write
//! replaces the whole file.

use super::{SecretError, SecretStore};
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> SecretError {
        SecretError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read(&self) -> Result<BTreeMap<String, String>, SecretError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => return Err(self.io_err(source)),
        };
        serde_json::from_str(&content).map_err(|source| SecretError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, secrets: &BTreeMap<String, String>) -> Result<(), SecretError> {
        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&dir).map_err(|e| self.io_err(e))?;

        let data = serde_json::to_string_pretty(secrets).map_err(|source| SecretError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.io_err(e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_err(e))?;
        }
        tmp.write_all(data.as_bytes()).map_err(|e| self.io_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_err(e.error))?;
        Ok(())
    }
}

impl SecretStore for FileSecretStore {
    fn store(&self, key: &str, value: &SecretString) -> Result<(), SecretError> {
        let mut secrets = self.read()?;
        secrets.insert(key.to_string(), value.expose_secret().to_string());
        self.write(&secrets)?;
        debug!(key, "Stored secret in file store");
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<SecretString, SecretError> {
        self.read()?
            .remove(key)
            .map(SecretString::new)
            .ok_or_else(|| SecretError::NotFound(key.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), SecretError> {
        let mut secrets = self.read()?;
        if secrets.remove(key).is_some() {
            self.write(&secrets)?;
            debug!(key, "Removed secret from file store");
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
