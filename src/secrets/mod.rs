//! 安全密钥存储
//!
//! 状态文件只记录引用键，密钥值保存在外部安全存储中。
//! 键格式固定为 `<definition>_<variable>`，重复写入同一键为覆盖更新。

mod file;
mod keychain;

pub use file::FileSecretStore;
pub use keychain::KeychainStore;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Secret '{0}' not found in secure store")]
    NotFound(String),

    #[error("Secure store ({backend}) failed for '{key}': {message}")]
    Backend {
        backend: &'static str,
        key: String,
        message: String,
    },

    #[error("Failed to access secret file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt secret file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 安全存储契约
pub trait SecretStore {
    /// 写入或覆盖
    fn store(&self, key: &str, value: &SecretString) -> Result<(), SecretError>;

    fn retrieve(&self, key: &str) -> Result<SecretString, SecretError>;

    /// 删除；键不存在视为成功
    fn remove(&self, key: &str) -> Result<(), SecretError>;

    fn backend_name(&self) -> &'static str;
}

/// Account key for a definition's secret variable.
pub fn secret_key(definition: &str, variable: &str) -> String {
    format!("{}_{}", definition, variable)
}

/// 安全存储后端选择
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretBackend {
    /// macOS 使用钥匙串，其他平台使用文件
    #[default]
    Auto,
    Keychain,
    File,
}

impl SecretBackend {
    pub fn resolve(self) -> SecretBackend {
        match self {
            SecretBackend::Auto if cfg!(target_os = "macos") => SecretBackend::Keychain,
            SecretBackend::Auto => SecretBackend::File,
            other => other,
        }
    }
}

/// 根据配置构造安全存储
pub fn open_store(backend: SecretBackend, secrets_file: PathBuf) -> Box<dyn SecretStore> {
    match backend.resolve() {
        SecretBackend::Keychain => Box::new(KeychainStore::new()),
        _ => Box::new(FileSecretStore::new(secrets_file)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_definition_and_variable() {
        assert_eq!(secret_key("weather", "API_KEY"), "weather_API_KEY");
    }

    #[test]
    fn auto_backend_resolves_per_platform() {
        let resolved = SecretBackend::Auto.resolve();
        if cfg!(target_os = "macos") {
            assert_eq!(resolved, SecretBackend::Keychain);
        } else {
            assert_eq!(resolved, SecretBackend::File);
        }
        assert_eq!(SecretBackend::File.resolve(), SecretBackend::File);
    }
}
