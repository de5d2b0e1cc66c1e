//! macOS 钥匙串后端
//!
//! 通过系统自带的 `security` 工具读写通用密码条目，服务名固定为 `Secure MCP`。
//! 写入时密钥经由 stdin 传给 `security -i`，不出现在进程参数中。

use super::{SecretError, SecretStore};
use crate::config::KEYCHAIN_SERVICE;
use secrecy::{ExposeSecret, SecretString};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

const SECURITY_BIN: &str = "security";
// errSecItemNotFound
const ITEM_NOT_FOUND_EXIT: i32 = 44;

#[derive(Debug, Clone)]
pub struct KeychainStore {
    service: String,
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeychainStore {
    pub fn new() -> Self {
        Self {
            service: KEYCHAIN_SERVICE.to_string(),
        }
    }

    fn backend_err(key: &str, message: impl Into<String>) -> SecretError {
        SecretError::Backend {
            backend: "keychain",
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Quote a token for `security -i`, which splits its input like a shell.
fn quote(token: &str) -> String {
    let escaped = token.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

impl SecretStore for KeychainStore {
    fn store(&self, key: &str, value: &SecretString) -> Result<(), SecretError> {
        let mut child = Command::new(SECURITY_BIN)
            .arg("-i")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| Self::backend_err(key, format!("failed to start security: {err}")))?;

        // -U 更新已有条目，保证重复写入是覆盖而不是重复
        let line = format!(
            "add-generic-password -U -s {} -a {} -w {}\n",
            quote(&self.service),
            quote(key),
            quote(value.expose_secret())
        );
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(line.as_bytes())
                .map_err(|err| Self::backend_err(key, err.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|err| Self::backend_err(key, err.to_string()))?;
        if !output.status.success() {
            return Err(Self::backend_err(
                key,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        debug!(key, "Stored secret in keychain");
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<SecretString, SecretError> {
        let output = Command::new(SECURITY_BIN)
            .args(["find-generic-password", "-s", &self.service, "-a", key, "-w"])
            .stdin(Stdio::null())
            .output()
            .map_err(|err| Self::backend_err(key, format!("failed to start security: {err}")))?;

        if output.status.code() == Some(ITEM_NOT_FOUND_EXIT) {
            return Err(SecretError::NotFound(key.to_string()));
        }
        if !output.status.success() {
            return Err(Self::backend_err(
                key,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let mut value = String::from_utf8(output.stdout)
            .map_err(|_| Self::backend_err(key, "secret is not valid UTF-8"))?;
        if value.ends_with('\n') {
            value.pop();
        }
        Ok(SecretString::new(value))
    }

    fn remove(&self, key: &str) -> Result<(), SecretError> {
        let output = Command::new(SECURITY_BIN)
            .args(["delete-generic-password", "-s", &self.service, "-a", key])
            .stdin(Stdio::null())
            .output()
            .map_err(|err| Self::backend_err(key, format!("failed to start security: {err}")))?;

        match output.status.code() {
            Some(0) | Some(ITEM_NOT_FOUND_EXIT) => Ok(()),
            _ => Err(Self::backend_err(
                key,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
        }
    }

    fn backend_name(&self) -> &'static str {
        "keychain"
    }
}
