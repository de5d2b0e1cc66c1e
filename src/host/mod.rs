//! 宿主应用集成
//!
//! 每个宿主（Claude Desktop、Cline、Cursor……）实现 [`HostConnector`]，
//! 在 [`HostRegistry`] 中按标识符注册。新增宿主只需新增一个实现。

pub mod claude_desktop;
pub mod cline;
pub mod config_file;
pub mod cursor;

pub use claude_desktop::ClaudeDesktop;
pub use cline::Cline;
pub use config_file::{HostServerEntry, McpConfigFile, Upsert};
pub use cursor::Cursor;

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Host '{host}' already has a server named '{server}' launched by '{existing}'")]
    Conflict {
        host: String,
        server: String,
        existing: String,
    },

    #[error("Unknown host '{0}'")]
    UnknownHost(String),

    #[error("Host '{0}' is not supported on this platform")]
    Unsupported(String),

    #[error("Host '{0}' is not installed on this machine")]
    Unavailable(String),

    #[error("Failed to read host config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid JSON in host config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write host config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 条目存在且已从内存中删除，但写回失败
    #[error("Removed '{server}' from host '{host}' but could not save {path}: {source}")]
    RemoveNotPersisted {
        host: String,
        server: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl HostError {
    /// 出错时条目是否存在过
    pub fn was_present(&self) -> bool {
        matches!(self, HostError::RemoveNotPersisted { .. })
    }
}

/// 宿主连接器
pub trait HostConnector {
    fn name(&self) -> &str;

    /// 只检查配置位置是否存在
    fn available(&self) -> bool;

    /// 幂等写入启动条目；同名条目的 command 不同则冲突
    fn connect(&self, executable: &Path, server: &str) -> Result<(), HostError>;

    /// 幂等删除，返回条目是否存在过
    fn disconnect(&self, server: &str) -> Result<bool, HostError>;
}

/// 按平台推导的应用配置根目录
///
/// macOS 为 `~/Library/Application Support`，Linux 为 `~/.config`，
/// Windows 为 `%APPDATA%`。
pub(crate) fn app_config_dir(home: &Path) -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        Some(home.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::config_dir()
    } else if cfg!(target_os = "linux") {
        Some(home.join(".config"))
    } else {
        None
    }
}

/// 宿主注册表，进程启动时构造一次后注入使用
pub struct HostRegistry {
    executable: PathBuf,
    connectors: BTreeMap<String, Box<dyn HostConnector>>,
}

impl HostRegistry {
    /// 空注册表；`executable` 为写入宿主配置的启动命令
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            connectors: BTreeMap::new(),
        }
    }

    /// 注册内置的全部宿主
    pub fn with_defaults(home: &Path, executable: impl Into<PathBuf>) -> Self {
        let mut registry = Self::new(executable);
        registry.register(Box::new(ClaudeDesktop::new(home)));
        registry.register(Box::new(Cline::new(home)));
        registry.register(Box::new(Cursor::new(home)));
        registry
    }

    pub fn register(&mut self, connector: Box<dyn HostConnector>) {
        self.connectors.insert(connector.name().to_string(), connector);
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// 全部已注册宿主
    pub fn names(&self) -> Vec<String> {
        self.connectors.keys().cloned().collect()
    }

    /// 当前可用的宿主（按名称排序）
    pub fn list(&self) -> Vec<String> {
        self.connectors
            .values()
            .filter(|connector| connector.available())
            .map(|connector| connector.name().to_string())
            .collect()
    }

    fn get(&self, host: &str) -> Result<&dyn HostConnector, HostError> {
        self.connectors
            .get(host)
            .map(|connector| connector.as_ref())
            .ok_or_else(|| HostError::UnknownHost(host.to_string()))
    }

    /// 已注册宿主当前是否可用；未注册时返回 `UnknownHost`
    pub fn is_available(&self, host: &str) -> Result<bool, HostError> {
        Ok(self.get(host)?.available())
    }

    pub fn connect(&self, host: &str, server: &str) -> Result<(), HostError> {
        let connector = self.get(host)?;
        debug!(host, server, executable = %self.executable.display(), "Connecting server to host");
        connector.connect(&self.executable, server)?;
        info!(host, server, "Connected");
        Ok(())
    }

    pub fn disconnect(&self, host: &str, server: &str) -> Result<bool, HostError> {
        let connector = self.get(host)?;
        let was_present = connector.disconnect(server)?;
        if was_present {
            info!(host, server, "Disconnected");
        } else {
            debug!(host, server, "No entry to remove");
        }
        Ok(was_present)
    }
}
