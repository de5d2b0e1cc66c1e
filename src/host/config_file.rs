//! 宿主 MCP 配置文件编辑器
//!
//! 所有宿主共用同一种文件结构：
//! `{"mcpServers": {<name>: {"command": str, "args": [str], "envs": {str: str}}}}`。
//! 只读写与本工具同名的那一个条目，其它条目与顶层字段原样保留。

use super::HostError;
use crate::config::{HOME_ENV, RUN_SUBCOMMAND};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 单个服务器条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostServerEntry {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub envs: BTreeMap<String, String>,
}

impl HostServerEntry {
    /// `<executable> run <server>`，透传 HOME
    pub fn launcher(executable: &Path, server: &str, home: &str) -> Self {
        let mut envs = BTreeMap::new();
        envs.insert(HOME_ENV.to_string(), home.to_string());
        Self {
            command: executable.display().to_string(),
            args: vec![RUN_SUBCOMMAND.to_string(), server.to_string()],
            envs,
        }
    }
}

/// 配置文件根结构
///
/// 服务器条目保留为原始 JSON，避免改写不属于本工具的条目。
#[derive(Debug, Default, Serialize, Deserialize)]
struct HostConfigDocument {
    #[serde(rename = "mcpServers", default, deserialize_with = "null_as_empty")]
    mcp_servers: Map<String, Value>,
    #[serde(flatten)]
    other: Map<String, Value>,
}

// `"mcpServers": null` 等同于空表
fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Upsert 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct McpConfigFile {
    host: String,
    path: PathBuf,
}

impl McpConfigFile {
    pub fn new(host: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<HostConfigDocument, HostError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            // 配置文件不存在，返回空配置
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(HostConfigDocument::default())
            }
            Err(source) => {
                return Err(HostError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(HostConfigDocument::default());
        }

        serde_json::from_str(&content).map_err(|source| HostError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, document: &HostConfigDocument) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(document)?;
        fs::write(&self.path, content)
    }

    /// 读取某个条目；条目不是合法结构时视为不存在 command 的条目
    pub fn entry(&self, server: &str) -> Result<Option<HostServerEntry>, HostError> {
        let document = self.read()?;
        Ok(document
            .mcp_servers
            .get(server)
            .and_then(|value| serde_json::from_value(value.clone()).ok()))
    }

    /// 插入条目；同名条目已存在且 command 相同则不写文件，不同则冲突
    pub fn upsert(&self, server: &str, entry: &HostServerEntry) -> Result<Upsert, HostError> {
        let mut document = self.read()?;

        if let Some(existing) = document.mcp_servers.get(server) {
            let command = existing
                .get("command")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if command == entry.command {
                debug!(host = %self.host, server, "Entry already present");
                return Ok(Upsert::Unchanged);
            }
            return Err(HostError::Conflict {
                host: self.host.clone(),
                server: server.to_string(),
                existing: command.to_string(),
            });
        }

        let value = serde_json::to_value(entry).map_err(|err| HostError::Write {
            path: self.path.clone(),
            source: err.into(),
        })?;
        document.mcp_servers.insert(server.to_string(), value);
        self.write(&document).map_err(|source| HostError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!(host = %self.host, server, path = %self.path.display(), "Entry added");
        Ok(Upsert::Inserted)
    }

    /// 删除条目，返回条目是否存在过
    pub fn remove(&self, server: &str) -> Result<bool, HostError> {
        let mut document = self.read()?;

        if document.mcp_servers.remove(server).is_none() {
            return Ok(false);
        }

        self.write(&document)
            .map_err(|source| HostError::RemoveNotPersisted {
                host: self.host.clone(),
                server: server.to_string(),
                path: self.path.clone(),
                source,
            })?;

        debug!(host = %self.host, server, path = %self.path.display(), "Entry removed");
        Ok(true)
    }
}
