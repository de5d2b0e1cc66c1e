//! MCP 安装状态存储
//!
//! 每个 MCP 一个 JSON 文件：`<base>/state/<name>.json`。
//! 读取不存在的记录返回新的空记录（load-or-create），保存为整文件原子替换。

use crate::config::STATE_DIRECTORY;
use crate::definition::is_valid_name;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Invalid MCP name '{0}'")]
    InvalidName(String),

    #[error("Failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt state file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize MCP state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// 环境变量的值：明文或安全存储中的引用键
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    Plain(String),
    /// 安全存储的账户键，运行时解析
    SecretRef(String),
}

/// 单个 MCP 的持久化状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledState {
    pub name: String,
    /// 最近一次成功构建的镜像标签，未构建时为空
    pub local_image_tag: String,
    pub environment: BTreeMap<String, EnvValue>,
    /// 已成功连接的宿主，按连接顺序
    pub configured_hosts: Vec<String>,
}

impl InstalledState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_built(&self) -> bool {
        !self.local_image_tag.is_empty()
    }

    pub fn set_local_image_tag(&mut self, tag: impl Into<String>) {
        self.local_image_tag = tag.into();
    }

    pub fn set_env(&mut self, name: impl Into<String>, value: EnvValue) {
        self.environment.insert(name.into(), value);
    }

    pub fn env(&self, name: &str) -> Option<&EnvValue> {
        self.environment.get(name)
    }

    /// `(变量名, 安全存储键)` 列表
    pub fn secret_refs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.environment.iter().filter_map(|(var, value)| match value {
            EnvValue::SecretRef(key) => Some((var.as_str(), key.as_str())),
            EnvValue::Plain(_) => None,
        })
    }

    /// 记录已连接的宿主；重复安装不会产生重复项
    pub fn record_host(&mut self, host: impl Into<String>) {
        let host = host.into();
        if !self.configured_hosts.contains(&host) {
            self.configured_hosts.push(host);
        }
    }
}

/// 磁盘格式，字段名与既有状态文件保持一致
#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    local_image_tag: String,
    #[serde(default, deserialize_with = "null_as_default")]
    environment_variables: BTreeMap<String, String>,
    /// 安全存储键 -> 环境变量名
    #[serde(default, deserialize_with = "null_as_default")]
    keychain_env_vars: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    configured_hosts: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<StateFile> for InstalledState {
    fn from(file: StateFile) -> Self {
        let mut environment: BTreeMap<String, EnvValue> = file
            .environment_variables
            .into_iter()
            .map(|(var, value)| (var, EnvValue::Plain(value)))
            .collect();
        for (key, var) in file.keychain_env_vars {
            environment.insert(var, EnvValue::SecretRef(key));
        }

        Self {
            name: file.name,
            local_image_tag: file.local_image_tag,
            environment,
            configured_hosts: file.configured_hosts,
        }
    }
}

impl From<&InstalledState> for StateFile {
    fn from(state: &InstalledState) -> Self {
        let mut environment_variables = BTreeMap::new();
        let mut keychain_env_vars = BTreeMap::new();
        for (var, value) in &state.environment {
            match value {
                EnvValue::Plain(value) => {
                    environment_variables.insert(var.clone(), value.clone());
                }
                EnvValue::SecretRef(key) => {
                    keychain_env_vars.insert(key.clone(), var.clone());
                }
            }
        }

        Self {
            name: state.name.clone(),
            local_image_tag: state.local_image_tag.clone(),
            environment_variables,
            keychain_env_vars,
            configured_hosts: state.configured_hosts.clone(),
        }
    }
}

/// 状态存储
#[derive(Debug, Clone)]
pub struct StateStore {
    state_dir: PathBuf,
}

impl StateStore {
    /// 在 `<base_dir>/state` 下创建存储；目录在首次保存时才创建
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            state_dir: base_dir.as_ref().join(STATE_DIRECTORY),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    fn record_path(&self, name: &str) -> Result<PathBuf, StateError> {
        if !is_valid_name(name) {
            return Err(StateError::InvalidName(name.to_string()));
        }
        Ok(self.state_dir.join(format!("{}.json", name)))
    }

    /// 读取状态；记录不存在时返回空记录
    pub fn load(&self, name: &str) -> Result<InstalledState, StateError> {
        let path = self.record_path(name)?;

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(name, "No state recorded yet, starting fresh");
                return Ok(InstalledState::new(name));
            }
            Err(source) => return Err(StateError::Read { path, source }),
        };

        let file: StateFile =
            serde_json::from_str(&content).map_err(|source| StateError::Parse {
                path: path.clone(),
                source,
            })?;

        let mut state = InstalledState::from(file);
        if state.name != name {
            warn!(
                file_name = name,
                recorded_name = %state.name,
                "State record name differs from its file name; using the file name"
            );
            state.name = name.to_string();
        }
        Ok(state)
    }

    /// 整文件替换：先写临时文件再原子重命名
    pub fn save(&self, state: &InstalledState) -> Result<(), StateError> {
        let path = self.record_path(&state.name)?;
        let data = serde_json::to_string_pretty(&StateFile::from(state))?;

        let write_err = |source: io::Error| StateError::Write {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.state_dir).map_err(write_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.state_dir).map_err(write_err)?;
        tmp.write_all(data.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&path).map_err(|err| write_err(err.error))?;

        debug!(name = %state.name, path = %path.display(), "Saved MCP state");
        Ok(())
    }

    /// 删除状态文件；不存在不是错误
    pub fn delete(&self, name: &str) -> Result<(), StateError> {
        let path = self.record_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(name, "Deleted MCP state");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StateError::Write { path, source }),
        }
    }

    /// 列出所有记录（按名称排序）；存储未初始化时返回空列表
    pub fn list(&self) -> Result<Vec<InstalledState>, StateError> {
        let entries = match fs::read_dir(&self.state_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StateError::Read {
                    path: self.state_dir.clone(),
                    source,
                })
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StateError::Read {
                path: self.state_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(stem) if is_valid_name(stem) => names.push(stem.to_string()),
                _ => continue,
            }
        }
        names.sort();

        names.iter().map(|name| self.load(name)).collect()
    }
}
