//! 配置路径管理
//!
//! - 持久化数据（状态、用户定义、密钥文件、config.json）保存在 ~/.smp/，可用 SMP_HOME 覆盖

use crate::config::{
    BASE_DIRECTORY, CONFIG_FILE_NAME, DEFAULT_DOCKER_BIN, DEFINITIONS_DIRECTORY,
    SECRETS_FILE_NAME, SMP_HOME_ENV, STATE_DIRECTORY,
};
use crate::secrets::SecretBackend;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// 用户配置（从 config.json 读取）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// 容器引擎可执行文件
    #[serde(default = "default_docker_bin")]
    pub docker_bin: String,
    /// 用户定义目录（默认 ~/.smp/definitions/），支持 ~ 展开
    #[serde(default)]
    pub definitions_dir: Option<String>,
    #[serde(default)]
    pub secret_backend: SecretBackend,
}

fn default_docker_bin() -> String {
    DEFAULT_DOCKER_BIN.to_string()
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            docker_bin: default_docker_bin(),
            definitions_dir: None,
            secret_backend: SecretBackend::default(),
        }
    }
}

impl UserConfig {
    /// 从配置文件加载；文件缺失或无效时使用默认值
    pub fn load(config_file: &Path) -> Self {
        let content = match std::fs::read_to_string(config_file) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %config_file.display(), error = %err, "Ignoring invalid config file");
                Self::default()
            }
        }
    }

    /// 用户定义目录（支持 ~ 展开）
    pub fn definitions_dir(&self) -> Option<PathBuf> {
        self.definitions_dir
            .as_ref()
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).into_owned()))
    }
}

/// 配置文件路径集合
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// 基础目录（~/.smp/）
    pub base_dir: PathBuf,
    /// 状态目录
    pub state_dir: PathBuf,
    pub definitions_dir: PathBuf,
    /// 文件后端的密钥文件
    pub secrets_file: PathBuf,
    pub config_file: PathBuf,
    pub user_config: UserConfig,
}

impl ConfigPaths {
    /// 基于用户主目录创建；设置了 SMP_HOME 时以它为基础目录
    pub fn new() -> Result<Self> {
        if let Some(base) = std::env::var_os(SMP_HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_base_dir(PathBuf::from(base)));
        }
        let home_dir =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?;
        Ok(Self::with_base_dir(home_dir.join(BASE_DIRECTORY)))
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        let config_file = base_dir.join(CONFIG_FILE_NAME);
        let user_config = UserConfig::load(&config_file);
        let definitions_dir = user_config
            .definitions_dir()
            .unwrap_or_else(|| base_dir.join(DEFINITIONS_DIRECTORY));

        Self {
            state_dir: base_dir.join(STATE_DIRECTORY),
            secrets_file: base_dir.join(SECRETS_FILE_NAME),
            definitions_dir,
            config_file,
            base_dir,
            user_config,
        }
    }
}
