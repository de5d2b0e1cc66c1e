//! MCP 定义
//!
//! 描述如何构建和配置一个 MCP：源码位置、Dockerfile 引用以及声明的环境变量。
//! 定义在每次调用时加载，加载后不可变。

mod catalog;

pub use catalog::{
    is_valid_name, CatalogError, DefinitionCatalog, DirectoryCatalog, EmbeddedCatalog, LayeredCatalog,
};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 环境变量类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvKind {
    #[default]
    Plain,
    Secret,
}

/// 定义中声明的环境变量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: EnvKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl EnvVarSpec {
    pub fn is_secret(&self) -> bool {
        self.kind == EnvKind::Secret
    }
}

/// MCP 定义（来自目录，按名称唯一）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// 本地构建上下文，存在时跳过克隆
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<PathBuf>,
    /// 权威 Dockerfile 的引用，由目录解析
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
    #[serde(default, rename = "environment")]
    pub environment: Vec<EnvVarSpec>,
}

/// Where the image build context comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildSource<'a> {
    Repository { url: &'a str, branch: Option<&'a str> },
    Context(&'a Path),
}

impl Definition {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// 构建来源：声明了本地上下文时优先使用，否则克隆仓库
    pub fn build_source(&self) -> Option<BuildSource<'_>> {
        if let Some(context) = &self.context {
            return Some(BuildSource::Context(context));
        }
        self.repository.as_deref().map(|url| BuildSource::Repository {
            url,
            branch: self.branch.as_deref().filter(|b| !b.is_empty()),
        })
    }

    pub fn has_secrets(&self) -> bool {
        self.environment.iter().any(EnvVarSpec::is_secret)
    }

    pub(crate) fn validate(&self, expected_name: &str) -> Result<(), String> {
        if self.name != expected_name {
            return Err(format!(
                "declared name '{}' does not match '{}'",
                self.name, expected_name
            ));
        }
        if self.build_source().is_none() {
            return Err("either 'repository' or 'context' must be set".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for var in &self.environment {
            if var.name.trim().is_empty() {
                return Err("environment variable with empty name".to_string());
            }
            if !seen.insert(var.name.as_str()) {
                return Err(format!("environment variable '{}' declared twice", var.name));
            }
        }
        Ok(())
    }
}
