//! 定义目录
//!
//! 给定名称返回定义；内置定义编译进二进制，用户目录中的定义优先。

use super::Definition;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const EMBEDDED_DEFINITIONS: &[(&str, &str)] = &[
    ("fetch", include_str!("../../definitions/fetch.yaml")),
    ("github", include_str!("../../definitions/github.yaml")),
];

const EMBEDDED_DOCKERFILES: &[(&str, &str)] = &[
    ("fetch/Dockerfile", include_str!("../../definitions/fetch/Dockerfile")),
    ("github/Dockerfile", include_str!("../../definitions/github/Dockerfile")),
];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("MCP '{0}' not found")]
    NotFound(String),

    #[error("Invalid MCP name '{0}'")]
    InvalidName(String),

    #[error("Failed to parse definition '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid definition '{name}': {message}")]
    Invalid { name: String, message: String },

    #[error("Dockerfile '{0}' not found")]
    DockerfileNotFound(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 定义来源
pub trait DefinitionCatalog {
    /// 按名称解析定义
    fn resolve(&self, name: &str) -> Result<Definition, CatalogError>;

    /// 所有可用定义名称（已排序）
    fn list(&self) -> Result<Vec<String>, CatalogError>;

    /// 读取定义引用的 Dockerfile 内容
    fn dockerfile(&self, reference: &str) -> Result<Vec<u8>, CatalogError>;
}

/// Names double as file names: letters and digits (any script) plus `-`, `_` and `.`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn parse_definition(name: &str, content: &str) -> Result<Definition, CatalogError> {
    let definition = Definition::from_yaml(content).map_err(|source| CatalogError::Parse {
        name: name.to_string(),
        source,
    })?;
    definition
        .validate(name)
        .map_err(|message| CatalogError::Invalid {
            name: name.to_string(),
            message,
        })?;
    Ok(definition)
}

/// 编译进二进制的内置定义
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedCatalog;

impl EmbeddedCatalog {
    pub fn new() -> Self {
        Self
    }
}

impl DefinitionCatalog for EmbeddedCatalog {
    fn resolve(&self, name: &str) -> Result<Definition, CatalogError> {
        let (_, content) = EMBEDDED_DEFINITIONS
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        parse_definition(name, content)
    }

    fn list(&self) -> Result<Vec<String>, CatalogError> {
        let mut names: Vec<String> = EMBEDDED_DEFINITIONS
            .iter()
            .map(|(name, _)| name.to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    fn dockerfile(&self, reference: &str) -> Result<Vec<u8>, CatalogError> {
        EMBEDDED_DOCKERFILES
            .iter()
            .find(|(path, _)| *path == reference)
            .map(|(_, content)| content.as_bytes().to_vec())
            .ok_or_else(|| CatalogError::DockerfileNotFound(reference.to_string()))
    }
}

/// 用户目录中的定义：`<dir>/<name>.yaml`
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    dir: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn definition_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.yaml", name))
    }
}

impl DefinitionCatalog for DirectoryCatalog {
    fn resolve(&self, name: &str) -> Result<Definition, CatalogError> {
        if !is_valid_name(name) {
            return Err(CatalogError::InvalidName(name.to_string()));
        }

        let path = self.definition_path(name);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(CatalogError::NotFound(name.to_string()))
            }
            Err(source) => return Err(CatalogError::Io { path, source }),
        };

        let mut definition = parse_definition(name, &content)?;
        // 相对的构建上下文以定义目录为基准
        if let Some(context) = definition.context.take() {
            definition.context = Some(if context.is_relative() {
                self.dir.join(context)
            } else {
                context
            });
        }
        debug!(name, path = %path.display(), "Resolved definition from directory");
        Ok(definition)
    }

    fn list(&self) -> Result<Vec<String>, CatalogError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CatalogError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CatalogError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("yaml") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn dockerfile(&self, reference: &str) -> Result<Vec<u8>, CatalogError> {
        let path = self.dir.join(reference);
        match fs::read(&path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(CatalogError::DockerfileNotFound(reference.to_string()))
            }
            Err(source) => Err(CatalogError::Io { path, source }),
        }
    }
}

/// 多层目录：按顺序查找，先命中者生效
pub struct LayeredCatalog {
    layers: Vec<Box<dyn DefinitionCatalog>>,
}

impl LayeredCatalog {
    pub fn new(layers: Vec<Box<dyn DefinitionCatalog>>) -> Self {
        Self { layers }
    }

    /// 用户目录优先，其次内置定义
    pub fn with_user_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(vec![
            Box::new(DirectoryCatalog::new(dir)),
            Box::new(EmbeddedCatalog::new()),
        ])
    }
}

impl DefinitionCatalog for LayeredCatalog {
    fn resolve(&self, name: &str) -> Result<Definition, CatalogError> {
        for layer in &self.layers {
            match layer.resolve(name) {
                Err(CatalogError::NotFound(_)) => continue,
                other => return other,
            }
        }
        Err(CatalogError::NotFound(name.to_string()))
    }

    fn list(&self) -> Result<Vec<String>, CatalogError> {
        let mut names = Vec::new();
        for layer in &self.layers {
            names.extend(layer.list()?);
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn dockerfile(&self, reference: &str) -> Result<Vec<u8>, CatalogError> {
        for layer in &self.layers {
            match layer.dockerfile(reference) {
                Err(CatalogError::DockerfileNotFound(_)) => continue,
                other => return other,
            }
        }
        Err(CatalogError::DockerfileNotFound(reference.to_string()))
    }
}
