//! 镜像构建
//!
//! 为定义生成本地镜像，并把标签写回状态记录：
//! - 仓库来源：浅克隆到临时目录后构建
//! - 本地上下文：复制到临时目录后直接构建
//!
//! 两种路径都会用定义指定的 Dockerfile 覆盖源码树自带的 Dockerfile。
//! 临时目录在任何退出路径上都会被删除。

pub mod engine;
pub mod source;

pub use engine::{DockerCli, EngineError, ImageEngine};
pub use source::{FetchError, GitFetcher, SourceFetcher};

use crate::config::{DOCKERFILE_NAME, TAG_PREFIX, TAG_SUFFIX};
use crate::definition::{BuildSource, CatalogError, Definition, DefinitionCatalog};
use crate::state::{InstalledState, StateError, StateStore};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to fetch source '{location}': {message}")]
    SourceFetch { location: String, message: String },

    #[error("Build instructions missing for '{name}': {reason}")]
    InstructionsMissing { name: String, reason: String },

    #[error("Image build for '{tag}' failed: {source}")]
    Build {
        tag: String,
        #[source]
        source: EngineError,
    },

    #[error("Definition '{0}' declares neither a repository nor a build context")]
    NoSource(String),

    #[error("Failed to prepare build workspace: {0}")]
    Workspace(#[source] io::Error),

    #[error("Failed to record image tag: {0}")]
    State(#[from] StateError),
}

/// 镜像标签只由名称决定：`mcp-<name>:latest`
pub fn image_tag(name: &str) -> String {
    format!("{}{}:{}", TAG_PREFIX, name, TAG_SUFFIX)
}

pub struct ImageBuilder<'a> {
    catalog: &'a dyn DefinitionCatalog,
    fetcher: &'a dyn SourceFetcher,
    engine: &'a dyn ImageEngine,
    store: &'a StateStore,
    scratch_root: Option<PathBuf>,
}

impl<'a> ImageBuilder<'a> {
    pub fn new(
        catalog: &'a dyn DefinitionCatalog,
        fetcher: &'a dyn SourceFetcher,
        engine: &'a dyn ImageEngine,
        store: &'a StateStore,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            engine,
            store,
            scratch_root: None,
        }
    }

    /// 临时工作目录的父目录（默认系统临时目录）
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// 构建镜像，成功后把标签写入 `state` 并持久化
    pub fn build(
        &self,
        definition: &Definition,
        state: &mut InstalledState,
    ) -> Result<String, BuildError> {
        let tag = image_tag(&definition.name);
        let source = definition
            .build_source()
            .ok_or_else(|| BuildError::NoSource(definition.name.clone()))?;

        let prefix = format!("{}{}-", TAG_PREFIX, definition.name);
        let mut scratch = tempfile::Builder::new();
        scratch.prefix(&prefix);
        let workspace = match &self.scratch_root {
            Some(root) => scratch.tempdir_in(root),
            None => scratch.tempdir(),
        }
        .map_err(BuildError::Workspace)?;
        let context = workspace.path().join("context");

        match source {
            BuildSource::Repository { url, branch } => {
                self.fetcher
                    .fetch(url, branch, &context)
                    .map_err(|err| BuildError::SourceFetch {
                        location: url.to_string(),
                        message: err.to_string(),
                    })?;
            }
            BuildSource::Context(dir) => {
                copy_context(dir, &context).map_err(|err| BuildError::SourceFetch {
                    location: dir.display().to_string(),
                    message: err.to_string(),
                })?;
            }
        }

        self.apply_dockerfile(definition, &context)?;

        info!(name = %definition.name, tag = %tag, "Building image");
        self.engine
            .build(&tag, &context)
            .map_err(|source| BuildError::Build {
                tag: tag.clone(),
                source,
            })?;

        // 只有保存成功才更新调用方的记录
        let mut updated = state.clone();
        updated.set_local_image_tag(&tag);
        self.store.save(&updated)?;
        *state = updated;

        info!(name = %definition.name, tag = %tag, "Image built");
        Ok(tag)
    }

    fn apply_dockerfile(&self, definition: &Definition, context: &Path) -> Result<(), BuildError> {
        let target = context.join(DOCKERFILE_NAME);

        let Some(reference) = definition.dockerfile.as_deref() else {
            if target.is_file() {
                debug!(name = %definition.name, "Using the source tree's own Dockerfile");
                return Ok(());
            }
            return Err(BuildError::InstructionsMissing {
                name: definition.name.clone(),
                reason: "no Dockerfile declared and none found in the source tree".to_string(),
            });
        };

        let content = self.catalog.dockerfile(reference).map_err(|err| match err {
            CatalogError::DockerfileNotFound(_) => BuildError::InstructionsMissing {
                name: definition.name.clone(),
                reason: format!("Dockerfile '{}' not found", reference),
            },
            other => BuildError::InstructionsMissing {
                name: definition.name.clone(),
                reason: other.to_string(),
            },
        })?;

        fs::write(&target, content).map_err(BuildError::Workspace)?;
        debug!(name = %definition.name, reference, "Overrode Dockerfile");
        Ok(())
    }
}

/// Copies a local build context, leaving VCS metadata behind.
fn copy_context(src: &Path, dst: &Path) -> io::Result<()> {
    if !src.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("build context {} is not a directory", src.display()),
        ));
    }
    fs::create_dir_all(dst)?;

    let walker = walkdir::WalkDir::new(src)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git");
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
