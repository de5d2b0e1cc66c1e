//! 源码获取
//!
//! 浅克隆（depth=1）；指定分支时只拉取该分支。

use git2::{build::RepoBuilder, FetchOptions};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("git: {0}")]
    Git(#[from] git2::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// 将源码树获取到 `dest`（`dest` 不存在或为空目录）
pub trait SourceFetcher {
    fn fetch(&self, url: &str, branch: Option<&str>, dest: &Path) -> Result<(), FetchError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GitFetcher;

impl GitFetcher {
    pub fn new() -> Self {
        Self
    }
}

fn spinner(message: String) -> ProgressBar {
    let style = ProgressStyle::default_spinner()
        .template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let bar = ProgressBar::new_spinner().with_style(style).with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

impl SourceFetcher for GitFetcher {
    fn fetch(&self, url: &str, branch: Option<&str>, dest: &Path) -> Result<(), FetchError> {
        info!(url, branch = branch.unwrap_or("<default>"), "Cloning repository");
        let progress = spinner(format!("Cloning {}...", url));

        let mut fetch_opts = FetchOptions::new();
        fetch_opts.depth(1);

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_opts);
        if let Some(branch) = branch {
            let refspec = format!("+refs/heads/{0}:refs/remotes/origin/{0}", branch);
            builder.branch(branch);
            builder.remote_create(move |repo, name, url| {
                repo.remote_with_fetch(name, url, &refspec)
            });
        }

        let result = builder.clone(url, dest);
        progress.finish_and_clear();
        result?;
        Ok(())
    }
}
