//! CLI 命令处理模块
//!
//! 进程启动时构造一次全部协作者（[`AppContext`]），再分发到各个子命令。

pub mod build;
pub mod host;
pub mod install;
pub mod list;
pub mod parser;
pub mod run;
pub mod uninstall;

pub use parser::*;

use crate::build::{DockerCli, GitFetcher};
use crate::definition::LayeredCatalog;
use crate::host::HostRegistry;
use crate::orchestrator::{Collaborators, DialoguerPrompter, Orchestrator};
use crate::secrets::{open_store, SecretStore};
use crate::state::StateStore;
use crate::utils::ConfigPaths;
use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tracing::debug;

/// 一次调用中使用的全部协作者
pub struct AppContext {
    pub paths: ConfigPaths,
    pub catalog: LayeredCatalog,
    pub store: StateStore,
    pub fetcher: GitFetcher,
    pub engine: DockerCli,
    pub secrets: Box<dyn SecretStore>,
    pub hosts: HostRegistry,
    pub prompter: DialoguerPrompter,
}

impl AppContext {
    /// 从用户环境构造：~/.smp（或 SMP_HOME）、用户主目录和当前可执行文件
    pub fn from_environment() -> Result<Self> {
        let paths = ConfigPaths::new()?;
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot find home directory"))?;
        Ok(Self::new(paths, home, current_executable()?))
    }

    pub fn new(paths: ConfigPaths, home: PathBuf, executable: PathBuf) -> Self {
        debug!(
            base = %paths.base_dir.display(),
            executable = %executable.display(),
            "Initialising context"
        );
        let config = &paths.user_config;
        Self {
            catalog: LayeredCatalog::with_user_dir(paths.definitions_dir.clone()),
            store: StateStore::new(&paths.base_dir),
            fetcher: GitFetcher::new(),
            engine: DockerCli::new(&config.docker_bin),
            secrets: open_store(config.secret_backend, paths.secrets_file.clone()),
            hosts: HostRegistry::with_defaults(&home, executable),
            prompter: DialoguerPrompter::new(),
            paths,
        }
    }

    pub fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator::new(Collaborators {
            catalog: &self.catalog,
            store: &self.store,
            fetcher: &self.fetcher,
            engine: &self.engine,
            secrets: self.secrets.as_ref(),
            hosts: &self.hosts,
            prompter: &self.prompter,
        })
    }
}

/// 宿主配置中写入的启动命令：解析符号链接后的绝对路径
fn current_executable() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    Ok(std::fs::canonicalize(&exe).unwrap_or(exe))
}

/// 执行子命令
pub fn execute(command: Commands) -> Result<()> {
    let ctx = AppContext::from_environment()?;
    match command {
        Commands::Install {
            name,
            env,
            hosts,
            yes,
            no_secure_store,
        } => install::execute(&ctx, &name, env, hosts, yes, no_secure_store),
        Commands::Uninstall { name } => uninstall::execute(&ctx, &name),
        Commands::Build {
            name,
            test_run,
            env,
        } => build::execute(&ctx, &name, test_run, env),
        Commands::Run { name } => run::execute(&ctx, &name),
        Commands::List => list::execute(&ctx),
        Commands::Host(action) => host::execute(&ctx, action),
    }
}
