//! 安装生命周期编排
//!
//! 串联目录、镜像构建、状态存储、安全存储与宿主注册表：
//! - `install`：构建 → 解析环境变量 → 逐个连接宿主（单个宿主失败不影响其它宿主）→ 保存
//! - `run`：读取状态 → 取回全部 secret → 运行镜像
//! - `uninstall`：删除镜像 → 逐个断开宿主（任一失败立即中止）→ 清理 secret → 删除状态
//!
//! 所有协作者都以 trait 对象注入，测试可以替换任意一个。

mod prompt;

pub use prompt::{DialoguerPrompter, PromptError, Prompter};

use crate::build::{ImageBuilder, ImageEngine, SourceFetcher};
use crate::definition::{Definition, DefinitionCatalog};
use crate::error::{SmpError, SmpResult};
use crate::host::{HostError, HostRegistry};
use crate::secrets::{secret_key, SecretStore};
use crate::state::{EnvValue, InstalledState, StateStore};
use secrecy::SecretString;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// 编排器依赖的协作者
pub struct Collaborators<'a> {
    pub catalog: &'a dyn DefinitionCatalog,
    pub store: &'a StateStore,
    pub fetcher: &'a dyn SourceFetcher,
    pub engine: &'a dyn ImageEngine,
    pub secrets: &'a dyn SecretStore,
    pub hosts: &'a HostRegistry,
    pub prompter: &'a dyn Prompter,
}

/// 安装选项
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// 预先提供的变量值，对应变量不再询问
    pub env: BTreeMap<String, String>,
    /// 指定要配置的宿主；`None` 时询问（或在 `assume_yes` 下全选）
    pub hosts: Option<Vec<String>>,
    /// 不询问，默认全选可用宿主并使用安全存储
    pub assume_yes: bool,
    /// 允许把 secret 写入安全存储
    pub secure_store: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            env: BTreeMap::new(),
            hosts: None,
            assume_yes: false,
            secure_store: true,
        }
    }
}

/// 安装结果
#[derive(Debug)]
pub struct InstallReport {
    pub name: String,
    pub tag: String,
    pub connected: Vec<String>,
    /// 连接失败的宿主及原因，不影响整体结果
    pub failed: Vec<(String, HostError)>,
}

/// 卸载结果
#[derive(Debug, Default)]
pub struct UninstallReport {
    pub name: String,
    pub removed_image: Option<String>,
    /// `(宿主, 条目是否存在过)`
    pub disconnected: Vec<(String, bool)>,
    pub removed_secrets: usize,
}

pub struct Orchestrator<'a> {
    deps: Collaborators<'a>,
    scratch_root: Option<PathBuf>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(deps: Collaborators<'a>) -> Self {
        Self {
            deps,
            scratch_root: None,
        }
    }

    /// 构建临时目录的父目录
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    fn builder(&self) -> ImageBuilder<'_> {
        let builder = ImageBuilder::new(
            self.deps.catalog,
            self.deps.fetcher,
            self.deps.engine,
            self.deps.store,
        );
        match &self.scratch_root {
            Some(root) => builder.with_scratch_root(root),
            None => builder,
        }
    }

    /// 安装：构建、解析环境变量、连接宿主并保存状态
    pub fn install(&self, name: &str, options: &InstallOptions) -> SmpResult<InstallReport> {
        let definition = self.deps.catalog.resolve(name)?;
        let mut state = self.deps.store.load(name)?;

        let tag = self.builder().build(&definition, &mut state)?;

        self.resolve_environment(&definition, &mut state, options, true)?;

        let selected = self.select_hosts(options)?;
        let mut connected = Vec::new();
        let mut failed = Vec::new();
        for host in selected {
            match self.connect_host(&host, name) {
                Ok(()) => {
                    state.record_host(host.as_str());
                    connected.push(host);
                }
                Err(err) => {
                    warn!(host = %host, server = name, error = %err, "Failed to configure host");
                    failed.push((host, err));
                }
            }
        }

        self.deps.store.save(&state)?;
        info!(name, tag = %tag, hosts = connected.len(), "MCP installed");

        Ok(InstallReport {
            name: name.to_string(),
            tag,
            connected,
            failed,
        })
    }

    /// 只构建镜像，并记录标签
    pub fn build(&self, name: &str) -> SmpResult<String> {
        let definition = self.deps.catalog.resolve(name)?;
        let mut state = self.deps.store.load(name)?;
        Ok(self.builder().build(&definition, &mut state)?)
    }

    /// 构建后用临时记录运行一次；临时记录不持久化，secret 也不写入安全存储
    pub fn build_and_test_run(&self, name: &str, options: &InstallOptions) -> SmpResult<String> {
        let definition = self.deps.catalog.resolve(name)?;
        let mut state = self.deps.store.load(name)?;
        let tag = self.builder().build(&definition, &mut state)?;

        // 只沿用明文值；secret 引用在试运行中重新询问
        let mut scratch = InstalledState::new(name);
        scratch.set_local_image_tag(&tag);
        for (var, value) in &state.environment {
            if let EnvValue::Plain(_) = value {
                scratch.set_env(var.as_str(), value.clone());
            }
        }
        self.resolve_environment(&definition, &mut scratch, options, false)?;

        let env = self.runtime_env(&scratch)?;
        self.deps.engine.run(&tag, &env)?;
        Ok(tag)
    }

    /// 运行已安装的 MCP；任一 secret 取不到都会中止
    pub fn run(&self, name: &str) -> SmpResult<()> {
        let state = self.deps.store.load(name)?;
        if !state.is_built() {
            return Err(SmpError::NotInstalled(name.to_string()));
        }

        let env = self.runtime_env(&state)?;
        debug!(name, vars = env.len(), "Resolved runtime environment");
        self.deps.engine.run(&state.local_image_tag, &env)?;
        Ok(())
    }

    /// 卸载；任一宿主断开失败立即返回，状态记录保留
    pub fn uninstall(&self, name: &str) -> SmpResult<UninstallReport> {
        let state = self.deps.store.load(name)?;
        let mut report = UninstallReport {
            name: name.to_string(),
            ..UninstallReport::default()
        };

        if state.is_built() {
            self.deps.engine.remove(&state.local_image_tag)?;
            report.removed_image = Some(state.local_image_tag.clone());
        }

        for host in &state.configured_hosts {
            let was_present = self.deps.hosts.disconnect(host, name)?;
            if !was_present {
                warn!(host = %host, server = name, "Server was not configured in host");
            }
            report.disconnected.push((host.clone(), was_present));
        }

        for (var, key) in state.secret_refs() {
            self.deps.secrets.remove(key)?;
            debug!(name, var, "Removed secret");
            report.removed_secrets += 1;
        }

        self.deps.store.delete(name)?;
        info!(name, "MCP uninstalled");
        Ok(report)
    }

    /// 为每个声明的变量确定取值
    ///
    /// 状态中已有值的变量跳过（`options.env` 显式提供的除外）。
    fn resolve_environment(
        &self,
        definition: &Definition,
        state: &mut InstalledState,
        options: &InstallOptions,
        allow_secure_store: bool,
    ) -> SmpResult<()> {
        let pending: Vec<_> = definition
            .environment
            .iter()
            .filter(|spec| options.env.contains_key(&spec.name) || state.env(&spec.name).is_none())
            .collect();

        let secure = allow_secure_store
            && options.secure_store
            && pending.iter().any(|spec| spec.is_secret())
            && (options.assume_yes
                || self
                    .deps
                    .prompter
                    .use_secure_store(self.deps.secrets.backend_name())?);

        for spec in pending {
            let value = match options.env.get(&spec.name) {
                Some(value) => Some(value.clone()),
                None => self.deps.prompter.env_value(&definition.name, spec)?,
            };

            let value = match value.filter(|value| !value.is_empty()) {
                Some(value) => value,
                None if spec.required => return Err(SmpError::MissingValue(spec.name.clone())),
                None => {
                    debug!(var = %spec.name, "Optional variable left empty");
                    continue;
                }
            };

            if spec.is_secret() && secure {
                let key = secret_key(&definition.name, &spec.name);
                self.deps.secrets.store(&key, &SecretString::new(value))?;
                state.set_env(spec.name.as_str(), EnvValue::SecretRef(key));
            } else {
                if let Some(EnvValue::SecretRef(old_key)) = state.env(&spec.name) {
                    self.deps.secrets.remove(old_key)?;
                    debug!(var = %spec.name, "Dropped secure-store entry replaced by a plain value");
                }
                state.set_env(spec.name.as_str(), EnvValue::Plain(value));
            }
        }
        Ok(())
    }

    /// 显式指定的宿主也必须可用，否则不写入其配置
    fn connect_host(&self, host: &str, server: &str) -> Result<(), HostError> {
        if !self.deps.hosts.is_available(host)? {
            return Err(HostError::Unavailable(host.to_string()));
        }
        self.deps.hosts.connect(host, server)
    }

    fn select_hosts(&self, options: &InstallOptions) -> SmpResult<Vec<String>> {
        if let Some(requested) = &options.hosts {
            return Ok(requested.clone());
        }

        let available = self.deps.hosts.list();
        if available.is_empty() || options.assume_yes {
            return Ok(available);
        }
        Ok(self.deps.prompter.select_hosts(&available)?)
    }

    fn runtime_env(&self, state: &InstalledState) -> SmpResult<Vec<(String, SecretString)>> {
        state
            .environment
            .iter()
            .map(|(var, value)| -> SmpResult<(String, SecretString)> {
                let resolved = match value {
                    EnvValue::Plain(value) => SecretString::new(value.clone()),
                    EnvValue::SecretRef(key) => self.deps.secrets.retrieve(key)?,
                };
                Ok((var.clone(), resolved))
            })
            .collect()
    }
}
