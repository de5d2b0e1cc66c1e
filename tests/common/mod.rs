//! 集成测试共用的假协作者
#![allow(dead_code)]

use secrecy::{ExposeSecret, SecretString};
use smp::build::{EngineError, FetchError};
use smp::definition::CatalogError;
use smp::orchestrator::PromptError;
use smp::{Definition, DefinitionCatalog, EnvKind, EnvVarSpec, ImageEngine, Prompter, SourceFetcher};
use smp::{SecretError, SecretStore};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// 内存中的目录
#[derive(Default)]
pub struct StaticCatalog {
    definitions: BTreeMap<String, Definition>,
}

impl StaticCatalog {
    pub fn with(definitions: impl IntoIterator<Item = Definition>) -> Self {
        Self {
            definitions: definitions
                .into_iter()
                .map(|def| (def.name.clone(), def))
                .collect(),
        }
    }
}

impl DefinitionCatalog for StaticCatalog {
    fn resolve(&self, name: &str) -> Result<Definition, CatalogError> {
        self.definitions
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }

    fn list(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.definitions.keys().cloned().collect())
    }

    fn dockerfile(&self, reference: &str) -> Result<Vec<u8>, CatalogError> {
        if reference.starts_with("missing") {
            return Err(CatalogError::DockerfileNotFound(reference.to_string()));
        }
        Ok(format!("# {}\nFROM scratch\n", reference).into_bytes())
    }
}

/// `weather`：一个必填明文变量和一个必填 secret 变量
pub fn weather_definition() -> Definition {
    Definition {
        name: "weather".into(),
        repository: Some("https://example.com/weather-mcp.git".into()),
        branch: Some("main".into()),
        context: None,
        dockerfile: Some("weather/Dockerfile".into()),
        environment: vec![
            EnvVarSpec {
                name: "API_REGION".into(),
                kind: EnvKind::Plain,
                description: "Region".into(),
                required: true,
            },
            EnvVarSpec {
                name: "API_KEY".into(),
                kind: EnvKind::Secret,
                description: "API key".into(),
                required: true,
            },
        ],
    }
}

/// 只创建目标目录的获取器
#[derive(Default)]
pub struct FakeFetcher {
    pub fail: bool,
    pub fetched: RefCell<Vec<(String, Option<String>)>>,
}

impl SourceFetcher for FakeFetcher {
    fn fetch(&self, url: &str, branch: Option<&str>, dest: &Path) -> Result<(), FetchError> {
        self.fetched
            .borrow_mut()
            .push((url.to_string(), branch.map(str::to_string)));
        if self.fail {
            return Err(FetchError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "network unreachable",
            )));
        }
        fs::create_dir_all(dest)?;
        Ok(())
    }
}

/// 记录调用的镜像引擎
#[derive(Default)]
pub struct FakeEngine {
    pub fail_build: bool,
    pub fail_remove: bool,
    pub builds: RefCell<Vec<String>>,
    pub runs: RefCell<Vec<(String, BTreeMap<String, String>)>>,
    pub removed: RefCell<Vec<String>>,
}

impl FakeEngine {
    fn failure(command: &str) -> EngineError {
        EngineError::NotFound(command.to_string())
    }
}

impl ImageEngine for FakeEngine {
    fn build(&self, tag: &str, context: &Path) -> Result<(), EngineError> {
        assert!(context.join("Dockerfile").is_file(), "build context lacks a Dockerfile");
        if self.fail_build {
            return Err(Self::failure("docker build"));
        }
        self.builds.borrow_mut().push(tag.to_string());
        Ok(())
    }

    fn run(&self, tag: &str, env: &[(String, SecretString)]) -> Result<(), EngineError> {
        let env = env
            .iter()
            .map(|(k, v)| (k.clone(), v.expose_secret().to_string()))
            .collect();
        self.runs.borrow_mut().push((tag.to_string(), env));
        Ok(())
    }

    fn remove(&self, tag: &str) -> Result<(), EngineError> {
        if self.fail_remove {
            return Err(Self::failure("docker rmi"));
        }
        self.removed.borrow_mut().push(tag.to_string());
        Ok(())
    }
}

/// 内存安全存储
#[derive(Default)]
pub struct MemorySecretStore {
    pub values: RefCell<BTreeMap<String, String>>,
    pub unavailable: Cell<bool>,
}

impl MemorySecretStore {
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }
}

impl SecretStore for MemorySecretStore {
    fn store(&self, key: &str, value: &SecretString) -> Result<(), SecretError> {
        if self.unavailable.get() {
            return Err(SecretError::Backend {
                backend: "memory",
                key: key.to_string(),
                message: "locked".into(),
            });
        }
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.expose_secret().to_string());
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<SecretString, SecretError> {
        self.values
            .borrow()
            .get(key)
            .map(|value| SecretString::new(value.clone()))
            .ok_or_else(|| SecretError::NotFound(key.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), SecretError> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// 按预设答案作答的提示器
pub struct ScriptedPrompter {
    pub answers: BTreeMap<String, String>,
    pub secure_store: bool,
    /// `None` 表示全选
    pub hosts: Option<Vec<String>>,
    pub asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[(&str, &str)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            secure_store: true,
            hosts: None,
            asked: RefCell::new(Vec::new()),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn env_value(&self, _definition: &str, spec: &EnvVarSpec) -> Result<Option<String>, PromptError> {
        self.asked.borrow_mut().push(spec.name.clone());
        Ok(self.answers.get(&spec.name).cloned())
    }

    fn use_secure_store(&self, _backend: &str) -> Result<bool, PromptError> {
        Ok(self.secure_store)
    }

    fn select_hosts(&self, available: &[String]) -> Result<Vec<String>, PromptError> {
        Ok(self.hosts.clone().unwrap_or_else(|| available.to_vec()))
    }
}
