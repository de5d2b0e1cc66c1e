//! Container engine invocation (`docker build` / `run` / `rmi`).

use secrecy::{ExposeSecret, SecretString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("'{0}' not found on PATH; is Docker installed?")]
    NotFound(String),

    #[error("Failed to start '{bin}': {source}")]
    Spawn {
        bin: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' exited with {status}")]
    Failed { command: String, status: ExitStatus },
}

/// 镜像构建、运行与删除
pub trait ImageEngine {
    fn build(&self, tag: &str, context: &Path) -> Result<(), EngineError>;

    /// 以 stdio 透传方式运行镜像，直到容器退出
    fn run(&self, tag: &str, env: &[(String, SecretString)]) -> Result<(), EngineError>;

    fn remove(&self, tag: &str) -> Result<(), EngineError>;
}

#[derive(Debug, Clone)]
pub struct DockerCli {
    bin: PathBuf,
}

impl DockerCli {
    /// Resolves `bin` through PATH when possible, keeping the raw name otherwise.
    pub fn new(bin: impl AsRef<Path>) -> Self {
        let bin = bin.as_ref();
        let resolved = which::which(bin).unwrap_or_else(|_| bin.to_path_buf());
        Self { bin: resolved }
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    fn bin_name(&self) -> String {
        self.bin.display().to_string()
    }

    fn exec(&self, mut cmd: Command, label: &str) -> Result<(), EngineError> {
        debug!(command = label, "Executing container engine");
        let status = cmd.status().map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                EngineError::NotFound(self.bin_name())
            } else {
                EngineError::Spawn {
                    bin: self.bin_name(),
                    source,
                }
            }
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(EngineError::Failed {
                command: label.to_string(),
                status,
            })
        }
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_DOCKER_BIN)
    }
}

impl ImageEngine for DockerCli {
    fn build(&self, tag: &str, context: &Path) -> Result<(), EngineError> {
        info!(tag, context = %context.display(), "Building image");
        let mut cmd = Command::new(&self.bin);
        cmd.arg("build").arg("-t").arg(tag).arg(context);
        // 构建输出写到 stderr，stdout 保持干净
        cmd.stdin(Stdio::null()).stdout(io::stderr()).stderr(Stdio::inherit());
        self.exec(cmd, "docker build")
    }

    fn run(&self, tag: &str, env: &[(String, SecretString)]) -> Result<(), EngineError> {
        info!(tag, vars = env.len(), "Running image");
        let mut cmd = Command::new(&self.bin);
        cmd.args(["run", "--rm", "-i"]);
        // `-e NAME` 让 docker 从自身环境读取值，密钥不出现在参数列表中
        for (name, value) in env {
            cmd.arg("-e").arg(name);
            cmd.env(name, value.expose_secret());
        }
        cmd.arg(tag);
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        self.exec(cmd, "docker run")
    }

    fn remove(&self, tag: &str) -> Result<(), EngineError> {
        info!(tag, "Removing image");
        let mut cmd = Command::new(&self.bin);
        // --force: 镜像不存在时不报错
        cmd.args(["rmi", "--force", tag]);
        cmd.stdin(Stdio::null()).stdout(io::stderr()).stderr(Stdio::inherit());
        self.exec(cmd, "docker rmi")
    }
}
