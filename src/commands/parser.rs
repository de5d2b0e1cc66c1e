//! CLI 命令行参数解析
//!
//! 使用 clap 定义命令行接口

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// 宿主管理动作
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    /// List the MCP hosts available on this machine
    #[command(alias = "ls")]
    List,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "smp",
    about = "Secure MCP manager: build, run and register containerised MCP servers",
    version
)]
pub struct Cli {
    /// Log level or filter directive (e.g. debug, smp=trace); defaults to RUST_LOG
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Also append logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Build an MCP image, collect its configuration and register it with hosts
    Install {
        /// Definition name
        name: String,
        /// Pre-supply a variable value (KEY=VALUE, repeatable)
        #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
        env: Vec<(String, String)>,
        /// Configure only these hosts (repeatable)
        #[arg(long = "host", value_name = "HOST")]
        hosts: Vec<String>,
        /// Do not ask: select every available host and use the secure store
        #[arg(short = 'y', long)]
        yes: bool,
        /// Keep secret values in the state file instead of the secure store
        #[arg(long)]
        no_secure_store: bool,
    },

    /// Remove an MCP image, its host entries, secrets and state
    #[command(alias = "rm")]
    Uninstall {
        /// Definition name
        name: String,
    },

    /// Build the image for an MCP without installing it
    Build {
        /// Definition name
        name: String,
        /// Run the container once after building
        #[arg(long)]
        test_run: bool,
        /// Variable values for the test run (KEY=VALUE, repeatable)
        #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
        env: Vec<(String, String)>,
    },

    /// Run an installed MCP over stdio (used by hosts)
    Run {
        /// Definition name
        name: String,
    },

    /// List known definitions and their installation status
    #[command(alias = "ls")]
    List,

    /// Manage MCP hosts
    #[command(subcommand)]
    Host(HostAction),
}

impl Cli {
    /// 解析命令行参数
    pub fn parse_cli() -> Self {
        Self::parse_cli_from(std::env::args_os())
    }

    /// 尝试解析命令行参数（用于测试或自定义 argv）
    pub fn try_parse_cli_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Cli::try_parse_from(iter)
    }

    /// 解析命令行参数（失败时由 clap 处理错误输出和退出）
    pub fn parse_cli_from<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match Self::try_parse_cli_from(iter) {
            Ok(cli) => cli,
            Err(err) => err.exit(),
        }
    }
}

/// 解析 `KEY=VALUE`；值可以为空，键不能为空
pub fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing variable name in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}
