//! 日志系统
//!
//! 日志只写 stderr（和可选的日志文件）：`smp run` 的 stdout/stdin 属于 MCP 的 stdio 流。

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 未指定级别且没有 RUST_LOG 时使用
pub const DEFAULT_FILTER: &str = "warn,smp=info";

/// 构建过滤器：参数优先，其次 RUST_LOG，最后 [`DEFAULT_FILTER`]
pub fn build_filter(log_level: Option<&str>) -> Result<EnvFilter> {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };
    Ok(filter)
}

/// 初始化日志系统
///
/// # Arguments
/// * `log_level` - 日志级别或过滤表达式 (trace, debug, `smp=debug` ...)
/// * `log_file` - 额外写入的日志文件，不带 ANSI 颜色
///
/// # Examples
/// ```no_run
/// use smp::utils::logger::init_logger;
///
/// init_logger(None, None).unwrap();
/// init_logger(Some("debug"), Some(std::path::PathBuf::from("smp.log"))).unwrap();
/// ```
pub fn init_logger(log_level: Option<&str>, log_file: Option<PathBuf>) -> Result<()> {
    let env_filter = build_filter(log_level)?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer);

    if let Some(log_path) = log_file {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(std::sync::Arc::new(file))
            .with_target(true)
            .with_ansi(false)
            .with_level(true);

        registry.with(file_layer).try_init()?;
    } else {
        registry.try_init()?;
    }

    tracing::debug!("Logger initialized");
    Ok(())
}
