//! install 命令：构建镜像、收集配置并注册到宿主

use super::AppContext;
use crate::orchestrator::InstallOptions;
use anyhow::Result;
use colored::Colorize;

pub fn execute(
    ctx: &AppContext,
    name: &str,
    env: Vec<(String, String)>,
    hosts: Vec<String>,
    yes: bool,
    no_secure_store: bool,
) -> Result<()> {
    let options = InstallOptions {
        env: env.into_iter().collect(),
        hosts: if hosts.is_empty() { None } else { Some(hosts) },
        assume_yes: yes,
        secure_store: !no_secure_store,
    };

    println!("Installing MCP '{}'...", name.cyan());
    let report = ctx.orchestrator().install(name, &options)?;

    println!("  Image: {}", report.tag.green());
    if report.connected.is_empty() && report.failed.is_empty() {
        println!("  {}", "No hosts selected for configuration".yellow());
    }
    for host in &report.connected {
        println!("  {} Configured in {}", "✓".green(), host.cyan());
    }
    for (host, err) in &report.failed {
        println!("  {} Configuring {} failed: {}", "✗".red(), host.cyan(), err);
    }

    println!();
    println!("MCP '{}' installed successfully", name.green());
    Ok(())
}
