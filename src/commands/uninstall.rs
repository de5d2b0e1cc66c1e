//! uninstall 命令

use super::AppContext;
use anyhow::Result;
use colored::Colorize;

pub fn execute(ctx: &AppContext, name: &str) -> Result<()> {
    let report = ctx.orchestrator().uninstall(name)?;

    if let Some(tag) = &report.removed_image {
        println!("  Removed image {}", tag.cyan());
    }
    for (host, was_present) in &report.disconnected {
        if *was_present {
            println!("  {} Disconnected from {}", "✓".green(), host.cyan());
        } else {
            println!(
                "  {} Server '{}' was not configured in host '{}'",
                "Warning:".yellow(),
                name,
                host
            );
        }
    }
    if report.removed_secrets > 0 {
        println!("  Removed {} stored secret(s)", report.removed_secrets);
    }

    println!("MCP '{}' uninstalled successfully", name.green());
    Ok(())
}
