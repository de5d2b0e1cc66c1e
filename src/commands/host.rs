//! host 命令

use super::{AppContext, HostAction};
use anyhow::Result;
use colored::Colorize;

pub fn execute(ctx: &AppContext, action: HostAction) -> Result<()> {
    match action {
        HostAction::List => list(ctx),
    }
}

fn list(ctx: &AppContext) -> Result<()> {
    let hosts = ctx.hosts.list();
    if hosts.is_empty() {
        println!("{}", "No available hosts found".yellow());
        return Ok(());
    }

    println!("Available hosts:");
    for host in hosts {
        println!("  {}", host.cyan());
    }
    Ok(())
}
