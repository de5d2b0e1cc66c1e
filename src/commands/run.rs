//! run 命令：宿主使用的启动入口，stdin/stdout 直接交给容器

use super::AppContext;
use anyhow::Result;

pub fn execute(ctx: &AppContext, name: &str) -> Result<()> {
    ctx.orchestrator().run(name)?;
    Ok(())
}
