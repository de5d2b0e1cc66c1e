//! build 命令
//!
//! 输出写到 stderr：`--test-run` 时 stdout 属于容器。

use super::AppContext;
use crate::orchestrator::InstallOptions;
use anyhow::Result;
use colored::Colorize;

pub fn execute(
    ctx: &AppContext,
    name: &str,
    test_run: bool,
    env: Vec<(String, String)>,
) -> Result<()> {
    let orchestrator = ctx.orchestrator();

    if !test_run {
        let tag = orchestrator.build(name)?;
        eprintln!("Built {}", tag.green());
        return Ok(());
    }

    let options = InstallOptions {
        env: env.into_iter().collect(),
        ..InstallOptions::default()
    };
    let tag = orchestrator.build_and_test_run(name, &options)?;
    eprintln!("Test run of {} finished", tag.green());
    Ok(())
}
