//! list 命令：目录中的定义及其安装状态

use super::AppContext;
use crate::definition::DefinitionCatalog;
use crate::state::InstalledState;
use anyhow::Result;
use colored::Colorize;
use prettytable::{format, Cell, Row, Table};
use std::collections::BTreeMap;

pub fn execute(ctx: &AppContext) -> Result<()> {
    let available = ctx.catalog.list()?;
    let installed: BTreeMap<String, InstalledState> = ctx
        .store
        .list()?
        .into_iter()
        .map(|state| (state.name.clone(), state))
        .collect();

    let mut names: Vec<&String> = available.iter().chain(installed.keys()).collect();
    names.sort();
    names.dedup();

    if names.is_empty() {
        println!("{}", "No MCP definitions found".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(Row::new(vec![
        Cell::new("NAME").style_spec("b"),
        Cell::new("STATUS").style_spec("b"),
        Cell::new("IMAGE").style_spec("b"),
        Cell::new("HOSTS").style_spec("b"),
    ]));

    for name in names {
        let in_catalog = available.contains(name);
        let state = installed.get(name.as_str());

        let status = match (state, in_catalog) {
            (Some(state), _) if state.is_built() => "installed".green().to_string(),
            (Some(_), true) => "configured".yellow().to_string(),
            (Some(_), false) => "orphaned".red().to_string(),
            (None, _) => "available".normal().to_string(),
        };
        let image = state
            .filter(|state| state.is_built())
            .map(|state| state.local_image_tag.clone())
            .unwrap_or_else(|| "-".to_string());
        let hosts = state
            .filter(|state| !state.configured_hosts.is_empty())
            .map(|state| state.configured_hosts.join(", "))
            .unwrap_or_else(|| "-".to_string());

        table.add_row(Row::new(vec![
            Cell::new(name),
            Cell::new(&status),
            Cell::new(&image),
            Cell::new(&hosts),
        ]));
    }

    table.printstd();
    println!();
    println!(
        "Total: {} definitions ({} installed)",
        available.len().to_string().cyan(),
        installed.values().filter(|s| s.is_built()).count().to_string().green()
    );
    Ok(())
}
