//! 交互式输入
//!
//! 编排流程只依赖 [`Prompter`]；终端实现基于 dialoguer。

use crate::definition::EnvVarSpec;
use colored::Colorize;
use dialoguer::{Confirm, Input, MultiSelect, Password};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Interactive input failed: {0}")]
    Terminal(#[from] dialoguer::Error),
}

pub trait Prompter {
    /// 询问变量值；可选变量留空时返回 `None`
    fn env_value(&self, definition: &str, spec: &EnvVarSpec) -> Result<Option<String>, PromptError>;

    /// 是否把 secret 变量写入安全存储
    fn use_secure_store(&self, backend: &str) -> Result<bool, PromptError>;

    /// 从可用宿主中选择要配置的宿主（默认全选）
    fn select_hosts(&self, available: &[String]) -> Result<Vec<String>, PromptError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for DialoguerPrompter {
    fn env_value(&self, definition: &str, spec: &EnvVarSpec) -> Result<Option<String>, PromptError> {
        eprintln!();
        eprintln!(
            "{} {} ({})",
            definition.cyan(),
            spec.name.bold(),
            if spec.required { "required" } else { "optional" }
        );
        if !spec.description.is_empty() {
            eprintln!("  {}", spec.description.dimmed());
        }

        let label = format!("Enter {}", spec.name);
        let value = if spec.is_secret() {
            Password::new()
                .with_prompt(label)
                .allow_empty_password(!spec.required)
                .interact()?
        } else if spec.required {
            Input::<String>::new()
                .with_prompt(label)
                .validate_with(|val: &String| {
                    if val.trim().is_empty() {
                        Err("Value cannot be empty")
                    } else {
                        Ok(())
                    }
                })
                .interact_text()?
        } else {
            Input::<String>::new()
                .with_prompt(format!("{} (optional)", label))
                .allow_empty(true)
                .interact_text()?
        };

        if value.is_empty() {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }

    fn use_secure_store(&self, backend: &str) -> Result<bool, PromptError> {
        let answer = Confirm::new()
            .with_prompt(format!("Store secrets in the {} secure store?", backend))
            .default(true)
            .interact()?;
        Ok(answer)
    }

    fn select_hosts(&self, available: &[String]) -> Result<Vec<String>, PromptError> {
        let defaults = vec![true; available.len()];
        let picked = MultiSelect::new()
            .with_prompt("Select hosts to configure (space to toggle, enter to confirm)")
            .items(available)
            .defaults(&defaults)
            .interact()?;
        Ok(picked
            .into_iter()
            .filter_map(|idx| available.get(idx).cloned())
            .collect())
    }
}
