//! Unified error handling for smp
//!
//! Component errors (`CatalogError`, `BuildError`, `HostError`, ...) are
//! folded into [`SmpError`], whose variants are the kinds a user can act on.

use crate::build::{BuildError, EngineError};
use crate::definition::CatalogError;
use crate::host::HostError;
use crate::orchestrator::PromptError;
use crate::secrets::SecretError;
use crate::state::StateError;
use std::fmt;
use thiserror::Error;

/// Main error type for the lifecycle flows
#[derive(Error, Debug)]
pub enum SmpError {
    /// Unknown or unreadable definition
    #[error(transparent)]
    Resolution(#[from] CatalogError),

    #[error(transparent)]
    Build(#[from] BuildError),

    /// Host already has a differently sourced entry
    #[error(transparent)]
    Conflict(HostError),

    #[error(transparent)]
    UnknownHost(HostError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    /// State record or host config I/O
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Image run/delete failure
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("MCP '{0}' has no built image; run `smp install {0}` first")]
    NotInstalled(String),

    #[error("A value for required variable '{0}' is missing")]
    MissingValue(String),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Host(HostError),
}

impl From<StateError> for SmpError {
    fn from(err: StateError) -> Self {
        SmpError::Persistence(PersistenceError::State(err))
    }
}

impl From<HostError> for SmpError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Conflict { .. } => SmpError::Conflict(err),
            HostError::UnknownHost(_) | HostError::Unavailable(_) => SmpError::UnknownHost(err),
            other => SmpError::Persistence(PersistenceError::Host(other)),
        }
    }
}

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Resolution,
    Build,
    Conflict,
    UnknownHost,
    Secret,
    Persistence,
    Engine,
    Usage,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Resolution => "resolution",
            ErrorCategory::Build => "build",
            ErrorCategory::Conflict => "conflict",
            ErrorCategory::UnknownHost => "unknown_host",
            ErrorCategory::Secret => "secret",
            ErrorCategory::Persistence => "persistence",
            ErrorCategory::Engine => "engine",
            ErrorCategory::Usage => "usage",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SmpError {
    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            SmpError::Resolution(_) => ErrorCategory::Resolution,
            SmpError::Build(BuildError::State(_)) => ErrorCategory::Persistence,
            SmpError::Build(_) => ErrorCategory::Build,
            SmpError::Conflict(_) => ErrorCategory::Conflict,
            SmpError::UnknownHost(_) => ErrorCategory::UnknownHost,
            SmpError::Secret(_) => ErrorCategory::Secret,
            SmpError::Persistence(_) => ErrorCategory::Persistence,
            SmpError::Engine(_) => ErrorCategory::Engine,
            SmpError::NotInstalled(_) | SmpError::MissingValue(_) | SmpError::Prompt(_) => {
                ErrorCategory::Usage
            }
        }
    }

    /// Short remediation hint shown under the error message
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SmpError::Resolution(CatalogError::NotFound(_)) => {
                Some("Run `smp list` to see the available definitions.")
            }
            SmpError::Build(BuildError::SourceFetch { .. }) => {
                Some("Check the repository URL, branch and your network connection.")
            }
            SmpError::Build(BuildError::Build { .. }) | SmpError::Engine(_) => {
                Some("Make sure Docker is installed and the daemon is running.")
            }
            SmpError::Conflict(_) => Some(
                "Another server with this name is configured in the host; remove it from the host config first.",
            ),
            SmpError::UnknownHost(_) => Some("Run `smp host list` to see the available hosts."),
            SmpError::Secret(SecretError::NotFound(_)) => {
                Some("Re-run `smp install` to store the missing secret again.")
            }
            SmpError::NotInstalled(_) => Some("Install the MCP before running it."),
            _ => None,
        }
    }
}

pub type SmpResult<T> = std::result::Result<T, SmpError>;
