//! smp - Secure MCP manager
//!
//! Builds container images for MCP server definitions, keeps per-MCP state,
//! registers the servers with locally installed host applications and resolves
//! secrets from a secure store when a host launches them.

pub mod build;
pub mod commands;
pub mod config;
pub mod definition;
pub mod error;
pub mod host;
pub mod orchestrator;
pub mod secrets;
pub mod state;
pub mod utils;

pub use build::{image_tag, BuildError, ImageBuilder, ImageEngine, SourceFetcher};
pub use definition::{Definition, DefinitionCatalog, EnvKind, EnvVarSpec};
pub use error::{ErrorCategory, SmpError, SmpResult};
pub use host::{HostConnector, HostError, HostRegistry};
pub use orchestrator::{Collaborators, InstallOptions, InstallReport, Orchestrator, Prompter};
pub use secrets::{secret_key, SecretError, SecretStore};
pub use state::{EnvValue, InstalledState, StateStore};
