// Base directory under $HOME, overridable with SMP_HOME_ENV
pub const BASE_DIRECTORY: &str = ".smp";
pub const SMP_HOME_ENV: &str = "SMP_HOME";
pub const STATE_DIRECTORY: &str = "state";
pub const DEFINITIONS_DIRECTORY: &str = "definitions";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const SECRETS_FILE_NAME: &str = "secrets.json";

// Image tags are `mcp-<name>:latest`, never content addressed
pub const TAG_PREFIX: &str = "mcp-";
pub const TAG_SUFFIX: &str = "latest";

pub const DEFAULT_DOCKER_BIN: &str = "docker";
pub const DOCKERFILE_NAME: &str = "Dockerfile";

// Secure store service label (macOS keychain item "Where")
pub const KEYCHAIN_SERVICE: &str = "Secure MCP";

// Host entries always launch `<smp> run <name>`
pub const RUN_SUBCOMMAND: &str = "run";
pub const HOME_ENV: &str = "HOME";
