//! Claude Desktop：`<app config>/Claude/claude_desktop_config.json`

use super::config_file::{HostServerEntry, McpConfigFile};
use super::{app_config_dir, HostConnector, HostError};
use std::path::{Path, PathBuf};

pub const NAME: &str = "claude_desktop";

const APP_FOLDER: &str = "Claude";
const CONFIG_FILE: &str = "claude_desktop_config.json";

#[derive(Debug, Clone)]
pub struct ClaudeDesktop {
    folder: Option<PathBuf>,
    file: Option<McpConfigFile>,
    home: String,
}

impl ClaudeDesktop {
    pub fn new(home: &Path) -> Self {
        let folder = app_config_dir(home).map(|base| base.join(APP_FOLDER));
        let file = folder
            .as_ref()
            .map(|dir| McpConfigFile::new(NAME, dir.join(CONFIG_FILE)));
        Self {
            folder,
            file,
            home: home.display().to_string(),
        }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.file.as_ref().map(McpConfigFile::path)
    }

    fn file(&self) -> Result<&McpConfigFile, HostError> {
        self.file
            .as_ref()
            .ok_or_else(|| HostError::Unsupported(NAME.to_string()))
    }
}

impl HostConnector for ClaudeDesktop {
    fn name(&self) -> &str {
        NAME
    }

    fn available(&self) -> bool {
        self.folder.as_deref().is_some_and(Path::is_dir)
    }

    fn connect(&self, executable: &Path, server: &str) -> Result<(), HostError> {
        let entry = HostServerEntry::launcher(executable, server, &self.home);
        self.file()?.upsert(server, &entry).map(|_| ())
    }

    fn disconnect(&self, server: &str) -> Result<bool, HostError> {
        self.file()?.remove(server)
    }
}
