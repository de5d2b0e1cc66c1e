//! Cline（VS Code 扩展 saoudrizwan.claude-dev）

use super::config_file::{HostServerEntry, McpConfigFile};
use super::{app_config_dir, HostConnector, HostError};
use std::path::{Path, PathBuf};

pub const NAME: &str = "cline";

const EXTENSION_SETTINGS: [&str; 5] = [
    "Code",
    "User",
    "globalStorage",
    "saoudrizwan.claude-dev",
    "settings",
];
const SETTINGS_FILE: &str = "cline_mcp_settings.json";

#[derive(Debug, Clone)]
pub struct Cline {
    folder: Option<PathBuf>,
    file: Option<McpConfigFile>,
    home: String,
}

impl Cline {
    pub fn new(home: &Path) -> Self {
        let folder = app_config_dir(home)
            .map(|base| EXTENSION_SETTINGS.iter().fold(base, |dir, part| dir.join(part)));
        let file = folder
            .as_ref()
            .map(|dir| McpConfigFile::new(NAME, dir.join(SETTINGS_FILE)));
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

impl HostConnector for Cline {
    fn name(&self) -> &str {
        NAME
    }

    /// 扩展的设置目录存在才算已安装
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    #[test]
    fn available_only_when_extension_folder_exists() {
        let temp = TempDir::new().unwrap();
        let host = Cline::new(temp.path());
        assert!(!host.available());

        let path = host.config_path().unwrap().to_path_buf();
        assert!(path.starts_with(temp.path()));
        assert!(path.ends_with("saoudrizwan.claude-dev/settings/cline_mcp_settings.json"));

        fs::create_dir_all(path.parent().unwrap()).unwrap();
        assert!(host.available());
    }
}
