//! Cursor：`~/.cursor/mcp.json`

use super::config_file::{HostServerEntry, McpConfigFile};
use super::{HostConnector, HostError};
use std::path::Path;

pub const NAME: &str = "cursor";

#[derive(Debug, Clone)]
pub struct Cursor {
    file: McpConfigFile,
    home: String,
}

impl Cursor {
    pub fn new(home: &Path) -> Self {
        Self {
            file: McpConfigFile::new(NAME, home.join(".cursor").join("mcp.json")),
            home: home.display().to_string(),
        }
    }

    pub fn config_path(&self) -> &Path {
        self.file.path()
    }
}

impl HostConnector for Cursor {
    fn name(&self) -> &str {
        NAME
    }

    /// 配置文件可以直接创建，始终可用
    fn available(&self) -> bool {
        true
    }

    fn connect(&self, executable: &Path, server: &str) -> Result<(), HostError> {
        let entry = HostServerEntry::launcher(executable, server, &self.home);
        self.file.upsert(server, &entry).map(|_| ())
    }

    fn disconnect(&self, server: &str) -> Result<bool, HostError> {
        self.file.remove(server)
    }
}
