use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ServerError;

/// On-disk configuration, loaded from the file passed with `--config`.
///
/// ```toml
/// allowed_paths = ["/srv/workspace"]
/// denied_paths = ["/srv/workspace/secrets"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Roots that file and process tools may touch
    #[serde(default)]
    pub allowed_paths: Option<Vec<String>>,

    /// Roots that are always refused
    #[serde(default)]
    pub denied_paths: Option<Vec<String>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&raw)
            .map_err(|e| ServerError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}
