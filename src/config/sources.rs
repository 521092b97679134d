use std::path::PathBuf;

use tracing::debug;

use super::{AdmissionConfig, FileConfig};

pub const ALLOWED_PATHS_ENV: &str = "MCP_ALLOWED_PATHS";
pub const DENIED_PATHS_ENV: &str = "MCP_DENIED_PATHS";

/// Split a colon-separated path list, dropping empty entries.
pub fn split_path_list(raw: &str) -> Vec<PathBuf> {
    raw.split(':')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// One configuration layer. `None` leaves the previous layer's value in place;
/// `Some` replaces it outright.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathOverrides {
    pub allowed: Option<Vec<PathBuf>>,
    pub denied: Option<Vec<PathBuf>>,
}

impl PathOverrides {
    /// Parse colon-separated lists; empty strings count as unset.
    pub fn from_lists(allowed: Option<&str>, denied: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| {
            raw.map(split_path_list).filter(|paths| !paths.is_empty())
        };
        Self {
            allowed: parse(allowed),
            denied: parse(denied),
        }
    }

    /// Read `MCP_ALLOWED_PATHS` / `MCP_DENIED_PATHS` from the process environment.
    pub fn from_env() -> Self {
        let allowed = std::env::var(ALLOWED_PATHS_ENV).ok();
        let denied = std::env::var(DENIED_PATHS_ENV).ok();
        Self::from_lists(allowed.as_deref(), denied.as_deref())
    }

    pub fn from_file(file: &FileConfig) -> Self {
        let convert = |paths: &Option<Vec<String>>| {
            paths
                .as_ref()
                .map(|list| list.iter().map(PathBuf::from).collect::<Vec<_>>())
        };
        Self {
            allowed: convert(&file.allowed_paths),
            denied: convert(&file.denied_paths),
        }
    }
}

/// Layered inputs for building an [`AdmissionConfig`].
///
/// Precedence, lowest first: built-in defaults, config file, environment,
/// command line. Each layer replaces the lists it sets.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    layers: Vec<(&'static str, PathOverrides)>,
}

impl ConfigSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a layer that overrides everything pushed before it.
    pub fn layer(mut self, name: &'static str, overrides: PathOverrides) -> Self {
        self.layers.push((name, overrides));
        self
    }

    pub fn resolve(&self) -> PathOverrides {
        let mut merged = PathOverrides::default();
        for (name, layer) in &self.layers {
            if let Some(allowed) = &layer.allowed {
                debug!(layer = *name, ?allowed, "allowed paths overridden");
                merged.allowed = Some(allowed.clone());
            }
            if let Some(denied) = &layer.denied {
                debug!(layer = *name, ?denied, "denied paths overridden");
                merged.denied = Some(denied.clone());
            }
        }
        merged
    }

    /// Resolve the layers and build the final, immutable snapshot.
    pub fn build(&self, working_dir: impl Into<PathBuf>) -> AdmissionConfig {
        let merged = self.resolve();
        AdmissionConfig::builder(working_dir)
            .allowed(merged.allowed.unwrap_or_default())
            .denied(merged.denied.unwrap_or_default())
            .build()
    }
}
