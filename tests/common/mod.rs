#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use mcp_server::{AdmissionConfig, PathAuthorizer, ToolRegistry};

/// A throwaway directory tree with its canonical root.
///
/// The root is canonicalized up front so assertions compare against the same
/// form the authorizer produces (macOS tempdirs live behind `/var` symlinks).
pub struct Workspace {
    _dir: TempDir,
    pub root: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        Self { _dir: dir, root }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Create `rel` (and its parents) with `content`.
    pub fn file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn dir(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(&path).unwrap();
        path
    }

    pub fn config(&self, allowed: &[&Path], denied: &[&Path]) -> AdmissionConfig {
        AdmissionConfig::builder(&self.root)
            .allowed(allowed.iter().map(|p| p.to_path_buf()))
            .denied(denied.iter().map(|p| p.to_path_buf()))
            .home_dir(None)
            .build()
    }

    pub fn authorizer(&self, allowed: &[&Path], denied: &[&Path]) -> PathAuthorizer {
        PathAuthorizer::new(Arc::new(self.config(allowed, denied)))
    }

    pub fn registry(&self, allowed: &[&Path], denied: &[&Path]) -> ToolRegistry {
        ToolRegistry::with_default_tools(self.authorizer(allowed, denied))
    }
}
