use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::canonical;
use super::verdict::{DenyReason, Verdict};
use crate::config::AdmissionConfig;

/// Decides whether a filesystem path may be touched.
///
/// The decision is made on the canonical form of the request: absolute,
/// `.`/`..` collapsed and symlinks resolved. Denied roots are checked before
/// allowed roots, so a deny match can never be overridden.
///
/// A positive verdict describes the filesystem at the moment of the check.
/// A symlink swapped in afterwards can still redirect the I/O that follows;
/// callers should use the path returned by [`PathAuthorizer::resolve`] and
/// refuse symlinks when they open it.
#[derive(Debug, Clone)]
pub struct PathAuthorizer {
    config: Arc<AdmissionConfig>,
}

impl PathAuthorizer {
    pub fn new(config: Arc<AdmissionConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Check a path without keeping its resolved form.
    pub fn is_allowed(&self, requested: impl AsRef<Path>) -> Verdict {
        self.resolve(requested).into()
    }

    /// Canonicalize `requested` and authorize it, returning the canonical path
    /// the caller should operate on.
    pub fn resolve(&self, requested: impl AsRef<Path>) -> Result<PathBuf, DenyReason> {
        let requested = requested.as_ref();
        let canonical = canonical::canonicalize(requested, self.config.working_dir())
            .map_err(|e| DenyReason::Unresolvable(e.to_string()))?;

        if self.config.denied().iter().any(|rule| rule.covers(&canonical)) {
            debug!(path = %canonical.display(), "path matched a denied root");
            return Err(DenyReason::DeniedLocation);
        }

        if self.config.allowed().iter().any(|rule| rule.covers(&canonical)) {
            Ok(canonical)
        } else {
            debug!(path = %canonical.display(), "path outside every allowed root");
            Err(DenyReason::OutsideAllowed)
        }
    }
}
