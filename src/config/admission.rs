use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::admission::canonical;

/// Subpaths denied beneath every allowed root, whatever the deny list says.
///
/// Each name is anchored directly under the root: `R/.env` is denied while
/// `R/sub/.env` or `R/vendor/x/.git` is not. Deny nested locations
/// explicitly when they matter.
pub const SENSITIVE_SUBPATHS: &[&str] = &[".git", ".env", ".ssh", ".gnupg", ".aws"];

/// Credential directories denied beneath `$HOME`.
pub const HOME_CREDENTIAL_DIRS: &[&str] = &[".ssh", ".gnupg", ".aws"];

/// Executables that may be launched by bare name.
pub const DEFAULT_COMMANDS: &[&str] = &[
    "ls", "find", "grep", "cat", "echo", "pwd", "cd", "mkdir", "rm", "cp", "mv", "touch", "head",
    "tail", "wc", "sort", "uniq", "cut", "tr", "sed", "awk", "ps", "top", "df", "du", "free",
    "which", "whereis", "whatis", "file", "zip", "unzip", "tar", "gzip", "gunzip",
];

/// A configured filesystem root.
///
/// The root is stored absolute and lexically cleaned. Symlinks are left alone
/// at construction and resolved when a decision is made, so the rule tracks
/// the filesystem as it is at check time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRule {
    root: PathBuf,
}

impl PathRule {
    /// Build a rule, resolving a relative `path` against `base`.
    pub fn new(path: impl AsRef<Path>, base: &Path) -> Self {
        Self {
            root: canonical::clean(path.as_ref(), base),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a canonical path lies at or beneath this root.
    ///
    /// Matches against the root as written and against its current real
    /// location, so a root behind a symlink (`/tmp` on macOS) still covers
    /// the resolved paths beneath it.
    pub fn covers(&self, canonical_path: &Path) -> bool {
        if canonical::is_within(canonical_path, &self.root) {
            return true;
        }
        // Same ancestor fallback as requests, so a root that does not exist
        // yet still follows a symlinked parent.
        match canonical::canonicalize(&self.root, Path::new("/")) {
            Ok(real) if real != self.root => canonical::is_within(canonical_path, &real),
            _ => false,
        }
    }
}

/// Bare command names considered safe to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandWhitelist {
    names: BTreeSet<String>,
}

impl CommandWhitelist {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for CommandWhitelist {
    fn default() -> Self {
        Self::new(DEFAULT_COMMANDS.iter().copied())
    }
}

/// Immutable admission configuration shared by every authorizer.
///
/// Construct it once through [`AdmissionConfig::builder`] and share it behind
/// an `Arc`. There are no mutating methods.
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    allowed: Vec<PathRule>,
    denied: Vec<PathRule>,
    commands: CommandWhitelist,
    working_dir: PathBuf,
}

impl AdmissionConfig {
    pub fn builder(working_dir: impl Into<PathBuf>) -> AdmissionConfigBuilder {
        AdmissionConfigBuilder::new(working_dir)
    }

    pub fn allowed(&self) -> &[PathRule] {
        &self.allowed
    }

    pub fn denied(&self) -> &[PathRule] {
        &self.denied
    }

    pub fn commands(&self) -> &CommandWhitelist {
        &self.commands
    }

    /// Working directory at startup; relative requests resolve against it.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

/// Builder for [`AdmissionConfig`].
pub struct AdmissionConfigBuilder {
    working_dir: PathBuf,
    allowed: Vec<PathBuf>,
    denied: Vec<PathBuf>,
    commands: CommandWhitelist,
    home_dir: Option<PathBuf>,
}

impl AdmissionConfigBuilder {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            allowed: Vec::new(),
            denied: Vec::new(),
            commands: CommandWhitelist::default(),
            home_dir: std::env::var_os("HOME").map(PathBuf::from),
        }
    }

    /// Replace the allowed roots.
    pub fn allowed<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.allowed = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the denied roots. Sensitive subpaths are still appended on build.
    pub fn denied<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.denied = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn commands(mut self, commands: CommandWhitelist) -> Self {
        self.commands = commands;
        self
    }

    /// Home directory whose credential folders are denied. Defaults to `$HOME`.
    pub fn home_dir(mut self, home: Option<PathBuf>) -> Self {
        self.home_dir = home;
        self
    }

    pub fn build(self) -> AdmissionConfig {
        let working_dir = canonical::clean(&self.working_dir, Path::new("/"));

        let mut allowed: Vec<PathRule> = self
            .allowed
            .iter()
            .map(|p| PathRule::new(p, &working_dir))
            .collect();
        if allowed.is_empty() {
            allowed.push(PathRule::new(&working_dir, &working_dir));
        }

        let mut denied: Vec<PathRule> = self
            .denied
            .iter()
            .map(|p| PathRule::new(p, &working_dir))
            .collect();

        for rule in &allowed {
            for name in SENSITIVE_SUBPATHS {
                denied.push(PathRule::new(rule.root().join(name), &working_dir));
            }
        }
        if let Some(home) = &self.home_dir {
            for name in HOME_CREDENTIAL_DIRS {
                denied.push(PathRule::new(home.join(name), &working_dir));
            }
        }

        AdmissionConfig {
            allowed,
            denied,
            commands: self.commands,
            working_dir,
        }
    }
}
