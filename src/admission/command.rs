use std::path::{Path, PathBuf};

use super::path::PathAuthorizer;
use super::verdict::{DenyReason, Verdict};

/// Decides whether an executable may be launched.
///
/// Bare names are checked against the configured whitelist. Anything that
/// looks like a path is handed to the [`PathAuthorizer`] instead, and the
/// whitelist plays no part. Working directories are not inspected here; the
/// launching tool authorizes them separately.
#[derive(Debug, Clone)]
pub struct CommandAdmissionFilter {
    paths: PathAuthorizer,
}

impl CommandAdmissionFilter {
    pub fn new(paths: PathAuthorizer) -> Self {
        Self { paths }
    }

    /// The path authorizer used for path-qualified executables.
    pub fn paths(&self) -> &PathAuthorizer {
        &self.paths
    }

    pub fn is_command_allowed(&self, token: &str) -> bool {
        self.admit(token).is_allowed()
    }

    pub fn admit(&self, token: &str) -> Verdict {
        self.resolve(token).into()
    }

    /// Admit `token` and return the program to launch: the canonical path for
    /// path-qualified tokens, the bare name otherwise.
    pub fn resolve(&self, token: &str) -> Result<PathBuf, DenyReason> {
        if token.is_empty() {
            return Err(DenyReason::EmptyCommand);
        }

        if is_path_qualified(token) {
            return self.paths.resolve(token);
        }

        if self.paths.config().commands().contains(token) {
            Ok(PathBuf::from(token))
        } else {
            Err(DenyReason::CommandNotWhitelisted(token.to_string()))
        }
    }
}

/// Absolute, or carrying a separator of either flavour.
pub fn is_path_qualified(token: &str) -> bool {
    Path::new(token).is_absolute() || token.contains('/') || token.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdmissionConfig;
    use std::sync::Arc;

    fn filter(allowed: &[&str]) -> CommandAdmissionFilter {
        let config = AdmissionConfig::builder("/")
            .allowed(allowed.iter().copied())
            .home_dir(None)
            .build();
        CommandAdmissionFilter::new(PathAuthorizer::new(Arc::new(config)))
    }

    #[test]
    fn whitelisted_bare_names_pass() {
        let f = filter(&["/nonexistent-ws"]);
        assert!(f.is_command_allowed("ls"));
        assert!(f.is_command_allowed("grep"));
        assert!(f.is_command_allowed("rm"));
    }

    #[test]
    fn unknown_bare_names_fail_closed() {
        let f = filter(&["/nonexistent-ws"]);
        assert!(!f.is_command_allowed("curl"));
        assert_eq!(
            f.admit("curl"),
            Verdict::Denied(DenyReason::CommandNotWhitelisted("curl".into()))
        );
    }

    #[test]
    fn whitelist_is_case_sensitive() {
        let f = filter(&["/nonexistent-ws"]);
        assert!(!f.is_command_allowed("Ls"));
        assert!(!f.is_command_allowed("LS"));
    }

    #[test]
    fn empty_token_is_denied() {
        let f = filter(&["/nonexistent-ws"]);
        assert_eq!(f.admit(""), Verdict::Denied(DenyReason::EmptyCommand));
    }

    #[test]
    fn path_qualified_tokens_use_path_rules() {
        let inside = filter(&["/nonexistent-ws"]);
        assert!(inside.is_command_allowed("/nonexistent-ws/bin/tool"));

        let elsewhere = filter(&["/nonexistent-opt"]);
        assert!(!elsewhere.is_command_allowed("/nonexistent-ws/bin/tool"));
    }

    #[test]
    fn path_qualified_whitelisted_name_still_needs_path_permission() {
        let f = filter(&["/nonexistent-ws"]);
        assert!(!f.is_command_allowed("/bin/ls"));
        assert!(!f.is_command_allowed("./ls"));
    }

    #[test]
    fn resolve_returns_program_to_launch() {
        let f = filter(&["/nonexistent-ws"]);
        assert_eq!(f.resolve("ls").unwrap(), PathBuf::from("ls"));
        assert_eq!(
            f.resolve("/nonexistent-ws/bin/../bin/tool").unwrap(),
            PathBuf::from("/nonexistent-ws/bin/tool")
        );
    }

    #[test]
    fn detects_path_qualified_tokens() {
        assert!(is_path_qualified("/usr/bin/env"));
        assert!(is_path_qualified("bin/tool"));
        assert!(is_path_qualified("..\\tool.exe"));
        assert!(!is_path_qualified("ls"));
    }
}
