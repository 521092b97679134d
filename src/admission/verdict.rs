/// Why a path or command was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DenyReason {
    #[error("path is in a denied location")]
    DeniedLocation,

    #[error("path is not within an allowed location")]
    OutsideAllowed,

    #[error("failed to resolve path: {0}")]
    Unresolvable(String),

    #[error("command '{0}' is not in the whitelist")]
    CommandNotWhitelisted(String),

    #[error("empty command")]
    EmptyCommand,
}

/// Outcome of an admission check. Denial is a value, never a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Denied(DenyReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }

    pub fn reason(&self) -> Option<&DenyReason> {
        match self {
            Verdict::Allowed => None,
            Verdict::Denied(reason) => Some(reason),
        }
    }
}

impl<T> From<Result<T, DenyReason>> for Verdict {
    fn from(result: Result<T, DenyReason>) -> Self {
        match result {
            Ok(_) => Verdict::Allowed,
            Err(reason) => Verdict::Denied(reason),
        }
    }
}
