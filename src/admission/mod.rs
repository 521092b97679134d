//! Path and command admission.
//!
//! Every file-touching and process-launching tool calls into this module
//! before doing any I/O. Both predicates are total: every input produces a
//! [`Verdict`], and nothing here panics or returns an error.

pub mod canonical;
mod command;
mod path;
mod verdict;

pub use command::{CommandAdmissionFilter, is_path_qualified};
pub use path::PathAuthorizer;
pub use verdict::{DenyReason, Verdict};
