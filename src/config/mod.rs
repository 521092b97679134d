mod admission;
mod file;
mod sources;

pub use admission::{
    AdmissionConfig, AdmissionConfigBuilder, CommandWhitelist, DEFAULT_COMMANDS,
    HOME_CREDENTIAL_DIRS, PathRule, SENSITIVE_SUBPATHS,
};
pub use file::FileConfig;
pub use sources::{
    ALLOWED_PATHS_ENV, ConfigSources, DENIED_PATHS_ENV, PathOverrides, split_path_list,
};
