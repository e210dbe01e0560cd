use thiserror::Error;

/// Result type alias for uvm operations
pub type Result<T> = anyhow::Result<T>;

#[derive(Error, Debug)]
pub enum UvmError {
    #[error("Invalid profile name {0:?}: use letters, digits, '.', '_' or '-'")]
    InvalidProfileName(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("No package registry available")]
    MissingRegistry,

    #[error("Command failed: {program} (exit={code:?}): {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command timed out: {program} after {timeout_secs}s")]
    CommandTimeout { program: String, timeout_secs: u64 },

    #[error("GitHub user not found: {0}")]
    GithubUserNotFound(String),

    #[error("GitHub API returned status {status}")]
    GithubStatus { status: u16 },

    #[error(
        "No TTY detected. The wizard requires an interactive terminal.\n\
         Use `uvm generate --profile NAME` for scripted runs."
    )]
    NoTty,
}
