use thiserror::Error;

/// Failure of a single target lookup.
///
/// These never abort a run; the orchestrator logs them and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No version found: {0}")]
    NoVersion(String),

    #[error("Missing option `{0}`")]
    MissingOption(&'static str),

    #[error("Invalid option `{key}`: {reason}")]
    InvalidOption { key: &'static str, reason: String },

    #[error("Command `{command}` failed with status {status}: {stderr}")]
    Command {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Source returned an empty version")]
    EmptyVersion,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
