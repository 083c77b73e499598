use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForkyardError {
    #[error("git error at {path}: {source}")]
    Git {
        path: PathBuf,
        source: git2::Error,
    },

    #[error("unconfigured repository: {0}")]
    UnconfiguredRepo(String),

    #[error("repository doesn't exist: {0}")]
    RepoNotFound(String),

    #[error("repository already cloned: {0}")]
    AlreadyCloned(String),

    #[error("fork not found for repository: {0}")]
    ForkNotFound(String),

    #[error("missing github credentials: cannot clone {0}")]
    MissingGithubCredentials(String),

    #[error("authentication required for {url}")]
    AuthenticationRequired { url: String },

    #[error("cannot clone repository {name}: {source}")]
    CannotClone {
        name: String,
        source: Box<ForkyardError>,
    },

    #[error("repository {name} was cloned but could not be registered: {source}")]
    IncompleteClone {
        name: String,
        source: Box<ForkyardError>,
    },

    #[error("malformed filter expression: {0:?}")]
    MalformedFilter(String),

    #[error("unknown filter key: {0}")]
    UnknownFilterKey(String),

    #[error("unsupported repository type: {0:?} (expected core, tooling or controller)")]
    UnknownRepoType(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("github api error: {status} on {url}: {message}")]
    GithubApi {
        status: u16,
        url: String,
        message: String,
    },

    #[error("github rate limit exceeded (resets at unix time {reset})")]
    RateLimited { reset: u64 },

    #[error("ssh identity error at {path}: {reason}")]
    Identity { path: PathBuf, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("run deadline exceeded")]
    DeadlineExceeded,

    #[error("{} of {} repositories failed to reconcile", .failed, .total)]
    EnsureFailed { failed: usize, total: usize },
}

pub type Result<T> = std::result::Result<T, ForkyardError>;
