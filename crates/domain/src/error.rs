/// Shared error type used across all threadline crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("auth: {0}")]
    Auth(String),

    #[error("config: {0}")]
    Config(String),

    #[error("store: {0}")]
    Store(String),

    /// A document with this unique key already exists.
    #[error("document already exists: {key}")]
    AlreadyExists { key: String },

    /// Optimistic concurrency check failed on save.
    #[error("stale revision for {key}: expected {expected}, stored {found}")]
    StaleRevision {
        key: String,
        expected: u64,
        found: u64,
    },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
