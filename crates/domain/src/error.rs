/// Shared error type used across all CrewAgent crates.
///
/// Guard short-circuits and rejected proposals are *not* errors — they are
/// ordinary conversational replies. Only failures the pipeline cannot
/// recover into a reply (upstream outages, parse exhaustion, store faults)
/// travel through this enum.
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

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    /// Model output failed to parse as structured data after the single
    /// permitted retry.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// A CRUD proposal failed field validation; the proposal is frozen in
    /// its rejected state and the details are returned to the caller.
    #[error("validation failed: {0:?}")]
    Validation(Vec<String>),

    #[error("employee not found: {0}")]
    NotFound(String),

    #[error("proposal {0} not found or already consumed")]
    ProposalNotFound(String),

    #[error("turn cancelled")]
    Cancelled,

    #[error("store: {0}")]
    Store(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True when the failure came from an upstream service (model or
    /// retrieval) rather than from this process. Callers render these as a
    /// temporarily-unavailable reply instead of an internal error.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Timeout(_) | Error::Provider { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
