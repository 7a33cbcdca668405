use thiserror::Error;

/// Error taxonomy for the patrol pipeline.
///
/// Classification failures never surface here; they degrade into error
/// verdicts at the classifier boundary so the pipeline keeps moving. The
/// variants below are for failures the controller must reconcile into a
/// terminal session disposition.
#[derive(Error, Debug)]
pub enum PatrolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Catalog API error (status {status})")]
    CatalogStatus { status: u16 },

    #[error("Rate limited")]
    RateLimited,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Session store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PatrolError>;
