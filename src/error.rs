use std::path::PathBuf;

/// Failure to retrieve a document. Never fatal for a run.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("response from {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },

    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

impl FetchError {
    /// Whether retrying the same URL is pointless.
    pub fn is_permanent(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => {
                (400..500).contains(status) && *status != 408 && *status != 429
            }
            FetchError::TooLarge { .. } | FetchError::InvalidUrl { .. } => true,
            FetchError::Timeout { .. } | FetchError::Transport { .. } => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read content store {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("content store {path:?} is not valid JSON")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to persist content store {path:?}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize content store")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("content store holds no items")]
    NoContent,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("another run holds {path:?}; remove it if no enrich process is running")]
    Held { path: PathBuf },

    #[error("failed to create lock file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
