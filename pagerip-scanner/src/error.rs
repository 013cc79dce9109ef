use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Malformed URL: base could not be determined for '{0}'")]
    MalformedUrl(String),

    #[error("No root URLs registered, nothing to crawl")]
    NoRoots,

    #[error("HTTP request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP client could not be built: {0}")]
    Client(#[source] reqwest::Error),

    #[error("HTTP {status} returned for {url}")]
    Status { url: String, status: u16 },

    #[error("Could not process reference '{reference}' found on {page}: {reason}")]
    Parse {
        reference: String,
        page: String,
        reason: String,
    },

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

impl ScanError {
    /// True for transport failures (network errors and non-success statuses).
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, ScanError::Http { .. } | ScanError::Status { .. })
    }

    /// The URL the error is about, when there is one.
    pub fn url(&self) -> Option<&str> {
        match self {
            ScanError::MalformedUrl(url) => Some(url),
            ScanError::Http { url, .. } | ScanError::Status { url, .. } => Some(url),
            ScanError::Parse { reference, .. } => Some(reference),
            _ => None,
        }
    }

    /// The page a failing reference was found on.
    pub fn page(&self) -> Option<&str> {
        match self {
            ScanError::Parse { page, .. } => Some(page),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
