use thiserror::Error;

/// Failure causes for a single fetch or save operation.
///
/// Messages are stored as strings so results can be cloned and compared;
/// the underlying `reqwest`/`io` errors are rendered at the point of failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("unexpected status code {status} for {url}")]
    NotFound { url: String, status: u16 },

    #[error("no {what} found on page")]
    EmptyResult { what: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("failed to write {path}: {message}")]
    Persist { path: String, message: String },

    #[error("failed after {retries} retries: {last}")]
    RetriesExhausted {
        retries: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    pub fn empty(what: impl Into<String>) -> Self {
        FetchError::EmptyResult { what: what.into() }
    }

    /// The underlying cause, looking through retry exhaustion wrappers.
    pub fn root_cause(&self) -> &FetchError {
        match self {
            FetchError::RetriesExhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), FetchError::Cancelled)
    }
}
