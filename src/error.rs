//! Error types for the ingest engine.
//!
//! Page-level failures (blocked, missing, upstream 5xx, navigation timeouts)
//! are not errors here. They are outcomes, carried in
//! [`FetchOutcome`](crate::fetch::FetchOutcome) so callers can score and
//! report them. This enum covers infrastructure faults only: the browser
//! died, the store is unreachable, a seed URL does not parse.

use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors that abort an ingest operation.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Browser could not be launched, crashed, or refused a CDP command.
    #[error("browser error: {0}")]
    Browser(String),

    /// A seed or configured URL failed to parse.
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Persistent store failure.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Serialization failure for a persisted payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure (profile dir, store path).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for wrapped errors from helper layers.
    #[error("{0}")]
    Other(String),
}

impl IngestError {
    /// Check if the error is transient and the operation can be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IngestError::Browser(_) | IngestError::Store(_) | IngestError::Io(_)
        )
    }

    /// Wrap any displayable browser-layer failure.
    pub(crate) fn browser(err: impl std::fmt::Display) -> Self {
        IngestError::Browser(err.to_string())
    }

    /// Build an [`IngestError::InvalidUrl`] from a URL and a parse failure.
    pub(crate) fn invalid_url(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        IngestError::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<anyhow::Error> for IngestError {
    fn from(err: anyhow::Error) -> Self {
        IngestError::Other(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(IngestError::Browser("gone".into()).is_transient());
        assert!(IngestError::Io(std::io::Error::other("disk")).is_transient());
        assert!(!IngestError::invalid_url("nope", "relative URL without a base").is_transient());
        assert!(!IngestError::Other("misc".into()).is_transient());
    }

    #[test]
    fn anyhow_chain_is_flattened() {
        let inner = anyhow::anyhow!("root cause");
        let wrapped = inner.context("outer layer");
        let err: IngestError = wrapped.into();
        let msg = err.to_string();
        assert!(msg.contains("outer layer"));
        assert!(msg.contains("root cause"));
    }
}
