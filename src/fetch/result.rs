//! Final shape of a single page fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::ChangeStatus;

use super::outcome::{FetchOutcome, OutcomeKind, PageContent};

/// One fetched page: where it was asked to go, where it landed, when, and
/// how it ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFetchResult {
    pub requested_url: String,

    /// Post-redirect location read from the page itself; falls back to the
    /// requested URL when the page reports none.
    pub final_url: String,

    pub fetched_at: DateTime<Utc>,

    pub outcome: FetchOutcome,

    /// Relation to the previous fingerprint of this URL, when change
    /// detection ran for this fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<ChangeStatus>,
}

impl PageFetchResult {
    #[must_use]
    pub fn new(
        requested_url: impl Into<String>,
        final_url: impl Into<String>,
        outcome: FetchOutcome,
    ) -> Self {
        Self {
            requested_url: requested_url.into(),
            final_url: final_url.into(),
            fetched_at: Utc::now(),
            outcome,
            change: None,
        }
    }

    /// Discriminant of the outcome.
    #[must_use]
    pub fn kind(&self) -> OutcomeKind {
        self.outcome.kind()
    }

    /// Whether the fetch produced usable content.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.kind() == OutcomeKind::Ok
    }

    /// Extracted content, for ok results.
    #[must_use]
    pub fn content(&self) -> Option<&PageContent> {
        self.outcome.content()
    }
}
