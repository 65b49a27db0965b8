//! Result types produced by a crawl.

use serde::{Deserialize, Serialize};

use crate::fetch::{OutcomeKind, PageFetchResult};

/// Why the crawl loop stopped pulling from the worklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The page budget was spent.
    MaxPages,
    /// The worklist drained before any usable page was collected.
    NoCandidates,
    /// Too many content-free fetches in a row.
    EmptyPages,
    /// The worklist drained after collecting at least one page.
    Completed,
    /// The caller's wall-clock deadline passed.
    Deadline,
}

impl StopReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::MaxPages => "max_pages",
            StopReason::NoCandidates => "no_candidates",
            StopReason::EmptyPages => "empty_pages",
            StopReason::Completed => "completed",
            StopReason::Deadline => "deadline",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page attempt that produced no usable content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageError {
    pub url: String,
    pub kind: OutcomeKind,
    pub detail: String,
}

/// Everything a single crawl produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    /// Pages that yielded content, in fetch order.
    pub pages: Vec<PageFetchResult>,
    /// Every URL attempted, successful or not, in attempt order.
    pub pages_visited: Vec<String>,
    /// Links accepted into the worklist, in discovery order.
    pub candidates_discovered: Vec<String>,
    /// One entry per attempt that yielded nothing.
    pub errors: Vec<PageError>,
    pub stopped_reason: StopReason,
}
