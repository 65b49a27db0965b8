//! Single-page fetching.
//!
//! One URL in, one [`PageFetchResult`] out. The result's [`FetchOutcome`]
//! is the single source of truth for what happened; callers branch on it
//! rather than on errors. See [`BrowserPageFetcher`] for the real
//! implementation and [`PageFetcher`] for the seam tests mock.

mod extract;
mod fetcher;
mod outcome;
mod result;

pub use fetcher::{BrowserPageFetcher, PageFetcher};
pub use outcome::{FetchOutcome, OutcomeKind, PageContent, classify_nav_error, classify_status};
pub use result::PageFetchResult;
