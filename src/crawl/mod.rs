//! Multi-page crawling: worklist, link discovery, and stop conditions.

mod discovery;
mod orchestrator;
mod types;

pub use orchestrator::CrawlOrchestrator;
pub use types::{CrawlResult, PageError, StopReason};
