//! Budgeted breadth-first crawl over one site.
//!
//! The orchestrator owns the worklist and the stop conditions; fetching is
//! behind [`PageFetcher`] so tests can drive the loop without a browser.
//! A page that fails to yield content is recorded and skipped, never fatal:
//! the loop returns `Err` only when the seed itself is unusable or a link
//! pattern does not compile.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::CrawlOptions;
use crate::error::{IngestError, Result};
use crate::fetch::{OutcomeKind, PageFetcher};
use crate::risk::DomainRiskTracker;
use crate::util::urls::{hostname, page_key};

use super::discovery::{compile_patterns, discover_links};
use super::types::{CrawlResult, PageError, StopReason};

/// Breadth-first crawl driver.
///
/// Visits the worklist in FIFO order, pausing between fetches for whichever
/// is longer: the configured rate limit or the risk tracker's recommended
/// delay for the target hostname.
pub struct CrawlOrchestrator<F: PageFetcher> {
    fetcher: F,
    risk: Arc<DomainRiskTracker>,
}

impl<F: PageFetcher> CrawlOrchestrator<F> {
    pub fn new(fetcher: F, risk: Arc<DomainRiskTracker>) -> Self {
        Self { fetcher, risk }
    }

    /// Crawl from `seed_url` within the configured budget.
    ///
    /// With explicit candidate URLs configured, the worklist is exactly those
    /// candidates and link discovery is skipped; the seed is only validated.
    /// Otherwise the crawl starts at the seed and each content-bearing page
    /// contributes up to `max_links_per_page` same-site links matching the
    /// configured path patterns.
    pub async fn crawl(&self, seed_url: &str, options: &CrawlOptions) -> Result<CrawlResult> {
        let started = Instant::now();

        let seed = Url::parse(seed_url).map_err(|e| IngestError::invalid_url(seed_url, e))?;
        if !matches!(seed.scheme(), "http" | "https") {
            return Err(IngestError::invalid_url(seed_url, "expected an http(s) URL"));
        }
        let patterns = compile_patterns(options.link_patterns())?;

        let explicit_candidates = options.candidate_urls().is_some();
        // Every key in `seen` is either visited already or queued exactly
        // once, so the worklist never holds the same page twice.
        let mut seen: HashSet<String> = HashSet::new();
        let mut worklist: VecDeque<String> = VecDeque::new();
        if let Some(candidates) = options.candidate_urls() {
            for candidate in candidates {
                match page_key(candidate) {
                    Ok(key) => {
                        if seen.insert(key) {
                            worklist.push_back(candidate.clone());
                        }
                    }
                    Err(e) => warn!(url = %candidate, error = %e, "skipping bad candidate URL"),
                }
            }
        } else {
            seen.insert(page_key(seed_url)?);
            worklist.push_back(seed_url.to_string());
        }

        let mut result = CrawlResult {
            pages: Vec::new(),
            pages_visited: Vec::new(),
            candidates_discovered: Vec::new(),
            errors: Vec::new(),
            stopped_reason: StopReason::Completed,
        };
        let mut consecutive_empty: u32 = 0;
        let deadline_at = options.deadline().map(|d| started + d);

        result.stopped_reason = loop {
            if result.pages.len() >= options.max_pages() {
                break StopReason::MaxPages;
            }
            if let Some(at) = deadline_at {
                if Instant::now() >= at {
                    break StopReason::Deadline;
                }
            }
            let Some(next_url) = worklist.pop_front() else {
                break if result.pages.is_empty() {
                    StopReason::NoCandidates
                } else {
                    StopReason::Completed
                };
            };

            let host = hostname(&next_url).unwrap_or_default();

            // Pause between fetches, never before the first one.
            if !result.pages_visited.is_empty() {
                let pause = self
                    .risk
                    .get_delay(&host)
                    .await
                    .max(Duration::from_millis(options.rate_limit_ms()));
                tokio::time::sleep(pause).await;
            }

            debug!(url = %next_url, queued = worklist.len(), "fetching page");
            result.pages_visited.push(next_url.clone());

            match self.fetcher.fetch(&next_url, options.fetch()).await {
                Ok(fetched) => {
                    let kind = fetched.kind();
                    self.risk
                        .record_outcome(&host, kind, fetched.outcome.http_status())
                        .await;

                    if let Some(content) = fetched.content() {
                        consecutive_empty = 0;
                        if !explicit_candidates {
                            let base = Url::parse(&fetched.final_url)
                                .or_else(|_| Url::parse(&next_url))
                                .unwrap_or_else(|_| seed.clone());
                            let links = discover_links(
                                &content.html,
                                &base,
                                &patterns,
                                options.same_domain_only(),
                                options.max_links_per_page(),
                            );
                            for link in links {
                                let Ok(key) = page_key(&link) else { continue };
                                if seen.insert(key) {
                                    result.candidates_discovered.push(link.clone());
                                    worklist.push_back(link);
                                }
                            }
                        }
                        result.pages.push(fetched);
                    } else {
                        consecutive_empty += 1;
                        result.errors.push(PageError {
                            url: next_url,
                            kind,
                            detail: fetched
                                .outcome
                                .error_detail()
                                .unwrap_or("fetch yielded no content")
                                .to_string(),
                        });
                        if consecutive_empty >= options.max_consecutive_empty() {
                            break StopReason::EmptyPages;
                        }
                    }
                }
                // Infrastructure faults count against the empty-page run but
                // are not attributed to the site's risk record.
                Err(e) => {
                    warn!(url = %next_url, error = %e, "page fetch failed");
                    consecutive_empty += 1;
                    result.errors.push(PageError {
                        url: next_url,
                        kind: OutcomeKind::ServerError,
                        detail: e.to_string(),
                    });
                    if consecutive_empty >= options.max_consecutive_empty() {
                        break StopReason::EmptyPages;
                    }
                }
            }
        };

        info!(
            seed = seed_url,
            pages = result.pages.len(),
            attempted = result.pages_visited.len(),
            discovered = result.candidates_discovered.len(),
            errors = result.errors.len(),
            reason = %result.stopped_reason,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "crawl finished"
        );
        Ok(result)
    }
}
