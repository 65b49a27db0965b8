//! The single-page fetcher.
//!
//! Drives one browser tab through the full fetch sequence: navigate under a
//! timeout, classify the document's HTTP status, wait and scroll until
//! client-side rendering settles, extract content and structured signals,
//! and close the tab. Network and content problems are encoded in the
//! returned [`FetchOutcome`]; only browser plumbing failures become errors.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::network::EventResponseReceived;
use chromiumoxide::listeners::EventStream;
use futures::StreamExt;
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::browser::{BrowserSessionManager, prepare_page};
use crate::cache::{ScrapeCache, UrlFetchCache, cache_key};
use crate::config::FetchOptions;
use crate::error::{IngestError, Result};
use crate::util::constants::{READY_WAIT_SECS, RESPONSE_EVENT_DRAIN_MS};

use super::extract;
use super::outcome::{FetchOutcome, OutcomeKind, PageContent, classify_nav_error, classify_status};
use super::result::PageFetchResult;

/// A thing that can fetch one page.
///
/// The crawl orchestrator is generic over this, so crawl logic is tested
/// against scripted fetchers with no browser in the loop.
pub trait PageFetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> impl Future<Output = Result<PageFetchResult>> + Send;
}

/// [`PageFetcher`] backed by the shared Chromium session.
pub struct BrowserPageFetcher {
    session: BrowserSessionManager,
    result_cache: Option<Arc<ScrapeCache<PageFetchResult>>>,
    fingerprints: Option<Arc<UrlFetchCache>>,
}

impl BrowserPageFetcher {
    #[must_use]
    pub fn new(session: BrowserSessionManager) -> Self {
        Self {
            session,
            result_cache: None,
            fingerprints: None,
        }
    }

    /// Serve repeat fetches of the same normalized URL from memory.
    #[must_use]
    pub fn with_result_cache(mut self, cache: Arc<ScrapeCache<PageFetchResult>>) -> Self {
        self.result_cache = Some(cache);
        self
    }

    /// Record content hashes for cross-run change detection.
    #[must_use]
    pub fn with_fingerprints(mut self, fingerprints: Arc<UrlFetchCache>) -> Self {
        self.fingerprints = Some(fingerprints);
        self
    }

    async fn fetch_inner(&self, url: &str, options: &FetchOptions) -> Result<PageFetchResult> {
        let key = cache_key(url)?;

        if let Some(cache) = &self.result_cache {
            if let Some(hit) = cache.get(&key).await {
                debug!(url, "serving fetch from result cache");
                return Ok(hit);
            }
        }

        let page = self.session.new_page("about:blank").await?;

        // Close the tab no matter how the drive went; a tab leaked on an
        // error path would pile up in the shared browser.
        let driven = drive_page(&page, url, options).await;
        if let Err(e) = page.close().await {
            debug!(url, error = %e, "page close failed");
        }
        let (outcome, final_url) = driven.map_err(|e| IngestError::browser(format!("{e:#}")))?;

        let mut result = PageFetchResult::new(url, final_url, outcome);

        if let Some(fingerprints) = &self.fingerprints {
            if let Some(content) = result.outcome.content() {
                match fingerprints
                    .record_fetch(
                        url,
                        &content.content_hash,
                        content.html.len(),
                        content.http_status,
                    )
                    .await
                {
                    Ok(change) => result.change = Some(change),
                    Err(e) => warn!(url, error = %e, "failed to record fetch fingerprint"),
                }
            }
        }

        if result.is_ok() {
            if let Some(cache) = &self.result_cache {
                cache.insert(key, result.clone()).await;
            }
        }

        Ok(result)
    }
}

impl PageFetcher for BrowserPageFetcher {
    fn fetch(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> impl Future<Output = Result<PageFetchResult>> + Send {
        self.fetch_inner(url, options)
    }
}

/// Run the fetch sequence against an open tab.
///
/// Returns the outcome together with the page's final location. Errors from
/// here are browser plumbing only; the caller converts them at the seam.
async fn drive_page(
    page: &Page,
    url: &str,
    options: &FetchOptions,
) -> anyhow::Result<(FetchOutcome, String)> {
    prepare_page(page).await?;

    // The document response races the navigation, so listen before it starts.
    let mut responses = page
        .event_listener::<EventResponseReceived>()
        .await
        .context("response event listener")?;

    let nav = tokio::time::timeout(options.nav_timeout(), async {
        page.goto(url).await?;
        page.wait_for_navigation().await?;
        Ok::<_, chromiumoxide::error::CdpError>(())
    })
    .await;

    let final_url = page
        .url()
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| url.to_string());

    match nav {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            return Ok((nav_failure(&e.to_string()), final_url));
        }
        Err(_) => {
            let detail = format!(
                "navigation did not settle within {}s",
                options.nav_timeout().as_secs()
            );
            return Ok((FetchOutcome::Timeout { detail }, final_url));
        }
    }

    let status = document_status(&mut responses, url, &final_url).await;
    if let Some(code) = status {
        match classify_status(code) {
            Some(OutcomeKind::Blocked) => {
                let detail =
                    format!("site returned HTTP {code}; content may need manual import");
                return Ok((
                    FetchOutcome::Blocked {
                        detail,
                        http_status: Some(code),
                    },
                    final_url,
                ));
            }
            Some(OutcomeKind::NotFound) => {
                return Ok((
                    FetchOutcome::NotFound {
                        detail: format!("page not found (HTTP {code})"),
                        http_status: Some(code),
                    },
                    final_url,
                ));
            }
            Some(OutcomeKind::ServerError) => {
                return Ok((
                    FetchOutcome::ServerError {
                        detail: format!("server responded with HTTP {code}"),
                        http_status: Some(code),
                    },
                    final_url,
                ));
            }
            _ => {}
        }
    }

    extract::wait_for_ready(page, Duration::from_secs(READY_WAIT_SECS)).await;
    if let Some(selector) = options.wait_selector() {
        extract::wait_for_selector(page, selector, Duration::from_secs(READY_WAIT_SECS)).await;
    }
    tokio::time::sleep(Duration::from_millis(options.settle_ms())).await;

    if options.scroll_page() {
        if let Err(e) = extract::scroll_page(page).await {
            debug!(url, error = %e, "auto-scroll failed");
        }
    }

    let html = match page.content().await {
        Ok(html) => html,
        Err(e) => {
            let detail = format!("content extraction failed: {e}");
            return Ok((nav_failure(&detail), final_url));
        }
    };

    if html.len() < options.min_content_len() {
        let detail = format!(
            "rendered HTML is {} bytes, below the {}-byte minimum; possibly a bot interstitial",
            html.len(),
            options.min_content_len()
        );
        return Ok((
            FetchOutcome::NoContent {
                detail,
                http_status: status,
                html_len: html.len(),
            },
            final_url,
        ));
    }

    // Secondary signals degrade one by one instead of failing the fetch.
    let rendered_text = extract::body_text(page).await.unwrap_or_else(|e| {
        debug!(url, error = %e, "body text extraction failed");
        String::new()
    });
    let title = extract::title(page).await.unwrap_or_else(|e| {
        debug!(url, error = %e, "title extraction failed");
        None
    });
    let structured_data = extract::json_ld_blocks(page).await.unwrap_or_else(|e| {
        debug!(url, error = %e, "json-ld extraction failed");
        Vec::new()
    });
    let platform_embedded = extract::platform_embedded(page).await.unwrap_or_else(|e| {
        debug!(url, error = %e, "platform state extraction failed");
        None
    });

    let screenshot = if options.capture_screenshot() {
        match extract::capture_screenshot(page).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(url, error = %e, "screenshot capture failed");
                None
            }
        }
    } else {
        None
    };

    let content_hash = format!("{:016x}", xxh3_64(html.as_bytes()));

    let content = PageContent {
        html,
        rendered_text,
        title,
        structured_data,
        platform_embedded,
        content_hash,
        http_status: status,
        screenshot,
    };
    Ok((FetchOutcome::Ok(content), final_url))
}

/// Map a navigation failure message onto an outcome.
fn nav_failure(detail: &str) -> FetchOutcome {
    match classify_nav_error(detail) {
        OutcomeKind::Timeout => FetchOutcome::Timeout {
            detail: detail.to_string(),
        },
        _ => FetchOutcome::ServerError {
            detail: detail.to_string(),
            http_status: None,
        },
    }
}

/// Pull the document response status out of the buffered network events.
///
/// Responses for subresources and redirect hops share the stream, so keep
/// the last status matching the requested URL and stop once the final URL
/// reports. Trailing slashes are ignored when matching.
async fn document_status(
    events: &mut EventStream<EventResponseReceived>,
    requested_url: &str,
    final_url: &str,
) -> Option<u16> {
    let requested = requested_url.trim_end_matches('/');
    let landed = final_url.trim_end_matches('/');
    let mut status: Option<i64> = None;

    let drain = async {
        while let Some(event) = events.next().await {
            let event_url = event.response.url.trim_end_matches('/');
            if event_url == landed {
                status = Some(event.response.status);
                break;
            }
            if event_url == requested {
                status = Some(event.response.status);
            }
        }
    };
    if tokio::time::timeout(Duration::from_millis(RESPONSE_EVENT_DRAIN_MS), drain)
        .await
        .is_err()
    {
        debug!(url = requested_url, "document response did not surface before the drain budget");
    }

    status.and_then(|s| u16::try_from(s).ok())
}
