//! In-page extraction helpers.
//!
//! JavaScript probes evaluated against a rendered page, plus the scroll and
//! readiness waits that run before them. Everything here is best-effort at
//! the call site: a probe that fails degrades one field, it never fails the
//! fetch.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use tracing::{debug, warn};

use crate::util::constants::{
    SCREENSHOT_QUALITY, SCROLL_MAX_STEPS, SCROLL_PAUSE_MS, SCROLL_STEP_PX,
};

/// Readiness probe for the post-navigation wait.
const READY_STATE_SCRIPT: &str = r"
    (() => ({
        readyState: document.readyState,
        bodyExists: document.body !== null
    }))()
";

/// Rendered text of the page body.
const BODY_TEXT_SCRIPT: &str = r"
    (() => document.body ? document.body.innerText : '')()
";

/// Raw JSON-LD block contents, parsed (and filtered) on the Rust side.
const JSON_LD_SCRIPT: &str = r#"
    (() => Array.from(
        document.querySelectorAll('script[type="application/ld+json"]')
    ).map(node => node.textContent || ''))()
"#;

/// Probe well-known platform globals for embedded state.
///
/// Returns the first hit as `{ source, payload }` with the payload
/// stringified in-page: cyclic or otherwise non-JSON state throws inside
/// the probe and falls through to the next candidate.
const PLATFORM_STATE_SCRIPT: &str = r"
    (() => {
        const probes = [
            ['next_data', () => window.__NEXT_DATA__],
            ['nuxt', () => window.__NUXT__],
            ['initial_state', () => window.__INITIAL_STATE__],
            ['shopify', () => window.ShopifyAnalytics && window.ShopifyAnalytics.meta]
        ];
        for (const [source, probe] of probes) {
            try {
                const data = probe();
                if (data) {
                    return { source, payload: JSON.stringify(data) };
                }
            } catch (e) {
                // fall through to the next probe
            }
        }
        return null;
    })()
";

/// Poll until `document.readyState` is `complete` and a body exists.
///
/// `wait_for_navigation` resolves on the HTTP side; JS-heavy pages still
/// mount content afterwards. Gives up quietly after `max_wait`.
pub(crate) async fn wait_for_ready(page: &Page, max_wait: Duration) {
    let start = Instant::now();
    let poll = Duration::from_millis(100);

    while start.elapsed() < max_wait {
        match page.evaluate(READY_STATE_SCRIPT).await {
            Ok(result) => {
                if let Ok(value) = result.into_value::<serde_json::Value>() {
                    let ready = value.get("readyState").and_then(|v| v.as_str());
                    let body = value
                        .get("bodyExists")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false);
                    if ready == Some("complete") && body {
                        return;
                    }
                }
            }
            Err(e) => debug!(error = %e, "readyState probe failed, retrying"),
        }
        tokio::time::sleep(poll).await;
    }

    debug!(
        waited_ms = max_wait.as_millis() as u64,
        "page did not reach readyState=complete, proceeding anyway"
    );
}

/// Poll for a caller-supplied CSS selector. Best effort: a selector that
/// never appears is logged and forgotten.
pub(crate) async fn wait_for_selector(page: &Page, selector: &str, max_wait: Duration) {
    let Ok(encoded) = serde_json::to_string(selector) else {
        return;
    };
    let script = format!("(() => document.querySelector({encoded}) !== null)()");
    let start = Instant::now();
    let poll = Duration::from_millis(100);

    while start.elapsed() < max_wait {
        let found = match page.evaluate(script.as_str()).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(e) => {
                debug!(error = %e, "selector probe failed, retrying");
                false
            }
        };
        if found {
            return;
        }
        tokio::time::sleep(poll).await;
    }

    debug!(selector, "selector did not appear before the wait budget");
}

/// Incrementally scroll to the bottom to trigger lazy loading, then return
/// to the top so screenshots show the fold.
pub(crate) async fn scroll_page(page: &Page) -> Result<()> {
    let step = format!(
        "(() => {{ window.scrollBy(0, {SCROLL_STEP_PX}); \
         return (window.innerHeight + window.scrollY) >= document.body.scrollHeight; }})()"
    );

    for _ in 0..SCROLL_MAX_STEPS {
        let at_bottom = page
            .evaluate(step.as_str())
            .await
            .context("auto-scroll step failed")?
            .into_value::<bool>()
            .unwrap_or(true);
        if at_bottom {
            break;
        }
        tokio::time::sleep(Duration::from_millis(SCROLL_PAUSE_MS)).await;
    }

    page.evaluate("window.scrollTo(0, 0)")
        .await
        .context("scroll to top failed")?;
    Ok(())
}

/// Rendered body text.
pub(crate) async fn body_text(page: &Page) -> Result<String> {
    let result = page
        .evaluate(BODY_TEXT_SCRIPT)
        .await
        .context("body text extraction failed")?;
    result
        .into_value()
        .map_err(|e| anyhow!("body text value: {e}"))
}

/// Document title, with empty titles mapped to `None`.
pub(crate) async fn title(page: &Page) -> Result<Option<String>> {
    let result = page
        .evaluate("document.title")
        .await
        .context("title extraction failed")?;
    let title: String = result.into_value().map_err(|e| anyhow!("title value: {e}"))?;
    let title = title.trim().to_string();
    Ok((!title.is_empty()).then_some(title))
}

/// Parsed JSON-LD blocks; blocks that fail to parse are skipped.
pub(crate) async fn json_ld_blocks(page: &Page) -> Result<Vec<serde_json::Value>> {
    let result = page
        .evaluate(JSON_LD_SCRIPT)
        .await
        .context("json-ld extraction failed")?;
    let raw: Vec<String> = result
        .into_value()
        .map_err(|e| anyhow!("json-ld value: {e}"))?;
    Ok(raw
        .iter()
        .filter_map(|block| serde_json::from_str(block).ok())
        .collect())
}

/// Platform-embedded state (`__NEXT_DATA__` and friends), when present.
pub(crate) async fn platform_embedded(page: &Page) -> Result<Option<serde_json::Value>> {
    let result = page
        .evaluate(PLATFORM_STATE_SCRIPT)
        .await
        .context("platform state extraction failed")?;
    let probe: serde_json::Value = result
        .into_value()
        .map_err(|e| anyhow!("platform state value: {e}"))?;
    if probe.is_null() {
        return Ok(None);
    }

    let source = probe
        .get("source")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let payload = probe
        .get("payload")
        .and_then(|v| v.as_str())
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok());

    match payload {
        Some(data) => Ok(Some(serde_json::json!({ "source": source, "data": data }))),
        None => {
            warn!(source, "platform state payload was not valid JSON");
            Ok(None)
        }
    }
}

/// Viewport screenshot as JPEG bytes.
pub(crate) async fn capture_screenshot(page: &Page) -> Result<Vec<u8>> {
    let params = CaptureScreenshotParams {
        quality: Some(SCREENSHOT_QUALITY),
        format: Some(CaptureScreenshotFormat::Jpeg),
        ..Default::default()
    };
    page.screenshot(params)
        .await
        .map_err(|e| anyhow!("screenshot capture failed: {e}"))
}
