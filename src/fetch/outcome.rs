//! Fetch outcome classification.
//!
//! Every page fetch ends in exactly one [`FetchOutcome`]. Downstream code
//! branches on the outcome instead of catching errors: a 403, a missing
//! page, or a bot-protection interstitial are data, not exceptions. Only
//! the `Ok` variant carries content, so there is no field that is "maybe
//! populated" depending on how the fetch went.

use serde::{Deserialize, Serialize};

/// Discriminant of a [`FetchOutcome`], without the payload.
///
/// Used for counters, risk tracking, and log fields where only the class
/// of the result matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Ok,
    Blocked,
    NotFound,
    ServerError,
    Timeout,
    NoContent,
}

impl OutcomeKind {
    /// Stable wire/storage name of the outcome.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::Ok => "ok",
            OutcomeKind::Blocked => "blocked",
            OutcomeKind::NotFound => "not_found",
            OutcomeKind::ServerError => "server_error",
            OutcomeKind::Timeout => "timeout",
            OutcomeKind::NoContent => "no_content",
        }
    }

    /// Inverse of [`OutcomeKind::as_str`].
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(OutcomeKind::Ok),
            "blocked" => Some(OutcomeKind::Blocked),
            "not_found" => Some(OutcomeKind::NotFound),
            "server_error" => Some(OutcomeKind::ServerError),
            "timeout" => Some(OutcomeKind::Timeout),
            "no_content" => Some(OutcomeKind::NoContent),
            _ => None,
        }
    }

    /// Whether this outcome means the fetch produced no usable page.
    #[must_use]
    pub fn is_failure(self) -> bool {
        !matches!(self, OutcomeKind::Ok)
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content extracted from a successfully rendered page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    /// Full post-render HTML.
    pub html: String,

    /// Decoded body text after rendering.
    pub rendered_text: String,

    /// Document title, when the page has one.
    pub title: Option<String>,

    /// Parsed JSON-LD blocks found in the page, invalid blocks skipped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub structured_data: Vec<serde_json::Value>,

    /// Vendor-specific embedded state (storefront catalogs, hydration
    /// payloads) exposed through well-known script globals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_embedded: Option<serde_json::Value>,

    /// xxh3 hash of the HTML, hex-encoded. Used for change detection.
    pub content_hash: String,

    /// HTTP status of the document response, when observable.
    pub http_status: Option<u16>,

    /// JPEG screenshot bytes when capture was requested. Kept out of
    /// serialized results; consumers that want the image take it in-process.
    #[serde(skip)]
    pub screenshot: Option<Vec<u8>>,
}

/// How a single page fetch ended.
///
/// Serializes with an `outcome` tag so persisted results read naturally:
/// `{"outcome":"blocked","detail":"...","http_status":403}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// The page rendered and passed the minimum-content check.
    Ok(PageContent),

    /// The site refused access (401/403). Not worth retrying; the detail
    /// carries guidance toward a manual import path.
    Blocked {
        detail: String,
        http_status: Option<u16>,
    },

    /// The page does not exist (404). Terminal.
    NotFound {
        detail: String,
        http_status: Option<u16>,
    },

    /// Upstream 5xx or an unexpected navigation failure. The caller may
    /// retry with backoff.
    ServerError {
        detail: String,
        http_status: Option<u16>,
    },

    /// Navigation exceeded its budget. The caller may retry once with a
    /// longer budget.
    Timeout { detail: String },

    /// The page rendered with 2xx but yielded less text than the
    /// minimum-content threshold. Usually a bot-protection interstitial;
    /// treated like `Blocked` for user messaging.
    NoContent {
        detail: String,
        http_status: Option<u16>,
        html_len: usize,
    },
}

impl FetchOutcome {
    /// Discriminant of this outcome.
    #[must_use]
    pub fn kind(&self) -> OutcomeKind {
        match self {
            FetchOutcome::Ok(_) => OutcomeKind::Ok,
            FetchOutcome::Blocked { .. } => OutcomeKind::Blocked,
            FetchOutcome::NotFound { .. } => OutcomeKind::NotFound,
            FetchOutcome::ServerError { .. } => OutcomeKind::ServerError,
            FetchOutcome::Timeout { .. } => OutcomeKind::Timeout,
            FetchOutcome::NoContent { .. } => OutcomeKind::NoContent,
        }
    }

    /// Extracted content, for `Ok` outcomes.
    #[must_use]
    pub fn content(&self) -> Option<&PageContent> {
        match self {
            FetchOutcome::Ok(content) => Some(content),
            _ => None,
        }
    }

    /// Consume the outcome, keeping the content if there is any.
    #[must_use]
    pub fn into_content(self) -> Option<PageContent> {
        match self {
            FetchOutcome::Ok(content) => Some(content),
            _ => None,
        }
    }

    /// Diagnostic message, for non-`Ok` outcomes.
    #[must_use]
    pub fn error_detail(&self) -> Option<&str> {
        match self {
            FetchOutcome::Ok(_) => None,
            FetchOutcome::Blocked { detail, .. }
            | FetchOutcome::NotFound { detail, .. }
            | FetchOutcome::ServerError { detail, .. }
            | FetchOutcome::Timeout { detail }
            | FetchOutcome::NoContent { detail, .. } => Some(detail),
        }
    }

    /// HTTP status attached to this outcome, when one was observed.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            FetchOutcome::Ok(content) => content.http_status,
            FetchOutcome::Blocked { http_status, .. }
            | FetchOutcome::NotFound { http_status, .. }
            | FetchOutcome::ServerError { http_status, .. }
            | FetchOutcome::NoContent { http_status, .. } => *http_status,
            FetchOutcome::Timeout { .. } => None,
        }
    }
}

/// Map an HTTP status to a terminal outcome, or `None` when extraction
/// should proceed.
///
/// 401/403 short-circuit as blocked, 404 as not found, 5xx as a server
/// error. Everything else (2xx, 3xx already followed by the browser,
/// odd 4xx like 429) falls through to the content heuristics.
#[must_use]
pub fn classify_status(status: u16) -> Option<OutcomeKind> {
    match status {
        401 | 403 => Some(OutcomeKind::Blocked),
        404 => Some(OutcomeKind::NotFound),
        s if s >= 500 => Some(OutcomeKind::ServerError),
        _ => None,
    }
}

/// Classify a navigation failure by its message: timeouts are their own
/// outcome, everything else counts as a server-side failure.
#[must_use]
pub fn classify_nav_error(message: &str) -> OutcomeKind {
    let lower = message.to_ascii_lowercase();
    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("deadline")
        || lower.contains("elapsed")
    {
        OutcomeKind::Timeout
    } else {
        OutcomeKind::ServerError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification_matches_contract() {
        assert_eq!(classify_status(401), Some(OutcomeKind::Blocked));
        assert_eq!(classify_status(403), Some(OutcomeKind::Blocked));
        assert_eq!(classify_status(404), Some(OutcomeKind::NotFound));
        assert_eq!(classify_status(500), Some(OutcomeKind::ServerError));
        assert_eq!(classify_status(503), Some(OutcomeKind::ServerError));
        assert_eq!(classify_status(200), None);
        assert_eq!(classify_status(204), None);
        // 429 falls through; the risk tracker handles it separately.
        assert_eq!(classify_status(429), None);
    }

    #[test]
    fn nav_error_classification() {
        assert_eq!(
            classify_nav_error("Navigation timeout of 45000ms exceeded"),
            OutcomeKind::Timeout
        );
        assert_eq!(
            classify_nav_error("deadline has elapsed"),
            OutcomeKind::Timeout
        );
        assert_eq!(
            classify_nav_error("net::ERR_CONNECTION_REFUSED"),
            OutcomeKind::ServerError
        );
    }

    #[test]
    fn outcome_kind_round_trips_through_storage_name() {
        for kind in [
            OutcomeKind::Ok,
            OutcomeKind::Blocked,
            OutcomeKind::NotFound,
            OutcomeKind::ServerError,
            OutcomeKind::Timeout,
            OutcomeKind::NoContent,
        ] {
            assert_eq!(OutcomeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(OutcomeKind::parse("bogus"), None);
    }

    #[test]
    fn tagged_serialization_shape() {
        let outcome = FetchOutcome::Blocked {
            detail: "access denied".into(),
            http_status: Some(403),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "blocked");
        assert_eq!(json["http_status"], 403);
        assert_eq!(json["detail"], "access denied");
    }

    #[test]
    fn only_ok_carries_content() {
        let outcome = FetchOutcome::Timeout {
            detail: "navigation budget exceeded".into(),
        };
        assert!(outcome.content().is_none());
        assert_eq!(outcome.kind(), OutcomeKind::Timeout);
        assert!(outcome.kind().is_failure());
        assert_eq!(outcome.error_detail(), Some("navigation budget exceeded"));
    }
}
