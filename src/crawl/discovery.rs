//! Candidate link discovery over rendered HTML.
//!
//! Runs a regex over the serialized DOM instead of a full HTML parse. The
//! browser already rendered the page, so every href is a quoted attribute in
//! the shape the serializer emits. Discovered hrefs are entity-decoded,
//! resolved against the page URL, and filtered down to same-site links whose
//! path matches one of the caller's patterns.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use url::Url;

use crate::error::{IngestError, Result};
use crate::util::urls::{join_discovered, page_key, same_site};

/// Quoted anchor hrefs. Bounded quantifiers keep pathological markup from
/// backtracking; `page.content()` serializes attributes quoted, so the quoted
/// form is the only shape seen here.
static HREF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a\s[^>]{0,2048}?href\s*=\s*["']([^"'<>]{1,2000})["']"#)
        .expect("HREF_RE: hardcoded regex is valid")
});

/// Compile caller-supplied path patterns. Matching is case-insensitive.
pub(crate) fn compile_patterns(sources: &[String]) -> Result<Vec<Regex>> {
    sources
        .iter()
        .map(|source| {
            RegexBuilder::new(source)
                .case_insensitive(true)
                .build()
                .map_err(|e| IngestError::Other(format!("invalid link pattern `{source}`: {e}")))
        })
        .collect()
}

/// Pull crawlable links out of a rendered page.
///
/// Returns absolute URLs in document order, deduplicated by page identity,
/// at most `cap` of them. An empty `patterns` slice accepts every path.
pub(crate) fn discover_links(
    html: &str,
    base: &Url,
    patterns: &[Regex],
    same_site_only: bool,
    cap: usize,
) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut found: Vec<String> = Vec::new();

    for caps in HREF_RE.captures_iter(html) {
        if found.len() >= cap {
            break;
        }
        let Some(raw) = caps.get(1) else { continue };
        let href = html_escape::decode_html_entities(raw.as_str());
        let Some(url) = join_discovered(base, &href) else {
            continue;
        };
        if same_site_only && !same_site(base, &url) {
            continue;
        }
        if !patterns.is_empty() && !patterns.iter().any(|p| p.is_match(url.path())) {
            continue;
        }
        let Ok(key) = page_key(url.as_str()) else {
            continue;
        };
        if seen.insert(key) {
            found.push(url.into());
        }
    }

    found
}
