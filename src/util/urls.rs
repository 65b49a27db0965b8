//! URL normalization shared by the crawl frontier, caches, and risk tracking.
//!
//! Two URLs that differ only in query string, fragment, default port, or a
//! trailing slash are the same page for crawl purposes. `page_key` collapses
//! those differences so the visited set and the persistent stores agree on
//! identity. The in-process cache layers its own, slightly looser key on top
//! (see `cache::key`).

use url::Url;

use crate::error::{IngestError, Result};

/// Canonical identity of a URL for dedup and store lookups.
///
/// Keeps scheme, host, explicit non-default port, and path (minus any
/// trailing slash). Query string and fragment are dropped.
pub fn page_key(raw: &str) -> Result<String> {
    let url = Url::parse(raw).map_err(|e| IngestError::invalid_url(raw, e))?;
    let host = url
        .host_str()
        .ok_or_else(|| IngestError::invalid_url(raw, "no host"))?;
    let path = url.path().trim_end_matches('/');
    match url.port() {
        Some(port) => Ok(format!("{}://{host}:{port}{path}", url.scheme())),
        None => Ok(format!("{}://{host}{path}", url.scheme())),
    }
}

/// Hostname of a URL, lowercased, or `None` if it does not parse.
pub fn hostname(raw: &str) -> Option<String> {
    Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
}

/// Host with any leading `www.` label removed.
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Whether two URLs point at the same site, treating `www.example.com`
/// and `example.com` as equivalent.
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(ha), Some(hb)) => strip_www(ha).eq_ignore_ascii_case(strip_www(hb)),
        _ => false,
    }
}

/// Resolve an href found in a page against the page URL.
///
/// Returns `None` for anything that is not a fetchable http(s) URL
/// (mailto:, javascript:, unparseable fragments). The fragment is cleared
/// so anchors collapse to their page.
pub fn join_discovered(base: &Url, href: &str) -> Option<Url> {
    let mut resolved = base.join(href.trim()).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_key_drops_query_fragment_and_trailing_slash() {
        let a = page_key("https://example.com/docs/?tab=1#intro").unwrap();
        let b = page_key("https://example.com/docs").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "https://example.com/docs");
    }

    #[test]
    fn page_key_normalizes_case_and_default_port() {
        let a = page_key("HTTPS://Example.COM:443/Guide").unwrap();
        assert_eq!(a, "https://example.com/Guide");
        // Path case is significant and must survive.
        assert_ne!(a, page_key("https://example.com/guide").unwrap());
    }

    #[test]
    fn page_key_keeps_explicit_port() {
        let a = page_key("http://example.com:8080/x").unwrap();
        assert_eq!(a, "http://example.com:8080/x");
    }

    #[test]
    fn page_key_root_has_no_trailing_slash() {
        assert_eq!(
            page_key("https://example.com/").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn page_key_rejects_garbage() {
        assert!(page_key("not a url").is_err());
        assert!(page_key("data:text/plain,hi").is_err());
    }

    #[test]
    fn same_site_treats_www_as_equivalent() {
        let a = Url::parse("https://www.example.com/a").unwrap();
        let b = Url::parse("https://example.com/b").unwrap();
        let c = Url::parse("https://blog.example.com/").unwrap();
        assert!(same_site(&a, &b));
        assert!(!same_site(&a, &c));
    }

    #[test]
    fn join_rejects_non_http_schemes() {
        let base = Url::parse("https://example.com/docs/").unwrap();
        assert!(join_discovered(&base, "mailto:hi@example.com").is_none());
        assert!(join_discovered(&base, "javascript:void(0)").is_none());
        assert!(join_discovered(&base, "tel:+15555551212").is_none());
    }

    #[test]
    fn join_resolves_relative_and_clears_fragment() {
        let base = Url::parse("https://example.com/docs/intro").unwrap();
        let got = join_discovered(&base, "../pricing#plans").unwrap();
        assert_eq!(got.as_str(), "https://example.com/pricing");
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn page_key_is_idempotent(
            host in "[a-z]{1,12}\\.[a-z]{2,4}",
            segments in prop::collection::vec("[a-zA-Z0-9]{1,8}", 0..5),
        ) {
            let url = format!("https://{}/{}", host, segments.join("/"));
            let key = page_key(&url).unwrap();
            prop_assert_eq!(page_key(&key).unwrap(), key.clone());
        }

        #[test]
        fn page_key_ignores_query_fragment_and_trailing_slash(
            host in "[a-z]{1,12}\\.[a-z]{2,4}",
            segments in prop::collection::vec("[a-z0-9]{1,8}", 0..4),
            query in "[a-z]{1,6}=[a-z0-9]{1,6}",
        ) {
            let base = format!("https://{}/{}", host, segments.join("/"));
            let noisy = format!("{base}/?{query}#frag");
            prop_assert_eq!(page_key(&noisy).unwrap(), page_key(&base).unwrap());
        }

        #[test]
        fn page_key_host_case_never_matters(
            host in "[a-zA-Z]{1,12}\\.[a-zA-Z]{2,4}",
        ) {
            let upper = format!("https://{}/x", host.to_uppercase());
            let lower = format!("https://{}/x", host.to_lowercase());
            prop_assert_eq!(page_key(&upper).unwrap(), page_key(&lower).unwrap());
        }
    }
}
