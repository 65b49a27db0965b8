//! Content cache layer.
//!
//! Two tiers with different jobs. [`ScrapeCache`] is an in-process TTL map
//! that hands back recent fetch results without touching the browser.
//! [`UrlFetchCache`] is persisted change detection: it never skips a fetch,
//! it reports whether the content differs from the previous run so
//! downstream extraction can skip unchanged pages. Both are constructed by
//! the owner and injected; nothing here is a global.

mod fingerprint;
mod key;
mod memory;

pub use fingerprint::{ChangeStatus, UrlFetchCache, UrlFetchCacheEntry};
pub use key::cache_key;
pub use memory::ScrapeCache;
