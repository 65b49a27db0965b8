//! Browser session management.
//!
//! One Chromium process serves every fetch. [`BrowserSessionManager`] owns
//! it: lazy launch on first use, a `version()` health check with automatic
//! relaunch when the process dies, and explicit shutdown. Launch details
//! (executable discovery, hardened arguments, the managed-download
//! fallback) live in `launch`; per-tab stealth preparation in `page_prep`.

mod launch;
mod page_prep;
mod session;
mod wrapper;

pub use launch::BrowserOptions;
pub use session::BrowserSessionManager;

pub(crate) use page_prep::prepare_page;
