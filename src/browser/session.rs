//! Shared browser session with lazy launch and crash recovery.

use std::sync::Arc;

use chromiumoxide::Page;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::launch::{self, BrowserOptions};
use super::wrapper::BrowserHandle;
use crate::error::{IngestError, Result};

/// Owns the single Chromium process every fetch in this engine runs through.
///
/// The process is launched on first use and reused until it stops answering
/// CDP commands, at which point it is torn down and relaunched. One
/// `tokio::sync::Mutex` guards the launch and teardown path so two callers
/// can never race a recovery.
///
/// Cloning is cheap; clones share the same browser.
#[derive(Clone)]
pub struct BrowserSessionManager {
    options: BrowserOptions,
    handle: Arc<Mutex<Option<BrowserHandle>>>,
}

impl BrowserSessionManager {
    /// Create a manager. The browser is not launched until the first
    /// [`new_page`](Self::new_page) call.
    #[must_use]
    pub fn new(options: BrowserOptions) -> Self {
        Self {
            options,
            handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Lock the session, launching or relaunching the browser as needed.
    ///
    /// A live browser is health-checked with the `version()` CDP call; on
    /// failure the crashed process is closed, waited on, and its profile
    /// directory cleaned before a fresh launch.
    async fn acquire(&self) -> Result<MutexGuard<'_, Option<BrowserHandle>>> {
        let mut guard = self.handle.lock().await;

        if let Some(handle) = guard.as_ref() {
            match handle.browser().version().await {
                Ok(_) => {
                    debug!("browser health check passed");
                    return Ok(guard);
                }
                Err(e) => {
                    warn!("browser health check failed, relaunching: {e}");
                    if let Some(mut crashed) = guard.take() {
                        // Best effort; the process may already be gone.
                        let _ = crashed.browser_mut().close().await;
                        let _ = crashed.browser_mut().wait().await;
                        crashed.cleanup_profile_dir();
                    }
                }
            }
        }

        info!("launching ingest browser");
        let (browser, handler, temp_profile) = launch::launch(&self.options)
            .await
            .map_err(|e| IngestError::Browser(format!("{e:#}")))?;
        *guard = Some(BrowserHandle::new(browser, handler, temp_profile));

        Ok(guard)
    }

    /// Open a tab on a healthy browser.
    ///
    /// Callers own the returned page and must close it on every exit path;
    /// a leaked tab stays open until the whole process shuts down.
    pub async fn new_page(&self, url: &str) -> Result<Page> {
        let guard = self.acquire().await?;
        let handle = guard
            .as_ref()
            .ok_or_else(|| IngestError::browser("browser failed to start"))?;
        handle
            .browser()
            .new_page(url)
            .await
            .map_err(|e| IngestError::browser(format!("failed to open tab: {e}")))
    }

    /// Close the browser process if one is running.
    ///
    /// Safe to call more than once; later calls are no-ops. `Drop` on the
    /// inner handle only aborts the event handler, so an explicit shutdown
    /// is the only way to close Chrome gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        let mut guard = self.handle.lock().await;
        if let Some(mut handle) = guard.take() {
            info!("shutting down ingest browser");
            if let Err(e) = handle.browser_mut().close().await {
                warn!("browser did not close cleanly: {e}");
            }
            if let Err(e) = handle.browser_mut().wait().await {
                warn!("browser exit wait failed: {e}");
            }
            handle.cleanup_profile_dir();
        }
        Ok(())
    }
}
