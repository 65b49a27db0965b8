//! RAII ownership of a launched browser process.

use std::path::PathBuf;

use chromiumoxide::browser::Browser;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A running Chromium process bundled with its CDP event handler task.
///
/// The handler task must not outlive the browser; `Drop` aborts it.
/// `temp_profile_dir` is set only when the launch created a throwaway
/// profile, so caller-supplied profile directories are never removed.
pub(crate) struct BrowserHandle {
    browser: Browser,
    handler: JoinHandle<()>,
    temp_profile_dir: Option<PathBuf>,
}

impl BrowserHandle {
    pub(crate) fn new(
        browser: Browser,
        handler: JoinHandle<()>,
        temp_profile_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            browser,
            handler,
            temp_profile_dir,
        }
    }

    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    pub(crate) fn browser_mut(&mut self) -> &mut Browser {
        &mut self.browser
    }

    /// Remove the throwaway profile directory, if this handle owns one.
    ///
    /// Must run after `browser.wait()` completes so Chrome has released
    /// its file locks. Blocking `std::fs` because this is also reachable
    /// from `Drop`, where no runtime is available.
    pub(crate) fn cleanup_profile_dir(&mut self) {
        if let Some(path) = self.temp_profile_dir.take() {
            debug!("removing browser profile dir {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(
                    "failed to remove browser profile dir {}: {e}",
                    path.display()
                );
            }
        }
    }
}

impl Drop for BrowserHandle {
    fn drop(&mut self) {
        self.handler.abort();
        // Browser::drop kills the Chrome process itself.
        if self.temp_profile_dir.is_some() {
            warn!("browser handle dropped without shutdown, removing profile dir in Drop");
            self.cleanup_profile_dir();
        }
    }
}
