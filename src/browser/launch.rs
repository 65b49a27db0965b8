//! Browser process launch: executable resolution and hardened configuration.
//!
//! Resolution order for the Chromium binary: explicit path from
//! [`BrowserOptions`], the `CHROMIUM_PATH` environment variable, well-known
//! platform install locations, `which` on Unix, and finally a managed
//! download through chromiumoxide's fetcher.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::util::constants::{
    BROWSER_REQUEST_TIMEOUT, ORBIT_USER_AGENT, STORE_DIR_NAME, VIEWPORT_HEIGHT, VIEWPORT_WIDTH,
};

/// Where and how to launch Chromium.
#[derive(Debug, Clone, Default)]
pub struct BrowserOptions {
    /// Explicit binary path. `None` walks the discovery chain.
    pub(crate) executable: Option<PathBuf>,

    /// Profile directory to reuse across launches. `None` creates a
    /// throwaway directory removed on shutdown.
    pub(crate) profile_dir: Option<PathBuf>,

    /// Show a browser window. Headless unless set.
    pub(crate) headed: bool,
}

impl BrowserOptions {
    #[must_use]
    pub fn with_executable(mut self, path: PathBuf) -> Self {
        self.executable = Some(path);
        self
    }

    #[must_use]
    pub fn with_profile_dir(mut self, dir: PathBuf) -> Self {
        self.profile_dir = Some(dir);
        self
    }

    #[must_use]
    pub fn with_headed(mut self, headed: bool) -> Self {
        self.headed = headed;
        self
    }
}

/// Find a Chrome/Chromium binary already present on this machine.
pub(crate) async fn find_chrome_executable(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        anyhow::bail!(
            "configured chrome executable does not exist: {}",
            path.display()
        );
    }

    if let Ok(raw) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(raw);
        if path.exists() {
            info!("using browser from CHROMIUM_PATH: {}", path.display());
            return Ok(path);
        }
        warn!(
            "CHROMIUM_PATH points to a non-existent file: {}",
            path.display()
        );
    }

    let candidates: Vec<PathBuf> = if cfg!(target_os = "windows") {
        let mut paths = vec![
            PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
            PathBuf::from(r"C:\Program Files\Chromium\Application\chrome.exe"),
        ];
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            paths.push(PathBuf::from(local).join(r"Google\Chrome\Application\chrome.exe"));
        }
        paths
    } else if cfg!(target_os = "macos") {
        [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
        .iter()
        .map(PathBuf::from)
        .collect()
    } else {
        [
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
        .iter()
        .map(PathBuf::from)
        .collect()
    };

    for path in candidates {
        if path.exists() {
            debug!("found browser at {}", path.display());
            return Ok(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for name in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(name).output()
                && output.status.success()
            {
                let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !found.is_empty() {
                    debug!("found browser via which: {found}");
                    return Ok(PathBuf::from(found));
                }
            }
        }
    }

    anyhow::bail!("no Chrome/Chromium executable found")
}

/// Download a managed Chromium build into the engine data directory.
///
/// Fallback for machines without a system browser. The download is cached,
/// so repeat launches reuse the same build.
pub(crate) async fn download_managed_chrome() -> Result<PathBuf> {
    let cache_dir = dirs::data_dir()
        .map(|d| d.join(STORE_DIR_NAME))
        .unwrap_or_else(|| std::env::temp_dir().join(STORE_DIR_NAME))
        .join("chromium");
    std::fs::create_dir_all(&cache_dir).context("failed to create managed browser directory")?;

    info!("downloading managed Chromium to {}", cache_dir.display());
    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("failed to build browser fetcher options")?,
    );
    let revision = fetcher
        .fetch()
        .await
        .context("failed to download managed Chromium")?;

    info!(
        "managed Chromium ready at {}",
        revision.executable_path.display()
    );
    Ok(revision.executable_path)
}

/// Launch Chromium and spawn the CDP event handler drain task.
///
/// Returns the browser, the tracked handler `JoinHandle` (abort it to stop
/// the drain), and the profile directory when this launch created a
/// throwaway one.
pub(crate) async fn launch(
    options: &BrowserOptions,
) -> Result<(Browser, JoinHandle<()>, Option<PathBuf>)> {
    let executable = match find_chrome_executable(options.executable.as_deref()).await {
        Ok(path) => path,
        Err(e) => {
            warn!("no local browser found ({e:#}), falling back to managed download");
            download_managed_chrome().await?
        }
    };

    let (profile_dir, owns_profile) = match &options.profile_dir {
        Some(dir) => (dir.clone(), false),
        None => (
            std::env::temp_dir().join(format!("orbit_ingest_chrome_{}", std::process::id())),
            true,
        ),
    };
    std::fs::create_dir_all(&profile_dir).context("failed to create browser profile directory")?;

    let mut builder = BrowserConfigBuilder::default()
        .request_timeout(BROWSER_REQUEST_TIMEOUT)
        .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
        .user_data_dir(&profile_dir)
        .chrome_executable(executable);

    builder = if options.headed {
        builder.with_head()
    } else {
        builder.headless_mode(HeadlessMode::default())
    };

    builder = builder
        .arg(format!("--user-agent={ORBIT_USER_AGENT}"))
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-infobars")
        .arg("--disable-extensions")
        .arg("--disable-popup-blocking")
        .arg("--disable-background-networking")
        .arg("--disable-background-timer-throttling")
        .arg("--disable-backgrounding-occluded-windows")
        .arg("--disable-breakpad")
        .arg("--disable-hang-monitor")
        .arg("--disable-ipc-flooding-protection")
        .arg("--disable-prompt-on-repost")
        .arg("--disable-setuid-sandbox")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--no-sandbox")
        .arg("--ignore-certificate-errors")
        .arg("--metrics-recording-only")
        .arg("--password-store=basic")
        .arg("--use-mock-keychain")
        .arg("--hide-scrollbars")
        .arg("--mute-audio");

    let config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .context("failed to launch browser")?;

    let handler_task = task::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                let msg = e.to_string();
                // Unrecognized DevTools events surface as serde errors in the
                // handler stream; they are noise, not faults.
                // https://github.com/mattsse/chromiumoxide/issues/167
                let benign = msg.contains("data did not match any variant of untagged enum Message")
                    || msg.contains("Failed to deserialize WS response");
                if benign {
                    debug!("ignoring benign CDP decode failure: {msg}");
                } else {
                    error!("browser event handler error: {msg}");
                }
            }
        }
        debug!("browser event handler drained");
    });

    Ok((browser, handler_task, owns_profile.then_some(profile_dir)))
}
