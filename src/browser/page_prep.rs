//! Per-tab preparation applied before navigation.
//!
//! Ingest targets routinely gate content behind bot checks that look at
//! `navigator.webdriver` and headless viewport quirks. Preparation pins a
//! desktop viewport, registers a small masking script that runs before any
//! site script, and aligns the reported user agent.

use anyhow::Result;
use chromiumoxide::{Page, cdp};

use crate::util::constants::{ORBIT_USER_AGENT, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};

/// Masks the most common automation tells. Runs on every new document in
/// the tab, ahead of site scripts.
const MASK_AUTOMATION_JS: &str = r"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
if (!window.chrome) { window.chrome = { runtime: {} }; }
";

/// Prepare a fresh tab for a fetch. Must run before the first navigation;
/// the masking script only covers documents created after registration.
pub(crate) async fn prepare_page(page: &Page) -> Result<()> {
    page.execute(
        cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams {
            source: MASK_AUTOMATION_JS.to_string(),
            include_command_line_api: None,
            world_name: None,
            run_immediately: None,
        },
    )
    .await?;

    page.execute(
        cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(VIEWPORT_WIDTH))
            .height(i64::from(VIEWPORT_HEIGHT))
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(anyhow::Error::msg)?,
    )
    .await?;

    page.execute(cdp::browser_protocol::network::SetUserAgentOverrideParams {
        user_agent: ORBIT_USER_AGENT.to_string(),
        accept_language: Some("en-US,en;q=0.9".to_string()),
        platform: Some("MacIntel".to_string()),
        user_agent_metadata: None,
    })
    .await?;

    Ok(())
}
