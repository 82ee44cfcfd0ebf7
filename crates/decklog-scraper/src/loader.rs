//! Reveals lazily loaded page content before extraction.
//!
//! Every step is best-effort: failures and timeouts are logged and the
//! pipeline continues with whatever the page already shows.

use crate::browser::PageSession;
use crate::error::BrowserError;
use crate::locator::CARD_SIGNATURES;
use serde::Deserialize;
use serde_json::json;
use shared::config::ScraperConfig;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound for a single short script (click, scroll step, marker check).
const SCRIPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Slack on top of the in-page idle timeout.
const IDLE_SLACK: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub consent_phrases: Vec<String>,
    pub consent_settle: Duration,
    pub scroll_step_px: u32,
    pub scroll_interval: Duration,
    pub scroll_max_iterations: u32,
    pub post_scroll_settle: Duration,
    pub idle_timeout: Duration,
    pub idle_window: Duration,
}

impl From<&ScraperConfig> for LoaderSettings {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            consent_phrases: config.consent_phrases.clone(),
            consent_settle: Duration::from_millis(config.consent_settle_ms),
            scroll_step_px: config.scroll_step_px.max(1),
            scroll_interval: Duration::from_millis(config.scroll_interval_ms),
            scroll_max_iterations: config.scroll_max_iterations,
            post_scroll_settle: Duration::from_millis(config.post_scroll_settle_ms),
            idle_timeout: Duration::from_millis(config.idle_timeout_ms),
            idle_window: Duration::from_millis(config.idle_window_ms),
        }
    }
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self::from(&ScraperConfig::default())
    }
}

/// What the loader managed to do on one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub consent_dismissed: bool,
    pub scroll_steps: u32,
    pub reached_bottom: bool,
    pub card_marker_present: bool,
    /// `None` when the idle wait was skipped or failed
    pub network_idle: Option<bool>,
}

/// Scroll state reported by the page after one step.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrollProgress {
    scroll_y: f64,
    inner_height: f64,
    scroll_height: f64,
}

impl ScrollProgress {
    fn reached_bottom(&self) -> bool {
        self.scroll_y + self.inner_height >= self.scroll_height
    }
}

fn consent_script(phrases: &[String]) -> String {
    format!(
        r#"(() => {{
  const texts = {phrases};
  const buttons = Array.from(document.querySelectorAll("button, [role='button'], .btn, .Button"));
  for (const b of buttons) {{
    const t = (b.innerText || b.textContent || "").trim();
    if (t && texts.some((w) => t.includes(w))) {{ b.click(); return true; }}
  }}
  const oneTrust = document.getElementById("onetrust-accept-btn-handler");
  if (oneTrust) {{ oneTrust.click(); return true; }}
  return false;
}})()"#,
        phrases = json!(phrases)
    )
}

fn scroll_script(step_px: u32) -> String {
    format!(
        "(() => {{ window.scrollBy(0, {step_px}); \
         return {{ scrollY: window.scrollY, innerHeight: window.innerHeight, \
         scrollHeight: document.body ? document.body.scrollHeight : 0 }}; }})()"
    )
}

fn marker_script() -> String {
    format!("!!document.querySelector({})", json!(CARD_SIGNATURES))
}

fn idle_script(window: Duration, timeout: Duration) -> String {
    format!(
        r#"(async () => {{
  const idleMs = {idle_ms}, timeoutMs = {timeout_ms}, interval = 100;
  const count = () => {{ try {{ return performance.getEntriesByType('resource').length; }} catch (_) {{ return 0; }} }};
  const start = Date.now();
  let last = count(), stable = 0;
  while (Date.now() - start < timeoutMs) {{
    await new Promise((r) => setTimeout(r, interval));
    const cur = count();
    if (cur === last && document.readyState === 'complete') {{
      stable += interval;
      if (stable >= idleMs) return true;
    }} else {{
      stable = 0;
    }}
    last = cur;
  }}
  return false;
}})()"#,
        idle_ms = window.as_millis(),
        timeout_ms = timeout.as_millis()
    )
}

pub struct ContentLoader {
    settings: LoaderSettings,
}

impl Default for ContentLoader {
    fn default() -> Self {
        Self::new(LoaderSettings::default())
    }
}

impl ContentLoader {
    pub fn new(settings: LoaderSettings) -> Self {
        Self { settings }
    }

    /// Dismiss consent, scroll to the bottom, and wait for cards or idle network.
    pub async fn prepare<P: PageSession>(&self, page: &P) -> LoadReport {
        let mut report = LoadReport {
            consent_dismissed: self.dismiss_consent(page).await,
            ..Default::default()
        };

        let (steps, bottom) = self.scroll_to_bottom(page).await;
        report.scroll_steps = steps;
        report.reached_bottom = bottom;

        if !self.settings.post_scroll_settle.is_zero() {
            tokio::time::sleep(self.settings.post_scroll_settle).await;
        }

        report.card_marker_present = self.card_marker_present(page).await;
        if !report.card_marker_present {
            report.network_idle = self.wait_for_network_idle(page).await;
        }

        info!(
            consent = report.consent_dismissed,
            scroll_steps = report.scroll_steps,
            reached_bottom = report.reached_bottom,
            card_marker = report.card_marker_present,
            network_idle = ?report.network_idle,
            "Page content prepared"
        );

        report
    }

    async fn run<P: PageSession>(
        &self,
        page: &P,
        step: &'static str,
        script: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, BrowserError> {
        match tokio::time::timeout(timeout, page.evaluate(script)).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::StepTimeout {
                step,
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Click an "agree" button if the page shows one.
    pub async fn dismiss_consent<P: PageSession>(&self, page: &P) -> bool {
        let script = consent_script(&self.settings.consent_phrases);
        match self.run(page, "consent", &script, SCRIPT_TIMEOUT).await {
            Ok(value) if value.as_bool() == Some(true) => {
                debug!("Consent overlay dismissed");
                tokio::time::sleep(self.settings.consent_settle).await;
                true
            }
            Ok(_) => false,
            Err(e) => {
                debug!(error = %e, "Consent check failed");
                false
            }
        }
    }

    /// Scroll in fixed steps until the bottom or the iteration cap.
    /// Returns the number of steps taken and whether the bottom was reached.
    pub async fn scroll_to_bottom<P: PageSession>(&self, page: &P) -> (u32, bool) {
        let script = scroll_script(self.settings.scroll_step_px);

        for step in 1..=self.settings.scroll_max_iterations {
            let progress = match self.run(page, "scroll", &script, SCRIPT_TIMEOUT).await {
                Ok(value) => serde_json::from_value::<ScrollProgress>(value)
                    .map_err(|e| BrowserError::Script(e.to_string())),
                Err(e) => Err(e),
            };

            match progress {
                Ok(progress) if progress.reached_bottom() => return (step, true),
                Ok(_) => tokio::time::sleep(self.settings.scroll_interval).await,
                Err(e) => {
                    warn!(step = step, error = %e, "Scrolling aborted");
                    return (step, false);
                }
            }
        }

        debug!(
            max_iterations = self.settings.scroll_max_iterations,
            "Scroll iteration cap reached"
        );
        (self.settings.scroll_max_iterations, false)
    }

    /// Whether any card-art element is already in the DOM.
    pub async fn card_marker_present<P: PageSession>(&self, page: &P) -> bool {
        match self.run(page, "card marker", &marker_script(), SCRIPT_TIMEOUT).await {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(e) => {
                debug!(error = %e, "Card marker check failed");
                false
            }
        }
    }

    /// Wait for the page's resource count to settle.
    pub async fn wait_for_network_idle<P: PageSession>(&self, page: &P) -> Option<bool> {
        let script = idle_script(self.settings.idle_window, self.settings.idle_timeout);
        let timeout = self.settings.idle_timeout + IDLE_SLACK;

        match self.run(page, "network idle", &script, timeout).await {
            Ok(value) => {
                let idle = value.as_bool();
                if idle == Some(false) {
                    debug!("Network did not settle before timeout");
                }
                idle
            }
            Err(e) => {
                debug!(error = %e, "Network idle wait failed");
                None
            }
        }
    }
}
