//! Chrome sessions over the DevTools protocol.

use super::{Navigator, PageSession, StealthProfile};
use crate::error::BrowserError;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, Headers, SetExtraHttpHeadersParams,
    SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, NavigateParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use shared::config::BrowserConfig as BrowserSettings;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

const READY_POLL: Duration = Duration::from_millis(100);

/// Launches one headless Chrome per `open` call.
pub struct ChromeNavigator {
    settings: BrowserSettings,
    profile: StealthProfile,
    navigation_timeout: Duration,
}

impl ChromeNavigator {
    pub fn new(settings: BrowserSettings, navigation_timeout: Duration) -> Self {
        let profile = StealthProfile::from_config(&settings);
        Self {
            settings,
            profile,
            navigation_timeout,
        }
    }

    pub fn with_profile(mut self, profile: StealthProfile) -> Self {
        self.profile = profile;
        self
    }

    fn browser_config(&self, profile_dir: &Path) -> Result<BrowserConfig, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile_dir)
            .args(self.settings.extra_args.iter().cloned())
            .args(self.profile.launch_args());

        if !self.settings.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &self.settings.executable {
            builder = builder.chrome_executable(executable);
        }

        builder.build().map_err(BrowserError::Launch)
    }
}

impl Navigator for ChromeNavigator {
    type Page = ChromeSession;

    async fn open(&self, url: &str) -> Result<ChromeSession, BrowserError> {
        let profile_dir = std::env::temp_dir().join(format!(
            "decklog-scraper-{}-{}",
            std::process::id(),
            SESSION_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let config = self.browser_config(&profile_dir)?;

        let session = ChromeSession::launch(config, profile_dir).await?;
        match session.load(&self.profile, url, self.navigation_timeout).await {
            Ok(()) => Ok(session),
            Err(e) => {
                session.close().await;
                Err(e)
            }
        }
    }
}

/// One browser process with a single page.
pub struct ChromeSession {
    browser: Option<Browser>,
    page: Page,
    handler_task: JoinHandle<()>,
    profile_dir: PathBuf,
}

impl ChromeSession {
    async fn launch(config: BrowserConfig, profile_dir: PathBuf) -> Result<Self, BrowserError> {
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler event error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                shutdown_browser(&mut browser).await;
                handler_task.abort();
                remove_profile_dir(&profile_dir);
                return Err(BrowserError::Launch(e.to_string()));
            }
        };

        debug!(profile_dir = %profile_dir.display(), "Browser session launched");

        Ok(Self {
            browser: Some(browser),
            page,
            handler_task,
            profile_dir,
        })
    }

    /// Apply the stealth profile, then navigate and wait for DOMContentLoaded.
    async fn load(
        &self,
        profile: &StealthProfile,
        url: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let nav_error = |reason: String| BrowserError::Navigation {
            url: url.to_string(),
            reason,
        };

        self.page
            .execute(NetworkEnableParams::default())
            .await
            .map_err(|e| nav_error(e.to_string()))?;

        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(profile.user_agent.clone())
            .accept_language(profile.accept_language.clone())
            .build()
            .map_err(nav_error)?;
        self.page
            .execute(user_agent)
            .await
            .map_err(|e| nav_error(e.to_string()))?;

        self.page
            .execute(SetExtraHttpHeadersParams::new(Headers::new(
                profile.extra_headers(),
            )))
            .await
            .map_err(|e| nav_error(e.to_string()))?;

        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(
                profile.init_script(),
            ))
            .await
            .map_err(|e| nav_error(e.to_string()))?;

        let started = Instant::now();
        let navigation = async {
            let response = self
                .page
                .execute(NavigateParams::new(url))
                .await
                .map_err(|e| nav_error(e.to_string()))?;
            if let Some(error_text) = response.result.error_text.clone() {
                return Err(nav_error(error_text));
            }

            // "interactive" means DOMContentLoaded has fired
            loop {
                let state = self.evaluate("document.readyState").await?;
                if state.as_str().is_some_and(|s| s != "loading") {
                    return Ok(());
                }
                tokio::time::sleep(READY_POLL).await;
            }
        };

        match tokio::time::timeout(timeout, navigation).await {
            Ok(Ok(())) => {
                info!(
                    url = url,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Page content loaded"
                );
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

impl PageSession for ChromeSession {
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(BrowserError::Script)?;

        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;

        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.page
            .content()
            .await
            .map_err(|e| BrowserError::Snapshot(e.to_string()))
    }

    async fn close(mut self) {
        if let Err(e) = self.page.clone().close().await {
            debug!(error = %e, "Failed to close page");
        }
        if let Some(mut browser) = self.browser.take() {
            shutdown_browser(&mut browser).await;
        }
        self.handler_task.abort();
        remove_profile_dir(&self.profile_dir);
        debug!("Browser session closed");
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        // Dropping `Browser` kills the child process; the handler would
        // otherwise spin until the socket errors out.
        self.handler_task.abort();
        if self.browser.is_some() {
            warn!("Browser session dropped without close");
        }
    }
}

async fn shutdown_browser(browser: &mut Browser) {
    if let Err(e) = browser.close().await {
        debug!(error = %e, "Browser close command failed, killing process");
        if let Some(Err(e)) = browser.kill().await {
            warn!(error = %e, "Failed to kill browser process");
        }
    }
    if let Err(e) = browser.wait().await {
        debug!(error = %e, "Failed to wait for browser process");
    }
}

fn remove_profile_dir(dir: &Path) {
    if dir.exists() {
        if let Err(e) = std::fs::remove_dir_all(dir) {
            debug!(dir = %dir.display(), error = %e, "Failed to remove browser profile");
        }
    }
}
