//! Mirror orchestration: one isolated session per candidate URL.

use crate::browser::{Navigator, PageSession};
use crate::cascade::{CascadeOutcome, ExtractionCascade};
use crate::error::{AttemptFailure, BrowserError, FailedAttempt, ScrapeError};
use crate::loader::ContentLoader;
use shared::config::ScraperConfig;
use shared::DeckExtractionResult;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Placeholder substituted with the deck code in mirror templates.
pub const CODE_PLACEHOLDER: &str = "{code}";

/// Deck codes are short alphanumeric identifiers, sometimes with separators.
pub fn validate_code(code: &str) -> Result<&str, ScrapeError> {
    let code = code.trim();
    let valid = !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(code)
    } else {
        Err(ScrapeError::InvalidCode(code.to_string()))
    }
}

pub struct DecklogScraper<N: Navigator> {
    navigator: N,
    loader: ContentLoader,
    cascade: ExtractionCascade,
    mirrors: Vec<String>,
    snapshot_timeout: Duration,
}

impl<N: Navigator> DecklogScraper<N> {
    pub fn new(navigator: N, loader: ContentLoader, config: &ScraperConfig) -> Self {
        Self {
            navigator,
            loader,
            cascade: ExtractionCascade::default(),
            mirrors: config.mirrors.clone(),
            snapshot_timeout: Duration::from_millis(config.snapshot_timeout_ms),
        }
    }

    pub fn with_cascade(mut self, cascade: ExtractionCascade) -> Self {
        self.cascade = cascade;
        self
    }

    /// Candidate URLs for `code`, in the order they are tried.
    pub fn candidate_urls(&self, code: &str) -> Vec<String> {
        self.mirrors
            .iter()
            .map(|template| template.replace(CODE_PLACEHOLDER, code))
            .collect()
    }

    /// Fetch and extract a deck, trying each mirror until one yields cards.
    pub async fn scrape(&self, code: &str) -> Result<DeckExtractionResult, ScrapeError> {
        let code = validate_code(code)?;
        let urls = self.candidate_urls(code);
        let mut attempts = Vec::with_capacity(urls.len());

        info!(code = %code, candidates = urls.len(), "Scraping deck");

        for url in urls {
            match self.attempt(&url).await {
                Ok(result) => {
                    info!(
                        code = %code,
                        url = %url,
                        strategy = %result.strategy_used,
                        cards = result.cards.total_cards(),
                        "Deck extracted"
                    );
                    return Ok(result);
                }
                Err(reason) => {
                    warn!(code = %code, url = %url, reason = %reason, "Candidate URL failed");
                    attempts.push(FailedAttempt { url, reason });
                }
            }
        }

        Err(ScrapeError::AllSourcesExhausted {
            code: code.to_string(),
            attempts,
        })
    }

    /// One candidate URL. The session is closed before returning on every path.
    async fn attempt(&self, url: &str) -> Result<DeckExtractionResult, AttemptFailure> {
        let page = self.navigator.open(url).await?;

        let result = self.extract_from(&page).await;
        page.close().await;

        result
    }

    async fn extract_from(&self, page: &N::Page) -> Result<DeckExtractionResult, AttemptFailure> {
        let report = self.loader.prepare(page).await;
        debug!(?report, "Loader finished");

        let markup = match tokio::time::timeout(self.snapshot_timeout, page.content()).await {
            Ok(markup) => markup?,
            Err(_) => {
                return Err(BrowserError::StepTimeout {
                    step: "snapshot",
                    timeout_ms: self.snapshot_timeout.as_millis() as u64,
                }
                .into())
            }
        };

        match self.cascade.run(&markup) {
            CascadeOutcome::Success(result) => Ok(result),
            CascadeOutcome::Empty => Err(AttemptFailure::Empty),
        }
    }
}
