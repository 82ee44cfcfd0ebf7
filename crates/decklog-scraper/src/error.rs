//! Error types for the extraction pipeline.

use thiserror::Error;

/// Failure of one browser-side step on one candidate URL.
///
/// All variants are recoverable at the orchestrator level: the attempt is
/// abandoned and the next mirror is tried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrowserError {
    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("page script failed: {0}")]
    Script(String),

    #[error("page snapshot failed: {0}")]
    Snapshot(String),

    #[error("{step} timed out after {timeout_ms}ms")]
    StepTimeout { step: &'static str, timeout_ms: u64 },
}

/// Why a single candidate URL did not produce a deck.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptFailure {
    #[error("no cards found by any extraction tier")]
    Empty,

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// One failed candidate URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAttempt {
    pub url: String,
    pub reason: AttemptFailure,
}

impl std::fmt::Display for FailedAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.url, self.reason)
    }
}

/// Errors surfaced to callers of the scraper.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid deck code {0:?}")]
    InvalidCode(String),

    #[error("no decklog page yielded cards for deck {code} ({} sources tried)", attempts.len())]
    AllSourcesExhausted {
        code: String,
        attempts: Vec<FailedAttempt>,
    },
}
