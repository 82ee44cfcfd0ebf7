//! Automated browser sessions.
//!
//! The pipeline only needs three things from a loaded page: run a script,
//! read the rendered markup, and close it. Keeping that behind traits lets the
//! orchestrator and content loader run against scripted fakes in tests.

pub mod chrome;
pub mod stealth;

pub use chrome::{ChromeNavigator, ChromeSession};
pub use stealth::StealthProfile;

use crate::error::BrowserError;
use std::future::Future;

/// A loaded page inside an exclusive browser session.
pub trait PageSession: Send + Sync {
    /// Evaluate a script in the page and return its JSON result. Promises
    /// are awaited.
    fn evaluate(
        &self,
        script: &str,
    ) -> impl Future<Output = Result<serde_json::Value, BrowserError>> + Send;

    /// Current rendered markup of the whole document.
    fn content(&self) -> impl Future<Output = Result<String, BrowserError>> + Send;

    /// Release the session and everything it holds.
    fn close(self) -> impl Future<Output = ()> + Send
    where
        Self: Sized;
}

/// Opens one isolated session per candidate URL.
pub trait Navigator: Send + Sync {
    type Page: PageSession;

    /// Open a fresh session and load `url` up to the "content loaded" state.
    /// On error no session is left behind.
    fn open(&self, url: &str) -> impl Future<Output = Result<Self::Page, BrowserError>> + Send;
}
