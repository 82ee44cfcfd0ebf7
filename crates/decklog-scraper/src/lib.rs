//! Decklog scraper library for extracting deck lists from decklog pages.
//!
//! A deck page is loaded in an isolated browser session, its lazy content is
//! revealed, and the rendered markup goes through a three-tier extraction
//! cascade. Mirrors are tried in order until one yields cards.

pub mod browser;
pub mod cascade;
pub mod error;
pub mod loader;
pub mod locator;
pub mod orchestrator;
pub mod section;
pub mod token;

pub use browser::{ChromeNavigator, ChromeSession, Navigator, PageSession, StealthProfile};
pub use cascade::{CascadeOutcome, ExtractionCascade, ExtractionTier, PageSnapshot};
pub use error::{AttemptFailure, BrowserError, FailedAttempt, ScrapeError};
pub use loader::{ContentLoader, LoadReport, LoaderSettings};
pub use orchestrator::{validate_code, DecklogScraper};
pub use section::{KeywordTable, SectionClassifier};
pub use token::{parse_card_filename, CardRef, TokenError};
