//! Shared library for the decklog import tools.
//!
//! This crate provides common functionality used by the scraper crate and
//! its command line front end:
//! - Configuration management
//! - Deck data models
//! - SQLite-backed deck store
//! - Logging infrastructure

pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use logging::LogConfig;
pub use models::*;
pub use store::DeckStore;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
