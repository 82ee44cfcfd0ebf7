//! Configuration management for the decklog import tools.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory settings
    pub data: DataConfig,

    /// Database settings
    pub database: DatabaseConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Scrape pipeline settings
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Browser session settings
    #[serde(default)]
    pub browser: BrowserConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file path (relative to data directory or absolute)
    pub path: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// Scrape pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Candidate page URLs in priority order; `{code}` is replaced by the deck code
    pub mirrors: Vec<String>,

    /// Upper bound for reaching the "content loaded" state
    pub navigation_timeout_ms: u64,

    /// Upper bound for reading the rendered markup
    pub snapshot_timeout_ms: u64,

    /// Pause after clicking a consent button
    pub consent_settle_ms: u64,

    /// Pixels scrolled per step
    pub scroll_step_px: u32,

    /// Pause between scroll steps
    pub scroll_interval_ms: u64,

    /// Hard cap on scroll steps
    pub scroll_max_iterations: u32,

    /// Pause after reaching the bottom of the page
    pub post_scroll_settle_ms: u64,

    /// Upper bound for the network idle wait
    pub idle_timeout_ms: u64,

    /// Quiet period that counts as network idle
    pub idle_window_ms: u64,

    /// Button texts accepted as "agree" on consent overlays
    pub consent_phrases: Vec<String>,
}

/// Browser session and fingerprint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a visible window
    pub headless: bool,

    /// Explicit Chrome/Chromium binary (auto-detected when unset)
    pub executable: Option<String>,

    /// User-Agent presented to the site
    pub user_agent: String,

    /// Accept-Language request header
    pub accept_language: String,

    /// Sec-CH-UA-Platform request header
    pub platform: String,

    /// Value reported by navigator.languages
    pub languages: Vec<String>,

    /// Length reported by navigator.plugins
    pub plugin_count: u32,

    /// WebGL UNMASKED_VENDOR_WEBGL value
    pub webgl_vendor: String,

    /// WebGL UNMASKED_RENDERER_WEBGL value
    pub webgl_renderer: String,

    /// Extra command line flags for the browser process
    pub extra_args: Vec<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            mirrors: vec![
                "https://decklog-en.bushiroad.com/ja/view/{code}".to_string(),
                "https://decklog.bushiroad.com/view/{code}".to_string(),
            ],
            navigation_timeout_ms: 30_000,
            snapshot_timeout_ms: 10_000,
            consent_settle_ms: 800,
            scroll_step_px: 600,
            scroll_interval_ms: 250,
            scroll_max_iterations: 60,
            post_scroll_settle_ms: 1_000,
            idle_timeout_ms: 10_000,
            idle_window_ms: 800,
            consent_phrases: ["同意", "同意する", "AGREE", "Agree", "OK"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: "ja,en;q=0.9".to_string(),
            platform: "Windows".to_string(),
            languages: vec!["ja".to_string(), "en-US".to_string()],
            plugin_count: 3,
            webgl_vendor: "Google Inc. (Intel)".to_string(),
            webgl_renderer: "ANGLE (Intel, Intel(R) UHD Graphics 620 Direct3D11 vs_5_0 ps_5_0)"
                .to_string(),
            extra_args: [
                "--no-sandbox",
                "--disable-setuid-sandbox",
                "--disable-gpu",
                "--disable-dev-shm-usage",
                "--disable-features=site-per-process",
                "--no-zygote",
                "--single-process",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                root_dir: "data".to_string(),
            },
            database: DatabaseConfig {
                path: "decks.db".to_string(),
            },
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: true,
                json_format: false,
            },
            scraper: ScraperConfig::default(),
            browser: BrowserConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Get the absolute path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Get the absolute path for the database file
    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.database.path)
    }

    /// Get the absolute path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        self.resolve(&self.logging.log_dir)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data.root_dir, "data");
        assert_eq!(config.database.path, "decks.db");
        assert_eq!(config.scraper.mirrors.len(), 2);
        assert!(config.scraper.mirrors[0].contains("decklog-en"));
        assert_eq!(config.scraper.navigation_timeout_ms, 30_000);
        assert_eq!(config.browser.languages, vec!["ja", "en-US"]);
    }

    #[test]
    fn test_save_and_load_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");

        let original_config = Config::default();
        original_config.save(&config_path)?;

        assert!(config_path.exists());

        let loaded_config = Config::from_file(&config_path)?;
        assert_eq!(loaded_config.data.root_dir, original_config.data.root_dir);
        assert_eq!(loaded_config.scraper.mirrors, original_config.scraper.mirrors);
        assert_eq!(
            loaded_config.browser.user_agent,
            original_config.browser.user_agent
        );

        Ok(())
    }

    #[test]
    fn test_partial_config_fills_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[data]
root_dir = "var"

[database]
path = "/tmp/decks.db"

[logging]
log_dir = "logs"
default_level = "debug"
console = true
file = false
json_format = false

[scraper]
mirrors = ["https://mirror.example/{code}"]
scroll_step_px = 900
"#,
        )?;

        let config = Config::from_file(&config_path)?;
        assert_eq!(config.scraper.mirrors, vec!["https://mirror.example/{code}"]);
        assert_eq!(config.scraper.scroll_step_px, 900);
        assert_eq!(config.scraper.idle_window_ms, 800);
        assert!(config.browser.headless);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/decks.db"));

        Ok(())
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        // Should return default config without error
        assert_eq!(config.data.root_dir, "data");
    }

    #[test]
    fn test_path_resolution() {
        let config = Config::default();

        let db_path = config.database_path();
        assert!(db_path.ends_with("data/decks.db"));

        let log_dir = config.log_dir();
        assert!(log_dir.ends_with("data/logs"));
    }
}
