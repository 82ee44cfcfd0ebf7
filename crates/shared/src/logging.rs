//! Logging setup for the decklog tools.
//!
//! Console output goes to stderr so stdout carries only JSON results. File
//! output rotates daily under the configured log directory.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{Level, Subscriber};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Resolved logging settings for one binary
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Binary name, used as the log file prefix and filter target
    pub component: String,
    /// Directory for rotated log files
    pub log_dir: PathBuf,
    pub level: Level,
    pub console: bool,
    pub file: bool,
    /// Write file logs as JSON lines
    pub json_format: bool,
}

impl LogConfig {
    /// Settings from the `[logging]` section. `verbose` forces DEBUG.
    pub fn from_settings(
        component: &str,
        settings: &LoggingConfig,
        log_dir: PathBuf,
        verbose: bool,
    ) -> Self {
        let level = if verbose {
            Level::DEBUG
        } else {
            parse_level(&settings.default_level)
        };

        Self {
            component: component.to_string(),
            log_dir,
            level,
            console: settings.console,
            file: settings.file,
            json_format: settings.json_format,
        }
    }

    /// `RUST_LOG` when set, otherwise the component directives.
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(&self.component, self.level)))
    }
}

/// Parse a configured level name, falling back to INFO for unknown values
pub fn parse_level(name: &str) -> Level {
    name.trim().parse::<Level>().unwrap_or(Level::INFO)
}

/// Our crates at `level`; browser protocol and HTML parser chatter at warn.
fn default_directives(component: &str, level: Level) -> String {
    format!(
        "{}={level},shared={level},decklog_scraper={level},chromiumoxide=warn,tungstenite=warn,html5ever=warn",
        component.replace('-', "_"),
    )
}

fn console_layer<S>() -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .boxed()
}

fn file_layer<S>(config: &LogConfig) -> Result<BoxedLayer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    std::fs::create_dir_all(&config.log_dir).with_context(|| {
        format!("Failed to create log directory: {}", config.log_dir.display())
    })?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&config.component)
        .filename_suffix("log")
        .build(&config.log_dir)
        .context("Failed to create rolling log file")?;

    let layer = if config.json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(appender)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .with_writer(appender)
            .boxed()
    };

    Ok(layer)
}

/// Install the global subscriber. Fails if one is already set.
pub fn init(config: LogConfig) -> Result<()> {
    let mut layers = Vec::new();
    if config.console {
        layers.push(console_layer());
    }
    if config.file {
        layers.push(file_layer(&config)?);
    }

    tracing_subscriber::registry()
        .with(config.filter())
        .with(layers)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::info!(
        component = %config.component,
        log_dir = %config.log_dir.display(),
        level = %config.level,
        "Logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(level: &str) -> LoggingConfig {
        LoggingConfig {
            log_dir: "logs".to_string(),
            default_level: level.to_string(),
            console: true,
            file: false,
            json_format: true,
        }
    }

    #[test]
    fn test_from_settings() {
        let config =
            LogConfig::from_settings("decklog-scraper", &settings("warn"), "data/logs".into(), false);
        assert_eq!(config.component, "decklog-scraper");
        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.log_dir, PathBuf::from("data/logs"));
        assert!(config.console);
        assert!(!config.file);
        assert!(config.json_format);
    }

    #[test]
    fn test_verbose_forces_debug() {
        let config =
            LogConfig::from_settings("decklog-scraper", &settings("error"), "logs".into(), true);
        assert_eq!(config.level, Level::DEBUG);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level(" WARN "), Level::WARN);
        assert_eq!(parse_level("loud"), Level::INFO);
    }

    #[test]
    fn test_default_directives() {
        let directives = default_directives("decklog-scraper", Level::DEBUG);
        assert!(directives.starts_with("decklog_scraper=DEBUG"));
        assert!(directives.contains("chromiumoxide=warn"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn test_file_layer_creates_log_dir() -> Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let config = LogConfig {
            log_dir: temp_dir.path().join("nested").join("logs"),
            file: true,
            ..LogConfig::from_settings("decklog-scraper", &settings("info"), PathBuf::new(), false)
        };

        let _layer: BoxedLayer<tracing_subscriber::Registry> = file_layer(&config)?;
        assert!(config.log_dir.is_dir());

        Ok(())
    }
}
