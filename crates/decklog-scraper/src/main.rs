//! Decklog Scraper CLI application.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use decklog_scraper::{
    validate_code, ChromeNavigator, ContentLoader, DecklogScraper, ExtractionCascade,
    LoaderSettings, ScrapeError,
};
use serde::Serialize;
use shared::{Config, Database, DeckExtractionResult, DeckStore, LogConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a deck from decklog and print it as JSON
    Fetch {
        /// Deck code
        code: String,

        /// Store the result in the deck database
        #[arg(long)]
        save: bool,

        /// Include the extraction tier in the output
        #[arg(long)]
        with_strategy: bool,
    },

    /// Run the extraction cascade on a saved HTML page
    Extract {
        /// HTML file
        file: PathBuf,

        /// Include the extraction tier in the output
        #[arg(long)]
        with_strategy: bool,
    },

    /// Print a stored deck
    Load { code: String },

    /// List stored deck codes
    List,

    /// Delete a stored deck
    Delete { code: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    shared::logging::init(LogConfig::from_settings(
        "decklog-scraper",
        &config.logging,
        config.log_dir(),
        args.verbose,
    ))?;

    info!(config_file = %args.config.display(), "Decklog Scraper starting");

    match args.command {
        Command::Fetch {
            code,
            save,
            with_strategy,
        } => fetch(&config, &code, save, with_strategy).await,
        Command::Extract {
            file,
            with_strategy,
        } => extract(&file, with_strategy),
        Command::Load { code } => {
            let store = open_store(&config)?;
            match store.load(deck_key(&code)?)? {
                Some(stored) => print_json(&stored),
                None => {
                    let message = format!("deck {} not found", code);
                    print_json(&serde_json::json!({ "error": message }))
                }
            }
        }
        Command::List => {
            let store = open_store(&config)?;
            print_json(&store.list_codes()?)
        }
        Command::Delete { code } => {
            let mut store = open_store(&config)?;
            let deleted = store.delete(deck_key(&code)?)?;
            print_json(&serde_json::json!({ "code": code, "deleted": deleted }))
        }
    }
}

async fn fetch(config: &Config, code: &str, save: bool, with_strategy: bool) -> Result<()> {
    let code = deck_key(code)?;
    let navigator = ChromeNavigator::new(
        config.browser.clone(),
        Duration::from_millis(config.scraper.navigation_timeout_ms),
    );
    let loader = ContentLoader::new(LoaderSettings::from(&config.scraper));
    let scraper = DecklogScraper::new(navigator, loader, &config.scraper);

    let result = match scraper.scrape(code).await {
        Ok(result) => result,
        Err(e) => {
            if let ScrapeError::AllSourcesExhausted { attempts, .. } = &e {
                error!(
                    code = code,
                    attempts = attempts.len(),
                    "All decklog sources exhausted"
                );
                let attempts: Vec<String> = attempts.iter().map(|a| a.to_string()).collect();
                print_json(&serde_json::json!({ "error": e.to_string(), "attempts": attempts }))?;
            }
            return Err(e).with_context(|| format!("Failed to fetch deck {}", code));
        }
    };

    if save {
        let mut store = open_store(config)?;
        save_result(&mut store, code, &result)?;
    }

    print_result(result, with_strategy)
}

fn extract(file: &Path, with_strategy: bool) -> Result<()> {
    let markup = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    match ExtractionCascade::default().run(&markup).into_result() {
        Some(result) => print_result(result, with_strategy),
        None => {
            print_json(&serde_json::json!({ "error": "no cards found" }))?;
            anyhow::bail!("No cards found in {}", file.display())
        }
    }
}

/// Deck codes are stored in the same trimmed form the scraper fetches.
fn deck_key(code: &str) -> Result<&str> {
    validate_code(code).with_context(|| format!("Rejected deck code {:?}", code))
}

fn save_result(store: &mut DeckStore, code: &str, result: &DeckExtractionResult) -> Result<()> {
    store.save(deck_key(code)?, &result.cards, Some(result.strategy_used))?;
    Ok(())
}

fn open_store(config: &Config) -> Result<DeckStore> {
    let db_path = config.database_path();
    info!(db_path = %db_path.display(), "Opening database");
    let database = Database::open(&db_path).context("Failed to open database")?;
    Ok(DeckStore::new(database))
}

fn print_result(result: DeckExtractionResult, with_strategy: bool) -> Result<()> {
    if with_strategy {
        print_json(&result)
    } else {
        print_json(&result.into_deck_list())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{CardToken, DeckList, ExtractionStrategy};

    fn extracted() -> DeckExtractionResult {
        DeckExtractionResult {
            cards: DeckList {
                deck: vec![CardToken::new("hBP02-084", "_02_U", 4)],
                ..Default::default()
            },
            strategy_used: ExtractionStrategy::Selector,
        }
    }

    #[test]
    fn test_saved_under_trimmed_code() -> Result<()> {
        let mut store = DeckStore::new(Database::open_in_memory()?);
        save_result(&mut store, " ABC1 ", &extracted())?;

        let stored = store.load(deck_key("ABC1")?)?.expect("deck should exist");
        assert_eq!(stored.code, "ABC1");
        assert_eq!(stored.deck, extracted().cards);
        assert!(store.load(deck_key("  ABC1")?)?.is_some());
        assert_eq!(store.list_codes()?, vec!["ABC1".to_string()]);

        Ok(())
    }

    #[test]
    fn test_rejects_invalid_code() -> Result<()> {
        let mut store = DeckStore::new(Database::open_in_memory()?);
        assert!(save_result(&mut store, "a b", &extracted()).is_err());
        assert!(store.list_codes()?.is_empty());
        Ok(())
    }
}
