//! Deck store keyed by deck code.
//!
//! Extracted deck lists are kept as JSON payloads so the stored shape is the
//! same one the scraper prints.

use crate::models::{DeckList, ExtractionStrategy, StoredDeck};
use crate::Database;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

/// Deck store manager
pub struct DeckStore {
    db: Database,
}

impl DeckStore {
    /// Create a new deck store with the given database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Save (or replace) the deck stored under `code`
    pub fn save(
        &mut self,
        code: &str,
        deck: &DeckList,
        strategy: Option<ExtractionStrategy>,
    ) -> Result<StoredDeck> {
        let saved_at = Utc::now();
        let payload = serde_json::to_string(deck).context("Failed to serialize deck")?;

        self.db
            .conn_mut()
            .execute(
                "INSERT INTO decks (code, payload, strategy_used, saved_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(code) DO UPDATE SET
                     payload = excluded.payload,
                     strategy_used = excluded.strategy_used,
                     saved_at = excluded.saved_at",
                params![code, payload, strategy.map(|s| s.to_string()), saved_at],
            )
            .with_context(|| format!("Failed to save deck {}", code))?;

        info!(
            code = code,
            printings = deck.distinct_printings(),
            cards = deck.total_cards(),
            "Deck saved"
        );

        Ok(StoredDeck {
            code: code.to_string(),
            deck: deck.clone(),
            strategy_used: strategy,
            saved_at,
        })
    }

    /// Load the deck stored under `code`, if any
    pub fn load(&self, code: &str) -> Result<Option<StoredDeck>> {
        let row: Option<(String, Option<String>, DateTime<Utc>)> = self
            .db
            .conn()
            .query_row(
                "SELECT payload, strategy_used, saved_at FROM decks WHERE code = ?1",
                params![code],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .with_context(|| format!("Failed to query deck {}", code))?;

        let Some((payload, strategy, saved_at)) = row else {
            debug!(code = code, "Deck not found");
            return Ok(None);
        };

        let deck: DeckList = serde_json::from_str(&payload)
            .with_context(|| format!("Failed to parse stored deck {}", code))?;
        let strategy_used = strategy
            .map(|s| s.parse::<ExtractionStrategy>())
            .transpose()?;

        Ok(Some(StoredDeck {
            code: code.to_string(),
            deck,
            strategy_used,
            saved_at,
        }))
    }

    /// List stored deck codes, most recently saved first
    pub fn list_codes(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .db
            .conn()
            .prepare("SELECT code FROM decks ORDER BY saved_at DESC, code ASC")?;
        let codes = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()
            .context("Failed to list deck codes")?;
        Ok(codes)
    }

    /// Delete the deck stored under `code`; returns whether anything was removed
    pub fn delete(&mut self, code: &str) -> Result<bool> {
        let removed = self
            .db
            .conn_mut()
            .execute("DELETE FROM decks WHERE code = ?1", params![code])
            .with_context(|| format!("Failed to delete deck {}", code))?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CardToken;
    use tempfile::TempDir;

    fn sample_deck() -> DeckList {
        DeckList {
            oshi: vec![CardToken::new("hSD01-001", "_OSR", 1)],
            deck: vec![
                CardToken::new("hBP02-084", "_02_U", 4),
                CardToken::new("hSD01-016", "_C", 2),
            ],
            energy: vec![CardToken::new("hY01-001", "_C", 20)],
        }
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let mut store = DeckStore::new(Database::open_in_memory()?);
        let deck = sample_deck();

        store.save("ABC123", &deck, Some(ExtractionStrategy::Heading))?;

        let stored = store.load("ABC123")?.expect("deck should exist");
        assert_eq!(stored.code, "ABC123");
        assert_eq!(stored.deck, deck);
        assert_eq!(stored.strategy_used, Some(ExtractionStrategy::Heading));

        Ok(())
    }

    #[test]
    fn test_load_missing_code() -> Result<()> {
        let store = DeckStore::new(Database::open_in_memory()?);
        assert!(store.load("NOPE")?.is_none());
        Ok(())
    }

    #[test]
    fn test_save_overwrites() -> Result<()> {
        let mut store = DeckStore::new(Database::open_in_memory()?);
        store.save("ABC123", &sample_deck(), Some(ExtractionStrategy::Heading))?;

        let replacement = DeckList {
            deck: vec![CardToken::new("hBP01-010", "_C", 3)],
            ..Default::default()
        };
        store.save("ABC123", &replacement, None)?;

        let stored = store.load("ABC123")?.expect("deck should exist");
        assert_eq!(stored.deck, replacement);
        assert_eq!(stored.strategy_used, None);
        assert_eq!(store.list_codes()?, vec!["ABC123".to_string()]);

        Ok(())
    }

    #[test]
    fn test_list_and_delete() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut store = DeckStore::new(Database::open(temp_dir.path().join("decks.db"))?);

        store.save("AAA", &sample_deck(), None)?;
        store.save("BBB", &sample_deck(), Some(ExtractionStrategy::Selector))?;

        let codes = store.list_codes()?;
        assert_eq!(codes.len(), 2);
        assert!(codes.contains(&"AAA".to_string()));

        assert!(store.delete("AAA")?);
        assert!(!store.delete("AAA")?);
        assert_eq!(store.list_codes()?, vec!["BBB".to_string()]);

        Ok(())
    }
}
