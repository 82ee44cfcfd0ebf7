//! Data models for the project.
//!
//! This module defines the deck structures produced by the extraction
//! pipeline and persisted by the deck store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version suffix assumed for cards whose image name carries none.
pub const DEFAULT_VERSION: &str = "_C";

/// One printing of a card together with its copy count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardToken {
    /// Set and number, e.g. `hBP02-084`
    pub id: String,
    /// Underscore-prefixed printing suffix, e.g. `_02_U`
    pub version: String,
    /// Copies in the section (always at least 1)
    pub count: u32,
}

impl CardToken {
    pub fn new(id: impl Into<String>, version: impl Into<String>, count: u32) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            count: count.max(1),
        }
    }

    /// Printing identity within a section.
    pub fn key(&self) -> (&str, &str) {
        (&self.id, &self.version)
    }

    /// Normalized filename core, `{id}{version}`.
    pub fn file_stem(&self) -> String {
        format!("{}{}", self.id, self.version)
    }

    /// Card art filename used by the image exporter.
    pub fn image_filename(&self) -> String {
        format!("{}.png", self.file_stem())
    }
}

/// Logical section of a deck list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeckSection {
    #[serde(rename = "oshi")]
    Oshi,
    #[serde(rename = "deck")]
    Main,
    #[serde(rename = "energy")]
    Energy,
}

impl DeckSection {
    pub const ALL: [DeckSection; 3] = [DeckSection::Oshi, DeckSection::Main, DeckSection::Energy];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeckSection::Oshi => "oshi",
            DeckSection::Main => "deck",
            DeckSection::Energy => "energy",
        }
    }
}

impl std::fmt::Display for DeckSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which extraction tier produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtractionStrategy {
    Heading,
    Selector,
    RegexFallback,
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionStrategy::Heading => write!(f, "heading"),
            ExtractionStrategy::Selector => write!(f, "selector"),
            ExtractionStrategy::RegexFallback => write!(f, "regexFallback"),
        }
    }
}

impl std::str::FromStr for ExtractionStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heading" => Ok(ExtractionStrategy::Heading),
            "selector" => Ok(ExtractionStrategy::Selector),
            "regexFallback" => Ok(ExtractionStrategy::RegexFallback),
            _ => Err(anyhow::anyhow!("Invalid extraction strategy: {}", s)),
        }
    }
}

/// Deck list as handed to callers: three sections, no diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckList {
    pub oshi: Vec<CardToken>,
    pub deck: Vec<CardToken>,
    pub energy: Vec<CardToken>,
}

impl DeckList {
    pub fn section(&self, section: DeckSection) -> &[CardToken] {
        match section {
            DeckSection::Oshi => &self.oshi,
            DeckSection::Main => &self.deck,
            DeckSection::Energy => &self.energy,
        }
    }

    /// Number of distinct printings across all sections
    pub fn distinct_printings(&self) -> usize {
        self.oshi.len() + self.deck.len() + self.energy.len()
    }

    /// Sum of copy counts across all sections
    pub fn total_cards(&self) -> u32 {
        DeckSection::ALL
            .iter()
            .flat_map(|s| self.section(*s))
            .map(|c| c.count)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.distinct_printings() == 0
    }
}

/// Output of one successful extraction, tagged with the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckExtractionResult {
    #[serde(flatten)]
    pub cards: DeckList,
    pub strategy_used: ExtractionStrategy,
}

impl DeckExtractionResult {
    pub fn into_deck_list(self) -> DeckList {
        self.cards
    }
}

/// Deck list persisted under its deck code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDeck {
    pub code: String,
    pub deck: DeckList,
    pub strategy_used: Option<ExtractionStrategy>,
    pub saved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_token_filenames() {
        let token = CardToken::new("hBP02-084", "_02_U", 2);
        assert_eq!(token.file_stem(), "hBP02-084_02_U");
        assert_eq!(token.image_filename(), "hBP02-084_02_U.png");
        assert_eq!(token.key(), ("hBP02-084", "_02_U"));
    }

    #[test]
    fn test_card_token_count_floor() {
        let token = CardToken::new("hSD01-001", DEFAULT_VERSION, 0);
        assert_eq!(token.count, 1);
    }

    #[test]
    fn test_section_names() {
        assert_eq!(DeckSection::Main.to_string(), "deck");
        assert_eq!(
            serde_json::to_string(&DeckSection::Oshi).unwrap(),
            "\"oshi\""
        );
    }

    #[test]
    fn test_strategy_serialization() {
        let json = serde_json::to_string(&ExtractionStrategy::RegexFallback).unwrap();
        assert_eq!(json, "\"regexFallback\"");
        let parsed: ExtractionStrategy = "selector".parse().unwrap();
        assert_eq!(parsed, ExtractionStrategy::Selector);
        assert!("bogus".parse::<ExtractionStrategy>().is_err());
    }

    #[test]
    fn test_extraction_result_shape() {
        let result = DeckExtractionResult {
            cards: DeckList {
                oshi: vec![CardToken::new("hSD01-001", "_OSR", 1)],
                deck: vec![CardToken::new("hBP02-084", "_02_U", 4)],
                energy: vec![],
            },
            strategy_used: ExtractionStrategy::Heading,
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["strategyUsed"], "heading");
        assert_eq!(value["deck"][0]["count"], 4);
        assert!(value["energy"].as_array().unwrap().is_empty());

        assert_eq!(result.cards.total_cards(), 5);
        assert_eq!(result.cards.distinct_printings(), 2);
    }
}
