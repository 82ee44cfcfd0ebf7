//! Card image filename parsing.
//!
//! Card art is served as `{id}{version}.png`, e.g. `hBP02-084_02_U.png`.
//! The id is a set code plus a three digit number; the version suffix tells
//! printings apart and is `_C` when the file carries none.

use once_cell::sync::Lazy;
use regex::Regex;
use shared::DEFAULT_VERSION;
use thiserror::Error;

static CARD_STEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<id>[A-Za-z]+\d*-\d{3})(?P<version>_[A-Za-z0-9_]+)?$").unwrap()
});

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("not a card image name: {0:?}")]
    NoMatch(String),
}

/// Printing identity recovered from an image name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardRef {
    pub id: String,
    pub version: String,
}

impl CardRef {
    /// `{id}{version}`; re-parsing it yields the same `CardRef`.
    pub fn file_stem(&self) -> String {
        format!("{}{}", self.id, self.version)
    }
}

/// Reduce a URL or filename to its bare stem: last path segment, no
/// query/fragment, no extension.
pub fn file_stem(name: &str) -> &str {
    let name = name.trim();
    let name = name.split(['?', '#']).next().unwrap_or(name);
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            stem
        }
        _ => name,
    }
}

/// Parse a card image name (bare name, path or full URL) into id and version.
pub fn parse_card_filename(name: &str) -> Result<CardRef, TokenError> {
    let stem = file_stem(name);
    let caps = CARD_STEM
        .captures(stem)
        .ok_or_else(|| TokenError::NoMatch(name.to_string()))?;

    let id = caps["id"].to_string();
    let version = caps
        .name("version")
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_VERSION.to_string());

    Ok(CardRef { id, version })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(name: &str) -> (String, String) {
        let card = parse_card_filename(name).unwrap();
        (card.id, card.version)
    }

    #[test]
    fn test_versioned_filenames() {
        assert_eq!(
            parsed("hBP02-084_02_U.png"),
            ("hBP02-084".to_string(), "_02_U".to_string())
        );
        assert_eq!(
            parsed("hSD01-016_OSR.png"),
            ("hSD01-016".to_string(), "_OSR".to_string())
        );
    }

    #[test]
    fn test_missing_version_defaults() {
        assert_eq!(
            parsed("hBP02-084.png"),
            ("hBP02-084".to_string(), "_C".to_string())
        );
        assert_eq!(parsed("hY01-001").1, "_C");
    }

    #[test]
    fn test_urls_and_queries() {
        assert_eq!(
            parsed("https://hololive-official-cardgame.com/wp-content/images/cardlist/hBP02/hBP02-084_02_U.png?v=3"),
            ("hBP02-084".to_string(), "_02_U".to_string())
        );
        assert_eq!(parsed("/cardlist/hSD01/hSD01-016_OSR.webp#top").1, "_OSR");
    }

    #[test]
    fn test_rejects_non_cards() {
        for name in [
            "logo.png",
            "",
            "hBP02-84.png",
            "hBP02-0845.png",
            "02-084.png",
            "hBP02-084-extra.png",
            "hBP02-084_.png",
        ] {
            assert!(
                matches!(parse_card_filename(name), Err(TokenError::NoMatch(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_round_trip() {
        for stem in ["hBP02-084_02_U", "hSD01-016_OSR", "hBP01-001_C", "hYS01-003_P"] {
            let card = parse_card_filename(&format!("{stem}.png")).unwrap();
            assert_eq!(card.file_stem(), stem);
            assert_eq!(parse_card_filename(&card.file_stem()).unwrap(), card);
        }

        // Suffix-less names normalize to the default printing
        let card = parse_card_filename("hBP02-084.png").unwrap();
        assert_eq!(card.file_stem(), "hBP02-084_C");
    }

    #[test]
    fn test_deterministic() {
        let a = parse_card_filename("hBP02-084_02_U.png");
        let b = parse_card_filename("hBP02-084_02_U.png");
        assert_eq!(a, b);
    }
}
