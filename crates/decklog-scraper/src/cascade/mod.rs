//! Tiered deck extraction over one rendered page.
//!
//! Tiers run in order against the same snapshot. The first tier that finds
//! any card wins; later tiers are not consulted and results are never mixed.

mod heading;
mod markup;
mod selector;

pub use heading::HeadingTier;
pub use markup::MarkupTier;
pub use selector::SelectorTier;

use crate::locator::Sighting;
use crate::section::SectionClassifier;
use crate::token::CardRef;
use scraper::Html;
use shared::{CardToken, DeckExtractionResult, DeckList, DeckSection, ExtractionStrategy};
use tracing::{debug, info};

/// Rendered markup plus its parsed document.
pub struct PageSnapshot {
    markup: String,
    document: Html,
}

impl PageSnapshot {
    pub fn parse(markup: impl Into<String>) -> Self {
        let markup = markup.into();
        let document = Html::parse_document(&markup);
        Self { markup, document }
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn document(&self) -> &Html {
        &self.document
    }
}

#[derive(Debug, Clone)]
struct Entry {
    card: CardRef,
    counter: Option<u32>,
}

impl Entry {
    fn count(&self) -> u32 {
        self.counter.unwrap_or(1)
    }
}

/// Cards collected by a tier, merged per printing within each section.
///
/// Repeated sightings of one printing keep the largest counter seen; a
/// printing shown without any counter counts 1.
#[derive(Debug, Clone, Default)]
pub struct SectionBuckets {
    oshi: Vec<Entry>,
    main: Vec<Entry>,
    energy: Vec<Entry>,
}

impl SectionBuckets {
    fn bucket_mut(&mut self, section: DeckSection) -> &mut Vec<Entry> {
        match section {
            DeckSection::Oshi => &mut self.oshi,
            DeckSection::Main => &mut self.main,
            DeckSection::Energy => &mut self.energy,
        }
    }

    fn bucket(&self, section: DeckSection) -> &[Entry] {
        match section {
            DeckSection::Oshi => &self.oshi,
            DeckSection::Main => &self.main,
            DeckSection::Energy => &self.energy,
        }
    }

    pub fn add(&mut self, section: DeckSection, sighting: Sighting) {
        let bucket = self.bucket_mut(section);
        match bucket.iter_mut().find(|e| e.card == sighting.card) {
            Some(entry) => entry.counter = entry.counter.max(sighting.counter),
            None => bucket.push(Entry {
                card: sighting.card,
                counter: sighting.counter,
            }),
        }
    }

    pub fn extend(&mut self, section: DeckSection, sightings: impl IntoIterator<Item = Sighting>) {
        for sighting in sightings {
            self.add(section, sighting);
        }
    }

    /// Distinct printings in one section
    pub fn len(&self, section: DeckSection) -> usize {
        self.bucket(section).len()
    }

    /// Distinct printings across all sections
    pub fn total(&self) -> usize {
        DeckSection::ALL.iter().map(|s| self.len(*s)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn into_deck_list(self) -> DeckList {
        let tokens = |entries: Vec<Entry>| -> Vec<CardToken> {
            entries
                .into_iter()
                .map(|e| {
                    let count = e.count();
                    CardToken::new(e.card.id, e.card.version, count)
                })
                .collect()
        };
        DeckList {
            oshi: tokens(self.oshi),
            deck: tokens(self.main),
            energy: tokens(self.energy),
        }
    }
}

/// One extraction strategy.
pub trait ExtractionTier: Send + Sync {
    fn strategy(&self) -> ExtractionStrategy;

    fn extract(&self, page: &PageSnapshot) -> SectionBuckets;
}

/// Terminal state of a cascade run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeOutcome {
    Success(DeckExtractionResult),
    Empty,
}

impl CascadeOutcome {
    pub fn into_result(self) -> Option<DeckExtractionResult> {
        match self {
            CascadeOutcome::Success(result) => Some(result),
            CascadeOutcome::Empty => None,
        }
    }
}

/// Ordered list of extraction tiers.
pub struct ExtractionCascade {
    tiers: Vec<Box<dyn ExtractionTier>>,
}

impl Default for ExtractionCascade {
    fn default() -> Self {
        Self::with_classifier(SectionClassifier::default())
    }
}

impl ExtractionCascade {
    pub fn new(tiers: Vec<Box<dyn ExtractionTier>>) -> Self {
        Self { tiers }
    }

    /// Heading, selector and raw-markup tiers, in that order.
    pub fn with_classifier(classifier: SectionClassifier) -> Self {
        Self::new(vec![
            Box::new(HeadingTier::new(classifier)),
            Box::new(SelectorTier),
            Box::new(MarkupTier),
        ])
    }

    pub fn strategies(&self) -> Vec<ExtractionStrategy> {
        self.tiers.iter().map(|t| t.strategy()).collect()
    }

    /// Parse `markup` and run the tiers against it.
    pub fn run(&self, markup: &str) -> CascadeOutcome {
        self.run_snapshot(&PageSnapshot::parse(markup))
    }

    pub fn run_snapshot(&self, page: &PageSnapshot) -> CascadeOutcome {
        for tier in &self.tiers {
            let strategy = tier.strategy();
            let buckets = tier.extract(page);

            if buckets.is_empty() {
                debug!(tier = %strategy, "Tier found no cards, falling through");
                continue;
            }

            info!(
                tier = %strategy,
                oshi = buckets.len(DeckSection::Oshi),
                deck = buckets.len(DeckSection::Main),
                energy = buckets.len(DeckSection::Energy),
                "Extraction tier succeeded"
            );

            return CascadeOutcome::Success(DeckExtractionResult {
                cards: buckets.into_deck_list(),
                strategy_used: strategy,
            });
        }

        debug!(tiers = self.tiers.len(), "All extraction tiers exhausted");
        CascadeOutcome::Empty
    }
}
