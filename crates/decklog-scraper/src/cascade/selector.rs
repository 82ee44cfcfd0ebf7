use super::{ExtractionTier, PageSnapshot, SectionBuckets};
use crate::locator::{card_items, collect_cards};
use shared::{DeckSection, ExtractionStrategy};

/// Scans the whole page for card-art signatures.
///
/// Section membership is unknown here, so everything lands in the main deck.
pub struct SelectorTier;

impl ExtractionTier for SelectorTier {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::Selector
    }

    fn extract(&self, page: &PageSnapshot) -> SectionBuckets {
        let mut buckets = SectionBuckets::default();
        buckets.extend(DeckSection::Main, collect_cards(card_items(page.document())));
        buckets
    }
}
