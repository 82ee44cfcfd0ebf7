use super::{ExtractionTier, PageSnapshot, SectionBuckets};
use crate::locator::SectionLocator;
use crate::section::SectionClassifier;
use shared::{DeckSection, ExtractionStrategy};
use tracing::debug;

/// Attributes cards to sections by the heading printed above them.
pub struct HeadingTier {
    classifier: SectionClassifier,
}

impl HeadingTier {
    pub fn new(classifier: SectionClassifier) -> Self {
        Self { classifier }
    }
}

impl ExtractionTier for HeadingTier {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::Heading
    }

    fn extract(&self, page: &PageSnapshot) -> SectionBuckets {
        let mut buckets = SectionBuckets::default();
        let headings = SectionLocator::new(&self.classifier).locate(page.document());

        for section in DeckSection::ALL {
            let Some(heading) = headings.get(section) else {
                debug!(section = %section, "No heading found");
                continue;
            };

            match SectionLocator::section_cards(*heading) {
                Some(hit) => {
                    debug!(
                        section = %section,
                        neighborhood = ?hit.neighborhood,
                        cards = hit.cards.len(),
                        "Section cards located"
                    );
                    buckets.extend(section, hit.cards);
                }
                None => debug!(section = %section, "Heading has no cards nearby"),
            }
        }

        buckets
    }
}
