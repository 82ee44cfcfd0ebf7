//! DOM traversal over a parsed page snapshot.
//!
//! Everything here works on `scraper::Html`, so it runs the same against a
//! live page dump and against fixture files.

use crate::section::{SectionClassifier, SectionMatches};
use crate::token::{parse_card_filename, CardRef, TokenError};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Structural signatures the site uses to render card art.
pub const CARD_SIGNATURES: &str = ".card-view-item, \
    .decklist img[title], \
    .decklist .card > img, \
    img[data-src*='/cardlist/'], \
    img[src*='/cardlist/']";

/// Elements treated as section headings.
pub const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, [role='heading'], .deck-title, .section-title";

/// Copy counters rendered next to a card.
pub const COUNTER_SELECTOR: &str = ".card-controller-inner .num, .num, .count, .card__num";

static CARD_ITEMS: Lazy<Selector> = Lazy::new(|| Selector::parse(CARD_SIGNATURES).unwrap());
static HEADINGS: Lazy<Selector> = Lazy::new(|| Selector::parse(HEADING_SELECTOR).unwrap());
static COUNTERS: Lazy<Selector> = Lazy::new(|| Selector::parse(COUNTER_SELECTOR).unwrap());
static IMAGES: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

/// Attributes that may carry the image URL, lazy-loading ones first.
const SOURCE_ATTRS: &[&str] = &["data-src", "data-original", "data-lazy-src", "src"];

/// One card image found on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sighting {
    pub card: CardRef,
    /// Copy count read from a nearby counter element, if one was found
    pub counter: Option<u32>,
}

/// Where to look for a section's cards relative to its heading, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    NextSibling,
    Parent,
    ParentNextSibling,
}

impl Neighborhood {
    pub const ORDER: [Neighborhood; 3] = [
        Neighborhood::NextSibling,
        Neighborhood::Parent,
        Neighborhood::ParentNextSibling,
    ];

    pub fn resolve<'a>(self, heading: ElementRef<'a>) -> Option<ElementRef<'a>> {
        match self {
            Neighborhood::NextSibling => next_element(heading),
            Neighborhood::Parent => parent_element(heading),
            Neighborhood::ParentNextSibling => parent_element(heading).and_then(next_element),
        }
    }
}

fn next_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

fn parent_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.parent().and_then(ElementRef::wrap)
}

fn has_class(el: &ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

/// URL of the image an element renders.
pub fn image_source<'a>(img: &ElementRef<'a>) -> Option<&'a str> {
    SOURCE_ATTRS
        .iter()
        .filter_map(|attr| img.value().attr(attr))
        .map(str::trim)
        .find(|src| !src.is_empty())
}

/// The image element for a card item: the item itself or its first `<img>`.
pub fn card_image<'a>(item: ElementRef<'a>) -> Option<ElementRef<'a>> {
    if item.value().name() == "img" {
        Some(item)
    } else {
        item.select(&IMAGES).next()
    }
}

/// First run of digits in `text` as a positive count.
fn parse_counter(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok().filter(|n| *n > 0)
}

/// Copy count shown in the nearest card wrapper.
///
/// The wrapper is the closest `.card-container`, else the closest `.card`,
/// else the item's parent.
pub fn copy_count(item: ElementRef<'_>) -> Option<u32> {
    let closest = |class: &str| {
        std::iter::once(item)
            .chain(item.ancestors().filter_map(ElementRef::wrap))
            .find(|el| has_class(el, class))
    };

    let wrapper = closest("card-container")
        .or_else(|| closest("card"))
        .or_else(|| parent_element(item))?;

    wrapper
        .select(&COUNTERS)
        .find_map(|el| parse_counter(&el.text().collect::<String>()))
}

/// Read the card an item element shows. Images that are not card art are
/// skipped (logged at debug).
pub fn read_card(item: ElementRef<'_>) -> Option<Sighting> {
    let img = card_image(item)?;
    let src = image_source(&img)?;

    match parse_card_filename(src) {
        Ok(card) => Some(Sighting {
            card,
            counter: copy_count(item),
        }),
        Err(TokenError::NoMatch(name)) => {
            debug!(src = %name, "Skipping non-card image");
            None
        }
    }
}

/// Read cards from item elements, visiting each image element once even when
/// several signatures match it.
pub fn collect_cards<'a, I>(items: I) -> Vec<Sighting>
where
    I: IntoIterator<Item = ElementRef<'a>>,
{
    let mut seen = Vec::new();
    let mut cards = Vec::new();

    for item in items {
        let Some(img) = card_image(item) else {
            continue;
        };
        let node = (*img).id();
        if seen.contains(&node) {
            continue;
        }
        seen.push(node);

        if let Some(sighting) = read_card(item) {
            cards.push(sighting);
        }
    }

    cards
}

/// Every element on the page matching a card signature, in document order.
pub fn card_items(doc: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    doc.select(&CARD_ITEMS)
}

/// Heading-like elements with their text, in document order.
pub fn headings(doc: &Html) -> impl Iterator<Item = (ElementRef<'_>, String)> {
    doc.select(&HEADINGS)
        .map(|el| (el, el.text().collect::<String>()))
}

/// Cards shown under a located section heading.
#[derive(Debug, Clone)]
pub struct SectionHit {
    pub neighborhood: Neighborhood,
    pub cards: Vec<Sighting>,
}

/// Finds section headings and the cards listed beneath them.
pub struct SectionLocator<'c> {
    classifier: &'c SectionClassifier,
}

impl<'c> SectionLocator<'c> {
    pub fn new(classifier: &'c SectionClassifier) -> Self {
        Self { classifier }
    }

    /// Best heading per section.
    pub fn locate<'a>(&self, doc: &'a Html) -> SectionMatches<ElementRef<'a>> {
        self.classifier.classify(headings(doc))
    }

    /// Containers around `heading` that may hold its cards. Lazy, at most
    /// three elements.
    pub fn candidates<'a>(
        heading: ElementRef<'a>,
    ) -> impl Iterator<Item = (Neighborhood, ElementRef<'a>)> + 'a {
        Neighborhood::ORDER
            .into_iter()
            .filter_map(move |step| step.resolve(heading).map(|el| (step, el)))
    }

    /// Cards in the first neighborhood of `heading` that has any.
    pub fn section_cards(heading: ElementRef<'_>) -> Option<SectionHit> {
        Self::candidates(heading).find_map(|(neighborhood, container)| {
            let items = std::iter::once(container)
                .filter(|el| el.value().name() == "img")
                .chain(container.select(&IMAGES));
            let cards = collect_cards(items);
            (!cards.is_empty()).then_some(SectionHit {
                neighborhood,
                cards,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        let selector = Selector::parse(css).unwrap();
        doc.select(&selector).next().unwrap()
    }

    #[test]
    fn test_parse_counter() {
        assert_eq!(parse_counter("3"), Some(3));
        assert_eq!(parse_counter(" ×4 "), Some(4));
        assert_eq!(parse_counter("12枚"), Some(12));
        assert_eq!(parse_counter("0"), None);
        assert_eq!(parse_counter("-"), None);
    }

    #[test]
    fn test_image_source_prefers_lazy_attribute() {
        let doc = Html::parse_fragment(
            r#"<img src="placeholder.gif" data-src="/cardlist/hBP02/hBP02-084_02_U.png">"#,
        );
        let img = first(&doc, "img");
        assert_eq!(image_source(&img), Some("/cardlist/hBP02/hBP02-084_02_U.png"));
    }

    #[test]
    fn test_copy_count_from_card_container() {
        let doc = Html::parse_fragment(
            r#"<div class="card-container">
                 <div class="card-view-item"><img src="/cardlist/hBP01/hBP01-010.png"></div>
                 <div class="card-controller-inner"><span class="num">3</span></div>
               </div>"#,
        );
        let item = first(&doc, ".card-view-item");
        assert_eq!(copy_count(item), Some(3));

        let sighting = read_card(item).unwrap();
        assert_eq!(sighting.card.id, "hBP01-010");
        assert_eq!(sighting.card.version, "_C");
        assert_eq!(sighting.counter, Some(3));
    }

    #[test]
    fn test_copy_count_missing() {
        let doc = Html::parse_fragment(r#"<div><img src="/cardlist/hBP01/hBP01-010.png"></div>"#);
        assert_eq!(copy_count(first(&doc, "img")), None);
    }

    #[test]
    fn test_collect_cards_visits_image_once() {
        let doc = Html::parse_fragment(
            r#"<div class="decklist">
                 <div class="card-view-item"><img title="a" src="/cardlist/hSD01/hSD01-016_OSR.png"></div>
                 <img src="/images/logo.png">
               </div>"#,
        );
        let items: Vec<_> = card_items(&doc).collect();
        // The wrapper div and the titled image both match a signature
        assert_eq!(items.len(), 2);

        let cards = collect_cards(items);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].card.file_stem(), "hSD01-016_OSR");
    }

    #[test]
    fn test_neighborhood_order() {
        let doc = Html::parse_fragment(
            r#"<div id="wrap"><div id="head"><h3 id="h">Main deck</h3><span id="sib">50</span></div><div id="next"></div></div>"#,
        );
        let heading = first(&doc, "#h");
        let steps: Vec<_> = SectionLocator::candidates(heading)
            .map(|(step, el)| (step, el.value().id().unwrap_or_default().to_string()))
            .collect();
        assert_eq!(
            steps,
            vec![
                (Neighborhood::NextSibling, "sib".to_string()),
                (Neighborhood::Parent, "head".to_string()),
                (Neighborhood::ParentNextSibling, "next".to_string()),
            ]
        );
    }

    #[test]
    fn test_section_cards_skips_empty_neighbors() {
        let doc = Html::parse_fragment(
            r#"<div class="head"><h3>メインデッキ</h3><span>50枚</span></div>
               <ul class="list">
                 <li class="card"><img src="/cardlist/hBP02/hBP02-084_02_U.png"><span class="num">4</span></li>
               </ul>"#,
        );
        let hit = SectionLocator::section_cards(first(&doc, "h3")).unwrap();
        assert_eq!(hit.neighborhood, Neighborhood::ParentNextSibling);
        assert_eq!(hit.cards.len(), 1);
        assert_eq!(hit.cards[0].counter, Some(4));
    }
}
