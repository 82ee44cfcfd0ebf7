use super::{ExtractionTier, PageSnapshot, SectionBuckets};
use crate::locator::Sighting;
use crate::token::{parse_card_filename, CardRef};
use once_cell::sync::Lazy;
use regex::Regex;
use shared::{DeckSection, ExtractionStrategy};
use std::borrow::Cow;

/// Card art URLs anywhere in the text, e.g. `.../cardlist/hBP02/hBP02-084_02_U.png`.
static CARD_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|[/"'=\s(,])([A-Za-z]+\d*-\d{3}(?:_[A-Za-z0-9_]+)?)\.(?i:png)"#).unwrap()
});

/// Escaped slashes and quotes as they appear in inline JSON state and
/// attribute values.
static ESCAPES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\\u002f|\\/|&#x2f;|&#47;|\\u0022|&quot;|&#34;|&#x22;").unwrap()
});

/// Undo the escapes that would otherwise hide a card name's leading boundary.
fn unescape(text: &str) -> Cow<'_, str> {
    ESCAPES.replace_all(text, |caps: &regex::Captures| {
        let escape = caps[0].to_ascii_lowercase();
        if escape.contains("2f") || escape.contains("47") || escape.ends_with('/') {
            "/"
        } else {
            "\""
        }
    })
}

/// Last resort: regex over the raw markup, no DOM assumptions at all.
///
/// The number of URL occurrences stands in for the copy count, and everything
/// lands in the main deck.
pub struct MarkupTier;

impl ExtractionTier for MarkupTier {
    fn strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::RegexFallback
    }

    fn extract(&self, page: &PageSnapshot) -> SectionBuckets {
        let text = unescape(page.markup());

        let mut occurrences: Vec<(CardRef, u32)> = Vec::new();
        for card in CARD_URL
            .captures_iter(&text)
            .filter_map(|caps| parse_card_filename(&caps[1]).ok())
        {
            match occurrences.iter_mut().find(|(seen, _)| *seen == card) {
                Some((_, n)) => *n += 1,
                None => occurrences.push((card, 1)),
            }
        }

        let mut buckets = SectionBuckets::default();
        buckets.extend(
            DeckSection::Main,
            occurrences.into_iter().map(|(card, n)| Sighting {
                card,
                counter: Some(n),
            }),
        );
        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::CardToken;

    #[test]
    fn test_counts_occurrences() {
        let page = PageSnapshot::parse(
            r#"<script>window.__deck = ["/cardlist/hBP02/hBP02-084_02_U.png",
               "/cardlist/hBP02/hBP02-084_02_U.png", "/cardlist/hSD01/hSD01-016.PNG?x=1"];</script>"#,
        );
        let deck = MarkupTier.extract(&page).into_deck_list();
        assert_eq!(deck.deck.len(), 2);
        assert_eq!(deck.deck[0].file_stem(), "hBP02-084_02_U");
        assert_eq!(deck.deck[0].count, 2);
        assert_eq!(deck.deck[1].file_stem(), "hSD01-016_C");
        assert_eq!(deck.deck[1].count, 1);
    }

    #[test]
    fn test_requires_name_boundary() {
        let page = PageSnapshot::parse("<p>xhBP02-084.png hBP02-0845.png</p>");
        assert!(MarkupTier.extract(&page).is_empty());
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\u002Fb\/c&#x2F;d&#47;e"), "a/b/c/d/e");
        assert_eq!(unescape("&quot;x&quot; &#34;y\\u0022"), "\"x\" \"y\"");
        assert!(matches!(unescape("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_escaped_urls_in_inline_state() {
        let page = PageSnapshot::parse(
            r#"<script>window.__NUXT__={deck:[{img:"https:\u002F\u002Fexample.com\u002Fcardlist\u002FhBP02\u002FhBP02-084_02_U.png",n:3}]}</script>
               <div data-cards="[&quot;hSD01-016_OSR.png&quot;,&quot;hBP02-084_02_U.png&quot;]"></div>"#,
        );
        let deck = MarkupTier.extract(&page).into_deck_list();
        assert_eq!(
            deck.deck,
            vec![
                CardToken::new("hBP02-084", "_02_U", 2),
                CardToken::new("hSD01-016", "_OSR", 1),
            ]
        );
    }
}
