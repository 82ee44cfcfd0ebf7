//! Multilingual section heading classification.

use shared::DeckSection;

/// Quote characters ignored when comparing heading text.
const QUOTES: &[char] = &[
    '"', '\'', '`', '“', '”', '‘', '’', '「', '」', '『', '』', '＂', '＇', '«', '»',
];

/// Recognized heading variants per section.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    oshi: Vec<String>,
    main: Vec<String>,
    energy: Vec<String>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::new(
            &["推しホロメン", "推し", "oshi"],
            &["メインデッキ", "メイン", "main deck", "main"],
            &["エールデッキ", "エール", "“エール” deck", "yell", "energy", "cheer"],
        )
    }
}

impl KeywordTable {
    pub fn new(oshi: &[&str], main: &[&str], energy: &[&str]) -> Self {
        let prepare = |words: &[&str]| -> Vec<String> {
            words
                .iter()
                .map(|w| normalize(w))
                .filter(|w| !w.is_empty())
                .collect()
        };
        Self {
            oshi: prepare(oshi),
            main: prepare(main),
            energy: prepare(energy),
        }
    }

    pub fn variants(&self, section: DeckSection) -> &[String] {
        match section {
            DeckSection::Oshi => &self.oshi,
            DeckSection::Main => &self.main,
            DeckSection::Energy => &self.energy,
        }
    }
}

/// Canonical form for heading comparison: no whitespace, no quotes, lowercase.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !QUOTES.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Best heading found for each section.
#[derive(Debug, Clone)]
pub struct SectionMatches<T> {
    pub oshi: Option<T>,
    pub main: Option<T>,
    pub energy: Option<T>,
}

impl<T> Default for SectionMatches<T> {
    fn default() -> Self {
        Self {
            oshi: None,
            main: None,
            energy: None,
        }
    }
}

impl<T> SectionMatches<T> {
    pub fn get(&self, section: DeckSection) -> Option<&T> {
        match section {
            DeckSection::Oshi => self.oshi.as_ref(),
            DeckSection::Main => self.main.as_ref(),
            DeckSection::Energy => self.energy.as_ref(),
        }
    }

    fn slot(&mut self, section: DeckSection) -> &mut Option<T> {
        match section {
            DeckSection::Oshi => &mut self.oshi,
            DeckSection::Main => &mut self.main,
            DeckSection::Energy => &mut self.energy,
        }
    }

    pub fn found(&self) -> usize {
        DeckSection::ALL.iter().filter(|s| self.get(**s).is_some()).count()
    }
}

/// Maps heading text to deck sections.
#[derive(Debug, Clone, Default)]
pub struct SectionClassifier {
    keywords: KeywordTable,
}

impl SectionClassifier {
    pub fn new(keywords: KeywordTable) -> Self {
        Self { keywords }
    }

    /// Whether `text` names `section`.
    pub fn matches(&self, text: &str, section: DeckSection) -> bool {
        let text = normalize(text);
        !text.is_empty()
            && self
                .keywords
                .variants(section)
                .iter()
                .any(|v| text.contains(v.as_str()))
    }

    /// First heading in document order containing a variant wins, per section.
    /// Sections are matched independently.
    pub fn classify<T, S, I>(&self, headings: I) -> SectionMatches<T>
    where
        T: Clone,
        S: AsRef<str>,
        I: IntoIterator<Item = (T, S)>,
    {
        let mut matches = SectionMatches::default();
        for (heading, text) in headings {
            for section in DeckSection::ALL {
                let slot = matches.slot(section);
                if slot.is_none() && self.matches(text.as_ref(), section) {
                    *slot = Some(heading.clone());
                }
            }
            if matches.found() == DeckSection::ALL.len() {
                break;
            }
        }
        matches
    }
}
