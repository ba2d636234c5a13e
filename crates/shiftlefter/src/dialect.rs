//! Per-language keyword prefix tables.
//!
//! A dialect is an ordered list of `(prefix, canonical_keyword)` pairs,
//! sorted by prefix length descending so the longest match always wins
//! (e.g. `"Scenario Outline:"` before `"Scenario:"`).

/// A canonical keyword, independent of source language spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Keyword {
    /// `Feature:`
    Feature,
    /// `Background:`
    Background,
    /// `Scenario:`
    Scenario,
    /// `Scenario Outline:`
    ScenarioOutline,
    /// `Examples:`
    Examples,
    /// `Rule:`
    Rule,
    /// `Given`
    Given,
    /// `When`
    When,
    /// `Then`
    Then,
    /// `And`
    And,
    /// `But`
    But,
    /// `*`
    Star,
}

impl Keyword {
    /// `true` for keywords that introduce a block (require a trailing `:`).
    #[must_use]
    pub const fn is_block(self) -> bool {
        matches!(
            self,
            Self::Feature
                | Self::Background
                | Self::Scenario
                | Self::ScenarioOutline
                | Self::Examples
                | Self::Rule
        )
    }

    /// `true` for step keywords (`Given`/`When`/`Then`/`And`/`But`/`*`).
    #[must_use]
    pub const fn is_step(self) -> bool {
        !self.is_block()
    }

    /// Canonical English rendering, consulted by the canonical printer for
    /// consistent keyword casing regardless of the spelling in source.
    #[must_use]
    pub const fn canonical_text(self) -> &'static str {
        match self {
            Self::Feature => "Feature",
            Self::Background => "Background",
            Self::Scenario => "Scenario",
            Self::ScenarioOutline => "Scenario Outline",
            Self::Examples => "Examples",
            Self::Rule => "Rule",
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
            Self::And => "And",
            Self::But => "But",
            Self::Star => "*",
        }
    }
}

/// A single dialect entry: the literal prefix text and the keyword it maps
/// to.
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    /// Literal prefix as it appears in source (e.g. `"Scenario Outline"`).
    pub prefix: &'static str,
    /// Canonical keyword the prefix resolves to.
    pub keyword: Keyword,
}

/// An ordered, longest-prefix-first table of dialect entries.
#[derive(Debug, Clone)]
pub struct DialectTable {
    entries: Vec<Entry>,
}

/// The built-in English dialect.
const EN: &[Entry] = &[
    Entry { prefix: "Scenario Outline", keyword: Keyword::ScenarioOutline },
    Entry { prefix: "Scenario Template", keyword: Keyword::ScenarioOutline },
    Entry { prefix: "Background", keyword: Keyword::Background },
    Entry { prefix: "Scenario", keyword: Keyword::Scenario },
    Entry { prefix: "Example", keyword: Keyword::Scenario },
    Entry { prefix: "Examples", keyword: Keyword::Examples },
    Entry { prefix: "Scenarios", keyword: Keyword::Examples },
    Entry { prefix: "Feature", keyword: Keyword::Feature },
    Entry { prefix: "Rule", keyword: Keyword::Rule },
    Entry { prefix: "Given", keyword: Keyword::Given },
    Entry { prefix: "When", keyword: Keyword::When },
    Entry { prefix: "Then", keyword: Keyword::Then },
    Entry { prefix: "And", keyword: Keyword::And },
    Entry { prefix: "But", keyword: Keyword::But },
    Entry { prefix: "*", keyword: Keyword::Star },
];

impl DialectTable {
    /// Build a table from an explicit set of entries, sorting by prefix
    /// length descending so longest-match lookups are correct regardless of
    /// input order.
    #[must_use]
    pub fn new(mut entries: Vec<Entry>) -> Self {
        entries.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { entries }
    }

    /// Look up a dialect by language code. Only `"en"` is built in; unknown
    /// codes fall back to `"en"` since dialect data is compiled in rather
    /// than loaded from an external catalogue.
    #[must_use]
    pub fn get(_language: &str) -> Self {
        Self::new(EN.to_vec())
    }

    /// Find the longest prefix of `line` (after skipping leading horizontal
    /// whitespace) that matches a known keyword, returning the keyword, the
    /// byte length of leading whitespace skipped, and the byte length of the
    /// matched prefix.
    #[must_use]
    pub fn match_prefix(&self, line: &str) -> Option<(Keyword, usize, usize)> {
        let stripped = line.trim_start_matches([' ', '\t']);
        let leading_ws = line.len() - stripped.len();
        for entry in &self.entries {
            if entry.keyword.is_step() && entry.prefix == "*" {
                if stripped.starts_with('*') {
                    return Some((entry.keyword, leading_ws, 1));
                }
                continue;
            }
            if let Some(rest) = stripped.strip_prefix(entry.prefix) {
                if entry.keyword.is_block() {
                    // Block keywords require a trailing ':' after optional
                    // horizontal whitespace.
                    let after_ws = rest.trim_start_matches([' ', '\t']);
                    if let Some(after_colon) = after_ws.strip_prefix(':') {
                        let _ = after_colon;
                        let matched = rest.len().saturating_sub(after_ws.len()) + 1;
                        return Some((entry.keyword, leading_ws, entry.prefix.len() + matched));
                    }
                } else {
                    return Some((entry.keyword, leading_ws, entry.prefix.len()));
                }
            }
        }
        None
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests exercise prefix matching against known-good input")]
mod tests {
    use super::*;

    #[test]
    fn longest_prefix_wins_for_scenario_outline() {
        let table = DialectTable::get("en");
        let (kw, ws, len) = table.match_prefix("  Scenario Outline: Foo").unwrap();
        assert_eq!(kw, Keyword::ScenarioOutline);
        assert_eq!(ws, 2);
        assert_eq!(len, "Scenario Outline:".len());
    }

    #[test]
    fn scenario_without_outline_suffix_matches_scenario() {
        let table = DialectTable::get("en");
        let (kw, _, _) = table.match_prefix("Scenario: Foo").unwrap();
        assert_eq!(kw, Keyword::Scenario);
    }

    #[test]
    fn block_keyword_without_colon_does_not_match() {
        let table = DialectTable::get("en");
        assert!(table.match_prefix("Scenario without colon").is_none());
    }

    #[test]
    fn step_keyword_matches_without_colon() {
        let table = DialectTable::get("en");
        let (kw, _, len) = table.match_prefix("Given a precondition").unwrap();
        assert_eq!(kw, Keyword::Given);
        assert_eq!(len, "Given".len());
    }

    #[test]
    fn star_keyword_matches_distinguished_canonical() {
        let table = DialectTable::get("en");
        let (kw, _, len) = table.match_prefix("* a step").unwrap();
        assert_eq!(kw, Keyword::Star);
        assert_eq!(len, 1);
    }

    #[test]
    fn unknown_prefix_does_not_match() {
        let table = DialectTable::get("en");
        assert!(table.match_prefix("Whatever this is").is_none());
    }

    #[test]
    fn canonical_text_matches_en_spelling() {
        assert_eq!(Keyword::ScenarioOutline.canonical_text(), "Scenario Outline");
        assert_eq!(Keyword::Star.canonical_text(), "*");
    }
}
