//! The [`Token`] type and its [`TokenKind`] tag.

use crate::dialect::Keyword;
use crate::location::Location;

/// The kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum TokenKind {
    /// `Feature:` line.
    FeatureLine,
    /// `Background:` line.
    BackgroundLine,
    /// `Scenario:` line.
    ScenarioLine,
    /// `Scenario Outline:` line.
    ScenarioOutlineLine,
    /// `Rule:` line.
    RuleLine,
    /// `Examples:` line.
    ExamplesLine,
    /// A step line (`Given`/`When`/`Then`/`And`/`But`/`*`).
    StepLine,
    /// One `@tag` atom.
    TagLine,
    /// A `#`-prefixed comment that is not a language header.
    Comment,
    /// `"""` or ```` ``` ```` fence line.
    DocstringSeparator,
    /// A line between a docstring's opening and closing fence, tokenized
    /// verbatim regardless of what it looks like (keyword, `|`, `#`, ...).
    DocstringContent,
    /// A `|...|` table row.
    TableRow,
    /// `# language: xx` header comment.
    LanguageHeader,
    /// Whitespace-only or zero-length line.
    Empty,
    /// Free-text description line (no recognised keyword).
    Text,
    /// Sentinel emitted once after the last real line.
    Eof,
}

/// A single lexical token.
///
/// Invariant: concatenating `raw` across every token produced for a given
/// input reproduces that input byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Token<'a> {
    /// The token's kind.
    pub kind: TokenKind,
    /// The exact input substring this token accounts for, including its EOL
    /// (if any). May be empty for sub-tokens that share a physical line with
    /// another token that already carries the line's `raw` (tag atoms).
    pub raw: &'a str,
    /// The semantically meaningful text for this token (e.g. the step text
    /// after the keyword, or the name after `Feature:`). Does not include
    /// the EOL.
    pub text: &'a str,
    /// Source location of the first character this token accounts for.
    pub location: Location,
    /// Count of leading horizontal whitespace characters on the physical
    /// line this token begins on.
    pub leading_ws: Option<u32>,
    /// Indentation width, in columns, of the physical line.
    pub indent: Option<u32>,
    /// The canonical keyword recognised for this line, if any.
    pub keyword: Option<Keyword>,
    /// Pre-split cell texts for `table_row` tokens.
    pub cells: Option<Vec<&'a str>>,
    /// Fence media type for `docstring_separator` tokens (e.g. `"json"` in
    /// ` ```json `), empty string when none was given.
    pub media_type: Option<&'a str>,
}

impl<'a> Token<'a> {
    pub(crate) fn new(kind: TokenKind, raw: &'a str, text: &'a str, location: Location) -> Self {
        Self {
            kind,
            raw,
            text,
            location,
            leading_ws: None,
            indent: None,
            keyword: None,
            cells: None,
            media_type: None,
        }
    }
}
