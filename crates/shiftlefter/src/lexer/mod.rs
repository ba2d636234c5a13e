//! Dialect-aware, line-oriented lexer.
//!
//! Lexing is total: every line of input produces at least one token, and
//! nothing a caller can supply causes an error here. Malformed keyword-like
//! text simply falls through to [`TokenKind::Text`].

mod token;

pub use token::{Token, TokenKind};

use crate::dialect::{DialectTable, Keyword};
use crate::location::Location;
use crate::source::lines_with_locations;
use std::collections::VecDeque;

/// Lex `source` under `dialect`, returning every token including a trailing
/// `eof` sentinel.
#[must_use]
pub fn lex<'a>(source: &'a str, dialect: &DialectTable) -> Vec<Token<'a>> {
    Lexer::new(source, dialect).collect()
}

/// Which fence style a currently open docstring must close with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocstringFence {
    /// Opened with `"""`.
    Quote,
    /// Opened with ```` ``` ````.
    Backtick,
}

/// A lazy, line-driven token iterator.
pub struct Lexer<'a> {
    dialect: DialectTable,
    lines: std::vec::IntoIter<(Location, &'a str)>,
    pending: VecDeque<Token<'a>>,
    last_location: Location,
    done: bool,
    /// `Some` while inside an open docstring body, pinning every line to
    /// verbatim [`TokenKind::DocstringContent`] until the matching fence.
    docstring_fence: Option<DocstringFence>,
}

impl<'a> Lexer<'a> {
    /// Construct a lexer over `source` using `dialect`.
    #[must_use]
    pub fn new(source: &'a str, dialect: &DialectTable) -> Self {
        Self {
            dialect: dialect.clone(),
            lines: lines_with_locations(source).into_iter(),
            pending: VecDeque::new(),
            last_location: Location::start(),
            done: false,
            docstring_fence: None,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(tok) = self.pending.pop_front() {
            return Some(tok);
        }
        loop {
            match self.lines.next() {
                Some((location, raw)) => {
                    self.last_location = location;
                    let tokens = match self.docstring_fence {
                        Some(fence) => {
                            let (tok, closed) = classify_docstring_line(fence, location, raw);
                            if closed {
                                self.docstring_fence = None;
                            }
                            vec![tok]
                        }
                        None => {
                            let tokens = classify_line(&self.dialect, location, raw);
                            if let [tok] = tokens.as_slice() {
                                if tok.kind == TokenKind::DocstringSeparator {
                                    let (content, _eol) = split_eol(raw);
                                    self.docstring_fence = Some(docstring_fence_kind(content.trim()));
                                }
                            }
                            tokens
                        }
                    };
                    self.pending.extend(tokens);
                    if let Some(tok) = self.pending.pop_front() {
                        return Some(tok);
                    }
                }
                None => {
                    if self.done {
                        return None;
                    }
                    self.done = true;
                    return Some(Token::new(TokenKind::Eof, "", "", self.last_location.next_line()));
                }
            }
        }
    }
}

fn docstring_fence_kind(trimmed: &str) -> DocstringFence {
    if trimmed.starts_with("```") {
        DocstringFence::Backtick
    } else {
        DocstringFence::Quote
    }
}

/// Classify one line while inside an open docstring: either the matching
/// closing fence, or verbatim content. Returns the token plus whether this
/// line closed the docstring.
fn classify_docstring_line<'a>(fence: DocstringFence, location: Location, raw: &'a str) -> (Token<'a>, bool) {
    let (content, _eol) = split_eol(raw);
    let trimmed = content.trim();
    let ws_len = leading_ws_len(content);
    let is_closing = match fence {
        DocstringFence::Quote => trimmed.starts_with("\"\"\""),
        DocstringFence::Backtick => trimmed.starts_with("```"),
    };
    if is_closing {
        return (classify_docstring_fence(raw, content, location, ws_len, trimmed), true);
    }
    let mut tok = Token::new(TokenKind::DocstringContent, raw, content, location);
    tok.leading_ws = Some(ws_len as u32);
    tok.indent = Some(ws_len as u32);
    (tok, false)
}

fn split_eol(raw: &str) -> (&str, &str) {
    if let Some(stripped) = raw.strip_suffix("\r\n") {
        (stripped, "\r\n")
    } else if let Some(stripped) = raw.strip_suffix('\n') {
        (stripped, "\n")
    } else if let Some(stripped) = raw.strip_suffix('\r') {
        (stripped, "\r")
    } else {
        (raw, "")
    }
}

fn leading_ws_len(content: &str) -> usize {
    content.len() - content.trim_start_matches([' ', '\t']).len()
}

fn classify_line<'a>(dialect: &DialectTable, location: Location, raw: &'a str) -> Vec<Token<'a>> {
    let (content, _eol) = split_eol(raw);
    let trimmed = content.trim();
    let ws_len = leading_ws_len(content);

    if trimmed.is_empty() {
        let mut tok = Token::new(TokenKind::Empty, raw, "", location);
        tok.leading_ws = Some(ws_len as u32);
        tok.indent = Some(ws_len as u32);
        return vec![tok];
    }

    if let Some(rest) = trimmed.strip_prefix('#') {
        return vec![classify_comment(raw, content, location, ws_len, rest)];
    }

    if trimmed.starts_with('@') {
        return classify_tags(raw, content, location, ws_len);
    }

    if trimmed.starts_with("\"\"\"") || trimmed.starts_with("```") {
        return vec![classify_docstring_fence(raw, content, location, ws_len, trimmed)];
    }

    if trimmed.starts_with('|') {
        return vec![classify_table_row(raw, content, location, ws_len, trimmed)];
    }

    if let Some((keyword, leading, matched_len)) = dialect.match_prefix(content) {
        return vec![classify_keyword_line(raw, content, location, leading, matched_len, keyword)];
    }

    let mut tok = Token::new(TokenKind::Text, raw, trimmed, location);
    tok.leading_ws = Some(ws_len as u32);
    tok.indent = Some(ws_len as u32);
    vec![tok]
}

fn classify_comment<'a>(
    raw: &'a str,
    content: &'a str,
    location: Location,
    ws_len: usize,
    after_hash: &'a str,
) -> Token<'a> {
    let body = after_hash.trim_start();
    let is_language = {
        let lower_prefix: String = body.chars().take(9).collect::<String>().to_ascii_lowercase();
        lower_prefix == "language:"
    };
    let _ = content;
    if is_language {
        #[expect(
            clippy::indexing_slicing,
            reason = "body starts with the literal ASCII prefix \"language:\" checked above"
        )]
        let value = body[9..].trim();
        let mut tok = Token::new(TokenKind::LanguageHeader, raw, value, location);
        tok.leading_ws = Some(ws_len as u32);
        tok.indent = Some(ws_len as u32);
        tok
    } else {
        let mut tok = Token::new(TokenKind::Comment, raw, body.trim_end(), location);
        tok.leading_ws = Some(ws_len as u32);
        tok.indent = Some(ws_len as u32);
        tok
    }
}

fn classify_tags<'a>(
    raw: &'a str,
    content: &'a str,
    location: Location,
    ws_len: usize,
) -> Vec<Token<'a>> {
    let mut tokens = Vec::new();
    let mut first = true;
    for (offset, atom) in split_whitespace_with_offsets(content) {
        if !atom.starts_with('@') {
            continue;
        }
        let atom_location = location.advance_columns(offset as u32);
        let this_raw = if first { raw } else { "" };
        let mut tok = Token::new(TokenKind::TagLine, this_raw, atom, atom_location);
        tok.leading_ws = Some(ws_len as u32);
        tok.indent = Some(ws_len as u32);
        tokens.push(tok);
        first = false;
    }
    if tokens.is_empty() {
        // A line that starts with '@' but has no recognisable atom; treat
        // as free text rather than silently dropping content.
        let mut tok = Token::new(TokenKind::Text, raw, content.trim(), location);
        tok.leading_ws = Some(ws_len as u32);
        tok.indent = Some(ws_len as u32);
        tokens.push(tok);
    }
    tokens
}

fn split_whitespace_with_offsets(content: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let bytes = content.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b' ' || bytes[i] == b'\t' {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i] != b' ' && bytes[i] != b'\t' {
            i += 1;
        }
        #[expect(
            clippy::indexing_slicing,
            reason = "start/i are whitespace-delimited boundaries found above"
        )]
        out.push((start, &content[start..i]));
    }
    out
}

fn classify_docstring_fence<'a>(
    raw: &'a str,
    content: &'a str,
    location: Location,
    ws_len: usize,
    trimmed: &'a str,
) -> Token<'a> {
    let _ = content;
    let media = if let Some(rest) = trimmed.strip_prefix("\"\"\"") {
        rest
    } else {
        #[expect(
            clippy::indexing_slicing,
            reason = "trimmed is known to start with the 3-byte ``` fence"
        )]
        &trimmed[3..]
    };
    let mut tok = Token::new(TokenKind::DocstringSeparator, raw, media.trim(), location);
    tok.leading_ws = Some(ws_len as u32);
    tok.indent = Some(ws_len as u32);
    tok.media_type = Some(media.trim());
    tok
}

fn classify_table_row<'a>(
    raw: &'a str,
    content: &'a str,
    location: Location,
    ws_len: usize,
    trimmed: &'a str,
) -> Token<'a> {
    let _ = content;
    let cells = split_table_cells(trimmed);
    let mut tok = Token::new(TokenKind::TableRow, raw, trimmed, location);
    tok.leading_ws = Some(ws_len as u32);
    tok.indent = Some(ws_len as u32);
    tok.cells = Some(cells);
    tok
}

/// Split a `|...|` row on unescaped `|` delimiters, trimming outer
/// whitespace from each cell while preserving inner whitespace.
fn split_table_cells(trimmed_row: &str) -> Vec<&str> {
    let bytes = trimmed_row.as_bytes();
    let mut positions = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'|') {
            i += 2;
            continue;
        }
        if bytes[i] == b'|' {
            positions.push(i);
        }
        i += 1;
    }
    let mut cells = Vec::new();
    for window in positions.windows(2) {
        #[expect(clippy::indexing_slicing, reason = "windows(2) always yields 2 elements")]
        let (start, end) = (window[0] + 1, window[1]);
        if start <= end {
            #[expect(
                clippy::indexing_slicing,
                reason = "start/end are pipe byte offsets found within trimmed_row above"
            )]
            cells.push(trimmed_row[start..end].trim());
        }
    }
    cells
}

fn classify_keyword_line<'a>(
    raw: &'a str,
    content: &'a str,
    location: Location,
    leading: usize,
    matched_len: usize,
    keyword: Keyword,
) -> Token<'a> {
    #[expect(
        clippy::indexing_slicing,
        reason = "leading/matched_len come from dialect::match_prefix over this same content"
    )]
    let residue = &content[leading + matched_len..];
    let kind = match keyword {
        Keyword::Feature => TokenKind::FeatureLine,
        Keyword::Background => TokenKind::BackgroundLine,
        Keyword::Scenario => TokenKind::ScenarioLine,
        Keyword::ScenarioOutline => TokenKind::ScenarioOutlineLine,
        Keyword::Rule => TokenKind::RuleLine,
        Keyword::Examples => TokenKind::ExamplesLine,
        Keyword::Given | Keyword::When | Keyword::Then | Keyword::And | Keyword::But | Keyword::Star => {
            TokenKind::StepLine
        }
    };
    let text = if keyword.is_block() {
        residue.trim()
    } else {
        residue.trim_start_matches([' ', '\t']).trim_end()
    };
    let mut tok = Token::new(kind, raw, text, location);
    tok.leading_ws = Some(leading as u32);
    tok.indent = Some(leading as u32);
    tok.keyword = Some(keyword);
    tok
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests exercise lexing fallibility")]
mod tests {
    use super::*;

    fn en() -> DialectTable {
        DialectTable::get("en")
    }

    #[test]
    fn roundtrip_concatenation_reproduces_input() {
        let input = "Feature: F\n  @tag1 @tag2\n  Scenario: S\n    Given a step\n    | a | b |\n";
        let tokens = lex(input, &en());
        let rebuilt: String = tokens.iter().map(|t| t.raw).collect();
        assert_eq!(rebuilt, input);
    }

    #[test]
    fn roundtrip_holds_for_crlf_and_cr_inputs() {
        for input in ["Feature: F\r\n  Scenario: S\r\n    Given x\r\n", "Feature: F\rScenario: S\rGiven x\r"] {
            let tokens = lex(input, &en());
            let rebuilt: String = tokens.iter().map(|t| t.raw).collect();
            assert_eq!(rebuilt, input);
        }
    }

    #[test]
    fn emits_eof_sentinel() {
        let tokens = lex("Feature: F\n", &en());
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn tag_line_splits_into_atoms_with_single_raw() {
        let tokens = lex("@one @two @three\n", &en());
        let tags: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::TagLine)
            .collect();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].text, "@one");
        assert_eq!(tags[0].raw, "@one @two @three\n");
        assert_eq!(tags[1].raw, "");
        assert_eq!(tags[2].raw, "");
        assert_eq!(tags[2].text, "@three");
    }

    #[test]
    fn step_line_keeps_keyword_and_trimmed_text() {
        let tokens = lex("  Given a precondition  \n", &en());
        let step = tokens
            .iter()
            .find(|t| t.kind == TokenKind::StepLine)
            .unwrap();
        assert_eq!(step.keyword, Some(Keyword::Given));
        assert_eq!(step.text, "a precondition");
    }

    #[test]
    fn language_header_is_distinguished_from_plain_comment() {
        let tokens = lex("# language: fr\n# just a comment\n", &en());
        assert_eq!(tokens[0].kind, TokenKind::LanguageHeader);
        assert_eq!(tokens[0].text, "fr");
        assert_eq!(tokens[1].kind, TokenKind::Comment);
    }

    #[test]
    fn encoding_header_is_an_ordinary_comment() {
        let tokens = lex("# encoding: utf-8\n", &en());
        assert_eq!(tokens[0].kind, TokenKind::Comment);
    }

    #[test]
    fn docstring_fence_carries_media_type() {
        let tokens = lex("\"\"\"json\nGiven x\n", &en());
        assert_eq!(tokens[0].kind, TokenKind::DocstringSeparator);
        assert_eq!(tokens[0].media_type, Some("json"));
    }

    #[test]
    fn docstring_interior_lines_are_never_reclassified() {
        let input = concat!(
            "Feature: F\n",
            "  Scenario: S\n",
            "    Given text\n",
            "      \"\"\"\n",
            "      Given a fenced step\n",
            "      | a | b |\n",
            "      # not a comment\n",
            "      \"\"\"\n",
        );
        let tokens = lex(input, &en());
        let kinds: Vec<_> = tokens
            .iter()
            .skip_while(|t| t.kind != TokenKind::DocstringSeparator)
            .skip(1)
            .take(3)
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![TokenKind::DocstringContent, TokenKind::DocstringContent, TokenKind::DocstringContent],
            "lines between the fences must stay verbatim docstring content"
        );
        let rebuilt: String = tokens.iter().map(|t| t.raw).collect();
        assert_eq!(rebuilt, input, "lossless round-trip must still hold");
    }

    #[test]
    fn table_row_splits_cells_and_preserves_inner_whitespace() {
        let tokens = lex("| a b | c |\n", &en());
        let row = tokens
            .iter()
            .find(|t| t.kind == TokenKind::TableRow)
            .unwrap();
        assert_eq!(row.cells.as_deref(), Some(&["a b", "c"][..]));
    }

    #[test]
    fn table_row_respects_escaped_pipes() {
        let tokens = lex(r"| a \| b | c |".to_string().as_str(), &en());
        let row = tokens
            .iter()
            .find(|t| t.kind == TokenKind::TableRow)
            .unwrap();
        assert_eq!(row.cells.as_deref(), Some(&[r"a \| b", "c"][..]));
    }

    #[test]
    fn malformed_keyword_becomes_text_token() {
        let tokens = lex("Not a keyword line\n", &en());
        assert_eq!(tokens[0].kind, TokenKind::Text);
    }

    #[test]
    fn blank_line_is_preserved_as_empty_token() {
        let tokens = lex("Feature: F\n\nScenario: S\n", &en());
        assert_eq!(tokens[1].kind, TokenKind::Empty);
    }
}
