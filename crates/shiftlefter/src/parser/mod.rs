//! Pass 1: a lossless, best-effort recursive-descent parser over the token
//! stream produced by [`crate::lexer`].
//!
//! The parser never aborts on the first problem it finds. It builds as much
//! of the tree as the surrounding grammar allows and collects every error
//! encountered along the way; a non-empty error list means the returned
//! [`ast::Feature`] (if any) must not be handed to the pickler.

pub mod ast;
pub mod error;

use std::collections::HashSet;

use crate::dialect::Keyword;
use crate::lexer::{Token, TokenKind};
use ast::{
    Background, Comment, DataTable, Docstring, Examples, Feature, FeatureChild, Rule, Scenario,
    ScenarioItem, ScenarioOutline, Step, StepArgument, Tag, TableRow,
};
pub use error::ParseError;

/// Result of parsing a single feature file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutput {
    /// The parsed tree, or `None` if not even a `Feature:` line was found.
    pub feature: Option<Feature>,
    /// Every error collected while parsing, in source order.
    pub errors: Vec<ParseError>,
}

impl ParseOutput {
    /// `true` when the feature is present and no errors were collected,
    /// i.e. the tree is safe to pickle.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.feature.is_some() && self.errors.is_empty()
    }
}

/// Parse a full token stream (including the trailing `Eof` sentinel) into a
/// [`ParseOutput`].
#[must_use]
pub fn parse(tokens: &[Token<'_>]) -> ParseOutput {
    let mut parser = Parser::new(tokens);
    let feature = parser.parse_feature_root();
    ParseOutput {
        feature,
        errors: parser.errors,
    }
}

/// Strip up to `fence_indent` leading spaces/tabs from a docstring interior
/// line, matching the opening fence's own indentation.
fn dedent_docstring_line(line: &str, fence_indent: usize) -> String {
    let mut chars = line.chars();
    for _ in 0..fence_indent {
        match chars.clone().next() {
            Some(' ' | '\t') => {
                chars.next();
            }
            _ => break,
        }
    }
    chars.as_str().to_owned()
}

struct Parser<'a, 'b> {
    tokens: &'b [Token<'a>],
    pos: usize,
    errors: Vec<ParseError>,
}

impl<'a, 'b> Parser<'a, 'b> {
    fn new(tokens: &'b [Token<'a>]) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn current(&self) -> &Token<'a> {
        #[expect(
            clippy::indexing_slicing,
            reason = "bump() never advances pos past the trailing Eof token"
        )]
        &self.tokens[self.pos]
    }

    fn bump(&mut self) -> &Token<'a> {
        let idx = self.pos;
        if self.tokens.get(self.pos + 1).is_some() {
            self.pos += 1;
        }
        #[expect(
            clippy::indexing_slicing,
            reason = "idx was validated as in-bounds immediately above"
        )]
        &self.tokens[idx]
    }

    fn skip_empty(&mut self) {
        while self.current().kind == TokenKind::Empty {
            self.bump();
        }
    }

    /// Kind of the first token after skipping over a run of `TagLine`
    /// tokens, without consuming anything. Lets callers decide which
    /// grammar production a run of tags belongs to before committing to
    /// consuming them.
    fn peek_after_tags_kind(&self) -> TokenKind {
        let mut i = self.pos;
        while self.tokens.get(i).is_some_and(|t| t.kind == TokenKind::TagLine) {
            i += 1;
        }
        self.tokens.get(i).map_or(TokenKind::Eof, |t| t.kind)
    }

    fn parse_tags(&mut self) -> Vec<Tag> {
        let mut tags = Vec::new();
        while self.current().kind == TokenKind::TagLine {
            let tok = self.bump();
            tags.push(Tag {
                name: tok.text.to_owned(),
                location: tok.location,
            });
        }
        tags
    }

    fn parse_comment(&mut self) -> Comment {
        let tok = self.bump();
        Comment {
            text: tok.text.to_owned(),
            location: tok.location,
        }
    }

    fn unexpected_token_here(&mut self) {
        let tok = self.current();
        self.errors.push(ParseError::UnexpectedToken {
            location: tok.location,
            found: format!("{:?}", tok.kind),
        });
        self.bump();
    }

    fn parse_description(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            match self.current().kind {
                TokenKind::Empty | TokenKind::Comment => {
                    self.bump();
                }
                TokenKind::Text => {
                    let tok = self.bump();
                    lines.push(tok.text.to_owned());
                }
                _ => break,
            }
        }
        lines
    }

    fn parse_steps(&mut self) -> Vec<Step> {
        let mut steps = Vec::new();
        loop {
            match self.current().kind {
                TokenKind::Empty | TokenKind::Comment => {
                    self.bump();
                }
                TokenKind::StepLine => steps.push(self.parse_step()),
                _ => break,
            }
        }
        steps
    }

    fn parse_step(&mut self) -> Step {
        let tok = self.bump();
        let location = tok.location;
        let keyword = tok.keyword.unwrap_or(Keyword::Given);
        let text = tok.text.to_owned();
        let is_macro_call = text.trim_end().ends_with(" +");
        let argument = self.parse_step_argument();
        Step {
            keyword,
            text,
            argument,
            location,
            is_macro_call,
        }
    }

    fn parse_step_argument(&mut self) -> StepArgument {
        match self.current().kind {
            TokenKind::DocstringSeparator => StepArgument::Docstring(self.parse_docstring()),
            TokenKind::TableRow => StepArgument::DataTable(self.parse_table()),
            _ => StepArgument::None,
        }
    }

    fn parse_table(&mut self) -> DataTable {
        let location = self.current().location;
        let mut rows = Vec::new();
        let mut expected_width: Option<usize> = None;
        while self.current().kind == TokenKind::TableRow {
            let tok = self.bump();
            let cells: Vec<String> = tok
                .cells
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|c| (*c).to_owned())
                .collect();
            match expected_width {
                None => expected_width = Some(cells.len()),
                Some(width) if width != cells.len() => {
                    self.errors.push(ParseError::InconsistentCellCount {
                        location: tok.location,
                        expected: width,
                        found: cells.len(),
                    });
                }
                Some(_) => {}
            }
            rows.push(TableRow {
                cells,
                location: tok.location,
            });
        }
        DataTable { rows, location }
    }

    fn parse_docstring(&mut self) -> Docstring {
        let open = self.bump();
        let location = open.location;
        let media_type = open.media_type.unwrap_or("").to_owned();
        let fence_indent = open.indent.unwrap_or(0) as usize;
        let mut content_lines = Vec::new();
        let mut closed = false;
        loop {
            match self.current().kind {
                TokenKind::Eof => break,
                TokenKind::DocstringSeparator => {
                    self.bump();
                    closed = true;
                    break;
                }
                _ => {
                    let tok = self.bump();
                    content_lines.push(dedent_docstring_line(tok.text, fence_indent));
                }
            }
        }
        if !closed {
            self.errors.push(ParseError::DocstringUnterminated { location });
        }
        Docstring {
            media_type,
            content: content_lines.join("\n"),
            location,
        }
    }

    fn parse_scenario(&mut self, tags: Vec<Tag>) -> Scenario {
        let tok = self.bump();
        let location = tok.location;
        let name = tok.text.to_owned();
        if name.trim().is_empty() {
            self.errors.push(ParseError::MissingName {
                location,
                keyword: "Scenario".to_owned(),
            });
        }
        let description = self.parse_description();
        let steps = self.parse_steps();
        Scenario {
            name,
            tags,
            description,
            steps,
            location,
        }
    }

    fn parse_examples(&mut self, tags: Vec<Tag>) -> Examples {
        let tok = self.bump();
        let location = tok.location;
        let name = tok.text.to_owned();
        let description = self.parse_description();
        let table = if self.current().kind == TokenKind::TableRow {
            Some(self.parse_table())
        } else {
            None
        };
        Examples {
            name,
            tags,
            description,
            table,
            location,
        }
    }

    fn parse_scenario_outline(&mut self, tags: Vec<Tag>) -> ScenarioOutline {
        let tok = self.bump();
        let location = tok.location;
        let name = tok.text.to_owned();
        if name.trim().is_empty() {
            self.errors.push(ParseError::MissingName {
                location,
                keyword: "Scenario Outline".to_owned(),
            });
        }
        let description = self.parse_description();
        let steps = self.parse_steps();
        let mut examples = Vec::new();
        let mut seen_names: HashSet<String> = HashSet::new();
        loop {
            self.skip_empty();
            if self.current().kind == TokenKind::Comment {
                self.bump();
                continue;
            }
            if self.peek_after_tags_kind() != TokenKind::ExamplesLine {
                break;
            }
            let ex_tags = self.parse_tags();
            let ex = self.parse_examples(ex_tags);
            let key = ex.name.clone();
            if !seen_names.insert(key.clone()) {
                self.errors.push(ParseError::DuplicateExamplesHeader {
                    location: ex.location,
                    name: if key.is_empty() { None } else { Some(key) },
                });
            }
            examples.push(ex);
        }
        ScenarioOutline {
            name,
            tags,
            description,
            steps,
            examples,
            location,
        }
    }

    fn parse_background(&mut self) -> Background {
        let tok = self.bump();
        let location = tok.location;
        let description = self.parse_description();
        let steps = self.parse_steps();
        Background {
            description,
            steps,
            location,
        }
    }

    fn parse_rule(&mut self, tags: Vec<Tag>) -> Rule {
        let tok = self.bump();
        let location = tok.location;
        let name = tok.text.to_owned();
        if name.trim().is_empty() {
            self.errors.push(ParseError::MissingName {
                location,
                keyword: "Rule".to_owned(),
            });
        }
        let description = self.parse_description();
        let mut background = None;
        let mut scenarios = Vec::new();
        loop {
            self.skip_empty();
            if self.current().kind == TokenKind::Comment {
                self.bump();
                continue;
            }
            match self.peek_after_tags_kind() {
                TokenKind::Eof | TokenKind::RuleLine | TokenKind::FeatureLine => break,
                TokenKind::BackgroundLine => {
                    let _ = self.parse_tags();
                    let bg = self.parse_background();
                    let bg_loc = bg.location;
                    if background.is_none() {
                        background = Some(bg);
                    } else {
                        self.errors.push(ParseError::UnexpectedToken {
                            location: bg_loc,
                            found: "BackgroundLine".to_owned(),
                        });
                    }
                }
                TokenKind::ScenarioLine => {
                    let inner_tags = self.parse_tags();
                    scenarios.push(ScenarioItem::Scenario(self.parse_scenario(inner_tags)));
                }
                TokenKind::ScenarioOutlineLine => {
                    let inner_tags = self.parse_tags();
                    scenarios.push(ScenarioItem::Outline(self.parse_scenario_outline(inner_tags)));
                }
                _ => self.unexpected_token_here(),
            }
        }
        Rule {
            tags,
            name,
            description,
            background,
            scenarios,
            location,
        }
    }

    fn parse_feature_root(&mut self) -> Option<Feature> {
        let mut language = None;
        loop {
            self.skip_empty();
            match self.current().kind {
                TokenKind::LanguageHeader => {
                    language = Some(self.current().text.to_owned());
                    self.bump();
                }
                TokenKind::Comment => {
                    self.bump();
                }
                _ => break,
            }
        }
        match self.peek_after_tags_kind() {
            TokenKind::FeatureLine => {}
            TokenKind::Eof => return None,
            _ => {
                self.unexpected_token_here();
                return None;
            }
        }
        let tags = self.parse_tags();
        let tok = self.bump();
        let location = tok.location;
        let name = tok.text.to_owned();
        if name.trim().is_empty() {
            self.errors.push(ParseError::MissingName {
                location,
                keyword: "Feature".to_owned(),
            });
        }
        let description = self.parse_description();
        let mut background = None;
        let mut children = Vec::new();
        loop {
            self.skip_empty();
            if self.current().kind == TokenKind::Comment {
                children.push(FeatureChild::Comment(self.parse_comment()));
                continue;
            }
            match self.peek_after_tags_kind() {
                TokenKind::Eof => break,
                TokenKind::BackgroundLine => {
                    let _ = self.parse_tags();
                    let bg = self.parse_background();
                    let bg_loc = bg.location;
                    if background.is_none() {
                        background = Some(bg);
                    } else {
                        self.errors.push(ParseError::UnexpectedToken {
                            location: bg_loc,
                            found: "BackgroundLine".to_owned(),
                        });
                    }
                }
                TokenKind::RuleLine => {
                    let rule_tags = self.parse_tags();
                    children.push(FeatureChild::Rule(self.parse_rule(rule_tags)));
                }
                TokenKind::ScenarioLine => {
                    let scenario_tags = self.parse_tags();
                    children.push(FeatureChild::Scenario(self.parse_scenario(scenario_tags)));
                }
                TokenKind::ScenarioOutlineLine => {
                    let outline_tags = self.parse_tags();
                    children.push(FeatureChild::Outline(
                        self.parse_scenario_outline(outline_tags),
                    ));
                }
                _ => self.unexpected_token_here(),
            }
        }
        Some(Feature {
            name,
            tags,
            description,
            language,
            background,
            children,
            location,
        })
    }
}
