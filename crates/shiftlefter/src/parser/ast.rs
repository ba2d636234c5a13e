//! The lossless Pass 1 abstract syntax tree.
//!
//! Every node carries its source [`Location`]. The tree borrows nothing
//! from the token stream it was built over — all text is owned — so it
//! outlives the lexer that produced the tokens feeding it.

use crate::dialect::Keyword;
use crate::location::Location;

/// A single `@tag` occurrence. Duplicates are allowed at this level;
/// deduplication happens during pickling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Tag text including the leading `@`.
    pub name: String,
    /// Location of the tag atom.
    pub location: Location,
}

/// A standalone `#` comment line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Comment text, without the leading `#`.
    pub text: String,
    /// Location of the comment line.
    pub location: Location,
}

/// One row of a data table, including the header row if present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// Cell values in column order.
    pub cells: Vec<String>,
    /// Location of the row.
    pub location: Location,
}

/// A Gherkin data table step argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTable {
    /// All rows, including the header row (row 0) when present.
    pub rows: Vec<TableRow>,
    /// Location of the first row.
    pub location: Location,
}

impl DataTable {
    /// Width (cell count) of the first row, or 0 for an empty table.
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.cells.len())
    }
}

/// A docstring step argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Docstring {
    /// Media type declared on the opening fence (empty when none given).
    pub media_type: String,
    /// Raw content between the fences, lines joined with `\n`.
    pub content: String,
    /// Location of the opening fence.
    pub location: Location,
}

/// The argument carried by a step, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepArgument {
    /// No argument.
    None,
    /// A data table.
    DataTable(DataTable),
    /// A docstring.
    Docstring(Docstring),
}

impl StepArgument {
    /// `true` when this is [`StepArgument::None`].
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// A single step line, with its optional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Literal keyword as written (`And`/`But`/`Star` are not resolved to
    /// the preceding primary keyword at this stage).
    pub keyword: Keyword,
    /// Step text, with any macro-call SPACE-PLUS suffix still attached.
    pub text: String,
    /// The step's argument, if any.
    pub argument: StepArgument,
    /// Location of the step line.
    pub location: Location,
    /// `true` when `text` (trimmed) ends with the two-character SPACE-PLUS
    /// sequence, marking this as a macro call.
    pub is_macro_call: bool,
}

/// A `Background:` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Background {
    /// Free-text description lines between the header and the first step.
    pub description: Vec<String>,
    /// Steps in source order.
    pub steps: Vec<Step>,
    /// Location of the `Background:` line.
    pub location: Location,
}

/// A plain `Scenario:` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    /// Scenario name (text after the colon).
    pub name: String,
    /// Tags attached directly to this scenario.
    pub tags: Vec<Tag>,
    /// Free-text description lines.
    pub description: Vec<String>,
    /// Steps in source order.
    pub steps: Vec<Step>,
    /// Location of the `Scenario:` line.
    pub location: Location,
}

/// An `Examples:` block attached to a scenario outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Examples {
    /// Name after the `Examples:` keyword, empty when the block is unnamed.
    pub name: String,
    /// Tags attached to this `Examples:` block.
    pub tags: Vec<Tag>,
    /// Free-text description lines.
    pub description: Vec<String>,
    /// The examples table (header row plus body rows), if one was given.
    pub table: Option<DataTable>,
    /// Location of the `Examples:` line.
    pub location: Location,
}

/// A `Scenario Outline:` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioOutline {
    /// Outline name.
    pub name: String,
    /// Tags attached directly to this outline.
    pub tags: Vec<Tag>,
    /// Free-text description lines.
    pub description: Vec<String>,
    /// Template steps (containing `<placeholder>` references).
    pub steps: Vec<Step>,
    /// One or more `Examples:` blocks.
    pub examples: Vec<Examples>,
    /// Location of the `Scenario Outline:` line.
    pub location: Location,
}

/// Either flavour of scenario a feature or rule may contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioItem {
    /// A plain scenario.
    Scenario(Scenario),
    /// A scenario outline.
    Outline(ScenarioOutline),
}

impl ScenarioItem {
    /// Location of the underlying scenario or outline.
    #[must_use]
    pub const fn location(&self) -> Location {
        match self {
            Self::Scenario(s) => s.location,
            Self::Outline(o) => o.location,
        }
    }
}

/// A `Rule:` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Tags attached directly to this rule.
    pub tags: Vec<Tag>,
    /// Rule name.
    pub name: String,
    /// Free-text description lines.
    pub description: Vec<String>,
    /// The rule's own background, if any.
    pub background: Option<Background>,
    /// Scenarios and outlines in source order.
    pub scenarios: Vec<ScenarioItem>,
    /// Location of the `Rule:` line.
    pub location: Location,
}

/// A top-level child of a [`Feature`], excluding its own background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureChild {
    /// A standalone comment.
    Comment(Comment),
    /// A `Rule:` block.
    Rule(Rule),
    /// A plain scenario.
    Scenario(Scenario),
    /// A scenario outline.
    Outline(ScenarioOutline),
}

/// The root of a parsed feature file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    /// Feature name.
    pub name: String,
    /// Tags attached directly to the feature.
    pub tags: Vec<Tag>,
    /// Free-text description lines.
    pub description: Vec<String>,
    /// Dialect declared by a `# language:` header, if present.
    pub language: Option<String>,
    /// The feature-level background, if any.
    pub background: Option<Background>,
    /// Rules, scenarios and comments in source order.
    pub children: Vec<FeatureChild>,
    /// Location of the `Feature:` line.
    pub location: Location,
}
