//! Parse error taxonomy (the `gherkin/*` diagnostic family).

use crate::location::Location;
use thiserror::Error;

/// A Pass 1 parse error. The parser collects these rather than aborting on
/// the first one, so a single feature file can report every problem found.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// A token appeared where the grammar did not expect it.
    #[error("{location}: unexpected token {found:?}")]
    UnexpectedToken {
        /// Where the offending token begins.
        location: Location,
        /// Debug rendering of the token kind found.
        found: String,
    },

    /// A block keyword (`Feature:`, `Scenario:`, `Rule:`, ...) was not
    /// followed by a name.
    #[error("{location}: {keyword} is missing a name")]
    MissingName {
        /// Location of the keyword line.
        location: Location,
        /// The keyword that required a name.
        keyword: String,
    },

    /// A data table's rows do not all have the same cell count.
    #[error("{location}: row has {found} cells, expected {expected}")]
    InconsistentCellCount {
        /// Location of the offending row.
        location: Location,
        /// Cell count established by the table's first row.
        expected: usize,
        /// Cell count found on the offending row.
        found: usize,
    },

    /// A docstring's opening fence was never closed.
    #[error("{location}: docstring opened here is never closed")]
    DocstringUnterminated {
        /// Location of the opening fence.
        location: Location,
    },

    /// A scenario outline declared more than one `Examples:` block with the
    /// same name (including two unnamed blocks).
    #[error("{location}: duplicate Examples block{}", name.as_deref().map(|n| format!(" named {n:?}")).unwrap_or_default())]
    DuplicateExamplesHeader {
        /// Location of the duplicate `Examples:` line.
        location: Location,
        /// The shared name, if the blocks were named.
        name: Option<String>,
    },
}

impl ParseError {
    /// Location the error should be reported at.
    #[must_use]
    pub const fn location(&self) -> Location {
        match self {
            Self::UnexpectedToken { location, .. }
            | Self::MissingName { location, .. }
            | Self::InconsistentCellCount { location, .. }
            | Self::DocstringUnterminated { location }
            | Self::DuplicateExamplesHeader { location, .. } => *location,
        }
    }

    /// Stable machine-readable diagnostic code, e.g. `"gherkin/missing_name"`.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnexpectedToken { .. } => "gherkin/unexpected_token",
            Self::MissingName { .. } => "gherkin/missing_name",
            Self::InconsistentCellCount { .. } => "gherkin/inconsistent_cell_count",
            Self::DocstringUnterminated { .. } => "gherkin/docstring_unterminated",
            Self::DuplicateExamplesHeader { .. } => "gherkin/duplicate_examples_header",
        }
    }
}
