//! Source locations threaded by value through tokens, the AST and pickles.

/// A 1-based line, 0-based column position in a source buffer.
///
/// `Location` is produced once by the lexer and copied everywhere it is
/// needed afterwards; nothing downstream holds a reference back into the
/// source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct Location {
    /// 1-based line number.
    pub line: u32,
    /// 0-based column (UTF-8 byte offset within the line is not used; this
    /// counts Unicode scalar values from the start of the line).
    pub column: u32,
}

impl Location {
    /// The location of the very first character of a buffer.
    #[must_use]
    pub const fn start() -> Self {
        Self { line: 1, column: 0 }
    }

    /// Construct a location directly.
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Return the location advanced by `columns` on the same line.
    #[must_use]
    pub const fn advance_columns(self, columns: u32) -> Self {
        Self {
            line: self.line,
            column: self.column.saturating_add(columns),
        }
    }

    /// Return the location for the start of the next line.
    #[must_use]
    pub const fn next_line(self) -> Self {
        Self {
            line: self.line.saturating_add(1),
            column: 0,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::Location;

    #[test]
    fn start_is_line_one_column_zero() {
        let loc = Location::start();
        assert_eq!(loc.line, 1);
        assert_eq!(loc.column, 0);
    }

    #[test]
    fn next_line_resets_column() {
        let loc = Location::new(3, 12).next_line();
        assert_eq!(loc, Location::new(4, 0));
    }

    #[test]
    fn advance_columns_keeps_line() {
        let loc = Location::new(2, 4).advance_columns(3);
        assert_eq!(loc, Location::new(2, 7));
    }

    #[test]
    fn ordering_is_lexicographic_by_line_then_column() {
        assert!(Location::new(1, 9) < Location::new(2, 0));
        assert!(Location::new(2, 1) < Location::new(2, 2));
    }
}
