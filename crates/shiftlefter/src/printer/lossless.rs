//! The lossless printer (component K).

use crate::lexer::Token;

/// Concatenate every token's `raw` field in lex order.
///
/// For every input that lexes, `print_tokens(lex(input)) == input`
/// byte-for-byte. This function must never consult anything but `raw` —
/// no AST, no keyword, no reformatting.
#[must_use]
pub fn print_tokens(tokens: &[Token<'_>]) -> String {
    tokens.iter().map(|t| t.raw).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectTable;
    use crate::lexer::lex;

    fn roundtrip(src: &str) {
        let dialect = DialectTable::get("en");
        let tokens = lex(src, &dialect);
        assert_eq!(print_tokens(&tokens), src);
    }

    #[test]
    fn roundtrips_a_plain_feature() {
        roundtrip(concat!(
            "Feature: F\n",
            "  Scenario: S\n",
            "    Given a precondition\n",
            "    When an action\n",
            "    Then an outcome\n",
        ));
    }

    #[test]
    fn roundtrips_crlf_and_blank_lines_and_comments() {
        roundtrip("Feature: F\r\n\r\n  # a comment\r\n  Scenario: S\r\n    Given x\r\n");
    }

    #[test]
    fn roundtrips_tags_tables_and_docstrings() {
        roundtrip(concat!(
            "Feature: F\n",
            "  @tag1 @tag2\n",
            "  Scenario: S\n",
            "    Given a table\n",
            "      | a | b |\n",
            "      | 1 | 2 |\n",
            "    And a docstring\n",
            "      \"\"\"json\n",
            "      {}\n",
            "      \"\"\"\n",
        ));
    }

    #[test]
    fn empty_input_roundtrips_to_empty_string() {
        roundtrip("");
    }
}
