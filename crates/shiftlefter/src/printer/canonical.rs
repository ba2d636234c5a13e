//! The canonical printer (component L): a normalizing formatter over the
//! parsed AST.
//!
//! Output is LF-only, tags are joined with a single space, blocks under
//! `Feature:` sit at a two-space indent and steps sit at four, and keyword
//! spelling always follows [`crate::dialect::Keyword::canonical_text`]
//! regardless of how the source spelled it. Content nested under a step
//! (table rows, docstring bodies) is indented two further columns than the
//! step itself; deeper nesting is otherwise unspecified, so this is our own
//! consistent extension of the two/four-space rule.
//!
//! `Rule:` blocks are explicitly unsupported: we surface
//! `canonical/rules_unsupported` rather than guessing a nested-rule layout.

use thiserror::Error;

use crate::parser::ast::{
    Background, Docstring, Examples, Feature, FeatureChild, Scenario, ScenarioOutline, Step, StepArgument, Tag,
    TableRow,
};

/// Errors raised while canonically formatting a feature.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The feature contains one or more `Rule:` blocks.
    #[error("canonical formatting does not support Rule: blocks")]
    RulesUnsupported,
}

fn render_tags(tags: &[Tag]) -> Option<String> {
    if tags.is_empty() {
        return None;
    }
    Some(tags.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(" "))
}

fn push_description(lines: &mut Vec<String>, description: &[String], indent: usize) {
    let pad = " ".repeat(indent);
    for line in description {
        lines.push(format!("{pad}{}", line.trim_end()));
    }
}

fn render_table(rows: &[TableRow], indent: usize, lines: &mut Vec<String>) {
    let pad = " ".repeat(indent);
    for row in rows {
        let cells = row.cells.join(" | ");
        lines.push(format!("{pad}| {cells} |"));
    }
}

fn render_docstring(ds: &Docstring, indent: usize, lines: &mut Vec<String>) {
    let pad = " ".repeat(indent);
    lines.push(format!("{pad}\"\"\"{}", ds.media_type));
    for line in ds.content.split('\n') {
        lines.push(format!("{pad}{line}"));
    }
    lines.push(format!("{pad}\"\"\""));
}

fn render_step(step: &Step, indent: usize, lines: &mut Vec<String>) {
    let pad = " ".repeat(indent);
    lines.push(format!("{pad}{} {}", step.keyword.canonical_text(), step.text));
    match &step.argument {
        StepArgument::None => {}
        StepArgument::DataTable(dt) => render_table(&dt.rows, indent + 2, lines),
        StepArgument::Docstring(ds) => render_docstring(ds, indent + 2, lines),
    }
}

fn render_background(bg: &Background, indent: usize, lines: &mut Vec<String>) {
    lines.push(format!("{}Background:", " ".repeat(indent)));
    push_description(lines, &bg.description, indent + 2);
    for step in &bg.steps {
        render_step(step, indent + 2, lines);
    }
}

fn render_scenario(scenario: &Scenario, indent: usize, lines: &mut Vec<String>) {
    let pad = " ".repeat(indent);
    if let Some(tags) = render_tags(&scenario.tags) {
        lines.push(format!("{pad}{tags}"));
    }
    lines.push(format!("{pad}Scenario: {}", scenario.name));
    push_description(lines, &scenario.description, indent + 2);
    for step in &scenario.steps {
        render_step(step, indent + 2, lines);
    }
}

fn render_examples(examples: &Examples, indent: usize, lines: &mut Vec<String>) {
    lines.push(String::new());
    let pad = " ".repeat(indent);
    if let Some(tags) = render_tags(&examples.tags) {
        lines.push(format!("{pad}{tags}"));
    }
    let header = if examples.name.is_empty() {
        format!("{pad}Examples:")
    } else {
        format!("{pad}Examples: {}", examples.name)
    };
    lines.push(header);
    push_description(lines, &examples.description, indent + 2);
    if let Some(table) = &examples.table {
        render_table(&table.rows, indent + 2, lines);
    }
}

fn render_outline(outline: &ScenarioOutline, indent: usize, lines: &mut Vec<String>) {
    let pad = " ".repeat(indent);
    if let Some(tags) = render_tags(&outline.tags) {
        lines.push(format!("{pad}{tags}"));
    }
    lines.push(format!("{pad}Scenario Outline: {}", outline.name));
    push_description(lines, &outline.description, indent + 2);
    for step in &outline.steps {
        render_step(step, indent + 2, lines);
    }
    for examples in &outline.examples {
        render_examples(examples, indent + 2, lines);
    }
}

/// Render `feature` as normalized canonical text.
///
/// # Errors
/// Returns [`Error::RulesUnsupported`] if `feature` contains any `Rule:`
/// block.
pub fn canonical(feature: &Feature) -> Result<String, Error> {
    if feature.children.iter().any(|c| matches!(c, FeatureChild::Rule(_))) {
        return Err(Error::RulesUnsupported);
    }

    let mut lines: Vec<String> = Vec::new();
    if let Some(tags) = render_tags(&feature.tags) {
        lines.push(tags);
    }
    lines.push(format!("Feature: {}", feature.name));
    push_description(&mut lines, &feature.description, 2);

    if let Some(bg) = &feature.background {
        lines.push(String::new());
        render_background(bg, 2, &mut lines);
    }

    for child in &feature.children {
        match child {
            FeatureChild::Comment(comment) => {
                lines.push(String::new());
                lines.push(format!("# {}", comment.text));
            }
            FeatureChild::Rule(_) => unreachable!("rejected above"),
            FeatureChild::Scenario(scenario) => {
                lines.push(String::new());
                render_scenario(scenario, 2, &mut lines);
            }
            FeatureChild::Outline(outline) => {
                lines.push(String::new());
                render_outline(outline, 2, &mut lines);
            }
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectTable;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn feature_from(src: &str) -> Feature {
        let dialect = DialectTable::get("en");
        let tokens = lex(src, &dialect);
        let out = parse(&tokens);
        out.feature.unwrap_or_else(|| panic!("expected a feature, errors: {:?}", out.errors))
    }

    #[test]
    fn normalizes_indentation_and_crlf() {
        let src = "Feature: F\r\n  Scenario:   S\r\n    Given  x\r\n";
        let feature = feature_from(src);
        let out = canonical(&feature).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(out, "Feature: F\n\n  Scenario: S\n    Given x\n");
    }

    #[test]
    fn joins_tags_with_a_single_space() {
        let src = "Feature: F\n  @a   @b\n  Scenario: S\n    Given x\n";
        let feature = feature_from(src);
        let out = canonical(&feature).unwrap_or_else(|e| panic!("{e}"));
        assert!(out.contains("  @a @b\n"));
    }

    #[test]
    fn rule_containing_feature_is_unsupported() {
        let src = "Feature: F\n  Rule: R\n    Scenario: S\n      Given x\n";
        let feature = feature_from(src);
        assert_eq!(canonical(&feature), Err(Error::RulesUnsupported));
    }

    #[test]
    fn is_idempotent() {
        let src = concat!(
            "Feature: F\n",
            "  Background:\n",
            "    Given setup\n",
            "\n",
            "  @slow\n",
            "  Scenario Outline: Login <role>\n",
            "    Given I log in as \"<name>\"\n",
            "      | k | v |\n",
            "      | a | b |\n",
            "\n",
            "    Examples:\n",
            "      | role | name |\n",
            "      | admin | alice |\n",
        );
        let feature = feature_from(src);
        let once = canonical(&feature).unwrap_or_else(|e| panic!("{e}"));
        let reparsed = feature_from(&once);
        let twice = canonical(&reparsed).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(once, twice);
    }
}
