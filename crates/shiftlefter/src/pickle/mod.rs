//! The pickler: flattens a lossless AST into executable pickles.
//!
//! Two logical phases, per the data model: Phase 1 walks the tree and
//! decides, for every scenario site, which steps it owns in which order
//! (background injection); Phase 2 assigns opaque identities and performs
//! outline placeholder substitution. Both phases are folded into a single
//! top-down walk here since neither phase is independently fallible;
//! pickling raises no errors of its own.

use hashbrown::HashMap;

use crate::dialect::Keyword;
use crate::location::Location;
use crate::parser::ast::{self, Feature, FeatureChild, Rule, ScenarioItem, Step};

/// Where a pickle step's text originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum StepOrigin {
    /// Declared directly on the scenario or outline.
    Scenario,
    /// Injected from the feature-level `Background:`.
    FeatureBackground,
    /// Injected from the enclosing rule's `Background:`.
    RuleBackground,
}

/// A pickle step's argument, with any outline placeholders already resolved.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum PickleArgument {
    /// No argument.
    None,
    /// A data table, as rows of cell text.
    DataTable(Vec<Vec<String>>),
    /// A docstring.
    Docstring {
        /// Docstring content.
        content: String,
        /// Declared media type, empty when none was given.
        media_type: String,
    },
}

/// Which half of a macro call a [`MacroProvenance`] describes.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum MacroProvenance {
    /// The synthetic wrapper step standing in for the call itself.
    Call {
        /// The macro key (the call text, minus the SPACE-PLUS suffix).
        key: String,
        /// Location of the calling step line.
        call_site: Location,
        /// Number of steps the macro body expanded to.
        step_count: usize,
    },
    /// One step produced by expanding a macro body.
    Expanded {
        /// The macro key.
        key: String,
        /// Location of the calling step line.
        call_site: Location,
        /// Macro definition file label.
        definition_file: String,
        /// Location of the macro's `[section]` header.
        definition_location: Location,
        /// Zero-based position of this step within the macro body.
        index: usize,
        /// Location of this specific body step within the definition file.
        definition_step: Location,
    },
}

/// A pickle-level summary of one macro used by a pickle, first-use order,
/// deduplicated by key.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MacroSummary {
    /// The macro key.
    pub key: String,
    /// Number of body steps the macro expanded to.
    pub step_count: usize,
    /// Location of the calling step line.
    pub call_site: Location,
    /// Macro definition file label.
    pub definition_file: String,
    /// Location of the macro's `[section]` header.
    pub definition_location: Location,
}

/// A single flattened, executable step.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PickleStep {
    /// Opaque unique identifier.
    pub id: String,
    /// Literal keyword as written on the source step line.
    pub keyword: Keyword,
    /// Expanded step text (placeholders substituted, macro suffix stripped
    /// for synthetic wrappers once the macro expander runs).
    pub text: String,
    /// Pre-substitution text, present only for steps in an outline-expanded
    /// pickle.
    pub template_text: Option<String>,
    /// Source location of the originating step line.
    pub location: Location,
    /// Where this step came from.
    pub origin: StepOrigin,
    /// The step's argument.
    pub argument: PickleArgument,
    /// `true` iff this step is a macro call wrapper. Synthetic steps are
    /// never matched against the step registry.
    pub synthetic: bool,
    /// Macro provenance, if this step is part of a macro expansion.
    pub macro_info: Option<MacroProvenance>,
}

/// A flat, executable scenario instance.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Pickle {
    /// Opaque unique identifier.
    pub id: String,
    /// Expanded name (placeholders substituted for outline rows).
    pub name: String,
    /// Label of the source file this pickle was produced from, if known.
    pub source_file: Option<String>,
    /// For outline rows: the row's own location; otherwise equal to
    /// `scenario_location`.
    pub location: Location,
    /// Location of the originating `Scenario:`/`Scenario Outline:` line.
    pub scenario_location: Location,
    /// Tags ordered feature -> rule -> scenario -> examples, deduplicated by
    /// name with first occurrence kept.
    pub tags: Vec<String>,
    /// Steps in execution order.
    pub steps: Vec<PickleStep>,
    /// The outline's own name, present only for outline-expanded pickles.
    pub template_name: Option<String>,
    /// Zero-based row index within the outline's combined body rows.
    pub row_index: Option<usize>,
    /// Header cell text -> row cell text, for outline-expanded pickles.
    pub row_values: Option<HashMap<String, String>>,
    /// Location of the originating example row.
    pub row_location: Option<Location>,
    /// Macros used by this pickle, first-use order, deduplicated by key.
    pub macros: Vec<MacroSummary>,
}

struct IdCounter {
    next_pickle: u64,
    next_step: u64,
}

impl IdCounter {
    const fn new() -> Self {
        Self {
            next_pickle: 0,
            next_step: 0,
        }
    }

    fn next_pickle_id(&mut self) -> String {
        let id = self.next_pickle;
        self.next_pickle += 1;
        format!("pk-{id}")
    }

    fn next_step_id(&mut self) -> String {
        let id = self.next_step;
        self.next_step += 1;
        format!("ps-{id}")
    }
}

/// Replace every `<key>` occurrence in `text` with `values[key]`, leaving
/// unmatched placeholders (and unterminated `<`) untouched.
#[must_use]
pub fn substitute_placeholders(text: &str, values: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let Some((before, after)) = rest.split_once('<') else {
            out.push_str(rest);
            break;
        };
        out.push_str(before);
        match after.split_once('>') {
            Some((key, remainder)) => {
                if let Some(val) = values.get(key) {
                    out.push_str(val);
                } else {
                    out.push('<');
                    out.push_str(key);
                    out.push('>');
                }
                rest = remainder;
            }
            None => {
                out.push('<');
                out.push_str(after);
                break;
            }
        }
    }
    out
}

fn inherited_tags(
    feature: &Feature,
    rule: Option<&Rule>,
    local: &[ast::Tag],
    examples: Option<&[ast::Tag]>,
) -> Vec<String> {
    let mut seen = hashbrown::HashSet::new();
    let mut out = Vec::new();
    let iter = feature
        .tags
        .iter()
        .chain(rule.into_iter().flat_map(|r| r.tags.iter()))
        .chain(local.iter())
        .chain(examples.unwrap_or(&[]).iter());
    for tag in iter {
        if seen.insert(tag.name.clone()) {
            out.push(tag.name.clone());
        }
    }
    out
}

fn background_steps_for<'a>(
    feature: &'a Feature,
    rule: Option<&'a Rule>,
) -> Vec<(&'a Step, StepOrigin)> {
    let mut out = Vec::new();
    if let Some(bg) = &feature.background {
        out.extend(bg.steps.iter().map(|s| (s, StepOrigin::FeatureBackground)));
    }
    if let Some(bg) = rule.and_then(|r| r.background.as_ref()) {
        out.extend(bg.steps.iter().map(|s| (s, StepOrigin::RuleBackground)));
    }
    out
}

fn materialize_step(
    step: &Step,
    origin: StepOrigin,
    counter: &mut IdCounter,
    row_values: Option<&HashMap<String, String>>,
) -> PickleStep {
    let template_text = row_values.map(|_| step.text.clone());
    let text = row_values.map_or_else(
        || step.text.clone(),
        |rv| substitute_placeholders(&step.text, rv),
    );
    let argument = match &step.argument {
        ast::StepArgument::None => PickleArgument::None,
        ast::StepArgument::DataTable(dt) => {
            let rows = dt
                .rows
                .iter()
                .map(|row| {
                    row.cells
                        .iter()
                        .map(|cell| {
                            row_values.map_or_else(
                                || cell.clone(),
                                |rv| substitute_placeholders(cell, rv),
                            )
                        })
                        .collect()
                })
                .collect();
            PickleArgument::DataTable(rows)
        }
        ast::StepArgument::Docstring(ds) => {
            let content = row_values.map_or_else(
                || ds.content.clone(),
                |rv| substitute_placeholders(&ds.content, rv),
            );
            let media_type = row_values.map_or_else(
                || ds.media_type.clone(),
                |rv| substitute_placeholders(&ds.media_type, rv),
            );
            PickleArgument::Docstring { content, media_type }
        }
    };
    PickleStep {
        id: counter.next_step_id(),
        keyword: step.keyword,
        text,
        template_text,
        location: step.location,
        origin,
        argument,
        synthetic: false,
        macro_info: None,
    }
}

fn combined_steps<'a>(
    feature: &'a Feature,
    rule: Option<&'a Rule>,
    own: &'a [Step],
) -> Vec<(&'a Step, StepOrigin)> {
    if own.is_empty() {
        return Vec::new();
    }
    let mut all = background_steps_for(feature, rule);
    all.extend(own.iter().map(|s| (s, StepOrigin::Scenario)));
    all
}

fn pickle_plain_scenario(
    feature: &Feature,
    rule: Option<&Rule>,
    name: &str,
    tags: &[ast::Tag],
    steps: &[Step],
    location: Location,
    counter: &mut IdCounter,
) -> Pickle {
    let tags = inherited_tags(feature, rule, tags, None);
    let pickle_steps = combined_steps(feature, rule, steps)
        .into_iter()
        .map(|(s, origin)| materialize_step(s, origin, counter, None))
        .collect();
    Pickle {
        id: counter.next_pickle_id(),
        name: name.to_owned(),
        source_file: None,
        location,
        scenario_location: location,
        tags,
        steps: pickle_steps,
        template_name: None,
        row_index: None,
        row_values: None,
        row_location: None,
        macros: Vec::new(),
    }
}

fn pickle_outline(feature: &Feature, rule: Option<&Rule>, outline: &ast::ScenarioOutline, counter: &mut IdCounter) -> Vec<Pickle> {
    if outline.examples.is_empty() {
        return vec![pickle_plain_scenario(
            feature,
            rule,
            &outline.name,
            &outline.tags,
            &outline.steps,
            outline.location,
            counter,
        )];
    }
    let mut pickles = Vec::new();
    let mut row_index = 0usize;
    for examples in &outline.examples {
        let Some(table) = &examples.table else { continue };
        let Some(header) = table.rows.first() else { continue };
        for row in table.rows.iter().skip(1) {
            let mut row_values = HashMap::new();
            for (key, value) in header.cells.iter().zip(row.cells.iter()) {
                row_values.insert(key.clone(), value.clone());
            }
            let tags = inherited_tags(feature, rule, &outline.tags, Some(&examples.tags));
            let name = substitute_placeholders(&outline.name, &row_values);
            let pickle_steps = combined_steps(feature, rule, &outline.steps)
                .into_iter()
                .map(|(s, origin)| materialize_step(s, origin, counter, Some(&row_values)))
                .collect();
            pickles.push(Pickle {
                id: counter.next_pickle_id(),
                name,
                source_file: None,
                location: row.location,
                scenario_location: outline.location,
                tags,
                steps: pickle_steps,
                template_name: Some(outline.name.clone()),
                row_index: Some(row_index),
                row_values: Some(row_values),
                row_location: Some(row.location),
                macros: Vec::new(),
            });
            row_index += 1;
        }
    }
    pickles
}

/// Flatten a parsed feature into pickles. The caller is responsible for only
/// calling this on a [`crate::parser::ParseOutput`] with no errors — an AST
/// produced alongside parse errors is not valid to pickle.
#[must_use]
pub fn pickle_feature(feature: &Feature) -> Vec<Pickle> {
    let mut counter = IdCounter::new();
    let mut pickles = Vec::new();
    for child in &feature.children {
        match child {
            FeatureChild::Comment(_) => {}
            FeatureChild::Scenario(scenario) => {
                pickles.push(pickle_plain_scenario(
                    feature,
                    None,
                    &scenario.name,
                    &scenario.tags,
                    &scenario.steps,
                    scenario.location,
                    &mut counter,
                ));
            }
            FeatureChild::Outline(outline) => {
                pickles.extend(pickle_outline(feature, None, outline, &mut counter));
            }
            FeatureChild::Rule(rule) => {
                for item in &rule.scenarios {
                    match item {
                        ScenarioItem::Scenario(scenario) => {
                            pickles.push(pickle_plain_scenario(
                                feature,
                                Some(rule),
                                &scenario.name,
                                &scenario.tags,
                                &scenario.steps,
                                scenario.location,
                                &mut counter,
                            ));
                        }
                        ScenarioItem::Outline(outline) => {
                            pickles.extend(pickle_outline(feature, Some(rule), outline, &mut counter));
                        }
                    }
                }
            }
        }
    }
    pickles
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests assert pickled shapes with descriptive failures"
)]
mod tests {
    use super::*;
    use crate::dialect::DialectTable;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn pickle_src(src: &str) -> Vec<Pickle> {
        let dialect = DialectTable::get("en");
        let tokens = lex(src, &dialect);
        let out = parse(&tokens);
        let feature = out.feature.expect("feature");
        assert!(out.errors.is_empty(), "unexpected parse errors: {:?}", out.errors);
        pickle_feature(&feature)
    }

    #[test]
    fn background_injection_with_rule() {
        let src = concat!(
            "Feature: F\n",
            "  Background:\n",
            "    Given feature setup\n",
            "\n",
            "  Rule: R\n",
            "    Background:\n",
            "      Given rule setup\n",
            "\n",
            "    Scenario: S\n",
            "      When action\n",
        );
        let pickles = pickle_src(src);
        assert_eq!(pickles.len(), 1);
        let pickle = &pickles[0];
        assert_eq!(pickle.name, "S");
        let texts: Vec<&str> = pickle.steps.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["feature setup", "rule setup", "action"]);
        let origins: Vec<StepOrigin> = pickle.steps.iter().map(|s| s.origin).collect();
        assert_eq!(
            origins,
            vec![
                StepOrigin::FeatureBackground,
                StepOrigin::RuleBackground,
                StepOrigin::Scenario,
            ]
        );
    }

    #[test]
    fn outline_row_expansion() {
        let src = concat!(
            "Feature: F\n",
            "  Scenario Outline: Login\n",
            "    Given I log in as \"<username>\" with role <role>\n",
            "    Examples:\n",
            "      | role | username |\n",
            "      | admin | alice |\n",
            "      | user | bob |\n",
        );
        let pickles = pickle_src(src);
        assert_eq!(pickles.len(), 2);
        let first = &pickles[0];
        assert_eq!(first.row_values.as_ref().unwrap()["role"], "admin");
        assert_eq!(first.row_values.as_ref().unwrap()["username"], "alice");
        assert_eq!(
            first.steps[0].text,
            "I log in as \"alice\" with role admin"
        );
        assert_eq!(
            first.steps[0].template_text.as_deref(),
            Some("I log in as \"<username>\" with role <role>")
        );
    }

    #[test]
    fn tag_dedup_and_inheritance() {
        let src = concat!(
            "Feature: F\n",
            "  @shared @f\n",
            "  Rule: R\n",
            "    @shared\n",
            "    Scenario: S\n",
            "      Given g\n",
        );
        let pickles = pickle_src(src);
        assert_eq!(pickles.len(), 1);
        assert_eq!(pickles[0].tags, vec!["@shared", "@f"]);
    }

    #[test]
    fn empty_scenario_has_no_steps_even_with_background() {
        let src = concat!(
            "Feature: F\n",
            "  Background:\n",
            "    Given setup\n",
            "\n",
            "  Scenario: Empty\n",
        );
        let pickles = pickle_src(src);
        assert_eq!(pickles.len(), 1);
        assert!(pickles[0].steps.is_empty());
    }

    #[test]
    fn outline_without_examples_falls_back_to_plain_scenario() {
        let src = "Feature: F\n  Scenario Outline: O\n    Given a <name>\n";
        let pickles = pickle_src(src);
        assert_eq!(pickles.len(), 1);
        assert_eq!(pickles[0].row_values, None);
        assert_eq!(pickles[0].steps[0].text, "a <name>");
    }

    #[test]
    fn substitute_placeholders_leaves_unmatched_keys_literal() {
        let mut values = HashMap::new();
        values.insert("role".to_owned(), "admin".to_owned());
        let out = substitute_placeholders("a <role> and <unknown>", &values);
        assert_eq!(out, "a admin and <unknown>");
    }
}
