//! Shifted mode: a stepdef carrying SVO metadata is validated against a
//! glossary assembled from configured files, with enforcement per rule.

use std::sync::Arc;

use hashbrown::HashMap;

use shiftlefter::binder::{bind, EnforcementLevel, Glossary, InterfaceDef, SvoEnforcement, ValidationOptions};
use shiftlefter::dialect::DialectTable;
use shiftlefter::lexer::lex;
use shiftlefter::parser::parse;
use shiftlefter::pickle::pickle_feature;
use shiftlefter::registry::{stepdef_id, Arity, Metadata, SourceRef, Stepdef, SvoMetadata};
use shiftlefter::step_fn::StepOutcome;
use shiftlefter::svo::load_glossaries;

const FEATURE: &str = "\
Feature: Checkout

  Scenario: Click through
    Given alice clicks \"checkout\"
";

fn clicking_stepdef() -> Arc<Stepdef> {
    let pattern = r#"^([^ ]+) clicks "([^"]+)"$"#;
    Arc::new(Stepdef {
        id: stepdef_id(pattern),
        pattern: shiftlefter::registry::Regex::new(pattern).unwrap_or_else(|err| panic!("{err}")),
        pattern_src: pattern.to_owned(),
        arity: Arity::Captures(2),
        handler: Arc::new(|_: &[Option<String>], _: Option<&shiftlefter::step_fn::ExecutionContext<'_>>| {
            StepOutcome::Unchanged
        }),
        source: SourceRef {
            module: "tests::svo_shifted_mode".to_owned(),
            file: "svo_shifted_mode.rs".to_owned(),
            line: 1,
        },
        metadata: Metadata {
            interface: Some("checkout".to_owned()),
            svo: Some(SvoMetadata {
                subject: "$1".to_owned(),
                verb: "click".to_owned(),
                object: "$2".to_owned(),
            }),
        },
    })
}

fn pickles() -> Vec<shiftlefter::Pickle> {
    let dialect = DialectTable::get("en");
    let parsed = parse(&lex(FEATURE, &dialect));
    let feature = parsed.feature.unwrap_or_else(|| panic!("no feature parsed"));
    pickle_feature(&feature)
}

#[test]
fn an_unrecognised_subject_with_glossary_files_assembled_from_disk_blocks_the_plan() {
    let glossary_text = "[subjects]\nadmin\n\n[verbs.web]\nclick\n";
    let mut configured = HashMap::new();
    configured.insert("main".to_owned(), "glossary.ini".to_owned());
    let glossary: Glossary = load_glossaries(&configured, [("glossary.ini", glossary_text)])
        .unwrap_or_else(|errs| panic!("glossary assembly failed: {errs:?}"));

    let mut interfaces = HashMap::new();
    interfaces.insert(
        "checkout".to_owned(),
        InterfaceDef {
            kind: "web".to_owned(),
            adapter: "playwright".to_owned(),
        },
    );

    let options = ValidationOptions {
        glossary,
        interfaces,
        enforcement: SvoEnforcement {
            unknown_subject: EnforcementLevel::Error,
            unknown_verb: EnforcementLevel::Error,
            unknown_interface: EnforcementLevel::Error,
        },
    };

    let out = bind(&pickles(), &[clicking_stepdef()], Some(&options));
    assert!(!out.runnable);
    assert_eq!(out.diagnostics.svo_issues.len(), 1);
    assert_eq!(out.diagnostics.svo_issues[0].value, "alice");
}

#[test]
fn a_recognised_subject_and_verb_is_runnable() {
    let glossary_text = "[subjects]\nalice\n\n[verbs.web]\nclick\n";
    let mut configured = HashMap::new();
    configured.insert("main".to_owned(), "glossary.ini".to_owned());
    let glossary: Glossary = load_glossaries(&configured, [("glossary.ini", glossary_text)])
        .unwrap_or_else(|errs| panic!("glossary assembly failed: {errs:?}"));

    let mut interfaces = HashMap::new();
    interfaces.insert(
        "checkout".to_owned(),
        InterfaceDef {
            kind: "web".to_owned(),
            adapter: "playwright".to_owned(),
        },
    );

    let options = ValidationOptions {
        glossary,
        interfaces,
        enforcement: SvoEnforcement {
            unknown_subject: EnforcementLevel::Error,
            unknown_verb: EnforcementLevel::Error,
            unknown_interface: EnforcementLevel::Error,
        },
    };

    let out = bind(&pickles(), &[clicking_stepdef()], Some(&options));
    assert!(out.runnable, "diagnostics: {:?}", out.diagnostics);
    assert!(out.diagnostics.svo_issues.is_empty());
}
