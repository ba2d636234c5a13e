//! A macro call site expands into synthetic wrapper plus body steps, and the
//! executor rolls the wrapper's status up from its expanded children.

use std::sync::Arc;

use shiftlefter::config::RunnerConfig;
use shiftlefter::dialect::DialectTable;
use shiftlefter::executor::{execute_suite, Status};
use shiftlefter::lexer::lex;
use shiftlefter::parser::parse;
use shiftlefter::pickle::pickle_feature;
use shiftlefter::registry::{stepdef_id, Arity, Metadata, SourceRef, Stepdef};
use shiftlefter::step_fn::StepOutcome;

const FEATURE: &str = "\
Feature: Login via macro

  Scenario: Admin session
    Given login as alice +
    Then the dashboard is shown
";

const AUTH_INI: &str = concat!(
    "[login as alice]\n",
    "description = logs in as the default admin user\n",
    "Given I am on the login page\n",
    "When I submit valid alice credentials\n",
);

fn stepdef(pattern: &str) -> Arc<Stepdef> {
    let compiled = shiftlefter::registry::Regex::new(pattern).unwrap_or_else(|err| panic!("bad pattern {pattern:?}: {err}"));
    Arc::new(Stepdef {
        id: stepdef_id(pattern),
        pattern: compiled,
        pattern_src: pattern.to_owned(),
        arity: Arity::Captures(0),
        handler: Arc::new(|_: &[Option<String>], _: Option<&shiftlefter::step_fn::ExecutionContext<'_>>| {
            StepOutcome::Unchanged
        }),
        source: SourceRef {
            module: "tests::macro_expansion".to_owned(),
            file: "macro_expansion.rs".to_owned(),
            line: 1,
        },
        metadata: Metadata::default(),
    })
}

#[test]
fn a_macro_call_expands_and_executes_its_body_steps() {
    let dialect = DialectTable::get("en");
    let parsed = parse(&lex(FEATURE, &dialect));
    let feature = parsed.feature.unwrap_or_else(|| panic!("no feature parsed"));
    let pickles = pickle_feature(&feature);
    assert_eq!(pickles.len(), 1);

    let mut runner = RunnerConfig::default();
    runner.macros.enabled = true;
    runner.macros.registry_paths = vec!["auth.ini".to_owned()];

    let stepdefs = vec![
        stepdef("^I am on the login page$"),
        stepdef("^I submit valid alice credentials$"),
        stepdef("^the dashboard is shown$"),
    ];

    let out = shiftlefter::compile(&pickles, &runner, [("auth.ini", AUTH_INI)], None, &stepdefs);
    assert!(out.runnable, "diagnostics: {:?}", out.diagnostics);
    assert_eq!(out.plans.len(), 1);

    let suite = execute_suite(&out.plans, &stepdefs, std::time::Duration::from_secs(1));
    assert_eq!(suite.status, Status::Passed);

    let scenario = &suite.scenarios[0];
    assert_eq!(
        scenario.steps.len(),
        4,
        "synthetic wrapper, its two expanded children, and the plain `Then` step"
    );
    assert_eq!(scenario.steps[0].status, Status::Passed, "wrapper rolls up from its children");
}

#[test]
fn an_undefined_macro_call_short_circuits_the_whole_compile() {
    let dialect = DialectTable::get("en");
    let parsed = parse(&lex(FEATURE, &dialect));
    let feature = parsed.feature.unwrap_or_else(|| panic!("no feature parsed"));
    let pickles = pickle_feature(&feature);

    let mut runner = RunnerConfig::default();
    runner.macros.enabled = true;

    let out = shiftlefter::compile(&pickles, &runner, std::iter::empty::<(&str, &str)>(), None, &[]);
    assert!(!out.runnable);
    assert!(out.diagnostics.macro_expansion_error.is_some());
}
