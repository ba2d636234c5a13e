//! The binder (component H): matches pickled steps against registered
//! stepdefs, validates arity, and extracts/validates subject-verb-object-
//! interface (SVOI) metadata.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use serde::Serialize;

use crate::location::Location;
use crate::pickle::Pickle;
use crate::registry::Stepdef;

/// A single regex capture: present text, or `None` for an optional group
/// that did not participate in the match.
pub type Captures = Vec<Option<String>>;

/// Outcome of attempting to bind one pickle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BindingStatus {
    /// Exactly one stepdef matched, with valid or invalid arity.
    Matched,
    /// No stepdef matched.
    Undefined,
    /// Two or more stepdefs matched.
    Ambiguous,
    /// A macro call wrapper; never matched against the registry.
    Synthetic,
}

/// A candidate stepdef surfaced in an ambiguous match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// The candidate's deterministic id.
    pub stepdef_id: String,
    /// The candidate's pattern source.
    pub pattern_src: String,
}

/// Extracted subject/verb/object/interface quadruple for a matched step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Svoi {
    /// Subject, normalized to a symbolic actor when resolved from a
    /// capture.
    pub subject: Option<String>,
    /// Verb, always a literal symbol.
    pub verb: Option<String>,
    /// Object, the raw capture text when resolved from a placeholder.
    pub object: Option<String>,
    /// Interface symbol.
    pub interface: Option<String>,
}

/// The pairing of a pickle step with its match outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Binding {
    /// The pickle step's id.
    pub step_id: String,
    /// Source location of the step.
    pub location: Location,
    /// Match outcome.
    pub status: BindingStatus,
    /// The matched stepdef's id, when `status == Matched`.
    pub stepdef_id: Option<String>,
    /// Captures extracted from the match, when `status == Matched`.
    pub captures: Option<Captures>,
    /// `true` iff the matched stepdef's arity accepts this capture count.
    /// `None` when not applicable (undefined/ambiguous/synthetic).
    pub arity_ok: Option<bool>,
    /// The accepted arity set `{C, C+1}`, when matched.
    pub expected_arity: Option<(usize, usize)>,
    /// The stepdef's declared arity, when matched.
    pub actual_arity: Option<usize>,
    /// Every candidate that matched, when `status == Ambiguous`.
    pub alternatives: Vec<Candidate>,
    /// Extracted SVOI, when the matched stepdef carries `metadata.svo`.
    pub svoi: Option<Svoi>,
    /// `true` iff this step raised an SVO issue at [`EnforcementLevel::Error`].
    pub svo_blocked: bool,
}

/// Severity an SVO enforcement rule is configured at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnforcementLevel {
    /// Reported but does not block runnability.
    Warn,
    /// Reported and blocks runnability.
    Error,
}

/// Which SVO rule an [`SvoIssue`] reports a violation of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SvoIssueKind {
    /// The subject is not present in the glossary.
    UnknownSubject,
    /// The verb is not present under the resolved interface type.
    UnknownVerb,
    /// The interface name is not present in the configured interfaces map.
    UnknownInterface,
}

/// One SVO validation failure.
#[derive(Debug, Clone, Serialize)]
pub struct SvoIssue {
    /// Which rule was violated.
    pub kind: SvoIssueKind,
    /// Location of the offending step.
    pub location: Location,
    /// The offending value (subject, verb, or interface name).
    pub value: String,
    /// Configured severity for this rule.
    pub severity: EnforcementLevel,
}

/// Subjects and interface-typed verbs recognised as valid.
#[derive(Debug, Clone, Default)]
pub struct Glossary {
    /// Recognised subject symbols.
    pub subjects: HashSet<String>,
    /// Recognised verb symbols, keyed by interface type.
    pub verbs_by_interface_type: HashMap<String, HashSet<String>>,
}

/// One configured interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDef {
    /// One of `web`, `api`, `sms`, `email`.
    pub kind: String,
    /// Adapter identifier.
    pub adapter: String,
}

/// Per-rule enforcement configuration.
#[derive(Debug, Clone, Copy)]
pub struct SvoEnforcement {
    /// Enforcement for an unrecognised subject.
    pub unknown_subject: EnforcementLevel,
    /// Enforcement for an unrecognised verb.
    pub unknown_verb: EnforcementLevel,
    /// Enforcement for an unrecognised interface.
    pub unknown_interface: EnforcementLevel,
}

/// Full SVO validation configuration. Passing `None` to [`bind`] disables
/// SVO validation entirely (SVOI is still extracted and attached, just
/// never checked against a glossary).
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// The subject/verb glossary.
    pub glossary: Glossary,
    /// Configured interfaces, by name.
    pub interfaces: HashMap<String, InterfaceDef>,
    /// Enforcement levels per rule.
    pub enforcement: SvoEnforcement,
}

/// A pickle plus its bindings and overall runnability.
#[derive(Debug, Clone)]
pub struct Plan {
    /// The pickle this plan was built from.
    pub pickle: Pickle,
    /// Bindings in step order.
    pub bound_steps: Vec<Binding>,
    /// `true` iff every step is matched with valid arity (or synthetic) and
    /// none of this plan's own steps raised a blocking (`Error`-level) SVO
    /// issue.
    pub runnable: bool,
}

/// Aggregate counts across every plan's bindings.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Counts {
    /// Steps with a single valid-arity match.
    pub matched: usize,
    /// Steps with zero matches.
    pub undefined: usize,
    /// Steps with two or more matches.
    pub ambiguous: usize,
    /// Matched steps whose arity was not in the accepted set.
    pub invalid_arity: usize,
    /// Macro call wrapper steps.
    pub synthetic: usize,
}

/// Diagnostics accumulated across every plan the binder built.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// Every undefined step, in source order.
    pub undefined: Vec<(String, Location)>,
    /// Every ambiguous step and its candidates, in source order.
    pub ambiguous: Vec<(String, Location, Vec<Candidate>)>,
    /// Every matched step with an invalid arity, in source order.
    pub invalid_arity: Vec<(String, Location, usize, usize, usize)>,
    /// Every SVO validation failure, in source order.
    pub svo_issues: Vec<SvoIssue>,
    /// Aggregate counts.
    pub counts: Counts,
}

/// Output of running the binder over a set of pickles.
#[derive(Debug, Clone)]
pub struct BinderOutput {
    /// One plan per input pickle, in order.
    pub plans: Vec<Plan>,
    /// `true` iff every plan is runnable.
    pub runnable: bool,
    /// Aggregated diagnostics across every plan.
    pub diagnostics: Diagnostics,
}

fn full_match<'t>(stepdef: &Stepdef, text: &'t str) -> Option<regex::Captures<'t>> {
    stepdef
        .pattern
        .captures(text)
        .filter(|caps| caps.get(0).is_some_and(|m| m.start() == 0 && m.end() == text.len()))
}

fn extract_captures(caps: &regex::Captures<'_>) -> Captures {
    caps.iter()
        .skip(1)
        .map(|m| m.map(|mm| mm.as_str().to_owned()))
        .collect()
}

fn normalize_actor(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_sep = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('-');
            last_was_sep = true;
        }
    }
    out.trim_matches('-').to_owned()
}

fn resolve_placeholder(value: &str, captures: &Captures) -> Option<String> {
    let index: usize = value.strip_prefix('$')?.parse().ok()?;
    let zero_based = index.checked_sub(1)?;
    captures.get(zero_based).cloned().flatten()
}

fn extract_svoi(stepdef: &Stepdef, captures: &Captures) -> Option<Svoi> {
    let svo = stepdef.metadata.svo.as_ref()?;
    let subject = if svo.subject.starts_with('$') {
        resolve_placeholder(&svo.subject, captures).map(|s| normalize_actor(&s))
    } else {
        Some(svo.subject.clone())
    };
    let object = if svo.object.starts_with('$') {
        resolve_placeholder(&svo.object, captures)
    } else {
        Some(svo.object.clone())
    };
    Some(Svoi {
        subject,
        verb: Some(svo.verb.clone()),
        object,
        interface: stepdef.metadata.interface.clone(),
    })
}

fn validate_svoi(svoi: &Svoi, location: Location, options: &ValidationOptions, issues: &mut Vec<SvoIssue>) -> bool {
    let mut blocked = false;
    if let Some(subject) = &svoi.subject {
        if !options.glossary.subjects.contains(subject) {
            let severity = options.enforcement.unknown_subject;
            blocked |= severity == EnforcementLevel::Error;
            issues.push(SvoIssue {
                kind: SvoIssueKind::UnknownSubject,
                location,
                value: subject.clone(),
                severity,
            });
        }
    }
    let interface_type = svoi.interface.as_ref().and_then(|name| {
        match options.interfaces.get(name) {
            Some(def) => Some(def.kind.clone()),
            None => {
                let severity = options.enforcement.unknown_interface;
                blocked |= severity == EnforcementLevel::Error;
                issues.push(SvoIssue {
                    kind: SvoIssueKind::UnknownInterface,
                    location,
                    value: name.clone(),
                    severity,
                });
                None
            }
        }
    });
    if let (Some(verb), Some(kind)) = (&svoi.verb, &interface_type) {
        let known = options
            .glossary
            .verbs_by_interface_type
            .get(kind)
            .is_some_and(|set| set.contains(verb));
        if !known {
            let severity = options.enforcement.unknown_verb;
            blocked |= severity == EnforcementLevel::Error;
            issues.push(SvoIssue {
                kind: SvoIssueKind::UnknownVerb,
                location,
                value: verb.clone(),
                severity,
            });
        }
    }
    blocked
}

fn bind_step(
    step: &crate::pickle::PickleStep,
    stepdefs: &[Arc<Stepdef>],
    options: Option<&ValidationOptions>,
    diagnostics: &mut Diagnostics,
) -> Binding {
    if step.synthetic {
        diagnostics.counts.synthetic += 1;
        return Binding {
            step_id: step.id.clone(),
            location: step.location,
            status: BindingStatus::Synthetic,
            stepdef_id: None,
            captures: None,
            arity_ok: None,
            expected_arity: None,
            actual_arity: None,
            alternatives: Vec::new(),
            svoi: None,
            svo_blocked: false,
        };
    }
    let matches: Vec<(&Arc<Stepdef>, Captures)> = stepdefs
        .iter()
        .filter_map(|sd| full_match(sd, &step.text).map(|caps| (sd, extract_captures(&caps))))
        .collect();
    match matches.as_slice() {
        [] => {
            diagnostics.counts.undefined += 1;
            diagnostics.undefined.push((step.id.clone(), step.location));
            Binding {
                step_id: step.id.clone(),
                location: step.location,
                status: BindingStatus::Undefined,
                stepdef_id: None,
                captures: None,
                arity_ok: None,
                expected_arity: None,
                actual_arity: None,
                alternatives: Vec::new(),
                svoi: None,
                svo_blocked: false,
            }
        }
        [(stepdef, captures)] => {
            let capture_count = captures.len();
            let actual = stepdef.arity.count();
            let arity_ok = actual == capture_count || actual == capture_count + 1;
            diagnostics.counts.matched += 1;
            if !arity_ok {
                diagnostics.counts.invalid_arity += 1;
                diagnostics.invalid_arity.push((
                    step.id.clone(),
                    step.location,
                    capture_count,
                    capture_count + 1,
                    actual,
                ));
            }
            let svoi = extract_svoi(stepdef, captures);
            let mut svo_blocked = false;
            if let (Some(svoi), Some(options)) = (&svoi, options) {
                svo_blocked = validate_svoi(svoi, step.location, options, &mut diagnostics.svo_issues);
            }
            Binding {
                step_id: step.id.clone(),
                location: step.location,
                status: BindingStatus::Matched,
                stepdef_id: Some(stepdef.id.clone()),
                captures: Some(captures.clone()),
                arity_ok: Some(arity_ok),
                expected_arity: Some((capture_count, capture_count + 1)),
                actual_arity: Some(actual),
                alternatives: Vec::new(),
                svoi,
                svo_blocked,
            }
        }
        multiple => {
            diagnostics.counts.ambiguous += 1;
            let alternatives: Vec<Candidate> = multiple
                .iter()
                .map(|(sd, _)| Candidate {
                    stepdef_id: sd.id.clone(),
                    pattern_src: sd.pattern_src.clone(),
                })
                .collect();
            diagnostics
                .ambiguous
                .push((step.id.clone(), step.location, alternatives.clone()));
            Binding {
                step_id: step.id.clone(),
                location: step.location,
                status: BindingStatus::Ambiguous,
                stepdef_id: None,
                captures: None,
                arity_ok: None,
                expected_arity: None,
                actual_arity: None,
                alternatives,
                svoi: None,
                svo_blocked: false,
            }
        }
    }
}

/// Bind every step of every pickle against `stepdefs`, optionally validating
/// SVOI against `options`.
#[must_use]
pub fn bind(pickles: &[Pickle], stepdefs: &[Arc<Stepdef>], options: Option<&ValidationOptions>) -> BinderOutput {
    let mut diagnostics = Diagnostics::default();
    let mut plans = Vec::with_capacity(pickles.len());
    for pickle in pickles {
        let bound_steps: Vec<Binding> = pickle
            .steps
            .iter()
            .map(|step| bind_step(step, stepdefs, options, &mut diagnostics))
            .collect();
        let runnable = bound_steps.iter().all(|b| {
            !b.svo_blocked
                && (matches!(b.status, BindingStatus::Synthetic)
                    || (matches!(b.status, BindingStatus::Matched) && b.arity_ok == Some(true)))
        });
        plans.push(Plan {
            pickle: pickle.clone(),
            bound_steps,
            runnable,
        });
    }
    let svo_blocks = diagnostics
        .svo_issues
        .iter()
        .any(|i| i.severity == EnforcementLevel::Error);
    let runnable = !svo_blocks && plans.iter().all(|p| p.runnable);
    BinderOutput {
        plans,
        runnable,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Keyword;
    use crate::pickle::{PickleArgument, PickleStep, StepOrigin};
    use crate::registry::{Arity, Metadata, SourceRef, SvoMetadata};

    fn plain_pickle(text: &str) -> Pickle {
        Pickle {
            id: "pk-0".to_owned(),
            name: "S".to_owned(),
            source_file: None,
            location: Location::new(1, 1),
            scenario_location: Location::new(1, 1),
            tags: Vec::new(),
            steps: vec![PickleStep {
                id: "ps-0".to_owned(),
                keyword: Keyword::Given,
                text: text.to_owned(),
                template_text: None,
                location: Location::new(1, 1),
                origin: StepOrigin::Scenario,
                argument: PickleArgument::None,
                synthetic: false,
                macro_info: None,
            }],
            template_name: None,
            row_index: None,
            row_values: None,
            row_location: None,
            macros: Vec::new(),
        }
    }

    fn stepdef_with(pattern_src: &str, arity: Arity, metadata: Metadata) -> Arc<Stepdef> {
        Arc::new(Stepdef {
            id: crate::registry::stepdef_id(pattern_src),
            pattern: regex::Regex::new(pattern_src).unwrap_or_else(|e| panic!("pattern should compile: {e}")),
            pattern_src: pattern_src.to_owned(),
            arity,
            handler: Arc::new(|_captures: &[Option<String>], _ctx: Option<&crate::step_fn::ExecutionContext<'_>>| {
                crate::step_fn::StepOutcome::Unchanged
            }),
            source: SourceRef {
                module: "steps".to_owned(),
                file: "steps.rs".to_owned(),
                line: 1,
            },
            metadata,
        })
    }

    #[test]
    fn arity_mismatch_is_visible_but_non_demoting() {
        let pickle = plain_pickle(r#"I type "a" into "b""#);
        let stepdef = stepdef_with(
            r#"^I type "([^"]+)" into "([^"]+)"$"#,
            Arity::Captures(0),
            Metadata::default(),
        );
        let out = bind(&[pickle], &[stepdef], None);
        assert!(!out.runnable);
        let binding = &out.plans[0].bound_steps[0];
        assert!(matches!(binding.status, BindingStatus::Matched));
        assert_eq!(binding.arity_ok, Some(false));
        assert_eq!(binding.expected_arity, Some((2, 3)));
        assert_eq!(binding.actual_arity, Some(0));
    }

    #[test]
    fn svo_unknown_subject_blocks_when_enforced_as_error() {
        let pickle = plain_pickle(r#"Alcie clicks "button""#);
        let stepdef = stepdef_with(
            r#"^([^ ]+) clicks "([^"]+)"$"#,
            Arity::Captures(2),
            Metadata {
                interface: Some("checkout".to_owned()),
                svo: Some(SvoMetadata {
                    subject: "$1".to_owned(),
                    verb: "click".to_owned(),
                    object: "$2".to_owned(),
                }),
            },
        );
        let mut glossary = Glossary::default();
        glossary.subjects.insert("alice".to_owned());
        glossary.subjects.insert("admin".to_owned());
        glossary
            .verbs_by_interface_type
            .entry("web".to_owned())
            .or_default()
            .insert("click".to_owned());
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
        let out = bind(&[pickle.clone()], &[stepdef.clone()], Some(&options));
        assert!(!out.runnable);
        assert!(!out.plans[0].runnable, "the blocked plan itself must be non-runnable");
        assert_eq!(out.diagnostics.svo_issues.len(), 1);
        assert_eq!(out.diagnostics.svo_issues[0].value, "alcie");

        let mut warn_options = options;
        warn_options.enforcement.unknown_subject = EnforcementLevel::Warn;
        let out_warn = bind(&[pickle], &[stepdef], Some(&warn_options));
        assert!(out_warn.runnable);
        assert_eq!(out_warn.diagnostics.svo_issues.len(), 1);
    }

    #[test]
    fn undefined_step_has_no_candidates() {
        let pickle = plain_pickle("nothing matches this");
        let out = bind(&[pickle], &[], None);
        assert!(!out.runnable);
        assert!(matches!(out.plans[0].bound_steps[0].status, BindingStatus::Undefined));
    }

    #[test]
    fn ambiguous_step_lists_every_candidate() {
        let pickle = plain_pickle("a shared step");
        let a = stepdef_with("^a shared step$", Arity::Captures(0), Metadata::default());
        let b = stepdef_with("^a shared .+$", Arity::Captures(0), Metadata::default());
        let out = bind(&[pickle], &[a, b], None);
        let binding = &out.plans[0].bound_steps[0];
        assert!(matches!(binding.status, BindingStatus::Ambiguous));
        assert_eq!(binding.alternatives.len(), 2);
    }

    #[test]
    fn synthetic_steps_bypass_matching() {
        let mut pickle = plain_pickle("unused");
        pickle.steps[0].synthetic = true;
        let out = bind(&[pickle], &[], None);
        assert!(out.runnable);
        assert!(matches!(out.plans[0].bound_steps[0].status, BindingStatus::Synthetic));
    }
}
