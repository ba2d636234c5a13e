//! The macro registry and expander (component F): INI-style macro
//! definitions, call-site detection, context validation, and expansion
//! with full provenance.

mod registry;

pub use registry::{Error as RegistryError, MacroDefinition, MacroRegistry, MacroStepLine};

use hashbrown::HashSet;
use thiserror::Error;

use crate::dialect::Keyword;
use crate::location::Location;
use crate::pickle::{MacroProvenance, MacroSummary, Pickle, PickleArgument, PickleStep, StepOrigin};

/// Errors raised while expanding macro calls across a set of pickles.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A call-site key has no matching macro definition.
    #[error("{call_site}: undefined macro {key:?}")]
    Undefined {
        /// Location of the calling step.
        call_site: Location,
        /// The macro key that was called.
        key: String,
    },
    /// A macro definition has zero body steps.
    #[error("macro {key:?} defined at {location} expands to zero steps")]
    EmptyExpansion {
        /// The macro key.
        key: String,
        /// Location of the macro's section header.
        location: Location,
    },
    /// An expanded step's text itself ends with the SPACE-PLUS call suffix.
    #[error("{call_site}: macro {key:?} recursively calls another macro, which is not allowed")]
    RecursionDisallowed {
        /// Location of the outer call.
        call_site: Location,
        /// The outer macro's key.
        key: String,
    },
    /// A macro call appeared inside an outline-derived pickle.
    #[error("{call_site}: macro calls are not supported inside scenario outlines")]
    ScenarioOutlineNotSupported {
        /// Location of the calling step.
        call_site: Location,
    },
    /// A macro call's step carried a non-empty docstring or data table.
    #[error("{call_site}: macro calls may not carry a docstring or data table argument")]
    ArgumentNotSupported {
        /// Location of the calling step.
        call_site: Location,
    },
}

/// Detect whether a pickle step's text marks it as a macro call, returning
/// the macro key (surrounding whitespace trimmed, internal whitespace
/// preserved) when it does.
#[must_use]
pub fn call_key(text: &str) -> Option<&str> {
    let without_suffix = text.strip_suffix(" +")?;
    Some(without_suffix.trim())
}

fn validate_call(pickle: &Pickle, step: &PickleStep) -> Result<(), Error> {
    if pickle.row_location.is_some() {
        return Err(Error::ScenarioOutlineNotSupported {
            call_site: step.location,
        });
    }
    if !matches!(step.argument, PickleArgument::None) {
        return Err(Error::ArgumentNotSupported {
            call_site: step.location,
        });
    }
    Ok(())
}

/// Expand every macro call in `pickle` using `registry`, returning a new
/// pickle with synthetic wrapper and expanded steps in place of each call,
/// or the first error encountered.
///
/// When `enabled` is `false`, pickles pass through unchanged: a SPACE-PLUS
/// suffix is preserved verbatim and treated as an ordinary step text.
pub fn expand_pickle(pickle: &Pickle, registry: &MacroRegistry, enabled: bool) -> Result<Pickle, Error> {
    if !enabled {
        return Ok(pickle.clone());
    }
    let mut steps = Vec::with_capacity(pickle.steps.len());
    let mut macros: Vec<MacroSummary> = Vec::new();
    let mut seen_keys: HashSet<String> = HashSet::new();
    for step in &pickle.steps {
        let Some(key) = call_key(&step.text) else {
            steps.push(step.clone());
            continue;
        };
        validate_call(pickle, step)?;
        let definition = registry
            .get(key)
            .ok_or_else(|| Error::Undefined {
                call_site: step.location,
                key: key.to_owned(),
            })?;
        if definition.steps.is_empty() {
            return Err(Error::EmptyExpansion {
                key: key.to_owned(),
                location: definition.location,
            });
        }
        for body_step in &definition.steps {
            if call_key(&body_step.text).is_some() {
                return Err(Error::RecursionDisallowed {
                    call_site: step.location,
                    key: key.to_owned(),
                });
            }
        }
        steps.push(PickleStep {
            id: step.id.clone(),
            keyword: step.keyword,
            text: key.to_owned(),
            template_text: step.template_text.clone(),
            location: step.location,
            origin: step.origin,
            argument: PickleArgument::None,
            synthetic: true,
            macro_info: Some(MacroProvenance::Call {
                key: key.to_owned(),
                call_site: step.location,
                step_count: definition.steps.len(),
            }),
        });
        for (index, body_step) in definition.steps.iter().enumerate() {
            steps.push(expanded_step(key, step, &definition, index, body_step));
        }
        if seen_keys.insert(key.to_owned()) {
            macros.push(MacroSummary {
                key: key.to_owned(),
                step_count: definition.steps.len(),
                call_site: step.location,
                definition_file: definition.source_file.clone(),
                definition_location: definition.location,
            });
        }
    }
    Ok(Pickle {
        steps,
        macros,
        ..pickle.clone()
    })
}

fn expanded_step(
    key: &str,
    call_step: &PickleStep,
    definition: &MacroDefinition,
    index: usize,
    body_step: &MacroStepLine,
) -> PickleStep {
    PickleStep {
        id: format!("{}-m{index}", call_step.id),
        keyword: body_step.keyword,
        text: body_step.text.clone(),
        template_text: None,
        location: call_step.location,
        origin: call_step.origin,
        argument: PickleArgument::None,
        synthetic: false,
        macro_info: Some(MacroProvenance::Expanded {
            key: key.to_owned(),
            call_site: call_step.location,
            definition_file: definition.source_file.clone(),
            definition_location: definition.location,
            index,
            definition_step: body_step.location,
        }),
    }
}

/// Expand macro calls across every pickle in `pickles`, in order, stopping
/// at the first error.
pub fn expand_all(pickles: &[Pickle], registry: &MacroRegistry, enabled: bool) -> Result<Vec<Pickle>, Error> {
    pickles
        .iter()
        .map(|p| expand_pickle(p, registry, enabled))
        .collect()
}

/// Keyword accepted on a macro body step line, per the INI format's
/// `<Keyword> <text>` convention.
#[must_use]
pub fn parse_step_keyword(word: &str) -> Option<Keyword> {
    match word {
        "Given" => Some(Keyword::Given),
        "When" => Some(Keyword::When),
        "Then" => Some(Keyword::Then),
        "And" => Some(Keyword::And),
        "But" => Some(Keyword::But),
        "*" => Some(Keyword::Star),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(steps: Vec<(Keyword, &str)>) -> MacroDefinition {
        MacroDefinition {
            name: "login as alice".to_owned(),
            description: None,
            steps: steps
                .into_iter()
                .enumerate()
                .map(|(i, (keyword, text))| MacroStepLine {
                    keyword,
                    text: text.to_owned(),
                    location: Location::new(2 + u32::try_from(i).unwrap_or(0), 1),
                })
                .collect(),
            source_file: "auth.ini".to_owned(),
            location: Location::new(1, 1),
        }
    }

    #[test]
    fn call_key_trims_surrounding_whitespace_only() {
        assert_eq!(call_key("login as alice +"), Some("login as alice"));
        assert_eq!(call_key("  login as alice  +"), Some("login as alice"));
        assert_eq!(call_key("no call"), None);
    }

    #[test]
    fn expands_macro_call_with_provenance() {
        let mut registry = MacroRegistry::new();
        registry.insert(def(vec![(Keyword::Given, "a"), (Keyword::When, "b")]));
        let call_step = PickleStep {
            id: "ps-0".to_owned(),
            keyword: Keyword::Given,
            text: "login as alice +".to_owned(),
            template_text: None,
            location: Location::new(12, 5),
            origin: StepOrigin::Scenario,
            argument: PickleArgument::None,
            synthetic: false,
            macro_info: None,
        };
        let pickle = Pickle {
            id: "pk-0".to_owned(),
            name: "S".to_owned(),
            source_file: None,
            location: Location::new(11, 3),
            scenario_location: Location::new(11, 3),
            tags: Vec::new(),
            steps: vec![call_step],
            template_name: None,
            row_index: None,
            row_values: None,
            row_location: None,
            macros: Vec::new(),
        };
        let expanded = expand_pickle(&pickle, &registry, true).unwrap_or_else(|e| {
            panic!("expansion should succeed: {e}")
        });
        assert_eq!(expanded.steps.len(), 3);
        assert!(expanded.steps[0].synthetic);
        let Some(MacroProvenance::Call { key, step_count, .. }) = &expanded.steps[0].macro_info else {
            panic!("expected call provenance")
        };
        assert_eq!(key, "login as alice");
        assert_eq!(*step_count, 2);
        let Some(MacroProvenance::Expanded { index, definition_step, .. }) =
            &expanded.steps[1].macro_info
        else {
            panic!("expected expanded provenance")
        };
        assert_eq!(*index, 0);
        assert_eq!(definition_step.line, 2);
        assert_eq!(expanded.macros.len(), 1);
        assert_eq!(expanded.macros[0].key, "login as alice");
    }

    #[test]
    fn disabled_macros_leave_call_text_verbatim() {
        let registry = MacroRegistry::new();
        let call_step = PickleStep {
            id: "ps-0".to_owned(),
            keyword: Keyword::Given,
            text: "login as alice +".to_owned(),
            template_text: None,
            location: Location::new(1, 1),
            origin: StepOrigin::Scenario,
            argument: PickleArgument::None,
            synthetic: false,
            macro_info: None,
        };
        let pickle = Pickle {
            id: "pk-0".to_owned(),
            name: "S".to_owned(),
            source_file: None,
            location: Location::new(1, 1),
            scenario_location: Location::new(1, 1),
            tags: Vec::new(),
            steps: vec![call_step],
            template_name: None,
            row_index: None,
            row_values: None,
            row_location: None,
            macros: Vec::new(),
        };
        let out = expand_pickle(&pickle, &registry, false).unwrap_or_else(|e| {
            panic!("should not fail: {e}")
        });
        assert!(!out.steps[0].synthetic);
        assert_eq!(out.steps[0].text, "login as alice +");
    }

    #[test]
    fn undefined_macro_call_is_an_error() {
        let registry = MacroRegistry::new();
        let call_step = PickleStep {
            id: "ps-0".to_owned(),
            keyword: Keyword::Given,
            text: "missing +".to_owned(),
            template_text: None,
            location: Location::new(1, 1),
            origin: StepOrigin::Scenario,
            argument: PickleArgument::None,
            synthetic: false,
            macro_info: None,
        };
        let pickle = Pickle {
            id: "pk-0".to_owned(),
            name: "S".to_owned(),
            source_file: None,
            location: Location::new(1, 1),
            scenario_location: Location::new(1, 1),
            tags: Vec::new(),
            steps: vec![call_step],
            template_name: None,
            row_index: None,
            row_values: None,
            row_location: None,
            macros: Vec::new(),
        };
        assert!(matches!(
            expand_pickle(&pickle, &registry, true),
            Err(Error::Undefined { .. })
        ));
    }

    #[test]
    fn call_inside_outline_row_is_rejected() {
        let mut registry = MacroRegistry::new();
        registry.insert(def(vec![(Keyword::Given, "a")]));
        let call_step = PickleStep {
            id: "ps-0".to_owned(),
            keyword: Keyword::Given,
            text: "login as alice +".to_owned(),
            template_text: None,
            location: Location::new(1, 1),
            origin: StepOrigin::Scenario,
            argument: PickleArgument::None,
            synthetic: false,
            macro_info: None,
        };
        let pickle = Pickle {
            id: "pk-0".to_owned(),
            name: "S".to_owned(),
            source_file: None,
            location: Location::new(1, 1),
            scenario_location: Location::new(1, 1),
            tags: Vec::new(),
            steps: vec![call_step],
            template_name: None,
            row_index: None,
            row_values: Some(hashbrown::HashMap::new()),
            row_location: Some(Location::new(1, 1)),
            macros: Vec::new(),
        };
        assert!(matches!(
            expand_pickle(&pickle, &registry, true),
            Err(Error::ScenarioOutlineNotSupported { .. })
        ));
    }
}
