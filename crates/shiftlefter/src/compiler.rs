//! The compiler (component I): the single entry point orchestrating macro
//! expansion and binding into an executable result.

use hashbrown::HashMap;

use crate::binder::{self, BinderOutput, InterfaceDef, Plan, SvoEnforcement, ValidationOptions};
use crate::config::{EnforcementLevel as ConfigEnforcementLevel, InterfaceConfig, RunnerConfig, SvoConfig};
use crate::macro_expansion::{self, MacroRegistry};
use crate::pickle::Pickle;
use crate::registry::Stepdef;
use crate::svo;
use std::sync::Arc;

/// Diagnostics shape common to every phase's short-circuit and the final
/// binder result, so downstream reporting never needs to branch on which
/// phase stopped.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// Errors from loading configured glossary files (shifted mode only).
    pub svo_config_errors: Vec<svo::Error>,
    /// Errors from loading configured macro registry files.
    pub macro_registry_errors: Vec<macro_expansion::RegistryError>,
    /// The single error that stopped macro expansion, if any.
    pub macro_expansion_error: Option<macro_expansion::Error>,
    /// The binder's own diagnostics, present once binding actually ran.
    pub binder: Option<binder::Diagnostics>,
}

/// Output of running the compiler over a set of pickles.
#[derive(Debug, Clone, Default)]
pub struct CompileOutput {
    /// Bound plans, empty if any phase short-circuited before binding.
    pub plans: Vec<Plan>,
    /// `true` iff binding ran and every plan came out runnable.
    pub runnable: bool,
    /// Diagnostics uniform across every short-circuit and the happy path.
    pub diagnostics: Diagnostics,
}

fn convert_svo_config(config: &SvoConfig) -> SvoEnforcement {
    let map = |level: ConfigEnforcementLevel| match level {
        ConfigEnforcementLevel::Warn => crate::binder::EnforcementLevel::Warn,
        ConfigEnforcementLevel::Error => crate::binder::EnforcementLevel::Error,
    };
    SvoEnforcement {
        unknown_subject: map(config.unknown_subject),
        unknown_verb: map(config.unknown_verb),
        unknown_interface: map(config.unknown_interface),
    }
}

fn convert_interfaces(interfaces: &HashMap<String, InterfaceConfig>) -> HashMap<String, InterfaceDef> {
    interfaces
        .iter()
        .map(|(name, def)| {
            (
                name.clone(),
                InterfaceDef {
                    kind: def.kind.clone(),
                    adapter: def.adapter.clone(),
                },
            )
        })
        .collect()
}

/// Build the validation options for shifted mode from already-read glossary
/// file contents, or return the accumulated errors.
///
/// `glossary_files` mirrors [`crate::macro_expansion::MacroRegistry::load`]'s
/// convention: the caller has already read every glossary path it could.
pub fn build_validation_options<'a, T>(
    svo_config: &SvoConfig,
    interfaces: &HashMap<String, InterfaceConfig>,
    glossary_files: impl IntoIterator<Item = (&'a str, T)>,
) -> Result<ValidationOptions, Vec<svo::Error>>
where
    T: AsRef<str>,
{
    let glossary = svo::load_glossaries(&svo_config.glossaries, glossary_files)?;
    Ok(ValidationOptions {
        glossary,
        interfaces: convert_interfaces(interfaces),
        enforcement: convert_svo_config(svo_config),
    })
}

/// Run the full compiler pipeline: macro registry load, macro expansion,
/// binding.
///
/// - `pickles` are already-pickled scenarios (component E's output).
/// - `macro_files` are already-read `(path, text)` pairs for every path
///   named in `runner.macros.registry_paths`; ignored when macros are
///   disabled.
/// - `validation_options` is `Some` for shifted mode (build it with
///   [`build_validation_options`]) or `None` otherwise.
pub fn compile<'a, I, P, T>(
    pickles: &[Pickle],
    runner: &RunnerConfig,
    macro_files: I,
    validation_options: Option<&ValidationOptions>,
    stepdefs: &[Arc<Stepdef>],
) -> CompileOutput
where
    I: IntoIterator<Item = (P, T)>,
    P: AsRef<str>,
    T: AsRef<str>,
{
    let macros_enabled = runner.macros.enabled;
    let registry = if macros_enabled {
        match MacroRegistry::load(macro_files) {
            Ok(registry) => registry,
            Err(errors) => {
                log::warn!("macro registry load failed with {} error(s)", errors.len());
                return CompileOutput {
                    plans: Vec::new(),
                    runnable: false,
                    diagnostics: Diagnostics {
                        macro_registry_errors: errors,
                        ..Diagnostics::default()
                    },
                };
            }
        }
    } else {
        MacroRegistry::new()
    };

    let expanded = match macro_expansion::expand_all(pickles, &registry, macros_enabled) {
        Ok(expanded) => expanded,
        Err(err) => {
            log::warn!("macro expansion failed: {err}");
            return CompileOutput {
                plans: Vec::new(),
                runnable: false,
                diagnostics: Diagnostics {
                    macro_expansion_error: Some(err),
                    ..Diagnostics::default()
                },
            };
        }
    };

    let binder_output: BinderOutput = binder::bind(&expanded, stepdefs, validation_options);
    log::debug!(
        "compiled {} pickle(s) into {} plan(s), runnable={}",
        pickles.len(),
        binder_output.plans.len(),
        binder_output.runnable
    );
    CompileOutput {
        plans: binder_output.plans,
        runnable: binder_output.runnable,
        diagnostics: Diagnostics {
            binder: Some(binder_output.diagnostics),
            ..Diagnostics::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Keyword;
    use crate::location::Location;
    use crate::pickle::{PickleArgument, PickleStep, StepOrigin};
    use crate::registry::{Arity, Metadata};

    fn pickle_with_step(text: &str) -> Pickle {
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

    #[test]
    fn macros_disabled_binds_directly() {
        let pickle = pickle_with_step("a plain step");
        let stepdef = Arc::new(Stepdef {
            id: crate::registry::stepdef_id("^a plain step$"),
            pattern: regex::Regex::new("^a plain step$").unwrap_or_else(|e| panic!("{e}")),
            pattern_src: "^a plain step$".to_owned(),
            arity: Arity::Captures(0),
            handler: Arc::new(|_captures: &[Option<String>], _ctx: Option<&crate::step_fn::ExecutionContext<'_>>| {
                crate::step_fn::StepOutcome::Unchanged
            }),
            source: crate::registry::SourceRef {
                module: "steps".to_owned(),
                file: "steps.rs".to_owned(),
                line: 1,
            },
            metadata: Metadata::default(),
        });
        let runner = RunnerConfig::default();
        let out = compile(
            &[pickle],
            &runner,
            std::iter::empty::<(&str, &str)>(),
            None,
            &[stepdef],
        );
        assert!(out.runnable);
        assert_eq!(out.plans.len(), 1);
    }

    #[test]
    fn missing_macro_registry_short_circuits_with_uniform_shape() {
        let pickle = pickle_with_step("login as alice +");
        let mut runner = RunnerConfig::default();
        runner.macros.enabled = true;
        runner.macros.registry_paths = vec!["auth.ini".to_owned()];
        let out = compile(
            &[pickle],
            &runner,
            [("auth.ini", "[nothing here]\n")],
            None,
            &[],
        );
        assert!(!out.runnable);
        assert!(out.plans.is_empty());
        assert_eq!(out.diagnostics.macro_registry_errors.len(), 1);
        assert!(out.diagnostics.binder.is_none());
    }

    #[test]
    fn undefined_macro_call_short_circuits_expansion() {
        let pickle = pickle_with_step("missing +");
        let mut runner = RunnerConfig::default();
        runner.macros.enabled = true;
        let out = compile(
            &[pickle],
            &runner,
            std::iter::empty::<(&str, &str)>(),
            None,
            &[],
        );
        assert!(!out.runnable);
        assert!(out.diagnostics.macro_expansion_error.is_some());
    }
}
