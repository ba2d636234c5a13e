//! Plain, `serde`-deserialisable configuration shapes.
//!
//! `shiftlefter` never reads a configuration file itself — file loading
//! (EDN, TOML, JSON, environment, whatever the host prefers) is an external
//! collaborator's job. These structs only give that host a typed shape to
//! deserialise into and hand to [`crate::compiler`].

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

fn default_dialect() -> String {
    "en".to_owned()
}

fn default_step_paths() -> Vec<String> {
    vec!["steps/".to_owned()]
}

/// `parser.*` configuration keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Dialect language code, e.g. `"en"`.
    pub dialect: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
        }
    }
}

/// `runner.macros.*` configuration keys.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroConfig {
    /// Whether macro expansion is enabled at all.
    pub enabled: bool,
    /// Paths to INI-style macro registry files. Required when `enabled` is
    /// `true`; the compiler raises `config/macro_config_missing_registry_paths`
    /// if it is empty in that case.
    pub registry_paths: Vec<String>,
}

/// `runner.*` configuration keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Directories a host searches for step definition modules.
    pub step_paths: Vec<String>,
    /// Whether a `pending` scenario status is tolerated in the suite result.
    pub allow_pending: bool,
    /// Macro expansion configuration.
    pub macros: MacroConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            step_paths: default_step_paths(),
            allow_pending: false,
            macros: MacroConfig::default(),
        }
    }
}

/// Enforcement level for one SVO validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementLevel {
    /// Reported but does not block runnability.
    Warn,
    /// Reported and blocks runnability.
    Error,
}

/// `svo.*` configuration keys. Presence of this struct in a host's parsed
/// config (as opposed to its absence) is what activates shifted mode; the
/// compiler itself takes `Option<SvoConfig>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvoConfig {
    /// Enforcement for an unrecognised subject.
    pub unknown_subject: EnforcementLevel,
    /// Enforcement for an unrecognised verb.
    pub unknown_verb: EnforcementLevel,
    /// Enforcement for an unrecognised interface.
    pub unknown_interface: EnforcementLevel,
    /// Paths to glossary files, by logical name.
    pub glossaries: HashMap<String, String>,
}

/// One `interfaces.<name>` configuration entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// One of `web`, `api`, `sms`, `email`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Adapter identifier.
    pub adapter: String,
    /// Adapter-specific configuration, left opaque to `shiftlefter`.
    #[serde(default)]
    pub config: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runner_config_defaults_match_spec() {
        let config = RunnerConfig::default();
        assert_eq!(config.step_paths, vec!["steps/".to_owned()]);
        assert!(!config.allow_pending);
        assert!(!config.macros.enabled);
        assert!(config.macros.registry_paths.is_empty());
    }

    #[test]
    fn parser_config_defaults_to_en() {
        assert_eq!(ParserConfig::default().dialect, "en");
    }
}
