//! INI-style macro definition files and the registry loaded from them.

use hashbrown::HashMap;
use thiserror::Error;

use crate::dialect::Keyword;
use crate::location::Location;

use super::parse_step_keyword;

/// Errors raised while loading macro definition files into a
/// [`MacroRegistry`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A configured registry file could not be read. Raised by the
    /// caller's I/O layer, not by this module; the variant exists so the
    /// taxonomy stays uniform across error phases.
    #[error("macro registry file not found: {path}")]
    FileNotFound {
        /// The unreadable path, as supplied by the caller.
        path: String,
    },
    /// Two sections declared the same macro name.
    #[error("macro {name:?} is defined twice, at {first} and {second}")]
    DuplicateKey {
        /// The shared macro name.
        name: String,
        /// Location of the first definition.
        first: Location,
        /// Location of the duplicate definition.
        second: Location,
    },
    /// A section declared no step lines.
    #[error("macro {name:?} at {location} has no steps")]
    MissingSteps {
        /// The macro name.
        name: String,
        /// Location of the section header.
        location: Location,
    },
}

/// One step line inside a macro body.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MacroStepLine {
    /// The step keyword.
    pub keyword: Keyword,
    /// Step text.
    pub text: String,
    /// Location within the definition file.
    pub location: Location,
}

/// A single `[name]` macro section.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MacroDefinition {
    /// The macro's unique name (its call key).
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Body steps in declaration order.
    pub steps: Vec<MacroStepLine>,
    /// Label of the file this definition came from.
    pub source_file: String,
    /// Location of the `[name]` header line.
    pub location: Location,
}

/// An immutable, load-time-validated table of macro definitions keyed by
/// name.
#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
    definitions: HashMap<String, MacroDefinition>,
}

impl MacroRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
        }
    }

    /// Insert a definition directly, overwriting any existing entry with the
    /// same name. Exposed for callers building a registry outside of
    /// [`MacroRegistry::load`] (tests, synthetic fixtures); [`Self::load`]
    /// performs duplicate detection itself rather than calling this.
    pub fn insert(&mut self, definition: MacroDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }

    /// Look up a macro definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<MacroDefinition> {
        self.definitions.get(name).cloned()
    }

    /// Number of macros loaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// `true` iff no macros are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Load macro definitions from an ordered list of `(path_label, text)`
    /// pairs. The caller has already read file contents; this only parses
    /// and validates them. Every error encountered across every file is
    /// collected and returned together; a non-empty error list means no
    /// registry should be used.
    pub fn load<I, P, T>(files: I) -> Result<Self, Vec<Error>>
    where
        I: IntoIterator<Item = (P, T)>,
        P: AsRef<str>,
        T: AsRef<str>,
    {
        let mut registry = Self::new();
        let mut errors = Vec::new();
        for (path, text) in files {
            for definition in parse_ini(path.as_ref(), text.as_ref()) {
                if definition.steps.is_empty() {
                    errors.push(Error::MissingSteps {
                        name: definition.name.clone(),
                        location: definition.location,
                    });
                    continue;
                }
                if let Some(existing) = registry.definitions.get(&definition.name) {
                    errors.push(Error::DuplicateKey {
                        name: definition.name.clone(),
                        first: existing.location,
                        second: definition.location,
                    });
                    continue;
                }
                registry.insert(definition);
            }
        }
        if errors.is_empty() {
            Ok(registry)
        } else {
            Err(errors)
        }
    }
}

/// Parse one INI-style file's text into its macro sections. Unknown lines
/// that are neither a `[section]` header, a `description = ...` line, nor a
/// recognised `<Keyword> <text>` step line are ignored — the format has no
/// other syntax to reject.
fn parse_ini(path: &str, text: &str) -> Vec<MacroDefinition> {
    let mut out = Vec::new();
    let mut current: Option<MacroDefinition> = None;
    for (line_no, raw_line) in text.lines().enumerate() {
        let line_no = u32::try_from(line_no).unwrap_or(u32::MAX) + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            if let Some(finished) = current.take() {
                out.push(finished);
            }
            current = Some(MacroDefinition {
                name: name.trim().to_owned(),
                description: None,
                steps: Vec::new(),
                source_file: path.to_owned(),
                location: Location::new(line_no, 1),
            });
            continue;
        }
        let Some(def) = current.as_mut() else {
            continue;
        };
        if let Some(value) = line.strip_prefix("description").and_then(|rest| {
            let rest = rest.trim_start();
            rest.strip_prefix('=').map(str::trim)
        }) {
            def.description = Some(value.to_owned());
            continue;
        }
        if let Some((word, text)) = line.split_once(char::is_whitespace) {
            if let Some(keyword) = parse_step_keyword(word) {
                def.steps.push(MacroStepLine {
                    keyword,
                    text: text.trim().to_owned(),
                    location: Location::new(line_no, 1),
                });
            }
        }
    }
    if let Some(finished) = current.take() {
        out.push(finished);
    }
    out
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests assert the rejected-load error cases directly")]
mod tests {
    use super::*;

    const AUTH_INI: &str = concat!(
        "[login as alice]\n",
        "description = logs in as the default admin user\n",
        "Given I am on the login page\n",
        "When I submit valid alice credentials\n",
    );

    #[test]
    fn loads_a_single_macro_with_description() {
        let registry =
            MacroRegistry::load([("auth.ini", AUTH_INI)]).unwrap_or_else(|e| panic!("load should succeed: {e:?}"));
        let def = registry.get("login as alice").unwrap_or_else(|| panic!("macro should be registered"));
        assert_eq!(def.steps.len(), 2);
        assert_eq!(def.description.as_deref(), Some("logs in as the default admin user"));
        assert_eq!(def.steps[0].location.line, 3);
    }

    #[test]
    fn duplicate_keys_across_files_are_rejected() {
        let errors = MacroRegistry::load([("a.ini", AUTH_INI), ("b.ini", AUTH_INI)])
            .expect_err("duplicate macro name should fail to load");
        assert!(matches!(errors.first(), Some(Error::DuplicateKey { .. })));
    }

    #[test]
    fn empty_section_is_rejected() {
        let errors = MacroRegistry::load([("empty.ini", "[nothing here]\n")])
            .expect_err("macro with no steps should fail to load");
        assert!(matches!(errors.first(), Some(Error::MissingSteps { .. })));
    }

    #[test]
    fn unrecognised_lines_are_ignored() {
        let ini = "[m]\n; a comment\nGiven a step\nnot a recognised line\n";
        let registry = MacroRegistry::load([("m.ini", ini)]).unwrap_or_else(|e| panic!("load should succeed: {e:?}"));
        let def = registry.get("m").unwrap_or_else(|| panic!("macro should be registered"));
        assert_eq!(def.steps.len(), 1);
    }
}
