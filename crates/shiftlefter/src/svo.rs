//! Glossary loading for shifted-mode SVO validation.
//!
//! File I/O itself is an external collaborator's job: callers read each
//! configured glossary path themselves and hand this module `(path, text)`
//! pairs, the same
//! shape [`crate::macro_expansion::MacroRegistry::load`] takes for macro
//! files. A path configured under `svo.glossaries` with no corresponding
//! entry in the supplied files is reported as
//! [`Error::GlossaryFileNotFound`].

use hashbrown::HashMap;
use thiserror::Error;

use crate::binder::Glossary;

/// Errors raised while assembling a [`Glossary`] for shifted mode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// `svo` config was present but named no glossary files.
    #[error("shifted mode requires at least one configured glossary file")]
    MissingGlossariesConfig,
    /// A configured glossary path had no corresponding supplied text.
    #[error("glossary file not found: {path}")]
    GlossaryFileNotFound {
        /// The unreadable path, as configured.
        path: String,
    },
}

/// Parse one glossary file's text. Recognised sections: `[subjects]` (bare
/// symbol lines) and `[verbs.<interface-type>]` (bare symbol lines under
/// that interface type). `;`/`#` lines and blank lines are ignored, mirroring
/// [`crate::macro_expansion::MacroRegistry`]'s INI scanner.
fn parse_glossary_ini(text: &str, glossary: &mut Glossary) {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Section<'a> {
        None,
        Subjects,
        Verbs(&'a str),
    }
    let mut section = Section::None;
    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            section = if name == "subjects" {
                Section::Subjects
            } else if let Some(interface_type) = name.strip_prefix("verbs.") {
                Section::Verbs(interface_type)
            } else {
                Section::None
            };
            continue;
        }
        match section {
            Section::None => {}
            Section::Subjects => {
                glossary.subjects.insert(line.to_owned());
            }
            Section::Verbs(interface_type) => {
                glossary
                    .verbs_by_interface_type
                    .entry(interface_type.to_owned())
                    .or_default()
                    .insert(line.to_owned());
            }
        }
    }
}

/// Assemble a [`Glossary`] from `configured_paths` (the `svo.glossaries`
/// config map, name -> path) and `files` (every path the caller
/// successfully read, as `(path, text)` pairs). Every configured path
/// missing from `files` is reported; a glossary map with no configured
/// paths at all is itself an error (shifted mode with nothing to validate
/// against is a configuration mistake, not silently-permissive).
pub fn load_glossaries<'a, I, T>(
    configured_paths: &HashMap<String, String>,
    files: I,
) -> Result<Glossary, Vec<Error>>
where
    I: IntoIterator<Item = (&'a str, T)>,
    T: AsRef<str>,
{
    if configured_paths.is_empty() {
        return Err(vec![Error::MissingGlossariesConfig]);
    }
    let available: HashMap<&str, T> = files.into_iter().collect();
    let mut errors = Vec::new();
    let mut glossary = Glossary::default();
    for path in configured_paths.values() {
        match available.get(path.as_str()) {
            Some(text) => parse_glossary_ini(text.as_ref(), &mut glossary),
            None => errors.push(Error::GlossaryFileNotFound { path: path.clone() }),
        }
    }
    if errors.is_empty() {
        Ok(glossary)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_glossaries_config_is_an_error_when_paths_are_empty() {
        let paths = HashMap::new();
        let err = load_glossaries(&paths, std::iter::empty::<(&str, &str)>());
        assert_eq!(err, Err(vec![Error::MissingGlossariesConfig]));
    }

    #[test]
    fn unreadable_path_is_reported_per_configured_name() {
        let mut paths = HashMap::new();
        paths.insert("main".to_owned(), "glossary.ini".to_owned());
        let err = load_glossaries(&paths, std::iter::empty::<(&str, &str)>());
        assert_eq!(
            err,
            Err(vec![Error::GlossaryFileNotFound {
                path: "glossary.ini".to_owned()
            }])
        );
    }

    #[test]
    fn parses_subjects_and_verbs_by_interface_type() {
        let mut paths = HashMap::new();
        paths.insert("main".to_owned(), "glossary.ini".to_owned());
        let text = "[subjects]\nalice\nadmin\n\n[verbs.web]\nclick\nsubmit\n";
        let glossary = load_glossaries(&paths, [("glossary.ini", text)])
            .unwrap_or_else(|e| panic!("load should succeed: {e:?}"));
        assert!(glossary.subjects.contains("alice"));
        assert!(glossary.subjects.contains("admin"));
        assert!(glossary
            .verbs_by_interface_type
            .get("web")
            .is_some_and(|set| set.contains("click") && set.contains("submit")));
    }
}
