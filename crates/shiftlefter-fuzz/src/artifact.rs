//! The on-disk shape of a saved failure. Serialization is this crate's
//! concern; writing the directory tree is left to the caller, since where
//! artifacts live is a deployment decision, not a fuzzing one.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use crate::signature::Signature;

/// Everything needed to reproduce a trial byte for byte.
#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    /// The seed that produced (or, for a mutation trial, fed into) the case.
    pub seed: u64,
    /// Version of the generator that produced the base text.
    pub generator_version: u32,
    /// Version of the mutator set in play, when the trial mutated its input.
    pub mutator_version: Option<u32>,
    /// Free-form run configuration (timeout, mode, and similar knobs).
    pub options: HashMap<String, String>,
    /// Unix timestamp, in seconds, supplied by the caller at save time.
    pub timestamp: u64,
}

/// The result half of a saved failure.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// The failure signature this case reproduces.
    pub signature: Signature,
    /// Any diagnostic text collected along the way (parse errors, the
    /// panic message, and so on).
    pub errors: Vec<String>,
    /// Wall-clock time the trial took.
    pub timing: Duration,
}

/// One saved failure: the input text plus enough metadata to reproduce and
/// triage it without rerunning the whole campaign.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    /// The Gherkin text that triggered the failure.
    pub case: String,
    pub meta: Meta,
    pub result: RunResult,
}

impl Artifact {
    /// Build an artifact from a failing case and its trial outcome.
    #[must_use]
    pub fn new(case: String, meta: Meta, signature: Signature, errors: Vec<String>, timing: Duration) -> Self {
        Self {
            case,
            meta,
            result: RunResult {
                signature,
                errors,
                timing,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{ErrorKind, Phase};

    #[test]
    fn artifact_serializes_to_json() {
        let artifact = Artifact::new(
            "Feature: F\n".to_owned(),
            Meta {
                seed: 1,
                generator_version: 1,
                mutator_version: Some(1),
                options: HashMap::new(),
                timestamp: 0,
            },
            Signature {
                mutator_type: None,
                phase: Phase::Parse,
                error_type: ErrorKind::Timeout,
            },
            vec!["boom".to_owned()],
            Duration::from_millis(5),
        );
        let json = serde_json::to_string(&artifact).unwrap_or_else(|err| panic!("serialize failed: {err}"));
        assert!(json.contains("\"case\":\"Feature: F\\n\""));
        assert!(json.contains("\"phase\":\"Parse\""));
    }
}
