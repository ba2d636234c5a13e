//! Failure signatures and first-occurrence tracking.

use hashbrown::HashSet;

use crate::mutators::MutatorType;

/// Which stage of the pipeline a trial failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Phase {
    /// Lexing.
    Lex,
    /// Parsing.
    Parse,
    /// Pickling.
    Pickle,
    /// Lossless printing.
    LosslessPrint,
    /// Canonical printing.
    Canonical,
}

/// How a trial failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ErrorKind {
    /// The per-trial time budget elapsed.
    Timeout,
    /// A panic escaped the pipeline.
    UncaughtException,
    /// A structured error was returned where none was expected (valid
    /// generation trials only; mutation trials treat this as a pass).
    UnexpectedStructuredError(String),
}

/// The characterization of one saved failure: `{mutator_type, phase,
/// error_type}`. Only the first occurrence of a given signature is kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Signature {
    /// The mutator (or combo) that produced the failing input, `None` for
    /// valid-generation trials.
    pub mutator_type: Option<MutatorType>,
    /// Which stage failed.
    pub phase: Phase,
    /// How it failed.
    pub error_type: ErrorKind,
}

/// Tracks which signatures have already been saved.
#[derive(Debug, Clone, Default)]
pub struct SignatureTracker {
    seen: HashSet<Signature>,
}

impl SignatureTracker {
    /// An empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `signature`, returning `true` iff this is its first
    /// occurrence (and therefore worth saving an artifact for).
    pub fn record_if_new(&mut self, signature: Signature) -> bool {
        self.seen.insert(signature)
    }

    /// Number of distinct signatures recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// `true` iff no signature has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
