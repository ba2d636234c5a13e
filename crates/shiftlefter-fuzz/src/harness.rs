//! Drives one trial of generated or mutated text through the core pipeline
//! and classifies the outcome.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use shiftlefter::dialect::DialectTable;
use shiftlefter::lexer::lex;
use shiftlefter::parser::parse;
use shiftlefter::pickle::pickle_feature;
use shiftlefter::printer::{canonical, print_tokens, CanonicalError};

use crate::signature::{ErrorKind, Phase};

/// Outcome of running one trial.
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    /// `true` iff the trial satisfied every property for its mode.
    pub passed: bool,
    /// Which phase failed, when `!passed`.
    pub phase: Option<Phase>,
    /// How it failed, when `!passed`.
    pub error: Option<ErrorKind>,
    /// Wall-clock time spent on the trial.
    pub elapsed: Duration,
}

impl TrialOutcome {
    fn passed(elapsed: Duration) -> Self {
        Self {
            passed: true,
            phase: None,
            error: None,
            elapsed,
        }
    }

    fn failed(phase: Phase, error: ErrorKind, elapsed: Duration) -> Self {
        Self {
            passed: false,
            phase: Some(phase),
            error: Some(error),
            elapsed,
        }
    }
}

/// Run the "valid generation" checks: parse with zero errors, pickle
/// successfully, lossless round-trip, and an idempotent canonical form (or
/// `rules_unsupported`, which is an acceptable outcome).
#[must_use]
pub fn run_valid_trial(source: &str, timeout: Duration) -> TrialOutcome {
    let started = Instant::now();
    let dialect = DialectTable::get("en");

    let tokens = match panic::catch_unwind(AssertUnwindSafe(|| lex(source, &dialect))) {
        Ok(tokens) => tokens,
        Err(_) => return TrialOutcome::failed(Phase::Lex, ErrorKind::UncaughtException, started.elapsed()),
    };
    if started.elapsed() > timeout {
        return TrialOutcome::failed(Phase::Lex, ErrorKind::Timeout, started.elapsed());
    }

    if print_tokens(&tokens) != source {
        return TrialOutcome::failed(
            Phase::LosslessPrint,
            ErrorKind::UnexpectedStructuredError("print_tokens(lex(x)) != x".to_owned()),
            started.elapsed(),
        );
    }

    let parsed = match panic::catch_unwind(AssertUnwindSafe(|| parse(&tokens))) {
        Ok(parsed) => parsed,
        Err(_) => return TrialOutcome::failed(Phase::Parse, ErrorKind::UncaughtException, started.elapsed()),
    };
    if !parsed.errors.is_empty() {
        return TrialOutcome::failed(
            Phase::Parse,
            ErrorKind::UnexpectedStructuredError(format!("{} parse error(s)", parsed.errors.len())),
            started.elapsed(),
        );
    }
    let Some(feature) = parsed.feature else {
        return TrialOutcome::failed(
            Phase::Parse,
            ErrorKind::UnexpectedStructuredError("no feature produced".to_owned()),
            started.elapsed(),
        );
    };

    let pickles = match panic::catch_unwind(AssertUnwindSafe(|| pickle_feature(&feature))) {
        Ok(pickles) => pickles,
        Err(_) => return TrialOutcome::failed(Phase::Pickle, ErrorKind::UncaughtException, started.elapsed()),
    };
    if pickles.is_empty() {
        return TrialOutcome::failed(
            Phase::Pickle,
            ErrorKind::UnexpectedStructuredError("zero pickles produced".to_owned()),
            started.elapsed(),
        );
    }

    match canonical(&feature) {
        Err(CanonicalError::RulesUnsupported) => TrialOutcome::passed(started.elapsed()),
        Ok(once) => {
            let reparsed = parse(&lex(&once, &dialect));
            let Some(refeature) = reparsed.feature else {
                return TrialOutcome::failed(
                    Phase::Canonical,
                    ErrorKind::UnexpectedStructuredError("canonical output failed to reparse".to_owned()),
                    started.elapsed(),
                );
            };
            match canonical(&refeature) {
                Ok(twice) if twice == once => TrialOutcome::passed(started.elapsed()),
                Ok(_) => TrialOutcome::failed(
                    Phase::Canonical,
                    ErrorKind::UnexpectedStructuredError("canonical output is not idempotent".to_owned()),
                    started.elapsed(),
                ),
                Err(err) => TrialOutcome::failed(
                    Phase::Canonical,
                    ErrorKind::UnexpectedStructuredError(err.to_string()),
                    started.elapsed(),
                ),
            }
        }
    }
}

/// Run the mutation-fuzzing check: the parser must return structured
/// errors, not panic or exceed `timeout`.
#[must_use]
pub fn run_mutation_trial(source: &str, timeout: Duration) -> TrialOutcome {
    let started = Instant::now();
    let dialect = DialectTable::get("en");
    let tokens = match panic::catch_unwind(AssertUnwindSafe(|| lex(source, &dialect))) {
        Ok(tokens) => tokens,
        Err(_) => return TrialOutcome::failed(Phase::Lex, ErrorKind::UncaughtException, started.elapsed()),
    };
    let parse_result = panic::catch_unwind(AssertUnwindSafe(|| parse(&tokens)));
    let elapsed = started.elapsed();
    if elapsed > timeout {
        return TrialOutcome::failed(Phase::Parse, ErrorKind::Timeout, elapsed);
    }
    match parse_result {
        Ok(_) => TrialOutcome::passed(elapsed),
        Err(_) => TrialOutcome::failed(Phase::Parse, ErrorKind::UncaughtException, elapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_feature;
    use crate::mutators::mutate;
    use crate::rng::Rng;

    #[test]
    fn a_freshly_generated_feature_always_passes_the_valid_trial() {
        for seed in 0..20 {
            let src = generate_feature(seed, 1);
            let outcome = run_valid_trial(&src, Duration::from_secs(1));
            assert!(outcome.passed, "seed {seed} failed: {:?}/{:?}", outcome.phase, outcome.error);
        }
    }

    #[test]
    fn mutated_text_never_produces_an_uncaught_exception() {
        let base = generate_feature(3, 1);
        let mut rng = Rng::new(11, 1);
        for _ in 0..30 {
            let (mutated, _kind) = mutate(&base, &mut rng);
            let outcome = run_mutation_trial(&mutated, Duration::from_secs(1));
            assert!(!matches!(outcome.error, Some(ErrorKind::UncaughtException)));
        }
    }
}
