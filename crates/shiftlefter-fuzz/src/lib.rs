//! Grammar-aware fuzzer and delta-debug minimizer for the `shiftlefter`
//! Gherkin pipeline.
//!
//! Two campaign modes exercise the pipeline: valid-generation trials check
//! that freshly generated, syntactically valid text round-trips and
//! canonicalizes cleanly; mutation trials apply targeted corruption to valid
//! text and check that the parser fails gracefully (structured errors)
//! rather than panicking or hanging. Each first-seen failure is minimized
//! and returned as an [`Artifact`]; writing artifacts to disk is left to the
//! caller.

pub mod artifact;
pub mod generator;
pub mod harness;
pub mod minimizer;
pub mod mutators;
pub mod rng;
pub mod signature;

use std::collections::HashMap;
use std::time::Duration;

use artifact::{Artifact, Meta};
use generator::generate_feature;
use harness::{run_mutation_trial, run_valid_trial, TrialOutcome};
use minimizer::Minimizer;
use mutators::mutate;
use rng::Rng;
use signature::{Signature, SignatureTracker};

/// Shared knobs for a fuzzing campaign.
#[derive(Debug, Clone)]
pub struct CampaignConfig {
    /// How many trials to run.
    pub trials: usize,
    /// Seed the first trial uses; subsequent trials use `base_seed + i`.
    pub base_seed: u64,
    /// Generator/mutator version stamped into every artifact's metadata.
    pub generator_version: u32,
    /// Per-trial time budget passed to the harness.
    pub trial_timeout: Duration,
    /// Wall-clock budget given to minimizing each failure.
    pub minimize_budget: Duration,
    /// Stamped into every artifact verbatim; this crate performs no I/O and
    /// has no business calling into the system clock itself.
    pub timestamp: u64,
}

/// The outcome of running a campaign: one artifact per distinct failure
/// signature encountered, in first-seen order.
#[derive(Debug, Clone)]
pub struct CampaignReport {
    pub artifacts: Vec<Artifact>,
    pub trials_run: usize,
}

fn outcome_to_errors(outcome: &TrialOutcome) -> Vec<String> {
    outcome
        .error
        .as_ref()
        .map(|err| vec![format!("{err:?}")])
        .unwrap_or_default()
}

fn meta_for(config: &CampaignConfig, seed: u64, mutator_version: Option<u32>) -> Meta {
    Meta {
        seed,
        generator_version: config.generator_version,
        mutator_version,
        options: HashMap::new(),
        timestamp: config.timestamp,
    }
}

/// Run `config.trials` valid-generation trials, saving the first case for
/// each distinct failure signature.
#[must_use]
pub fn run_generation_campaign(config: &CampaignConfig) -> CampaignReport {
    let mut tracker = SignatureTracker::new();
    let mut artifacts = Vec::new();
    let minimizer = Minimizer::new(config.minimize_budget);

    for i in 0..config.trials {
        let seed = config.base_seed.wrapping_add(i as u64);
        let case = generate_feature(seed, config.generator_version);
        let outcome = run_valid_trial(&case, config.trial_timeout);
        if outcome.passed {
            continue;
        }
        let Some(phase) = outcome.phase else { continue };
        let Some(error_type) = outcome.error.clone() else {
            continue;
        };
        let signature = Signature {
            mutator_type: None,
            phase,
            error_type,
        };
        if !tracker.record_if_new(signature.clone()) {
            continue;
        }
        let target = signature.clone();
        let minimized = minimizer.minimize(&case, |candidate| {
            let retry = run_valid_trial(candidate, config.trial_timeout);
            !retry.passed
                && retry.phase == Some(target.phase)
                && retry.error.as_ref() == Some(&target.error_type)
        });
        artifacts.push(Artifact::new(
            minimized,
            meta_for(config, seed, None),
            signature,
            outcome_to_errors(&outcome),
            outcome.elapsed,
        ));
    }

    CampaignReport {
        artifacts,
        trials_run: config.trials,
    }
}

/// Run `config.trials` mutation trials, saving the first case for each
/// distinct failure signature.
#[must_use]
pub fn run_mutation_campaign(config: &CampaignConfig) -> CampaignReport {
    let mut tracker = SignatureTracker::new();
    let mut artifacts = Vec::new();
    let minimizer = Minimizer::new(config.minimize_budget);

    for i in 0..config.trials {
        let seed = config.base_seed.wrapping_add(i as u64);
        let base = generate_feature(seed, config.generator_version);
        let mut rng = Rng::new(seed, config.generator_version);
        let (case, mutator_type) = mutate(&base, &mut rng);
        let outcome = run_mutation_trial(&case, config.trial_timeout);
        if outcome.passed {
            continue;
        }
        let Some(phase) = outcome.phase else { continue };
        let Some(error_type) = outcome.error.clone() else {
            continue;
        };
        let signature = Signature {
            mutator_type: Some(mutator_type),
            phase,
            error_type,
        };
        if !tracker.record_if_new(signature.clone()) {
            continue;
        }
        let target = signature.clone();
        let minimized = minimizer.minimize(&case, |candidate| {
            let retry = run_mutation_trial(candidate, config.trial_timeout);
            !retry.passed
                && retry.phase == Some(target.phase)
                && retry.error.as_ref() == Some(&target.error_type)
        });
        artifacts.push(Artifact::new(
            minimized,
            meta_for(config, seed, Some(config.generator_version)),
            signature,
            outcome_to_errors(&outcome),
            outcome.elapsed,
        ));
    }

    CampaignReport {
        artifacts,
        trials_run: config.trials,
    }
}
