//! The executor (component J): drives compiled plans scenario by scenario
//! with fail-fast, pending-propagation, and synthetic-wrapper rollup
//! semantics.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::HashMap;

use crate::binder::{BindingStatus, Plan};
use crate::pickle::MacroProvenance;
use crate::registry::Stepdef;
use crate::step_fn::{ExecutionContext, ScenarioState, StepOutcome};

/// Rollup precedence shared by wrapper rollup and scenario/suite rollup:
/// `failed > pending > skipped > passed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Status {
    /// The step, scenario, or suite ran to completion without error.
    Passed,
    /// Fail-fast was triggered somewhere in this unit.
    Failed,
    /// A step returned the pending sentinel.
    Pending,
    /// Never attempted, because an earlier step in the same unit halted.
    Skipped,
}

impl Status {
    const fn ordinal(self) -> u8 {
        match self {
            Self::Failed => 0,
            Self::Pending => 1,
            Self::Skipped => 2,
            Self::Passed => 3,
        }
    }

    /// `true` iff this status should trigger fail-fast for subsequent steps
    /// in the same scenario.
    #[must_use]
    pub const fn halts(self) -> bool {
        matches!(self, Self::Failed | Self::Pending)
    }
}

/// Fold a run of statuses by rollup precedence; an empty run rolls up to
/// `Passed`.
#[must_use]
pub fn rollup(statuses: impl IntoIterator<Item = Status>) -> Status {
    statuses
        .into_iter()
        .min_by_key(|s| s.ordinal())
        .unwrap_or(Status::Passed)
}

/// Which `step/*` error code a failed step carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum StepErrorKind {
    /// The handler panicked.
    Exception,
    /// The handler returned [`StepOutcome::Invalid`].
    InvalidReturn,
    /// The handler ran past its allotted time budget.
    Timeout,
}

impl StepErrorKind {
    /// The namespaced error code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Exception => "step/exception",
            Self::InvalidReturn => "step/invalid_return",
            Self::Timeout => "step/timeout",
        }
    }
}

/// Detail recorded for a failed step.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StepError {
    /// Which failure mode this is.
    pub kind: StepErrorKind,
    /// Human-readable detail.
    pub message: String,
}

/// Outcome of one pickle step's run, or lack of one.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StepResult {
    /// The pickle step's id.
    pub step_id: String,
    /// Rollup or direct execution status.
    pub status: Status,
    /// Captures the step was invoked with, when it was invoked at all.
    pub captures: Option<Vec<Option<String>>>,
    /// Failure detail, present only when `status == Failed`.
    pub error: Option<StepError>,
}

/// Outcome of running one scenario (pickle) to completion.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScenarioResult {
    /// The pickle's id.
    pub pickle_id: String,
    /// The pickle's expanded name.
    pub name: String,
    /// Per-step results, in pickle step order.
    pub steps: Vec<StepResult>,
    /// Rolled-up scenario status.
    pub status: Status,
}

/// Aggregate pass/fail/pending/skip counts across a suite.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct SuiteCounts {
    /// Number of scenarios that passed.
    pub passed: usize,
    /// Number of scenarios that failed.
    pub failed: usize,
    /// Number of scenarios left pending.
    pub pending: usize,
    /// Number of scenarios skipped outright (non-runnable plans).
    pub skipped: usize,
}

/// Outcome of running every plan in a suite.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SuiteResult {
    /// Per-scenario results, in plan order.
    pub scenarios: Vec<ScenarioResult>,
    /// Aggregate counts.
    pub counts: SuiteCounts,
    /// Rolled-up suite status.
    pub status: Status,
}

/// Render a caught panic payload into a human-readable message, preferring
/// string payloads and falling back to `Debug` formatting.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

fn execute_step(
    stepdef: &Stepdef,
    captures: &[Option<String>],
    step: &crate::pickle::PickleStep,
    scenario: &mut ScenarioState,
    timeout: Duration,
) -> StepResult {
    let context = stepdef
        .arity
        .takes_context()
        .then(|| ExecutionContext { step, scenario: &*scenario });
    let handler = Arc::clone(&stepdef.handler);
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.call(captures, context.as_ref())));
    let elapsed = started.elapsed();
    let (status, error, next_state) = match outcome {
        Err(payload) => (
            Status::Failed,
            Some(StepError {
                kind: StepErrorKind::Exception,
                message: panic_message(payload.as_ref()),
            }),
            None,
        ),
        Ok(_) if elapsed > timeout => (
            Status::Failed,
            Some(StepError {
                kind: StepErrorKind::Timeout,
                message: format!("step exceeded its {timeout:?} budget ({elapsed:?} elapsed)"),
            }),
            None,
        ),
        Ok(StepOutcome::Replace(state)) => (Status::Passed, None, Some(state)),
        Ok(StepOutcome::Merge(state)) => {
            let mut merged = scenario.clone();
            merged.extend(state);
            (Status::Passed, None, Some(merged))
        }
        Ok(StepOutcome::Unchanged) => (Status::Passed, None, None),
        Ok(StepOutcome::Pending) => (Status::Pending, None, None),
        Ok(StepOutcome::Invalid(reason)) => (
            Status::Failed,
            Some(StepError {
                kind: StepErrorKind::InvalidReturn,
                message: reason,
            }),
            None,
        ),
    };
    if let Some(state) = next_state {
        *scenario = state;
    }
    StepResult {
        step_id: step.id.clone(),
        status,
        captures: Some(captures.to_vec()),
        error,
    }
}

fn skipped(step_id: &str) -> StepResult {
    StepResult {
        step_id: step_id.to_owned(),
        status: Status::Skipped,
        captures: None,
        error: None,
    }
}

/// Execute one macro wrapper's contiguous run of expanded children starting
/// at `start` (the index right after the wrapper). Returns the children's
/// results (in order) and whether the run halted fail-fast.
fn execute_macro_children(
    plan: &Plan,
    start: usize,
    key: &str,
    stepdefs_by_id: &HashMap<String, Arc<Stepdef>>,
    scenario: &mut ScenarioState,
    timeout: Duration,
) -> (Vec<StepResult>, usize) {
    let mut results = Vec::new();
    let mut halted = false;
    let mut j = start;
    while j < plan.bound_steps.len() {
        let child_pickle_step = &plan.pickle.steps[j];
        let is_child =
            matches!(&child_pickle_step.macro_info, Some(MacroProvenance::Expanded { key: k, .. }) if k == key);
        if !is_child {
            break;
        }
        if halted {
            results.push(skipped(&plan.bound_steps[j].step_id));
        } else {
            let binding = &plan.bound_steps[j];
            let result = match binding.stepdef_id.as_ref().and_then(|id| stepdefs_by_id.get(id)) {
                Some(stepdef) => execute_step(
                    stepdef,
                    binding.captures.as_deref().unwrap_or(&[]),
                    child_pickle_step,
                    scenario,
                    timeout,
                ),
                None => StepResult {
                    step_id: binding.step_id.clone(),
                    status: Status::Failed,
                    captures: None,
                    error: Some(StepError {
                        kind: StepErrorKind::Exception,
                        message: "matched stepdef absent from the registry snapshot".to_owned(),
                    }),
                },
            };
            if result.status.halts() {
                halted = true;
            }
            results.push(result);
        }
        j += 1;
    }
    (results, j)
}

/// Run one plan to completion. A non-runnable plan is never executed: every
/// step is recorded `Skipped` and the scenario status is `Skipped`.
#[must_use]
pub fn execute_scenario(plan: &Plan, stepdefs_by_id: &HashMap<String, Arc<Stepdef>>, timeout: Duration) -> ScenarioResult {
    if !plan.runnable {
        let steps = plan.bound_steps.iter().map(|b| skipped(&b.step_id)).collect();
        return ScenarioResult {
            pickle_id: plan.pickle.id.clone(),
            name: plan.pickle.name.clone(),
            steps,
            status: Status::Skipped,
        };
    }

    let mut scenario_state = ScenarioState::new();
    let mut results: Vec<StepResult> = Vec::with_capacity(plan.bound_steps.len());
    let mut halted = false;
    let mut i = 0usize;
    while i < plan.bound_steps.len() {
        let binding = &plan.bound_steps[i];
        if halted {
            results.push(skipped(&binding.step_id));
            i += 1;
            continue;
        }
        let pickle_step = &plan.pickle.steps[i];
        match binding.status {
            BindingStatus::Synthetic => {
                let key = match &pickle_step.macro_info {
                    Some(MacroProvenance::Call { key, .. }) => key.clone(),
                    _ => String::new(),
                };
                let (child_results, next_index) =
                    execute_macro_children(plan, i + 1, &key, stepdefs_by_id, &mut scenario_state, timeout);
                let wrapper_status = rollup(child_results.iter().map(|r| r.status));
                if wrapper_status.halts() {
                    halted = true;
                }
                results.push(StepResult {
                    step_id: binding.step_id.clone(),
                    status: wrapper_status,
                    captures: None,
                    error: None,
                });
                results.extend(child_results);
                i = next_index;
            }
            BindingStatus::Matched => {
                let result = match binding.stepdef_id.as_ref().and_then(|id| stepdefs_by_id.get(id)) {
                    Some(stepdef) => execute_step(
                        stepdef,
                        binding.captures.as_deref().unwrap_or(&[]),
                        pickle_step,
                        &mut scenario_state,
                        timeout,
                    ),
                    None => StepResult {
                        step_id: binding.step_id.clone(),
                        status: Status::Failed,
                        captures: None,
                        error: Some(StepError {
                            kind: StepErrorKind::Exception,
                            message: "matched stepdef absent from the registry snapshot".to_owned(),
                        }),
                    },
                };
                if result.status.halts() {
                    halted = true;
                }
                results.push(result);
                i += 1;
            }
            BindingStatus::Undefined | BindingStatus::Ambiguous => {
                // Unreachable for a runnable plan, since `runnable?` requires
                // every step matched or synthetic; skip defensively rather
                // than invoking nothing.
                results.push(skipped(&binding.step_id));
                i += 1;
            }
        }
    }

    let status = rollup(results.iter().map(|r| r.status));
    ScenarioResult {
        pickle_id: plan.pickle.id.clone(),
        name: plan.pickle.name.clone(),
        steps: results,
        status,
    }
}

/// Build the id -> stepdef lookup table [`execute_scenario`] needs from a
/// registry snapshot.
#[must_use]
pub fn index_stepdefs(stepdefs: &[Arc<Stepdef>]) -> HashMap<String, Arc<Stepdef>> {
    stepdefs.iter().map(|s| (s.id.clone(), Arc::clone(s))).collect()
}

/// Execute every plan in `plans`, continuing after scenario failures, and
/// aggregate the suite-level result.
#[must_use]
pub fn execute_suite(plans: &[Plan], stepdefs: &[Arc<Stepdef>], timeout: Duration) -> SuiteResult {
    let by_id = index_stepdefs(stepdefs);
    let scenarios: Vec<ScenarioResult> = plans.iter().map(|plan| execute_scenario(plan, &by_id, timeout)).collect();
    let mut counts = SuiteCounts::default();
    for scenario in &scenarios {
        match scenario.status {
            Status::Passed => counts.passed += 1,
            Status::Failed => counts.failed += 1,
            Status::Pending => counts.pending += 1,
            Status::Skipped => counts.skipped += 1,
        }
    }
    let status = rollup(scenarios.iter().map(|s| s.status));
    SuiteResult { scenarios, counts, status }
}
