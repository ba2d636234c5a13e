//! The step handler shape: the callable a [`crate::registry::Stepdef`]
//! wraps, and the value it hands back to the executor.
//!
//! Step handlers are one of two explicit shapes, captures only or captures
//! plus an execution context, discriminated by the stepdef's declared
//! [`crate::registry::Arity`], not by introspecting the handler itself at
//! call time.

use hashbrown::HashMap;

use crate::pickle::PickleStep;

/// The scenario-level state threaded through a run, merged or replaced by
/// each step's [`StepOutcome`].
pub type ScenarioState = HashMap<String, serde_json::Value>;

/// The execution context passed to handlers whose arity is
/// [`crate::registry::Arity::CapturesAndContext`].
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext<'a> {
    /// The pickle step currently being executed.
    pub step: &'a PickleStep,
    /// The scenario state accumulated so far.
    pub scenario: &'a ScenarioState,
}

/// The explicit sum type replacing the dynamic "map merges, nil ignored,
/// pending sentinel, anything else error" return convention.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Replace the scenario state outright.
    Replace(ScenarioState),
    /// Merge these entries into the scenario state.
    Merge(ScenarioState),
    /// Leave the scenario state as-is.
    Unchanged,
    /// Mark the step (and, by fail-fast, the scenario) pending.
    Pending,
    /// The handler's return value did not fit any recognised shape.
    Invalid(String),
}

/// A registered step's callable handler.
pub trait StepFn: Send + Sync {
    /// Invoke the handler. `context` is `Some` iff the stepdef's arity is
    /// `CapturesAndContext`.
    fn call(&self, captures: &[Option<String>], context: Option<&ExecutionContext<'_>>) -> StepOutcome;
}

impl<F> StepFn for F
where
    F: Fn(&[Option<String>], Option<&ExecutionContext<'_>>) -> StepOutcome + Send + Sync,
{
    fn call(&self, captures: &[Option<String>], context: Option<&ExecutionContext<'_>>) -> StepOutcome {
        self(captures, context)
    }
}
