//! The step registry (component G): a process-wide index of registered step
//! definitions, keyed by a deterministic digest of their pattern source.
//!
//! Registration is append-only in normal operation. Rather than an
//! `inventory`-based compile-time collection, it is backed by a runtime
//! `Mutex<Vec<Stepdef>>` behind a `LazyLock` so tests can reset it between
//! cases via [`clear`].

use std::sync::{Arc, LazyLock, Mutex};

pub use regex::Regex;
use thiserror::Error;

use crate::location::Location;
use crate::step_fn::StepFn;

/// Errors raised while registering a step definition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Two stepdefs were registered with the same `pattern_src`.
    #[error("step pattern {pattern_src:?} is already registered (first at {first}, again at {second})")]
    Duplicate {
        /// The shared pattern source.
        pattern_src: String,
        /// Location of the first registration.
        first: Location,
        /// Location of the duplicate registration.
        second: Location,
    },
    /// A variadic step function was registered.
    #[error("step pattern {pattern_src:?} at {location} has a variadic handler, which is not supported")]
    VariadicRejected {
        /// The pattern source of the rejected registration.
        pattern_src: String,
        /// Location of the rejected registration.
        location: Location,
    },
}

/// Where a stepdef's handler lives in source.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SourceRef {
    /// Module path of the handler.
    pub module: String,
    /// File the handler is defined in.
    pub file: String,
    /// Line the handler is defined at.
    pub line: u32,
}

/// Subject/verb/object metadata attached to a stepdef, consulted by the
/// binder's SVOI extraction.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SvoMetadata {
    /// Subject symbol, or `$N` to extract it from capture group N.
    pub subject: String,
    /// Verb symbol.
    pub verb: String,
    /// Object symbol, or `$N` to extract it from capture group N.
    pub object: String,
}

/// Optional metadata attached to a stepdef at registration time, carried
/// verbatim and not inspected until the binder consults it.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct Metadata {
    /// The interface symbol this step operates through.
    pub interface: Option<String>,
    /// Subject/verb/object classification.
    pub svo: Option<SvoMetadata>,
}

/// A registered step function's fixed arity, as introspected at
/// registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Arity {
    /// Takes exactly `n` captures and no execution context.
    Captures(usize),
    /// Takes `n` captures followed by the execution context.
    CapturesAndContext(usize),
}

impl Arity {
    /// The numeric arity regardless of shape.
    #[must_use]
    pub const fn count(self) -> usize {
        match self {
            Self::Captures(n) | Self::CapturesAndContext(n) => n,
        }
    }

    /// `true` if this arity expects the execution context as its last
    /// argument.
    #[must_use]
    pub const fn takes_context(self) -> bool {
        matches!(self, Self::CapturesAndContext(_))
    }
}

/// A registered step definition.
#[derive(Clone)]
pub struct Stepdef {
    /// Deterministic `sd-<16 hex>` identifier derived from `pattern_src`.
    pub id: String,
    /// Compiled pattern used for full-string matching.
    pub pattern: Regex,
    /// The original pattern source text, before compilation.
    pub pattern_src: String,
    /// Declared arity.
    pub arity: Arity,
    /// The callable the executor invokes once this stepdef is bound.
    pub handler: Arc<dyn StepFn>,
    /// Where this stepdef's handler is defined.
    pub source: SourceRef,
    /// Attached metadata, if any.
    pub metadata: Metadata,
}

impl std::fmt::Debug for Stepdef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stepdef")
            .field("id", &self.id)
            .field("pattern_src", &self.pattern_src)
            .field("arity", &self.arity)
            .field("source", &self.source)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Stepdef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Stepdef {}

/// Deterministic id for a stepdef, a stable 64-bit FNV-1a hash of
/// `pattern_src` rendered as `sd-<16 hex>`.
#[must_use]
pub fn stepdef_id(pattern_src: &str) -> String {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = FNV_OFFSET;
    for byte in pattern_src.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    format!("sd-{hash:016x}")
}

static REGISTRY: LazyLock<Mutex<Vec<Arc<Stepdef>>>> = LazyLock::new(|| Mutex::new(Vec::new()));

#[expect(
    clippy::unwrap_used,
    reason = "the registry mutex is never held across a panic, so poisoning cannot occur in practice"
)]
fn lock() -> std::sync::MutexGuard<'static, Vec<Arc<Stepdef>>> {
    REGISTRY.lock().unwrap()
}

/// Register a step definition. Fails if another stepdef with the same
/// `pattern_src` is already registered, or if `arity` was computed from a
/// variadic handler (the caller is expected to reject variadic handlers
/// before constructing a [`Stepdef`]; this is a defence-in-depth check for
/// callers that construct one manually).
pub fn register(stepdef: Stepdef) -> Result<(), Error> {
    let mut steps = lock();
    if let Some(existing) = steps.iter().find(|s| s.pattern_src == stepdef.pattern_src) {
        return Err(Error::Duplicate {
            pattern_src: stepdef.pattern_src.clone(),
            first: Location::new(existing.source.line, 1),
            second: Location::new(stepdef.source.line, 1),
        });
    }
    steps.push(Arc::new(stepdef));
    Ok(())
}

/// Take an owned, consistent snapshot of every currently registered
/// stepdef. The binder acquires this once at plan-building entry.
#[must_use]
pub fn snapshot() -> Vec<Arc<Stepdef>> {
    lock().clone()
}

/// Number of stepdefs currently registered.
#[must_use]
pub fn len() -> usize {
    lock().len()
}

/// Reset the registry to empty. Test-only: production call sites must never
/// call this, since the registry is meant to be append-only for the
/// lifetime of a process.
pub fn clear() {
    lock().clear();
}

/// Register a step definition declaratively.
///
/// ```ignore
/// register_step! {
///     pattern: r#"^I am on the login page$"#,
///     arity: Arity::Captures(0),
///     handler: |_captures, _ctx| StepOutcome::Unchanged,
///     module: "steps::login",
///     file: "steps/login.rs",
///     line: 12,
/// }
/// ```
///
/// Panics at registration time if the pattern fails to compile or a
/// duplicate/variadic handler is registered. These are programmer errors,
/// not runtime input errors.
#[macro_export]
macro_rules! register_step {
    (pattern: $pattern:expr, arity: $arity:expr, handler: $handler:expr, module: $module:expr, file: $file:expr, line: $line:expr $(,)?) => {{
        let pattern_src = $pattern.to_string();
        let compiled = $crate::registry::Regex::new(&pattern_src)
            .unwrap_or_else(|err| panic!("invalid step pattern {pattern_src:?}: {err}"));
        let handler: std::sync::Arc<dyn $crate::step_fn::StepFn> = std::sync::Arc::new($handler);
        let stepdef = $crate::registry::Stepdef {
            id: $crate::registry::stepdef_id(&pattern_src),
            pattern: compiled,
            pattern_src,
            arity: $arity,
            handler,
            source: $crate::registry::SourceRef {
                module: $module.to_string(),
                file: $file.to_string(),
                line: $line,
            },
            metadata: $crate::registry::Metadata::default(),
        };
        $crate::registry::register(stepdef)
            .unwrap_or_else(|err| panic!("step registration failed: {err}"))
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    static TEST_LOCK: StdMutex<()> = StdMutex::new(());

    fn stepdef(pattern_src: &str, line: u32) -> Stepdef {
        Stepdef {
            id: stepdef_id(pattern_src),
            pattern: Regex::new(pattern_src).unwrap_or_else(|e| panic!("pattern should compile: {e}")),
            pattern_src: pattern_src.to_owned(),
            arity: Arity::Captures(0),
            handler: std::sync::Arc::new(|_captures: &[Option<String>], _ctx: Option<&crate::step_fn::ExecutionContext<'_>>| {
                crate::step_fn::StepOutcome::Unchanged
            }),
            source: SourceRef {
                module: "steps".to_owned(),
                file: "steps.rs".to_owned(),
                line,
            },
            metadata: Metadata::default(),
        }
    }

    #[test]
    fn id_is_a_deterministic_function_of_pattern_src() {
        assert_eq!(stepdef_id("^a$"), stepdef_id("^a$"));
        assert_ne!(stepdef_id("^a$"), stepdef_id("^b$"));
    }

    #[test]
    fn register_and_snapshot_roundtrip() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear();
        register(stepdef("^one$", 1)).unwrap_or_else(|e| panic!("register should succeed: {e}"));
        let snap = snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].pattern_src, "^one$");
        clear();
    }

    #[test]
    fn duplicate_pattern_src_is_rejected() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear();
        register(stepdef("^dup$", 1)).unwrap_or_else(|e| panic!("register should succeed: {e}"));
        let err = register(stepdef("^dup$", 2));
        assert!(matches!(err, Err(Error::Duplicate { .. })));
        clear();
    }

    #[test]
    fn clear_empties_the_registry() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear();
        register(stepdef("^x$", 1)).unwrap_or_else(|e| panic!("register should succeed: {e}"));
        clear();
        assert_eq!(len(), 0);
    }
}
