//! `shiftlefter`: a lossless Gherkin toolkit — lexer, parser, picker,
//! macro expander, step binder/compiler, fail-fast executor, and a pair of
//! printers (lossless and canonical).
//!
//! The crate never performs file I/O or owns a process-wide runtime; every
//! module takes already-read text (or, for the step registry, already
//! linked handlers) and hands back plain values. Reading feature files,
//! loading macro/glossary files, and driving a CLI or test harness around
//! this crate are all a host's job, not this crate's.

pub mod binder;
pub mod compiler;
pub mod config;
pub mod dialect;
pub mod executor;
pub mod lexer;
pub mod location;
pub mod macro_expansion;
pub mod parser;
pub mod pickle;
pub mod printer;
pub mod registry;
pub mod source;
pub mod step_fn;
pub mod svo;

pub use compiler::{compile, CompileOutput};
pub use executor::{execute_scenario, execute_suite, ScenarioResult, Status, SuiteResult};
pub use location::Location;
pub use pickle::{pickle_feature, Pickle};
pub use registry::{register, Stepdef};
