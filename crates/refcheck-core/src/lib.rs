//! Core library of the refcheck regression harness.
//!
//! Two subsystems cooperate here. The resolver maps an execution context
//! (computing mode, platform) to the one reference directory a test run
//! must be compared against, and certifies that the candidate set is
//! globally coherent. The engine then compares the run's `results`
//! directory against that reference with numeric tolerance, kind-specific
//! filtering, and an ordered chain of recovery strategies for known benign
//! differences, and renders a deterministic comparison log.

pub mod classify;
pub mod compare;
pub mod context;
pub mod domain;
pub mod engine;
pub mod report;
pub mod resolver;

pub use classify::{FileClassifier, FileKind};
pub use context::{Context, ContextVocabulary};
pub use domain::{HarnessError, HarnessErrorCategory, HarnessResult};
pub use engine::{CheckConfig, ComparisonOutcome, Engine, run_check};
pub use report::{SummaryBlock, parse_summary};
pub use resolver::{discover_reference_candidates, resolve, validate_candidate_name};
