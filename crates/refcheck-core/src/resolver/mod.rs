//! Reference-context resolution.
//!
//! A test directory may hold several `results.ref*` directories, each tagged
//! with the context values it covers. Resolution parses every candidate name,
//! certifies that the whole set is coherent for every concrete context, and
//! returns the directory applicable to the context in force. Matching is
//! substring-based on value tokens, which the vocabulary invariants keep
//! unambiguous.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::context::{Context, ContextVocabulary};
use crate::domain::{HarnessError, HarnessResult};

/// Base token of every reference directory name.
pub const REFERENCE_DIR_PREFIX: &str = "results.ref";
/// Separates axis groups ("and" semantics).
pub const AND_SEPARATOR: char = '-';
/// Separates values inside an axis group ("or" semantics).
pub const OR_SEPARATOR: char = '_';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error(
        "reference directory '{name}' must be '{REFERENCE_DIR_PREFIX}' optionally followed by \
         '-'-separated context groups"
    )]
    BadPrefix { name: String },
    #[error("reference directory '{name}' contains an empty context group")]
    EmptyAndGroup { name: String },
    #[error("reference directory '{name}' contains an empty value inside a context group")]
    EmptyOrValue { name: String },
    #[error("reference directory '{name}' uses unknown context value '{value}'")]
    UnknownValue { name: String, value: String },
    #[error(
        "reference directory '{name}' mixes values of axes '{first_axis}' and '{second_axis}' \
         in one group"
    )]
    MixedAxes {
        name: String,
        first_axis: String,
        second_axis: String,
    },
    #[error("reference directory '{name}' group '{group}' is not sorted")]
    UnsortedGroup { name: String, group: String },
    #[error(
        "reference directory '{name}' group '{group}' enumerates every value of axis '{axis}'; \
         drop the group instead"
    )]
    FullAxisGroup {
        name: String,
        group: String,
        axis: String,
    },
    #[error("reference directory '{name}' specifies axis '{axis}' more than once")]
    RepeatedAxis { name: String, axis: String },
    #[error("reference directory '{name}' orders its groups against the declared axis order")]
    MisorderedAxes { name: String },
    #[error("context ({context}) is matched equally by reference directories {candidates:?}")]
    AmbiguousMatch {
        context: String,
        candidates: Vec<String>,
    },
    #[error("no reference directory applies to context ({context})")]
    NoCandidate { context: String },
    #[error("reference directory '{name}' is never selected by any context")]
    UnusedCandidate { name: String },
}

impl From<ResolutionError> for HarnessError {
    fn from(error: ResolutionError) -> Self {
        let code = match &error {
            ResolutionError::AmbiguousMatch { .. } => "RESOLVE.AMBIGUOUS",
            ResolutionError::NoCandidate { .. } => "RESOLVE.NO_CANDIDATE",
            ResolutionError::UnusedCandidate { .. } => "RESOLVE.UNUSED",
            _ => "RESOLVE.GRAMMAR",
        };
        HarnessError::resolution(code, error.to_string())
    }
}

/// Checks one candidate directory name against the naming grammar.
pub fn validate_candidate_name(
    vocabulary: &ContextVocabulary,
    name: &str,
) -> Result<(), ResolutionError> {
    let bad_prefix = || ResolutionError::BadPrefix {
        name: name.to_string(),
    };
    let suffix = name.strip_prefix(REFERENCE_DIR_PREFIX).ok_or_else(bad_prefix)?;
    if suffix.is_empty() {
        return Ok(());
    }
    let groups = suffix.strip_prefix(AND_SEPARATOR).ok_or_else(bad_prefix)?;

    let mut previous_axis: Option<usize> = None;
    for group in groups.split(AND_SEPARATOR) {
        if group.is_empty() {
            return Err(ResolutionError::EmptyAndGroup {
                name: name.to_string(),
            });
        }
        let mut group_axis: Option<usize> = None;
        let mut previous_value: Option<&str> = None;
        let mut value_count = 0usize;
        for value in group.split(OR_SEPARATOR) {
            if value.is_empty() {
                return Err(ResolutionError::EmptyOrValue {
                    name: name.to_string(),
                });
            }
            let axis_index =
                vocabulary
                    .value_axis(value)
                    .ok_or_else(|| ResolutionError::UnknownValue {
                        name: name.to_string(),
                        value: value.to_string(),
                    })?;
            match group_axis {
                None => group_axis = Some(axis_index),
                Some(seen) if seen != axis_index => {
                    return Err(ResolutionError::MixedAxes {
                        name: name.to_string(),
                        first_axis: axis_name(vocabulary, seen),
                        second_axis: axis_name(vocabulary, axis_index),
                    });
                }
                Some(_) => {}
            }
            if let Some(previous) = previous_value {
                if previous >= value {
                    return Err(ResolutionError::UnsortedGroup {
                        name: name.to_string(),
                        group: group.to_string(),
                    });
                }
            }
            previous_value = Some(value);
            value_count += 1;
        }
        let axis_index = group_axis.ok_or_else(|| ResolutionError::EmptyAndGroup {
            name: name.to_string(),
        })?;
        if value_count == axis_value_count(vocabulary, axis_index) {
            return Err(ResolutionError::FullAxisGroup {
                name: name.to_string(),
                group: group.to_string(),
                axis: axis_name(vocabulary, axis_index),
            });
        }
        if let Some(previous) = previous_axis {
            if axis_index == previous {
                return Err(ResolutionError::RepeatedAxis {
                    name: name.to_string(),
                    axis: axis_name(vocabulary, axis_index),
                });
            }
            if axis_index < previous {
                return Err(ResolutionError::MisorderedAxes {
                    name: name.to_string(),
                });
            }
        }
        previous_axis = Some(axis_index);
    }
    Ok(())
}

fn axis_name(vocabulary: &ContextVocabulary, index: usize) -> String {
    vocabulary
        .axis(index)
        .map(|axis| axis.name().to_string())
        .unwrap_or_default()
}

fn axis_value_count(vocabulary: &ContextVocabulary, index: usize) -> usize {
    vocabulary.axis(index).map_or(0, |axis| axis.values().len())
}

/// Resolves the reference directory for `context`, certifying on the way that
/// the candidate set is coherent for every concrete context: one best match
/// per context, no ties, no candidate left unused.
pub fn resolve(
    vocabulary: &ContextVocabulary,
    candidates: &BTreeSet<String>,
    context: &Context,
) -> Result<String, ResolutionError> {
    if candidates.is_empty() {
        return Ok(REFERENCE_DIR_PREFIX.to_string());
    }
    for name in candidates {
        validate_candidate_name(vocabulary, name)?;
    }

    let mut used: BTreeSet<&str> = BTreeSet::new();
    let mut queried_selection: Option<String> = None;
    for concrete in vocabulary.enumerate_contexts() {
        let selected = select_for_context(candidates, &concrete)?;
        used.insert(selected.as_str());
        if concrete == *context {
            queried_selection = Some(selected.clone());
        }
    }
    for name in candidates {
        if !used.contains(name.as_str()) {
            return Err(ResolutionError::UnusedCandidate { name: name.clone() });
        }
    }

    let selected = queried_selection.ok_or_else(|| ResolutionError::NoCandidate {
        context: context.to_string(),
    })?;
    debug!(context = %context, reference = %selected, "resolved reference directory");
    Ok(selected)
}

fn select_for_context<'c>(
    candidates: &'c BTreeSet<String>,
    context: &Context,
) -> Result<&'c String, ResolutionError> {
    let mut best: Vec<&String> = Vec::new();
    let mut best_count = 0usize;
    for name in candidates {
        let count = context
            .values()
            .iter()
            .filter(|value| name.contains(value.as_str()))
            .count();
        if count > best_count {
            best_count = count;
            best.clear();
            best.push(name);
        } else if count == best_count && count > 0 {
            best.push(name);
        }
    }
    if best_count == 0 {
        return candidates
            .get(REFERENCE_DIR_PREFIX)
            .ok_or_else(|| ResolutionError::NoCandidate {
                context: context.to_string(),
            });
    }
    if best.len() > 1 {
        return Err(ResolutionError::AmbiguousMatch {
            context: context.to_string(),
            candidates: best.iter().map(|name| (*name).clone()).collect(),
        });
    }
    Ok(best[0])
}

/// Lists the `results.ref*` subdirectories of a test directory. The set is
/// read fresh on every call and ordered by name.
pub fn discover_reference_candidates(test_dir: &Path) -> HarnessResult<BTreeSet<String>> {
    let entries = fs::read_dir(test_dir).map_err(|error| {
        HarnessError::io_system(
            "IO.TEST_DIR",
            format!("cannot list test directory '{}': {error}", test_dir.display()),
        )
    })?;
    let mut candidates = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|error| {
            HarnessError::io_system(
                "IO.TEST_DIR",
                format!("cannot read entry of '{}': {error}", test_dir.display()),
            )
        })?;
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.starts_with(REFERENCE_DIR_PREFIX) {
                candidates.insert(name.to_string());
            }
        }
    }
    Ok(candidates)
}
