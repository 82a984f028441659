//! Execution-context model: ordered categorical axes and their values.
//!
//! A comparison runs under one concrete [`Context`]: one value per axis, in
//! the fixed axis order declared by the [`ContextVocabulary`]. The vocabulary
//! is injected wherever it is needed and validated once, at construction.

use std::fmt::{Display, Formatter};

use thiserror::Error;

pub const COMPUTING_AXIS: &str = "computing";
pub const PLATFORM_AXIS: &str = "platform";

pub const PARALLEL_COMPUTING: &str = "parallel";
pub const SEQUENTIAL_COMPUTING: &str = "sequential";

pub const DARWIN_PLATFORM: &str = "Darwin";
pub const LINUX_PLATFORM: &str = "Linux";
pub const WINDOWS_PLATFORM: &str = "Windows";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabularyError {
    #[error("context vocabulary must declare at least one axis")]
    EmptyVocabulary,
    #[error("axis '{axis}' must declare at least one value")]
    EmptyAxis { axis: String },
    #[error("axis '{axis}' is declared more than once")]
    DuplicateAxis { axis: String },
    #[error("value '{value}' on axis '{axis}' must be purely alphabetic")]
    NonAlphabeticValue { axis: String, value: String },
    #[error("value '{value}' is declared more than once across the vocabulary")]
    DuplicateValue { value: String },
    #[error("value '{shorter}' is a substring of value '{longer}'")]
    SubstringValue { shorter: String, longer: String },
    #[error("value '{value}' does not belong to axis '{axis}'")]
    ValueOutsideAxis { axis: String, value: String },
    #[error("a context needs {expected} axis value(s), got {actual}")]
    WrongValueCount { expected: usize, actual: usize },
    #[error("value '{value}' is not part of any axis")]
    UnknownValue { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisDefinition {
    name: String,
    values: Vec<String>,
}

impl AxisDefinition {
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|known| known == value)
    }
}

/// Ordered set of axes. Construction enforces the invariants substring-based
/// candidate matching depends on: alphabetic values, no duplicates, and no
/// value being a substring of another value anywhere in the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextVocabulary {
    axes: Vec<AxisDefinition>,
}

impl ContextVocabulary {
    pub fn new(axes: Vec<AxisDefinition>) -> Result<Self, VocabularyError> {
        if axes.is_empty() {
            return Err(VocabularyError::EmptyVocabulary);
        }
        for (index, axis) in axes.iter().enumerate() {
            if axis.values.is_empty() {
                return Err(VocabularyError::EmptyAxis {
                    axis: axis.name.clone(),
                });
            }
            if axes[..index].iter().any(|seen| seen.name == axis.name) {
                return Err(VocabularyError::DuplicateAxis {
                    axis: axis.name.clone(),
                });
            }
            for value in &axis.values {
                if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphabetic()) {
                    return Err(VocabularyError::NonAlphabeticValue {
                        axis: axis.name.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
        let all_values: Vec<&String> = axes.iter().flat_map(|axis| axis.values.iter()).collect();
        for (index, value) in all_values.iter().enumerate() {
            for other in &all_values[index + 1..] {
                if value == other {
                    return Err(VocabularyError::DuplicateValue {
                        value: (*value).clone(),
                    });
                }
                if other.contains(value.as_str()) {
                    return Err(VocabularyError::SubstringValue {
                        shorter: (*value).clone(),
                        longer: (*other).clone(),
                    });
                }
                if value.contains(other.as_str()) {
                    return Err(VocabularyError::SubstringValue {
                        shorter: (*other).clone(),
                        longer: (*value).clone(),
                    });
                }
            }
        }
        Ok(Self { axes })
    }

    /// The stock vocabulary: computing mode, then platform.
    pub fn standard() -> Self {
        Self {
            axes: vec![
                AxisDefinition::new(
                    COMPUTING_AXIS,
                    [PARALLEL_COMPUTING, SEQUENTIAL_COMPUTING],
                ),
                AxisDefinition::new(
                    PLATFORM_AXIS,
                    [DARWIN_PLATFORM, LINUX_PLATFORM, WINDOWS_PLATFORM],
                ),
            ],
        }
    }

    pub fn axes(&self) -> &[AxisDefinition] {
        &self.axes
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    pub fn axis(&self, index: usize) -> Option<&AxisDefinition> {
        self.axes.get(index)
    }

    pub fn axis_named(&self, name: &str) -> Option<(usize, &AxisDefinition)> {
        self.axes
            .iter()
            .enumerate()
            .find(|(_, axis)| axis.name == name)
    }

    /// Index of the axis a value belongs to, if any.
    pub fn value_axis(&self, value: &str) -> Option<usize> {
        self.axes
            .iter()
            .position(|axis| axis.values.iter().any(|known| known == value))
    }

    /// Every concrete context, in axis order with values in declared order.
    pub fn enumerate_contexts(&self) -> Vec<Context> {
        let mut assignments: Vec<Vec<String>> = vec![Vec::new()];
        for axis in &self.axes {
            let mut grown = Vec::with_capacity(assignments.len() * axis.values.len());
            for prefix in &assignments {
                for value in &axis.values {
                    let mut values = prefix.clone();
                    values.push(value.clone());
                    grown.push(values);
                }
            }
            assignments = grown;
        }
        assignments
            .into_iter()
            .map(|values| Context { values })
            .collect()
    }
}

/// One concrete assignment of a value to every axis, in axis order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Context {
    values: Vec<String>,
}

impl Context {
    pub fn new(
        vocabulary: &ContextVocabulary,
        values: &[&str],
    ) -> Result<Self, VocabularyError> {
        if values.len() != vocabulary.axis_count() {
            return Err(VocabularyError::WrongValueCount {
                expected: vocabulary.axis_count(),
                actual: values.len(),
            });
        }
        for (axis, value) in vocabulary.axes.iter().zip(values) {
            if !axis.contains(value) {
                return Err(VocabularyError::ValueOutsideAxis {
                    axis: axis.name.clone(),
                    value: (*value).to_string(),
                });
            }
        }
        Ok(Self {
            values: values.iter().map(|value| value.to_string()).collect(),
        })
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn value(&self, axis_index: usize) -> Option<&str> {
        self.values.get(axis_index).map(String::as_str)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|held| held == value)
    }
}

impl Display for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.values.join(", "))
    }
}
