//! Comparison primitives: field, line, and file level, each yielding a
//! three-way verdict plus a numeric deviation.

pub mod filters;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Relative-difference tolerance for numeric fields.
pub const TOLERANCE: f64 = 1e-5;
/// Loosened tolerance used when re-comparing rough-estimate fields.
pub const ROUGH_ESTIMATE_TOLERANCE: f64 = 1e-2;

const EXCERPT_CHARS: usize = 80;

static TIME_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{1,2}:[0-9]{2}:[0-9]{2}(\.[0-9]+)?$").expect("time value regex")
});
static NUMBER_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-+]?[0-9]+(\.[0-9]+)?([eE][-+]?[0-9]+)?").expect("number token regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    Equal,
    Tolerated,
    Error,
}

impl Verdict {
    /// The worse of two verdicts; `Error` dominates, then `Tolerated`.
    pub const fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Error, _) | (_, Self::Error) => Self::Error,
            (Self::Tolerated, _) | (_, Self::Tolerated) => Self::Tolerated,
            _ => Self::Equal,
        }
    }

    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldComparison {
    pub verdict: Verdict,
    pub deviation: f64,
}

impl FieldComparison {
    const fn equal() -> Self {
        Self {
            verdict: Verdict::Equal,
            deviation: 0.0,
        }
    }

    const fn error() -> Self {
        Self {
            verdict: Verdict::Error,
            deviation: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LineComparison {
    pub verdict: Verdict,
    pub deviation: f64,
    pub error_count: usize,
    pub warning_count: usize,
    pub note: Option<String>,
}

/// One reportable difference. `line` is 1-based; file-level findings carry no
/// line number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Difference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct FileComparison {
    pub verdict: Verdict,
    pub deviation: f64,
    pub error_count: usize,
    pub warning_count: usize,
    pub differences: Vec<Difference>,
}

/// Relative difference between two numbers. The epsilon keeps the quotient
/// defined around zero and matches the tolerance threshold.
pub fn relative_difference(a: f64, b: f64) -> f64 {
    0.5 * (a - b).abs() / (a.abs() / 2.0 + b.abs() / 2.0 + TOLERANCE)
}

pub fn compare_fields(test: &str, reference: &str) -> FieldComparison {
    compare_fields_with_tolerance(test, reference, TOLERANCE)
}

pub fn compare_fields_with_tolerance(
    test: &str,
    reference: &str,
    tolerance: f64,
) -> FieldComparison {
    if test == reference {
        return FieldComparison::equal();
    }
    if is_time_value(test) && is_time_value(reference) {
        // Durations and timestamps vary run to run; never compared as numbers.
        return FieldComparison::equal();
    }
    let test_normalized = normalize_path_separators(test);
    let reference_normalized = normalize_path_separators(reference);
    if test_normalized == reference_normalized {
        return FieldComparison::equal();
    }
    if let (Some(a), Some(b)) = (parse_number(&test_normalized), parse_number(&reference_normalized))
    {
        return numeric_comparison(a, b, tolerance);
    }

    let test_tokens = tokenize(&test_normalized);
    let reference_tokens = tokenize(&reference_normalized);
    if test_tokens.len() != reference_tokens.len() {
        return FieldComparison::error();
    }
    let mut verdict = Verdict::Equal;
    let mut deviation = 0.0f64;
    for (test_token, reference_token) in test_tokens.iter().zip(&reference_tokens) {
        let token = compare_atomic(test_token, reference_token, tolerance);
        verdict = verdict.combine(token.verdict);
        deviation = deviation.max(token.deviation);
        if verdict.is_error() {
            return FieldComparison {
                verdict: Verdict::Error,
                deviation,
            };
        }
    }
    FieldComparison { verdict, deviation }
}

/// Token-level comparison: equality, time equivalence, then numeric
/// tolerance. Tokens are atomic, so no further splitting happens here.
fn compare_atomic(test: &str, reference: &str, tolerance: f64) -> FieldComparison {
    if test == reference {
        return FieldComparison::equal();
    }
    if is_time_value(test) && is_time_value(reference) {
        return FieldComparison::equal();
    }
    if let (Some(a), Some(b)) = (parse_number(test), parse_number(reference)) {
        return numeric_comparison(a, b, tolerance);
    }
    FieldComparison::error()
}

fn numeric_comparison(a: f64, b: f64, tolerance: f64) -> FieldComparison {
    let deviation = relative_difference(a, b);
    let verdict = if deviation <= tolerance {
        Verdict::Tolerated
    } else {
        Verdict::Error
    };
    FieldComparison { verdict, deviation }
}

pub fn is_time_value(text: &str) -> bool {
    TIME_VALUE_RE.is_match(text.trim())
}

pub fn normalize_path_separators(text: &str) -> String {
    text.replace('\\', "/")
}

fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Splits a string into alternating numeric and non-numeric substrings.
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut cursor = 0;
    for number in NUMBER_TOKEN_RE.find_iter(text) {
        if number.start() > cursor {
            tokens.push(&text[cursor..number.start()]);
        }
        tokens.push(number.as_str());
        cursor = number.end();
    }
    if cursor < text.len() {
        tokens.push(&text[cursor..]);
    }
    tokens
}

pub fn compare_lines(
    test: &str,
    reference: &str,
    split_fields: bool,
    tolerance: f64,
) -> LineComparison {
    let test_fields: Vec<&str> = if split_fields {
        test.split('\t').collect()
    } else {
        vec![test]
    };
    let reference_fields: Vec<&str> = if split_fields {
        reference.split('\t').collect()
    } else {
        vec![reference]
    };

    if test_fields.len() != reference_fields.len() {
        return LineComparison {
            verdict: Verdict::Error,
            deviation: 0.0,
            error_count: 1,
            warning_count: 0,
            note: Some(format!(
                "has {} fields and should have {}",
                test_fields.len(),
                reference_fields.len()
            )),
        };
    }

    let mut verdict = Verdict::Equal;
    let mut deviation = 0.0f64;
    let mut error_count = 0;
    let mut warning_count = 0;
    let mut note = None;
    for (index, (test_field, reference_field)) in
        test_fields.iter().zip(&reference_fields).enumerate()
    {
        let field = compare_fields_with_tolerance(test_field, reference_field, tolerance);
        verdict = verdict.combine(field.verdict);
        deviation += field.deviation;
        match field.verdict {
            Verdict::Error => {
                error_count += 1;
                if note.is_none() {
                    note = Some(if split_fields && test_fields.len() > 1 {
                        format!(
                            "field {}: '{}' should be '{}'",
                            index + 1,
                            excerpt(test_field),
                            excerpt(reference_field)
                        )
                    } else {
                        format!(
                            "'{}' should be '{}'",
                            excerpt(test_field),
                            excerpt(reference_field)
                        )
                    });
                }
            }
            Verdict::Tolerated => warning_count += 1,
            Verdict::Equal => {}
        }
    }
    LineComparison {
        verdict,
        deviation,
        error_count,
        warning_count,
        note,
    }
}

pub fn compare_file_lines(
    test: &[String],
    reference: &[String],
    split_fields: bool,
    tolerance: f64,
) -> FileComparison {
    let mut verdict = Verdict::Equal;
    let mut deviation = 0.0f64;
    let mut error_count = 0;
    let mut warning_count = 0;
    let mut differences = Vec::new();

    if test.len() != reference.len() {
        verdict = Verdict::Error;
        error_count += 1;
        differences.push(Difference {
            line: None,
            message: format!(
                "has {} lines and should have {} lines",
                test.len(),
                reference.len()
            ),
        });
    }

    for (index, (test_line, reference_line)) in test.iter().zip(reference).enumerate() {
        let line = compare_lines(test_line, reference_line, split_fields, tolerance);
        verdict = verdict.combine(line.verdict);
        deviation = deviation.max(line.deviation);
        error_count += line.error_count;
        warning_count += line.warning_count;
        if line.verdict.is_error() {
            differences.push(Difference {
                line: Some(index + 1),
                message: line
                    .note
                    .unwrap_or_else(|| "differs from the reference".to_string()),
            });
        }
    }

    FileComparison {
        verdict,
        deviation,
        error_count,
        warning_count,
        differences,
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let mut shortened: String = text.chars().take(EXCERPT_CHARS).collect();
    shortened.push_str("...");
    shortened
}
