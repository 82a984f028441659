//! File-kind classification.
//!
//! Every compared file name maps to one behavioral category deciding which
//! filters run before comparison. Classification is pure; the only context it
//! needs is the sibling name set, for `.bad` reclassification.

use std::collections::BTreeSet;
use std::path::Path;

use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use serde::Serialize;

use crate::domain::{HarnessError, HarnessResult};

/// Error log written by the analyzed tool.
pub const ERROR_LOG_FILE_NAME: &str = "err.txt";
/// Timing log written by the orchestrator; excluded from comparison.
pub const TIME_LOG_FILE_NAME: &str = "time.log";
/// Benchmark sheet stem and extension.
pub const BENCHMARK_FILE_NAME: &str = "benchmark.xls";
/// Suffix marking a rejected-output copy of a structured report.
pub const BAD_SUFFIX: &str = ".bad";
/// Report extensions treated as structured text.
pub const STRUCTURED_EXTENSIONS: [&str; 3] = ["anj", "ccj", "json"];
/// Extension marking a coclustering run; its presence relaxes error-log
/// filtering for intermediate progress reports.
pub const COCLUSTERING_EXTENSION: &str = "ccj";

const HISTOGRAM_PATTERN: &str = "*histogram*.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FileKind {
    Time,
    Histogram,
    ErrorLog,
    Benchmark,
    Structured,
    Generic,
}

impl FileKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Histogram => "histogram",
            Self::ErrorLog => "errorLog",
            Self::Benchmark => "benchmark",
            Self::Structured => "structured",
            Self::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileClassifier {
    histogram: GlobMatcher,
    structured: GlobSet,
}

impl FileClassifier {
    pub fn new() -> HarnessResult<Self> {
        let histogram = GlobBuilder::new(HISTOGRAM_PATTERN)
            .case_insensitive(true)
            .build()
            .map_err(|error| {
                HarnessError::internal(
                    "CLASSIFY.PATTERN",
                    format!("cannot compile histogram pattern: {error}"),
                )
            })?
            .compile_matcher();
        let mut structured = GlobSetBuilder::new();
        for extension in STRUCTURED_EXTENSIONS {
            let glob = GlobBuilder::new(&format!("*.{extension}"))
                .build()
                .map_err(|error| {
                    HarnessError::internal(
                        "CLASSIFY.PATTERN",
                        format!("cannot compile report pattern '*.{extension}': {error}"),
                    )
                })?;
            structured.add(glob);
        }
        let structured = structured.build().map_err(|error| {
            HarnessError::internal(
                "CLASSIFY.PATTERN",
                format!("cannot compile report pattern set: {error}"),
            )
        })?;
        Ok(Self {
            histogram,
            structured,
        })
    }

    /// Maps a file name to its kind. `siblings` is the name set of the
    /// directory holding the file.
    pub fn classify(&self, file_name: &str, siblings: &BTreeSet<String>) -> FileKind {
        if file_name == TIME_LOG_FILE_NAME {
            return FileKind::Time;
        }
        if file_name == ERROR_LOG_FILE_NAME {
            return FileKind::ErrorLog;
        }
        if self.histogram.is_match(file_name) {
            return FileKind::Histogram;
        }
        if file_name == BENCHMARK_FILE_NAME {
            return FileKind::Benchmark;
        }
        if self.structured.is_match(file_name) {
            return FileKind::Structured;
        }
        if let Some(stem) = file_name.strip_suffix(BAD_SUFFIX) {
            // "report.anj.bad" stays structured as long as "report.anj" is
            // present next to it.
            if self.structured.is_match(stem) && siblings.contains(stem) {
                return FileKind::Structured;
            }
        }
        FileKind::Generic
    }
}

/// Extension of a file name for problem-type grouping; extensionless names
/// group under the full name.
pub fn file_type_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| file_name.to_string())
}
