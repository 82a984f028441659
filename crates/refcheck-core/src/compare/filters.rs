//! Kind-specific line filters applied before comparison, plus the message
//! isolation used by the recovery residuals.
//!
//! Filters only ever rewrite or drop lines; whatever survives is compared
//! verbatim by the comparator.

use std::sync::LazyLock;

use regex::Regex;

use crate::classify::FileKind;

pub const ERROR_MESSAGE_MARKER: &str = "error : ";
pub const WARNING_MESSAGE_MARKER: &str = "warning : ";

/// Warning emitted when a parallel read of a table slice is interrupted and
/// retried; its count varies with the process layout.
pub const SLICE_INTERRUPT_MARKER: &str = "slice read interrupted";
/// Trailer appended when a run is stopped from the progress dialog.
pub const INTERRUPTED_BY_USER_MARKER: &str = "interrupted by user";
/// Benign allocation message whose capitalization differs across platforms.
pub const LOW_MEMORY_MARKER: &str = "not enough memory";
/// Warning emitted when the evaluation falls back to the sampled AUC.
pub const LOW_MEMORY_AUC_MARKER: &str = "not enough memory to compute the exact auc";
/// Message emitted when an input file cannot be opened.
pub const UNOPENABLE_FILE_MARKER: &str = "unable to open file";
/// Progress notice written while a coclustering run saves checkpoints.
pub const INTERMEDIATE_REPORT_MARKER: &str = "intermediate report";
/// Replaces the volatile part of temporary paths.
pub const SCRATCH_PLACEHOLDER: &str = "SCRATCH";

const ELAPSED_TIME_LABEL: &str = "Elapsed time";
const BENCHMARK_TIME_HEADER: &str = "Time";

static TIMING_NOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(time: [0-9][0-9.:]*s?\)").expect("timing note regex"));
static RECORD_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<stable>warning : .*[Rr]ead) [0-9][0-9,]* records?.*$")
        .expect("record count regex")
});
static VERSION_MEMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*"version"\s*:"#).expect("version member regex"));
static SCRATCH_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:[^\s"]*[/\\])?scratch_[0-9A-Za-z]+[/\\](?P<rest>[^\s"]*)"#)
        .expect("scratch path regex")
});
static NUMERIC_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9][0-9_]*").expect("numeric run regex"));
static RECORD_INDEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\brecord\s+[0-9][0-9,]*").expect("record index regex"));
static AUC_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(auc|aucs|rocCurve|rocCurves)"\s*:"#).expect("auc field regex")
});

/// Applies the filters selected by the file kind. `coclustering` marks runs
/// whose results include a coclustering report.
pub fn filter_lines(kind: FileKind, lines: &[String], coclustering: bool) -> Vec<String> {
    match kind {
        FileKind::ErrorLog => lines
            .iter()
            .filter_map(|line| filter_error_log_line(line, coclustering))
            .collect(),
        FileKind::Histogram => lines.iter().map(|line| blank_elapsed_time(line)).collect(),
        FileKind::Structured => skip_banner(lines)
            .iter()
            .filter_map(|line| filter_structured_line(line))
            .collect(),
        FileKind::Benchmark => filter_benchmark_lines(skip_banner(lines)),
        FileKind::Generic => skip_banner(lines).to_vec(),
        FileKind::Time => lines.to_vec(),
    }
}

/// Reports start with a `#`-prefixed banner naming the tool version.
fn skip_banner(lines: &[String]) -> &[String] {
    match lines.first() {
        Some(first) if first.starts_with('#') => &lines[1..],
        _ => lines,
    }
}

fn filter_error_log_line(line: &str, coclustering: bool) -> Option<String> {
    if coclustering && line.contains(INTERMEDIATE_REPORT_MARKER) {
        return None;
    }
    let mut line = TIMING_NOTE_RE.replace_all(line, "").into_owned();
    if let Some(position) = line.find(INTERRUPTED_BY_USER_MARKER) {
        // The progress percentage after the marker varies run to run.
        line.truncate(position + INTERRUPTED_BY_USER_MARKER.len());
    }
    line = RECORD_COUNT_RE
        .replace(&line, "$stable records")
        .into_owned();
    if line.to_lowercase().contains(LOW_MEMORY_MARKER) {
        line = line.to_lowercase();
    }
    Some(normalize_scratch_paths(&line))
}

fn blank_elapsed_time(line: &str) -> String {
    match line.find(ELAPSED_TIME_LABEL) {
        Some(position) => line[..position + ELAPSED_TIME_LABEL.len()].to_string(),
        None => line.to_string(),
    }
}

fn filter_structured_line(line: &str) -> Option<String> {
    if VERSION_MEMBER_RE.is_match(line) {
        return None;
    }
    Some(normalize_scratch_paths(line))
}

/// Drops benchmark blocks whose header line contains `Time`; blocks are
/// delimited by blank lines, which stay in place.
fn filter_benchmark_lines(lines: &[String]) -> Vec<String> {
    let mut filtered = Vec::with_capacity(lines.len());
    let mut at_block_start = true;
    let mut skipping = false;
    for line in lines {
        if line.trim().is_empty() {
            at_block_start = true;
            skipping = false;
            filtered.push(line.clone());
            continue;
        }
        if at_block_start {
            at_block_start = false;
            skipping = line.contains(BENCHMARK_TIME_HEADER);
        }
        if !skipping {
            filtered.push(line.clone());
        }
    }
    filtered
}

/// Replaces the volatile scratch-directory segment of embedded paths with a
/// placeholder and collapses numeric runs in the final path component.
pub fn normalize_scratch_paths(line: &str) -> String {
    SCRATCH_PATH_RE
        .replace_all(line, |caps: &regex::Captures<'_>| {
            let rest = caps["rest"].replace('\\', "/");
            let mut components: Vec<String> = rest.split('/').map(str::to_string).collect();
            if let Some(file_name) = components.last_mut() {
                *file_name = NUMERIC_RUN_RE.replace_all(file_name, "N").into_owned();
            }
            format!("{SCRATCH_PLACEHOLDER}/{}", components.join("/"))
        })
        .into_owned()
}

/// Collects user-visible `error : ` / `warning : ` messages in a shape
/// independent of the surrounding file structure.
pub fn isolate_user_messages(lines: &[String]) -> Vec<String> {
    let mut messages = Vec::new();
    for line in lines {
        let position = match (
            line.find(ERROR_MESSAGE_MARKER),
            line.find(WARNING_MESSAGE_MARKER),
        ) {
            (Some(error), Some(warning)) => error.min(warning),
            (Some(error), None) => error,
            (None, Some(warning)) => warning,
            (None, None) => continue,
        };
        let raw = line[position..].trim_end();
        let unquoted = raw.trim_end_matches(',').trim_end_matches('"');
        let unescaped = unquoted.replace("\\/", "/").replace('\\', "/");
        messages.push(normalize_scratch_paths(&unescaped));
    }
    messages
}

/// Replaces document-order record indexes so sorted message sets compare.
pub fn normalize_record_indexes(message: &str) -> String {
    RECORD_INDEX_RE.replace_all(message, "record N").into_owned()
}

/// Strips the `[n] ` rank prefix parallel drivers prepend to captured output.
pub fn strip_process_rank_prefix(line: &str) -> &str {
    let Some(rest) = line.strip_prefix('[') else {
        return line;
    };
    let Some(end) = rest.find("] ") else {
        return line;
    };
    if end > 0 && rest[..end].chars().all(|c| c.is_ascii_digit()) {
        &rest[end + 2..]
    } else {
        line
    }
}

pub fn is_slice_interrupt_warning(line: &str) -> bool {
    line.contains(SLICE_INTERRUPT_MARKER)
}

/// Lines carrying the ROC/AUC members of a structured report.
pub fn extract_auc_lines(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|line| AUC_FIELD_RE.is_match(line))
        .cloned()
        .collect()
}
