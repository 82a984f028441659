//! Ordered recovery strategies. Each one recognizes a known benign cause
//! for persistent comparison errors; the first applicable strategy whose
//! residual comparison is clean downgrades every error to a warning.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::classify::FileKind;
use crate::compare::filters::{
    LOW_MEMORY_AUC_MARKER, UNOPENABLE_FILE_MARKER, extract_auc_lines, is_slice_interrupt_warning,
    normalize_record_indexes,
};
use crate::compare::{ROUGH_ESTIMATE_TOLERANCE, TOLERANCE, compare_file_lines};
use crate::context::{Context, DARWIN_PLATFORM};
use crate::resolver::{discover_reference_candidates, resolve};

use super::{Engine, EngineOptions, FileRecord};

/// Recovery strategies in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecoveryKind {
    VaryingWarningCount,
    UnsortedUserMessages,
    RoughAucEstimate,
    AccentedFilePaths,
}

impl RecoveryKind {
    pub const ORDER: [Self; 4] = [
        Self::VaryingWarningCount,
        Self::UnsortedUserMessages,
        Self::RoughAucEstimate,
        Self::AccentedFilePaths,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VaryingWarningCount => "varying warning count",
            Self::UnsortedUserMessages => "unsorted user messages",
            Self::RoughAucEstimate => "rough AUC estimate",
            Self::AccentedFilePaths => "accented file paths",
        }
    }
}

/// Comparison state handed to the strategies: per-file records plus the
/// error totals that did not come from file content.
#[derive(Debug)]
pub(crate) struct Snapshot<'a> {
    pub(crate) records: &'a [FileRecord],
    pub(crate) special_error_count: usize,
    pub(crate) file_set_error_count: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct RecoveryOutcome {
    pub(crate) kind: RecoveryKind,
    pub(crate) note: String,
}

#[derive(Debug)]
enum RecoveryAttempt {
    Recovered(String),
    NotApplicable,
}

pub(crate) fn attempt_recoveries(
    engine: &Engine<'_>,
    test_dir: &Path,
    reference_name: &str,
    snapshot: &Snapshot<'_>,
) -> Option<RecoveryOutcome> {
    for kind in RecoveryKind::ORDER {
        let attempt = match kind {
            RecoveryKind::VaryingWarningCount => varying_warning_count(snapshot),
            RecoveryKind::UnsortedUserMessages => unsorted_user_messages(snapshot),
            RecoveryKind::RoughAucEstimate => rough_auc_estimate(snapshot),
            RecoveryKind::AccentedFilePaths => {
                accented_file_paths(engine, test_dir, reference_name, snapshot)
            }
        };
        match attempt {
            RecoveryAttempt::Recovered(note) => return Some(RecoveryOutcome { kind, note }),
            RecoveryAttempt::NotApplicable => {
                debug!(strategy = kind.as_str(), "recovery strategy not applicable");
            }
        }
    }
    None
}

/// True when there is at least one file error and every error source is
/// covered by `allowed`. Capture files and file-set mismatches disqualify
/// the content-based strategies outright.
fn errors_confined_to(snapshot: &Snapshot<'_>, allowed: impl Fn(&FileRecord) -> bool) -> bool {
    snapshot.special_error_count == 0
        && snapshot.file_set_error_count == 0
        && snapshot.records.iter().any(|record| record.error_count > 0)
        && snapshot
            .records
            .iter()
            .filter(|record| record.error_count > 0)
            .all(allowed)
}

fn error_records<'a>(snapshot: &'a Snapshot<'_>) -> impl Iterator<Item = &'a FileRecord> {
    snapshot
        .records
        .iter()
        .filter(|record| record.error_count > 0)
}

/// Parallel runs emit a run-dependent number of "slice read interrupted"
/// warnings. Dropping them from both sides must leave the error logs equal.
fn varying_warning_count(snapshot: &Snapshot<'_>) -> RecoveryAttempt {
    if !errors_confined_to(snapshot, |record| record.kind == FileKind::ErrorLog) {
        return RecoveryAttempt::NotApplicable;
    }
    for record in error_records(snapshot) {
        let test = drop_interrupt_warnings(&record.test_lines);
        let reference = drop_interrupt_warnings(&record.reference_lines);
        if compare_file_lines(&test, &reference, false, TOLERANCE).error_count > 0 {
            return RecoveryAttempt::NotApplicable;
        }
    }
    RecoveryAttempt::Recovered("recovered from varying warning count".to_string())
}

fn drop_interrupt_warnings(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|line| !is_slice_interrupt_warning(line))
        .cloned()
        .collect()
}

/// User messages may arrive in a run-dependent order and carry document-order
/// record indexes. Sorting the isolated messages after normalizing the
/// indexes must make both sides equal.
fn unsorted_user_messages(snapshot: &Snapshot<'_>) -> RecoveryAttempt {
    let confined = errors_confined_to(snapshot, |record| {
        matches!(record.kind, FileKind::ErrorLog | FileKind::Structured)
    });
    if !confined {
        return RecoveryAttempt::NotApplicable;
    }
    for record in error_records(snapshot) {
        if record.test_messages.is_empty() && record.reference_messages.is_empty() {
            return RecoveryAttempt::NotApplicable;
        }
        let test = sorted_normalized_messages(&record.test_messages);
        let reference = sorted_normalized_messages(&record.reference_messages);
        if compare_file_lines(&test, &reference, false, TOLERANCE).error_count > 0 {
            return RecoveryAttempt::NotApplicable;
        }
    }
    RecoveryAttempt::Recovered("recovered from unsorted user messages".to_string())
}

fn sorted_normalized_messages(messages: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = messages
        .iter()
        .map(|message| normalize_record_indexes(message))
        .collect();
    normalized.sort();
    normalized
}

/// When the run lacked memory for the exact AUC computation, the structured
/// reports are judged only by their ROC/AUC members at a rough tolerance and
/// the evaluation spreadsheets are ignored entirely.
fn rough_auc_estimate(snapshot: &Snapshot<'_>) -> RecoveryAttempt {
    let confined = errors_confined_to(snapshot, |record| {
        matches!(record.kind, FileKind::ErrorLog | FileKind::Structured)
            || record.file_type == "xls"
    });
    if !confined {
        return RecoveryAttempt::NotApplicable;
    }
    let warned = snapshot
        .records
        .iter()
        .filter(|record| record.kind == FileKind::ErrorLog)
        .flat_map(|record| record.test_lines.iter().chain(record.reference_lines.iter()))
        .any(|line| line.to_lowercase().contains(LOW_MEMORY_AUC_MARKER));
    if !warned {
        return RecoveryAttempt::NotApplicable;
    }

    let mut residual_lines = 0;
    for record in snapshot.records {
        if record.kind != FileKind::Structured {
            continue;
        }
        let test = extract_auc_lines(&record.test_lines);
        let reference = extract_auc_lines(&record.reference_lines);
        residual_lines += test.len() + reference.len();
        if compare_file_lines(&test, &reference, false, ROUGH_ESTIMATE_TOLERANCE).error_count > 0 {
            return RecoveryAttempt::NotApplicable;
        }
    }
    if residual_lines == 0 {
        return RecoveryAttempt::NotApplicable;
    }
    RecoveryAttempt::Recovered("recovered from rough AUC estimate".to_string())
}

/// Darwin decomposes accented file names (NFD), which makes a run fail to
/// open files whose reference listing was produced elsewhere. The whole
/// comparison is replayed against the reference of another platform value;
/// it must fully succeed. The nested engine runs with this strategy
/// disabled.
fn accented_file_paths(
    engine: &Engine<'_>,
    test_dir: &Path,
    reference_name: &str,
    snapshot: &Snapshot<'_>,
) -> RecoveryAttempt {
    if !engine.options.accent_recovery_enabled {
        return RecoveryAttempt::NotApplicable;
    }
    let Some(platform_axis) = engine.vocabulary.value_axis(DARWIN_PLATFORM) else {
        return RecoveryAttempt::NotApplicable;
    };
    if engine.context.value(platform_axis) != Some(DARWIN_PLATFORM) {
        return RecoveryAttempt::NotApplicable;
    }
    let unopenable = snapshot
        .records
        .iter()
        .filter(|record| record.kind == FileKind::ErrorLog)
        .flat_map(|record| record.test_lines.iter())
        .any(|line| {
            line.to_lowercase().contains(UNOPENABLE_FILE_MARKER)
                && line.chars().any(|c| !c.is_ascii())
        });
    if !unopenable {
        return RecoveryAttempt::NotApplicable;
    }

    let Ok(candidates) = discover_reference_candidates(test_dir) else {
        return RecoveryAttempt::NotApplicable;
    };
    let Some(axis) = engine.vocabulary.axis(platform_axis) else {
        return RecoveryAttempt::NotApplicable;
    };
    for alternate in axis
        .values()
        .iter()
        .filter(|value| value.as_str() != DARWIN_PLATFORM)
    {
        let mut values: Vec<&str> = engine.context.values().iter().map(String::as_str).collect();
        values[platform_axis] = alternate.as_str();
        let Ok(alternate_context) = Context::new(engine.vocabulary, &values) else {
            continue;
        };
        let Ok(alternate_reference) = resolve(engine.vocabulary, &candidates, &alternate_context)
        else {
            continue;
        };
        if alternate_reference == reference_name {
            continue;
        }
        let disabled = EngineOptions {
            accent_recovery_enabled: false,
        };
        let Ok(nested) = Engine::with_options(engine.vocabulary, engine.context.clone(), disabled)
        else {
            continue;
        };
        match nested.compare(test_dir, &alternate_reference) {
            Ok(outcome) if outcome.error_count == 0 => {
                return RecoveryAttempt::Recovered(format!(
                    "recovered from accented file paths against reference '{alternate_reference}'"
                ));
            }
            Ok(_) | Err(_) => {
                debug!(reference = %alternate_reference, "alternate reference still disagrees");
            }
        }
    }
    RecoveryAttempt::NotApplicable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::file_type_of;
    use crate::context::ContextVocabulary;

    fn record(name: &str, kind: FileKind, error_count: usize) -> FileRecord {
        FileRecord {
            name: name.to_string(),
            kind,
            file_type: file_type_of(name),
            error_count,
            warning_count: 0,
            test_lines: Vec::new(),
            reference_lines: Vec::new(),
            test_messages: Vec::new(),
            reference_messages: Vec::new(),
            differences: Vec::new(),
        }
    }

    fn snapshot(records: &[FileRecord]) -> Snapshot<'_> {
        Snapshot {
            records,
            special_error_count: 0,
            file_set_error_count: 0,
        }
    }

    #[test]
    fn varying_warning_count_recovers_interrupt_only_differences() {
        let mut log = record("err.txt", FileKind::ErrorLog, 1);
        log.test_lines = vec![
            "warning : slice read interrupted after slice 3".to_string(),
            "error : bad value".to_string(),
        ];
        log.reference_lines = vec!["error : bad value".to_string()];
        let records = vec![log];

        let attempt = varying_warning_count(&snapshot(&records));
        assert!(matches!(attempt, RecoveryAttempt::Recovered(_)));
    }

    #[test]
    fn varying_warning_count_rejects_errors_outside_the_error_log() {
        let records = vec![
            record("err.txt", FileKind::ErrorLog, 1),
            record("report.txt", FileKind::Generic, 1),
        ];
        let attempt = varying_warning_count(&snapshot(&records));
        assert!(matches!(attempt, RecoveryAttempt::NotApplicable));
    }

    #[test]
    fn varying_warning_count_rejects_capture_file_errors() {
        let mut log = record("err.txt", FileKind::ErrorLog, 1);
        log.test_lines = vec!["warning : slice read interrupted".to_string()];
        let records = vec![log];
        let mut state = snapshot(&records);
        state.special_error_count = 1;

        let attempt = varying_warning_count(&state);
        assert!(matches!(attempt, RecoveryAttempt::NotApplicable));
    }

    #[test]
    fn message_sorting_recovers_reordered_records() {
        let mut log = record("err.txt", FileKind::ErrorLog, 1);
        log.test_messages = vec![
            "warning : record 1200 ignored".to_string(),
            "error : missing field".to_string(),
        ];
        log.reference_messages = vec![
            "error : missing field".to_string(),
            "warning : record 1350 ignored".to_string(),
        ];
        let mut report = record("model.anj", FileKind::Structured, 1);
        report.test_messages = vec!["error : dictionary missing".to_string()];
        report.reference_messages = vec!["error : dictionary missing".to_string()];
        let records = vec![log, report];

        let attempt = unsorted_user_messages(&snapshot(&records));
        assert!(matches!(attempt, RecoveryAttempt::Recovered(_)));
    }

    #[test]
    fn message_sorting_requires_isolated_messages() {
        let records = vec![record("model.anj", FileKind::Structured, 2)];
        let attempt = unsorted_user_messages(&snapshot(&records));
        assert!(
            matches!(attempt, RecoveryAttempt::NotApplicable),
            "errors without any isolated message must not be recovered"
        );
    }

    #[test]
    fn rough_auc_recovery_tolerates_loose_auc_values() {
        let mut log = record("err.txt", FileKind::ErrorLog, 1);
        log.test_lines =
            vec!["warning : not enough memory to compute the exact auc".to_string()];
        let mut report = record("model.anj", FileKind::Structured, 1);
        report.test_lines = vec![
            r#""auc": 0.9832,"#.to_string(),
            r#""accuracy": 0.88,"#.to_string(),
        ];
        report.reference_lines = vec![
            r#""auc": 0.9817,"#.to_string(),
            r#""accuracy": 0.88,"#.to_string(),
        ];
        let sheet = record("evaluation.xls", FileKind::Generic, 3);
        let records = vec![log, report, sheet];

        let attempt = rough_auc_estimate(&snapshot(&records));
        assert!(matches!(attempt, RecoveryAttempt::Recovered(_)));
    }

    #[test]
    fn rough_auc_recovery_needs_the_low_memory_warning() {
        let mut report = record("model.anj", FileKind::Structured, 1);
        report.test_lines = vec![r#""auc": 0.9832,"#.to_string()];
        report.reference_lines = vec![r#""auc": 0.9817,"#.to_string()];
        let records = vec![report];

        let attempt = rough_auc_estimate(&snapshot(&records));
        assert!(matches!(attempt, RecoveryAttempt::NotApplicable));
    }

    #[test]
    fn rough_auc_recovery_needs_auc_lines() {
        let mut log = record("err.txt", FileKind::ErrorLog, 1);
        log.test_lines =
            vec!["warning : not enough memory to compute the exact auc".to_string()];
        let mut report = record("model.anj", FileKind::Structured, 1);
        report.test_lines = vec![r#""accuracy": 0.88,"#.to_string()];
        report.reference_lines = vec![r#""accuracy": 0.91,"#.to_string()];
        let records = vec![log, report];

        let attempt = rough_auc_estimate(&snapshot(&records));
        assert!(matches!(attempt, RecoveryAttempt::NotApplicable));
    }

    #[test]
    fn accent_recovery_is_gated_to_darwin_contexts() {
        let vocabulary = ContextVocabulary::standard();
        let context = Context::new(&vocabulary, &["sequential", "Linux"])
            .expect("standard context should be valid");
        let engine =
            Engine::new(&vocabulary, context).expect("engine construction should succeed");

        let mut log = record("err.txt", FileKind::ErrorLog, 1);
        log.test_lines = vec!["error : unable to open file crédit.txt".to_string()];
        let records = vec![log];

        let attempt =
            accented_file_paths(&engine, Path::new("unused"), "results.ref", &snapshot(&records));
        assert!(matches!(attempt, RecoveryAttempt::NotApplicable));
    }

    #[test]
    fn strategies_are_tried_in_declared_order() {
        let vocabulary = ContextVocabulary::standard();
        let context = Context::new(&vocabulary, &["sequential", "Linux"])
            .expect("standard context should be valid");
        let engine =
            Engine::new(&vocabulary, context).expect("engine construction should succeed");

        // A log whose difference both the warning-count filter and message
        // sorting would accept.
        let mut log = record("err.txt", FileKind::ErrorLog, 1);
        log.test_lines = vec![
            "warning : slice read interrupted".to_string(),
            "error : bad value".to_string(),
        ];
        log.reference_lines = vec!["error : bad value".to_string()];
        log.test_messages = vec!["error : bad value".to_string()];
        log.reference_messages = vec!["error : bad value".to_string()];
        let records = vec![log];

        let outcome =
            attempt_recoveries(&engine, Path::new("unused"), "results.ref", &snapshot(&records))
                .expect("a recovery strategy should commit");
        assert_eq!(outcome.kind, RecoveryKind::VaryingWarningCount);
    }
}
