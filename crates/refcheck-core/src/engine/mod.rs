//! Comparison engine: pairs the results directory with the resolved
//! reference directory, applies kind-specific filtering, scores errors and
//! warnings, and hands persistent errors to the recovery chain.

pub mod recovery;

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::classify::{
    COCLUSTERING_EXTENSION, FileClassifier, FileKind, TIME_LOG_FILE_NAME, file_type_of,
};
use crate::compare::filters::{filter_lines, isolate_user_messages, strip_process_rank_prefix};
use crate::compare::{Difference, TOLERANCE, compare_file_lines};
use crate::context::{Context, ContextVocabulary};
use crate::domain::{HarnessError, HarnessResult};
use crate::report::write_comparison_log;
use crate::resolver::{discover_reference_candidates, resolve};
use recovery::{RecoveryKind, Snapshot, attempt_recoveries};

/// Name of the directory holding the run output under a test directory.
pub const RESULTS_DIR_NAME: &str = "results";
/// Name of the comparison log written next to the results directory.
pub const COMPARISON_LOG_FILE_NAME: &str = "comparison.log";

/// Capture file written when the tool exits with a non-zero code.
pub const RETURN_CODE_ERROR_FILE: &str = "return_code_error.log";
/// Capture file holding unexpected standard output.
pub const STDOUT_ERROR_FILE: &str = "stdout_error.log";
/// Capture file holding unexpected standard error output.
pub const STDERR_ERROR_FILE: &str = "stderr_error.log";
/// Capture file written when the monitored process ran out of time.
pub const TIMEOUT_ERROR_FILE: &str = "process_timeout_error.log";

const SPECIAL_ERROR_FILES: [(&str, SpecialFileLabel); 4] = [
    (TIMEOUT_ERROR_FILE, SpecialFileLabel::Timeout),
    (RETURN_CODE_ERROR_FILE, SpecialFileLabel::FatalExitCode),
    (STDOUT_ERROR_FILE, SpecialFileLabel::UnexpectedOutput),
    (STDERR_ERROR_FILE, SpecialFileLabel::UnexpectedOutput),
];

/// Bound on missing or additional file names listed in the log.
pub const MAX_LISTED_FILES: usize = 10;
/// Bound on difference details rendered per compared file.
pub const MAX_REPORTED_DIFFERENCES: usize = 10;
/// Number of lines excerpted from a non-empty capture file.
pub const SPECIAL_FILE_EXCERPT_LINES: usize = 5;

/// Headline label attached to a non-empty capture file, in decreasing
/// severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpecialFileLabel {
    #[serde(rename = "TIMEOUT")]
    Timeout,
    #[serde(rename = "FATAL EXIT")]
    FatalExitCode,
    #[serde(rename = "UNEXPECTED OUTPUT")]
    UnexpectedOutput,
}

impl SpecialFileLabel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "TIMEOUT",
            Self::FatalExitCode => "FATAL EXIT",
            Self::UnexpectedOutput => "UNEXPECTED OUTPUT",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "TIMEOUT" => Some(Self::Timeout),
            "FATAL EXIT" => Some(Self::FatalExitCode),
            "UNEXPECTED OUTPUT" => Some(Self::UnexpectedOutput),
            _ => None,
        }
    }

    const fn priority(self) -> u8 {
        match self {
            Self::Timeout => 3,
            Self::FatalExitCode => 2,
            Self::UnexpectedOutput => 1,
        }
    }
}

/// Report for one non-empty capture file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialFileReport {
    pub name: String,
    pub label: SpecialFileLabel,
    pub excerpt: Vec<String>,
}

/// Per-file comparison result exposed in the outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutcome {
    pub name: String,
    pub kind: FileKind,
    pub error_count: usize,
    pub warning_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub differences: Vec<Difference>,
}

/// Full result of comparing a results directory against its reference.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonOutcome {
    pub reference_dir: String,
    pub candidate_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_file: Option<SpecialFileLabel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub special_files: Vec<SpecialFileReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_set_differences: Vec<Difference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub problem_file_types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery: Option<RecoveryKind>,
    pub files: Vec<FileOutcome>,
}

impl ComparisonOutcome {
    /// True when the run ended without persistent errors.
    pub fn is_success(&self) -> bool {
        self.error_count == 0
    }
}

/// Snapshot of one compared file pair, kept around for the recovery
/// strategies which re-examine filtered lines and isolated messages.
#[derive(Debug, Clone)]
pub(crate) struct FileRecord {
    pub(crate) name: String,
    pub(crate) kind: FileKind,
    pub(crate) file_type: String,
    pub(crate) error_count: usize,
    pub(crate) warning_count: usize,
    pub(crate) test_lines: Vec<String>,
    pub(crate) reference_lines: Vec<String>,
    pub(crate) test_messages: Vec<String>,
    pub(crate) reference_messages: Vec<String>,
    pub(crate) differences: Vec<Difference>,
}

impl FileRecord {
    fn unreadable(name: &str, kind: FileKind, file_type: String, message: String) -> Self {
        Self {
            name: name.to_string(),
            kind,
            file_type,
            error_count: 1,
            warning_count: 0,
            test_lines: Vec::new(),
            reference_lines: Vec::new(),
            test_messages: Vec::new(),
            reference_messages: Vec::new(),
            differences: vec![Difference {
                line: None,
                message,
            }],
        }
    }
}

/// Engine switches. Accent recovery is disabled for the nested run the
/// accented-file-paths strategy performs, which keeps it from recursing.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub accent_recovery_enabled: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            accent_recovery_enabled: true,
        }
    }
}

/// Compares a results directory against a reference directory for one
/// execution context.
#[derive(Debug)]
pub struct Engine<'a> {
    vocabulary: &'a ContextVocabulary,
    context: Context,
    classifier: FileClassifier,
    options: EngineOptions,
}

impl<'a> Engine<'a> {
    pub fn new(vocabulary: &'a ContextVocabulary, context: Context) -> HarnessResult<Self> {
        Self::with_options(vocabulary, context, EngineOptions::default())
    }

    pub fn with_options(
        vocabulary: &'a ContextVocabulary,
        context: Context,
        options: EngineOptions,
    ) -> HarnessResult<Self> {
        Ok(Self {
            vocabulary,
            context,
            classifier: FileClassifier::new()?,
            options,
        })
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Compares `<test_dir>/results` against `<test_dir>/<reference_name>`.
    ///
    /// The result is deterministic for a given pair of directory states:
    /// files are visited in sorted order and every message is derived from
    /// file content, never from timestamps or traversal order.
    pub fn compare(
        &self,
        test_dir: &Path,
        reference_name: &str,
    ) -> HarnessResult<ComparisonOutcome> {
        let results_path = test_dir.join(RESULTS_DIR_NAME);
        let reference_path = test_dir.join(reference_name);
        let test_names = list_file_names(&results_path, "IO.RESULTS_DIR")?;
        let reference_names = list_file_names(&reference_path, "IO.REFERENCE_DIR")?;
        let candidate_count = discover_reference_candidates(test_dir)?.len();

        let (special_files, special_label, special_error_count) =
            collect_special_files(&results_path, &test_names);

        let test_files = filter_paired_names(&test_names);
        let reference_files = filter_paired_names(&reference_names);

        let mut file_set_differences = Vec::new();
        let missing: Vec<&String> = reference_files.difference(&test_files).collect();
        let additional: Vec<&String> = test_files.difference(&reference_files).collect();
        let file_set_error_count = missing.len() + additional.len();
        push_file_set_details(&mut file_set_differences, &missing, "missing file:");
        push_file_set_details(&mut file_set_differences, &additional, "additional file:");

        let coclustering_suffix = format!(".{COCLUSTERING_EXTENSION}");
        let coclustering = test_files
            .union(&reference_files)
            .any(|name| name.ends_with(&coclustering_suffix));
        let sibling_names: BTreeSet<String> =
            test_files.union(&reference_files).cloned().collect();

        let mut records: Vec<FileRecord> = test_files
            .intersection(&reference_files)
            .map(|name| {
                self.compare_file_pair(
                    &results_path,
                    &reference_path,
                    name,
                    &sibling_names,
                    coclustering,
                )
            })
            .collect();

        let file_error_count: usize = records.iter().map(|record| record.error_count).sum();
        let mut warning_count: usize = records.iter().map(|record| record.warning_count).sum();
        let mut error_count = file_error_count + special_error_count + file_set_error_count;

        let mut recovery_outcome = None;
        if error_count > 0 {
            let snapshot = Snapshot {
                records: &records,
                special_error_count,
                file_set_error_count,
            };
            recovery_outcome = attempt_recoveries(self, test_dir, reference_name, &snapshot);
        }
        if let Some(recovered) = &recovery_outcome {
            info!(
                strategy = recovered.kind.as_str(),
                "comparison errors recovered as warnings"
            );
            warning_count += error_count;
            error_count = 0;
            for record in &mut records {
                record.warning_count += record.error_count;
                record.error_count = 0;
            }
        }

        let problem_file_types: Vec<String> = records
            .iter()
            .filter(|record| record.error_count > 0)
            .map(|record| record.file_type.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let note = (error_count > 0
            && special_error_count == 0
            && file_set_error_count == 0
            && problem_file_types.len() == 1)
            .then(|| format!("errors only in {} files", problem_file_types[0]));

        let mut portability_parts = Vec::new();
        if let Some(recovered) = &recovery_outcome {
            portability_parts.push(recovered.note.clone());
        }
        if candidate_count > 1 {
            portability_parts.push(format!(
                "reference '{reference_name}' selected among {candidate_count} candidates"
            ));
        }
        let portability = (!portability_parts.is_empty()).then(|| portability_parts.join("; "));

        Ok(ComparisonOutcome {
            reference_dir: reference_name.to_string(),
            candidate_count,
            error_count,
            warning_count,
            special_file: special_label,
            special_files,
            file_set_differences,
            problem_file_types,
            note,
            portability,
            recovery: recovery_outcome.map(|recovered| recovered.kind),
            files: records
                .into_iter()
                .map(|record| FileOutcome {
                    name: record.name,
                    kind: record.kind,
                    error_count: record.error_count,
                    warning_count: record.warning_count,
                    differences: record.differences,
                })
                .collect(),
        })
    }

    fn compare_file_pair(
        &self,
        results_path: &Path,
        reference_path: &Path,
        name: &str,
        siblings: &BTreeSet<String>,
        coclustering: bool,
    ) -> FileRecord {
        let kind = self.classifier.classify(name, siblings);
        let file_type = file_type_of(name);
        let test_raw = match read_lines(&results_path.join(name)) {
            Ok(lines) => lines,
            Err(error) => {
                return FileRecord::unreadable(
                    name,
                    kind,
                    file_type,
                    format!("cannot read file: {error}"),
                );
            }
        };
        let reference_raw = match read_lines(&reference_path.join(name)) {
            Ok(lines) => lines,
            Err(error) => {
                return FileRecord::unreadable(
                    name,
                    kind,
                    file_type,
                    format!("cannot read reference file: {error}"),
                );
            }
        };

        let test_lines = filter_lines(kind, &test_raw, coclustering);
        let reference_lines = filter_lines(kind, &reference_raw, coclustering);
        let split_fields = kind != FileKind::ErrorLog;
        let comparison = compare_file_lines(&test_lines, &reference_lines, split_fields, TOLERANCE);
        let (test_messages, reference_messages) =
            if matches!(kind, FileKind::ErrorLog | FileKind::Structured) {
                (
                    isolate_user_messages(&test_lines),
                    isolate_user_messages(&reference_lines),
                )
            } else {
                (Vec::new(), Vec::new())
            };
        debug!(
            file = name,
            kind = kind.as_str(),
            errors = comparison.error_count,
            warnings = comparison.warning_count,
            "compared file pair"
        );

        FileRecord {
            name: name.to_string(),
            kind,
            file_type,
            error_count: comparison.error_count,
            warning_count: comparison.warning_count,
            test_lines,
            reference_lines,
            test_messages,
            reference_messages,
            differences: comparison.differences,
        }
    }
}

/// One full check: resolve the reference, compare, write the log and the
/// optional JSON report.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub test_dir: PathBuf,
    pub vocabulary: ContextVocabulary,
    pub context: Context,
    pub log_path: Option<PathBuf>,
    pub json_report_path: Option<PathBuf>,
    pub max_details: usize,
}

impl CheckConfig {
    pub fn new(
        test_dir: impl Into<PathBuf>,
        vocabulary: ContextVocabulary,
        context: Context,
    ) -> Self {
        Self {
            test_dir: test_dir.into(),
            vocabulary,
            context,
            log_path: None,
            json_report_path: None,
            max_details: MAX_REPORTED_DIFFERENCES,
        }
    }
}

pub fn run_check(config: &CheckConfig) -> HarnessResult<ComparisonOutcome> {
    let candidates = discover_reference_candidates(&config.test_dir)?;
    let reference_name = resolve(&config.vocabulary, &candidates, &config.context)?;
    info!(
        reference = %reference_name,
        context = %config.context,
        "resolved reference directory"
    );

    let engine = Engine::new(&config.vocabulary, config.context.clone())?;
    let outcome = engine.compare(&config.test_dir, &reference_name)?;
    if let Some(path) = &config.log_path {
        write_comparison_log(path, &outcome, config.max_details)?;
    }
    if let Some(path) = &config.json_report_path {
        write_json_report(path, &outcome)?;
    }
    Ok(outcome)
}

fn write_json_report(path: &Path, outcome: &ComparisonOutcome) -> HarnessResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|error| {
                HarnessError::io_system(
                    "IO.REPORT",
                    format!(
                        "cannot create report directory '{}': {error}",
                        parent.display()
                    ),
                )
            })?;
        }
    }
    let body = serde_json::to_string_pretty(outcome).map_err(|error| {
        HarnessError::internal(
            "REPORT.SERIALIZE",
            format!("cannot serialize comparison outcome: {error}"),
        )
    })?;
    fs::write(path, body).map_err(|error| {
        HarnessError::io_system(
            "IO.REPORT",
            format!("cannot write report '{}': {error}", path.display()),
        )
    })?;
    Ok(())
}

fn collect_special_files(
    results_path: &Path,
    test_names: &BTreeSet<String>,
) -> (Vec<SpecialFileReport>, Option<SpecialFileLabel>, usize) {
    let mut reports = Vec::new();
    let mut label: Option<SpecialFileLabel> = None;
    let mut error_count = 0;
    for (name, file_label) in SPECIAL_ERROR_FILES {
        if !test_names.contains(name) {
            continue;
        }
        let lines = match read_lines(&results_path.join(name)) {
            Ok(lines) => lines,
            Err(error) => vec![format!("(unreadable: {error})")],
        };
        if lines.iter().all(|line| line.trim().is_empty()) {
            debug!(file = name, "ignoring empty capture file");
            continue;
        }
        error_count += 1;
        if label.is_none_or(|current| file_label.priority() > current.priority()) {
            label = Some(file_label);
        }
        let excerpt = lines
            .iter()
            .filter(|line| !line.trim().is_empty())
            .take(SPECIAL_FILE_EXCERPT_LINES)
            .map(|line| strip_process_rank_prefix(line).to_string())
            .collect();
        reports.push(SpecialFileReport {
            name: name.to_string(),
            label: file_label,
            excerpt,
        });
    }
    (reports, label, error_count)
}

/// Capture files and the timing log never take part in file pairing.
fn is_unpaired_name(name: &str) -> bool {
    name == TIME_LOG_FILE_NAME
        || SPECIAL_ERROR_FILES
            .iter()
            .any(|(special, _)| *special == name)
}

fn filter_paired_names(names: &BTreeSet<String>) -> BTreeSet<String> {
    names
        .iter()
        .filter(|name| !is_unpaired_name(name))
        .cloned()
        .collect()
}

fn push_file_set_details(differences: &mut Vec<Difference>, names: &[&String], label: &str) {
    for name in names.iter().take(MAX_LISTED_FILES) {
        differences.push(Difference {
            line: None,
            message: format!("{label} {name}"),
        });
    }
    if names.len() > MAX_LISTED_FILES {
        differences.push(Difference {
            line: None,
            message: format!("{label} {} more not listed", names.len() - MAX_LISTED_FILES),
        });
    }
}

fn list_file_names(dir: &Path, code: &'static str) -> HarnessResult<BTreeSet<String>> {
    let entries = fs::read_dir(dir).map_err(|error| {
        HarnessError::io_system(
            code,
            format!("cannot list directory '{}': {error}", dir.display()),
        )
    })?;
    let mut names = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|error| {
            HarnessError::io_system(
                code,
                format!("cannot read entry of '{}': {error}", dir.display()),
            )
        })?;
        if !entry.path().is_file() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) => {
                names.insert(name.to_string());
            }
            None => debug!(directory = %dir.display(), "skipping non-UTF-8 file name"),
        }
    }
    Ok(names)
}

/// Reads a text file leniently: invalid UTF-8 becomes replacement
/// characters and Windows line endings are stripped.
fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("creating parent directories should succeed");
        }
        fs::write(&path, content).expect("writing test file should succeed");
    }

    fn engine_for(vocabulary: &ContextVocabulary) -> Engine<'_> {
        let context = Context::new(vocabulary, &["sequential", "Linux"])
            .expect("standard context should be valid");
        Engine::new(vocabulary, context).expect("engine construction should succeed")
    }

    #[test]
    fn identical_directories_compare_clean() {
        let temp = TempDir::new().expect("temp dir should be created");
        write_file(temp.path(), "results/report.txt", "accuracy\t0.97\n");
        write_file(temp.path(), "results.ref/report.txt", "accuracy\t0.97\n");

        let vocabulary = ContextVocabulary::standard();
        let outcome = engine_for(&vocabulary)
            .compare(temp.path(), "results.ref")
            .expect("comparison should succeed");
        assert!(outcome.is_success());
        assert_eq!(outcome.error_count, 0);
        assert_eq!(outcome.warning_count, 0);
        assert_eq!(outcome.reference_dir, "results.ref");
        assert_eq!(outcome.candidate_count, 1);
        assert_eq!(outcome.files.len(), 1);
        assert!(outcome.portability.is_none());
    }

    #[test]
    fn differing_value_counts_one_error_with_line_number() {
        let temp = TempDir::new().expect("temp dir should be created");
        write_file(temp.path(), "results/report.txt", "a\t1.0\nb\t2.0\n");
        write_file(temp.path(), "results.ref/report.txt", "a\t1.0\nb\t3.0\n");

        let vocabulary = ContextVocabulary::standard();
        let outcome = engine_for(&vocabulary)
            .compare(temp.path(), "results.ref")
            .expect("comparison should succeed");
        assert_eq!(outcome.error_count, 1);
        let file = &outcome.files[0];
        assert_eq!(file.error_count, 1);
        assert_eq!(file.differences.len(), 1);
        assert_eq!(file.differences[0].line, Some(2));
    }

    #[test]
    fn missing_and_additional_files_each_count_one_error() {
        let temp = TempDir::new().expect("temp dir should be created");
        write_file(temp.path(), "results/only_here.txt", "x\n");
        write_file(temp.path(), "results.ref/only_there.txt", "x\n");

        let vocabulary = ContextVocabulary::standard();
        let outcome = engine_for(&vocabulary)
            .compare(temp.path(), "results.ref")
            .expect("comparison should succeed");
        assert_eq!(outcome.error_count, 2);
        let messages: Vec<&str> = outcome
            .file_set_differences
            .iter()
            .map(|difference| difference.message.as_str())
            .collect();
        assert!(messages.contains(&"missing file: only_there.txt"));
        assert!(messages.contains(&"additional file: only_here.txt"));
    }

    #[test]
    fn timing_log_is_never_paired() {
        let temp = TempDir::new().expect("temp dir should be created");
        write_file(temp.path(), "results/time.log", "0:00:12.5\n");
        write_file(temp.path(), "results.ref/time.log", "1:42:07\n");
        write_file(temp.path(), "results/report.txt", "ok\n");
        write_file(temp.path(), "results.ref/report.txt", "ok\n");

        let vocabulary = ContextVocabulary::standard();
        let outcome = engine_for(&vocabulary)
            .compare(temp.path(), "results.ref")
            .expect("comparison should succeed");
        assert_eq!(outcome.error_count, 0);
        assert_eq!(outcome.files.len(), 1, "time.log should not be compared");
    }

    #[test]
    fn non_empty_capture_files_raise_errors_with_priority_label() {
        let temp = TempDir::new().expect("temp dir should be created");
        write_file(temp.path(), "results/stdout_error.log", "unexpected output\n");
        write_file(
            temp.path(),
            "results/process_timeout_error.log",
            "[0] killed after 3600s\n",
        );
        write_file(temp.path(), "results/stderr_error.log", "\n  \n");
        fs::create_dir_all(temp.path().join("results.ref"))
            .expect("reference dir should be created");

        let vocabulary = ContextVocabulary::standard();
        let outcome = engine_for(&vocabulary)
            .compare(temp.path(), "results.ref")
            .expect("comparison should succeed");
        assert_eq!(outcome.error_count, 2, "empty stderr capture is ignored");
        assert_eq!(outcome.special_file, Some(SpecialFileLabel::Timeout));
        assert_eq!(outcome.special_files.len(), 2);
        let timeout = outcome
            .special_files
            .iter()
            .find(|report| report.name == TIMEOUT_ERROR_FILE)
            .expect("timeout capture should be reported");
        assert_eq!(
            timeout.excerpt,
            vec!["killed after 3600s".to_string()],
            "process rank prefix should be stripped from the excerpt"
        );
    }

    #[test]
    fn problem_file_types_and_note_cover_single_extension_errors() {
        let temp = TempDir::new().expect("temp dir should be created");
        write_file(temp.path(), "results/a.txt", "1.0\n");
        write_file(temp.path(), "results.ref/a.txt", "2.0\n");
        write_file(temp.path(), "results/b.txt", "5\n");
        write_file(temp.path(), "results.ref/b.txt", "9\n");

        let vocabulary = ContextVocabulary::standard();
        let outcome = engine_for(&vocabulary)
            .compare(temp.path(), "results.ref")
            .expect("comparison should succeed");
        assert_eq!(outcome.problem_file_types, vec!["txt".to_string()]);
        assert_eq!(outcome.note.as_deref(), Some("errors only in txt files"));
    }

    #[test]
    fn portability_mentions_candidate_count_when_several_references_exist() {
        let temp = TempDir::new().expect("temp dir should be created");
        write_file(temp.path(), "results/report.txt", "ok\n");
        write_file(temp.path(), "results.ref/report.txt", "ok\n");
        write_file(temp.path(), "results.ref-Windows/report.txt", "ok\r\n");

        let vocabulary = ContextVocabulary::standard();
        let outcome = engine_for(&vocabulary)
            .compare(temp.path(), "results.ref")
            .expect("comparison should succeed");
        assert_eq!(outcome.candidate_count, 2);
        assert_eq!(
            outcome.portability.as_deref(),
            Some("reference 'results.ref' selected among 2 candidates")
        );
    }

    #[test]
    fn run_check_writes_log_and_json_report() {
        let temp = TempDir::new().expect("temp dir should be created");
        write_file(temp.path(), "results/report.txt", "ok\n");
        write_file(temp.path(), "results.ref/report.txt", "ok\n");

        let vocabulary = ContextVocabulary::standard();
        let context = Context::new(&vocabulary, &["sequential", "Linux"])
            .expect("standard context should be valid");
        let mut config = CheckConfig::new(temp.path(), vocabulary, context);
        config.log_path = Some(temp.path().join(COMPARISON_LOG_FILE_NAME));
        config.json_report_path = Some(temp.path().join("report/outcome.json"));

        let outcome = run_check(&config).expect("check should succeed");
        assert!(outcome.is_success());
        let log = fs::read_to_string(temp.path().join(COMPARISON_LOG_FILE_NAME))
            .expect("log should be written");
        assert!(log.contains("SUMMARY"));
        let report = fs::read_to_string(temp.path().join("report/outcome.json"))
            .expect("report should be written");
        let parsed: serde_json::Value =
            serde_json::from_str(&report).expect("report should be valid JSON");
        assert_eq!(parsed["referenceDir"], "results.ref");
        assert_eq!(parsed["errorCount"], 0);
    }

    #[test]
    fn windows_line_endings_are_invisible_to_the_comparison() {
        let temp = TempDir::new().expect("temp dir should be created");
        write_file(temp.path(), "results/report.txt", "a\t1.0\r\nb\t2.0\r\n");
        write_file(temp.path(), "results.ref/report.txt", "a\t1.0\nb\t2.0\n");

        let vocabulary = ContextVocabulary::standard();
        let outcome = engine_for(&vocabulary)
            .compare(temp.path(), "results.ref")
            .expect("comparison should succeed");
        assert_eq!(outcome.error_count, 0);
        assert_eq!(outcome.warning_count, 0);
    }
}
