//! Comparison log rendering. The terminal SUMMARY block is the interface
//! other tooling greps, so its key strings and line order are fixed.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::domain::{HarnessError, HarnessResult};
use crate::engine::{ComparisonOutcome, FileOutcome, SpecialFileLabel};

pub const SUMMARY_TITLE: &str = "SUMMARY";
pub const WARNING_KEY: &str = "warning(s): ";
pub const ERROR_KEY: &str = "error(s): ";
pub const PROBLEM_FILE_TYPES_KEY: &str = "Problem file types: ";
pub const NOTE_KEY: &str = "Note: ";
pub const PORTABILITY_KEY: &str = "Portability: ";
/// Marker appended when per-file details are truncated.
pub const DETAIL_ELLIPSIS: &str = "...";

/// Renders the full comparison log: per-file sections followed by the
/// SUMMARY block. Output depends only on the outcome, never on timestamps
/// or traversal order.
pub fn render_comparison_log(outcome: &ComparisonOutcome, max_details: usize) -> String {
    let mut log = String::new();
    let _ = writeln!(log, "reference directory: {}", outcome.reference_dir);

    if !outcome.file_set_differences.is_empty() {
        log.push('\n');
        for difference in &outcome.file_set_differences {
            let _ = writeln!(log, "{}", difference.message);
        }
    }
    for report in &outcome.special_files {
        log.push('\n');
        let _ = writeln!(log, "file {}: {}", report.name, report.label.as_str());
        for line in &report.excerpt {
            let _ = writeln!(log, "  {line}");
        }
    }
    if !outcome.files.is_empty() {
        log.push('\n');
        for file in &outcome.files {
            render_file_section(&mut log, file, max_details);
        }
    }

    log.push('\n');
    log.push_str(&render_summary_block(outcome));
    log
}

fn render_file_section(log: &mut String, file: &FileOutcome, max_details: usize) {
    if file.error_count == 0 && file.warning_count == 0 {
        let _ = writeln!(log, "file {}: OK", file.name);
        return;
    }
    let _ = writeln!(
        log,
        "file {}: {} error(s), {} warning(s)",
        file.name, file.error_count, file.warning_count
    );
    for difference in file.differences.iter().take(max_details) {
        match difference.line {
            Some(number) => {
                let _ = writeln!(log, "  line {number}: {}", difference.message);
            }
            None => {
                let _ = writeln!(log, "  {}", difference.message);
            }
        }
    }
    if file.differences.len() > max_details {
        let _ = writeln!(log, "  {DETAIL_ELLIPSIS}");
    }
}

/// Renders the SUMMARY block alone, in its fixed key order.
pub fn render_summary_block(outcome: &ComparisonOutcome) -> String {
    let mut block = String::new();
    let _ = writeln!(block, "{SUMMARY_TITLE}");
    let _ = writeln!(block, "{WARNING_KEY}{}", outcome.warning_count);
    let _ = writeln!(block, "{ERROR_KEY}{}", outcome.error_count);
    if let Some(label) = outcome.special_file {
        let _ = writeln!(block, "{}", label.as_str());
    }
    if !outcome.problem_file_types.is_empty() {
        let _ = writeln!(
            block,
            "{PROBLEM_FILE_TYPES_KEY}{}",
            outcome.problem_file_types.join(", ")
        );
    }
    if let Some(note) = &outcome.note {
        let _ = writeln!(block, "{NOTE_KEY}{note}");
    }
    if let Some(portability) = &outcome.portability {
        let _ = writeln!(block, "{PORTABILITY_KEY}{portability}");
    }
    block
}

pub fn write_comparison_log(
    path: &Path,
    outcome: &ComparisonOutcome,
    max_details: usize,
) -> HarnessResult<()> {
    let log = render_comparison_log(outcome, max_details);
    fs::write(path, log).map_err(|error| {
        HarnessError::io_system(
            "IO.LOG",
            format!("cannot write comparison log '{}': {error}", path.display()),
        )
    })
}

/// Parsed form of the terminal SUMMARY block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryBlock {
    pub warning_count: usize,
    pub error_count: usize,
    pub special_file: Option<SpecialFileLabel>,
    pub problem_file_types: Vec<String>,
    pub note: Option<String>,
    pub portability: Option<String>,
}

impl SummaryBlock {
    pub fn is_success(&self) -> bool {
        self.error_count == 0
    }
}

/// Extracts the last SUMMARY block from a rendered log. Returns `None` when
/// the block is absent or violates the key contract.
pub fn parse_summary(text: &str) -> Option<SummaryBlock> {
    let lines: Vec<&str> = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .collect();
    let title = lines.iter().rposition(|line| *line == SUMMARY_TITLE)?;
    let mut rest = lines[title + 1..]
        .iter()
        .copied()
        .take_while(|line| !line.trim().is_empty());

    let warning_count: usize = rest
        .next()?
        .strip_prefix(WARNING_KEY)?
        .trim()
        .parse()
        .ok()?;
    let error_count: usize = rest.next()?.strip_prefix(ERROR_KEY)?.trim().parse().ok()?;

    let mut block = SummaryBlock {
        warning_count,
        error_count,
        special_file: None,
        problem_file_types: Vec::new(),
        note: None,
        portability: None,
    };
    for line in rest {
        if let Some(label) = SpecialFileLabel::from_keyword(line) {
            block.special_file = Some(label);
        } else if let Some(types) = line.strip_prefix(PROBLEM_FILE_TYPES_KEY) {
            block.problem_file_types = types.split(", ").map(str::to_string).collect();
        } else if let Some(note) = line.strip_prefix(NOTE_KEY) {
            block.note = Some(note.to_string());
        } else if let Some(portability) = line.strip_prefix(PORTABILITY_KEY) {
            block.portability = Some(portability.to_string());
        } else {
            return None;
        }
    }
    Some(block)
}
