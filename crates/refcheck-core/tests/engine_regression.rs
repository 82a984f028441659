use std::fs;
use std::path::Path;

use tempfile::TempDir;

use refcheck_core::context::{Context, ContextVocabulary};
use refcheck_core::engine::{COMPARISON_LOG_FILE_NAME, CheckConfig, run_check};
use refcheck_core::report::parse_summary;

fn write_file(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dir should be created");
    }
    fs::write(&path, content).expect("file should be written");
}

fn check_config(temp: &TempDir, values: &[&str]) -> CheckConfig {
    let vocabulary = ContextVocabulary::standard();
    let context = Context::new(&vocabulary, values).expect("context should be valid");
    let mut config = CheckConfig::new(temp.path(), vocabulary, context);
    config.log_path = Some(temp.path().join(COMPARISON_LOG_FILE_NAME));
    config
}

fn read_log(temp: &TempDir) -> String {
    fs::read_to_string(temp.path().join(COMPARISON_LOG_FILE_NAME))
        .expect("comparison log should be written")
}

#[test]
fn full_check_resolves_the_specialized_reference_for_its_context() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_file(temp.path(), "results/report.txt", "rows\t40000\n");
    write_file(temp.path(), "results.ref/report.txt", "rows\t10000\n");
    write_file(temp.path(), "results.ref-parallel/report.txt", "rows\t40000\n");

    let config = check_config(&temp, &["parallel", "Linux"]);
    let outcome = run_check(&config).expect("check should succeed");

    assert_eq!(outcome.reference_dir, "results.ref-parallel");
    assert_eq!(outcome.candidate_count, 2);
    assert_eq!(outcome.error_count, 0);
    assert_eq!(
        outcome.portability.as_deref(),
        Some("reference 'results.ref-parallel' selected among 2 candidates")
    );

    let sequential = check_config(&temp, &["sequential", "Linux"]);
    let outcome = run_check(&sequential).expect("check should succeed");
    assert_eq!(outcome.reference_dir, "results.ref");
    assert_eq!(
        outcome.error_count, 1,
        "the sequential reference should disagree on the row count"
    );
}

#[test]
fn repeated_runs_write_identical_logs() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_file(temp.path(), "results/report.txt", "a\t1.0\nb\t2.0\n");
    write_file(temp.path(), "results/err.txt", "error : missing field\n");
    write_file(temp.path(), "results.ref/report.txt", "a\t1.0\nb\t9.9\n");
    write_file(temp.path(), "results.ref/err.txt", "error : missing field\n");

    let config = check_config(&temp, &["sequential", "Linux"]);
    run_check(&config).expect("first check should succeed");
    let first = read_log(&temp);
    run_check(&config).expect("second check should succeed");
    let second = read_log(&temp);

    assert_eq!(first, second, "log output should be deterministic");
    let block = parse_summary(&first).expect("log should carry a summary block");
    assert_eq!(block.error_count, 1);
}

#[test]
fn line_count_mismatch_counts_one_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_file(temp.path(), "results/report.txt", "a\t1\nb\t2\n");
    write_file(temp.path(), "results.ref/report.txt", "a\t1\nb\t2\nc\t3\n");

    let config = check_config(&temp, &["sequential", "Linux"]);
    let outcome = run_check(&config).expect("check should succeed");

    assert_eq!(outcome.error_count, 1);
    let file = &outcome.files[0];
    assert_eq!(file.differences[0].line, None);
    assert!(read_log(&temp).contains("has 2 lines and should have 3 lines"));
}

#[test]
fn field_count_mismatch_counts_one_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_file(temp.path(), "results/report.txt", "a\t1\t2\n");
    write_file(temp.path(), "results.ref/report.txt", "a\t1\n");

    let config = check_config(&temp, &["sequential", "Linux"]);
    let outcome = run_check(&config).expect("check should succeed");

    assert_eq!(outcome.error_count, 1);
    assert!(read_log(&temp).contains("has 3 fields and should have 2"));
}

#[test]
fn error_log_filters_absorb_known_noise() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_file(
        temp.path(),
        "results/err.txt",
        "Train model: done (time: 2.51s)\n\
         warning : Table train : Read 12500 records instead of 12000\n\
         Task interrupted by user at 45%\n\
         warning : Not Enough Memory for the dictionary cache\n",
    );
    write_file(
        temp.path(),
        "results.ref/err.txt",
        "Train model: done (time: 3.07s)\n\
         warning : Table train : Read 11000 records instead of 12000\n\
         Task interrupted by user at 99%\n\
         warning : not enough memory for the dictionary cache\n",
    );

    let config = check_config(&temp, &["sequential", "Linux"]);
    let outcome = run_check(&config).expect("check should succeed");
    assert_eq!(outcome.error_count, 0);
    assert_eq!(outcome.warning_count, 0);
}

#[test]
fn histogram_elapsed_time_lines_are_ignored() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_file(
        temp.path(),
        "results/freq_Histogram.log",
        "bin\tcount\n0\t12\nElapsed time 12.4s\n",
    );
    write_file(
        temp.path(),
        "results.ref/freq_Histogram.log",
        "bin\tcount\n0\t12\nElapsed time 9.1s\n",
    );

    let config = check_config(&temp, &["sequential", "Linux"]);
    let outcome = run_check(&config).expect("check should succeed");
    assert_eq!(outcome.error_count, 0);
    assert_eq!(outcome.warning_count, 0);
}

#[test]
fn benchmark_time_blocks_are_skipped() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_file(
        temp.path(),
        "results/benchmark.xls",
        "Accuracy\ntrain\t0.91\n\nComputing Time\ntrain\t12.4\n\nCoverage\ntrain\t0.99\n",
    );
    write_file(
        temp.path(),
        "results.ref/benchmark.xls",
        "Accuracy\ntrain\t0.91\n\nComputing Time\ntrain\t99.9\n\nCoverage\ntrain\t0.99\n",
    );

    let config = check_config(&temp, &["sequential", "Linux"]);
    let outcome = run_check(&config).expect("check should succeed");
    assert_eq!(outcome.error_count, 0);
    assert_eq!(outcome.warning_count, 0);
}

#[test]
fn structured_banner_and_version_members_are_skipped() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_file(
        temp.path(),
        "results/model.anj",
        "#Analytics 10.2\n{\n  \"version\": \"10.2.1\",\n  \"accuracy\": 0.88\n}\n",
    );
    write_file(
        temp.path(),
        "results.ref/model.anj",
        "#Analytics 10.5\n{\n  \"version\": \"10.5.0\",\n  \"accuracy\": 0.88\n}\n",
    );

    let config = check_config(&temp, &["sequential", "Linux"]);
    let outcome = run_check(&config).expect("check should succeed");
    assert_eq!(outcome.error_count, 0);
    assert_eq!(outcome.warning_count, 0);
}

#[test]
fn scratch_paths_compare_equal_across_hosts() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_file(
        temp.path(),
        "results/err.txt",
        "warning : temp file /tmp/scratch_a1b2/slices/slice_004.bin removed\n",
    );
    write_file(
        temp.path(),
        "results.ref/err.txt",
        "warning : temp file /var/scratch_zz9/slices/slice_012.bin removed\n",
    );

    let config = check_config(&temp, &["sequential", "Linux"]);
    let outcome = run_check(&config).expect("check should succeed");
    assert_eq!(outcome.error_count, 0);
    assert_eq!(outcome.warning_count, 0);
}

#[test]
fn numeric_drift_within_tolerance_counts_warnings_only() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_file(temp.path(), "results/report.txt", "0.500000\t1.000000\n");
    write_file(temp.path(), "results.ref/report.txt", "0.500001\t1.000001\n");

    let config = check_config(&temp, &["sequential", "Linux"]);
    let outcome = run_check(&config).expect("check should succeed");
    assert_eq!(outcome.error_count, 0);
    assert_eq!(outcome.warning_count, 2);

    let block = parse_summary(&read_log(&temp)).expect("log should carry a summary block");
    assert!(block.is_success());
    assert_eq!(block.warning_count, 2);
}

#[test]
fn time_valued_fields_always_compare_equal() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_file(temp.path(), "results/report.txt", "elapsed\t0:03:27.5\n");
    write_file(temp.path(), "results.ref/report.txt", "elapsed\t12:00:01\n");

    let config = check_config(&temp, &["sequential", "Linux"]);
    let outcome = run_check(&config).expect("check should succeed");
    assert_eq!(outcome.error_count, 0);
    assert_eq!(outcome.warning_count, 0);
}

#[test]
fn missing_files_are_listed_in_the_log() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_file(temp.path(), "results/report.txt", "ok\n");
    write_file(temp.path(), "results.ref/report.txt", "ok\n");
    write_file(temp.path(), "results.ref/extra.txt", "only in reference\n");

    let config = check_config(&temp, &["sequential", "Linux"]);
    let outcome = run_check(&config).expect("check should succeed");

    assert_eq!(outcome.error_count, 1);
    let log = read_log(&temp);
    assert!(log.contains("missing file: extra.txt"));
    let block = parse_summary(&log).expect("log should carry a summary block");
    assert_eq!(block.error_count, 1);
}

#[test]
fn capture_files_surface_in_the_summary_block() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_file(temp.path(), "results/report.txt", "ok\n");
    write_file(temp.path(), "results/stdout_error.log", "stray output\n");
    write_file(temp.path(), "results.ref/report.txt", "ok\n");

    let config = check_config(&temp, &["sequential", "Linux"]);
    let outcome = run_check(&config).expect("check should succeed");
    assert_eq!(outcome.error_count, 1);

    let log = read_log(&temp);
    assert!(log.contains("file stdout_error.log: UNEXPECTED OUTPUT"));
    let block = parse_summary(&log).expect("log should carry a summary block");
    assert_eq!(block.error_count, 1);
    assert_eq!(
        block.special_file,
        Some(refcheck_core::engine::SpecialFileLabel::UnexpectedOutput)
    );
}
