use std::path::PathBuf;

use refcheck_core::context::ContextVocabulary;
use refcheck_core::engine::{
    COMPARISON_LOG_FILE_NAME, CheckConfig, MAX_REPORTED_DIFFERENCES, run_check,
};
use refcheck_core::report::render_summary_block;
use refcheck_core::resolver::{discover_reference_candidates, resolve};
use tracing::debug;

use super::CliError;
use super::helpers::{build_context, validate_process_count};

#[derive(clap::Args)]
pub(super) struct CompareArgs {
    /// Test directory holding results/ and the reference candidates
    #[arg(long, default_value = ".")]
    test_dir: PathBuf,

    /// Process count of the checked run
    #[arg(long, default_value_t = 1)]
    processes: usize,

    /// Platform axis value; defaults to the host operating system
    #[arg(long)]
    platform: Option<String>,

    /// Comparison log path; defaults to comparison.log in the test directory
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Optional JSON report output path
    #[arg(long)]
    json_report: Option<PathBuf>,

    /// Difference details listed per file
    #[arg(long, default_value_t = MAX_REPORTED_DIFFERENCES)]
    max_details: usize,
}

pub(super) fn run_compare_command(args: CompareArgs) -> Result<i32, CliError> {
    validate_process_count(args.processes)?;

    let vocabulary = ContextVocabulary::standard();
    let context = build_context(&vocabulary, args.processes, args.platform.as_deref())?;
    debug!(
        test_dir = %args.test_dir.display(),
        context = %context,
        "starting results comparison"
    );
    let log_path = args
        .log_file
        .unwrap_or_else(|| args.test_dir.join(COMPARISON_LOG_FILE_NAME));

    let mut config = CheckConfig::new(args.test_dir, vocabulary, context);
    config.log_path = Some(log_path.clone());
    config.json_report_path = args.json_report;
    config.max_details = args.max_details;

    let outcome = run_check(&config).map_err(CliError::Harness)?;
    println!("comparison log: {}", log_path.display());
    print!("{}", render_summary_block(&outcome));

    if outcome.is_success() { Ok(0) } else { Ok(1) }
}

#[derive(clap::Args)]
pub(super) struct ResolveArgs {
    /// Test directory holding the reference candidates
    #[arg(long, default_value = ".")]
    test_dir: PathBuf,

    /// Process count of the checked run
    #[arg(long, default_value_t = 1)]
    processes: usize,

    /// Platform axis value; defaults to the host operating system
    #[arg(long)]
    platform: Option<String>,
}

pub(super) fn run_resolve_command(args: ResolveArgs) -> Result<i32, CliError> {
    validate_process_count(args.processes)?;

    let vocabulary = ContextVocabulary::standard();
    let context = build_context(&vocabulary, args.processes, args.platform.as_deref())?;
    let candidates = discover_reference_candidates(&args.test_dir).map_err(CliError::Harness)?;
    let reference = resolve(&vocabulary, &candidates, &context)
        .map_err(|error| CliError::Harness(error.into()))?;

    println!("context: {context}");
    println!("candidates: {}", candidates.len());
    println!("reference: {reference}");
    Ok(0)
}
