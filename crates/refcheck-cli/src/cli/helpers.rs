use refcheck_core::context::{
    Context, ContextVocabulary, DARWIN_PLATFORM, LINUX_PLATFORM, PARALLEL_COMPUTING,
    SEQUENTIAL_COMPUTING, WINDOWS_PLATFORM,
};
use refcheck_core::domain::HarnessError;

use super::CliError;

/// Maps the host operating system to a platform axis value.
pub(super) fn detect_platform_value() -> Result<&'static str, CliError> {
    match std::env::consts::OS {
        "linux" => Ok(LINUX_PLATFORM),
        "macos" => Ok(DARWIN_PLATFORM),
        "windows" => Ok(WINDOWS_PLATFORM),
        other => Err(CliError::Harness(HarnessError::input_validation(
            "INPUT.PLATFORM",
            format!("unsupported host operating system '{other}'; pass --platform explicitly"),
        ))),
    }
}

pub(super) const fn computing_value(processes: usize) -> &'static str {
    if processes > 1 {
        PARALLEL_COMPUTING
    } else {
        SEQUENTIAL_COMPUTING
    }
}

pub(super) fn validate_process_count(processes: usize) -> Result<(), CliError> {
    if processes == 0 {
        return Err(CliError::Usage(
            "Invalid process count '0'; expected a positive integer.".to_string(),
        ));
    }
    Ok(())
}

/// Builds the execution context from the CLI flags, falling back to host
/// detection when no platform value is given.
pub(super) fn build_context(
    vocabulary: &ContextVocabulary,
    processes: usize,
    platform: Option<&str>,
) -> Result<Context, CliError> {
    let platform = match platform {
        Some(value) => value,
        None => detect_platform_value()?,
    };
    let computing = computing_value(processes);
    Context::new(vocabulary, &[computing, platform]).map_err(|error| {
        CliError::Harness(HarnessError::input_validation(
            "INPUT.CONTEXT",
            error.to_string(),
        ))
    })
}
