//! Shared helpers for the subcommands

use codepad_foundation::CodepadConfig;
use codepad_runtime::ExecutionOutcome;

/// Config files, then env, then command-line flags
pub fn load_config(api_url: Option<&str>, python: Option<&str>) -> anyhow::Result<CodepadConfig> {
    let config = apply_flags(CodepadConfig::load()?, api_url, python);

    tracing::debug!(
        "Using task service {} and python {}",
        config.api.base_url,
        config.runtime.python_path.as_deref().unwrap_or("<auto>")
    );
    Ok(config)
}

fn apply_flags(
    mut config: CodepadConfig,
    api_url: Option<&str>,
    python: Option<&str>,
) -> CodepadConfig {
    if let Some(url) = api_url {
        config = config.base_url(url);
    }
    if let Some(python) = python {
        config = config.python_path(python);
    }
    config
}

/// Write captured output to stdout and any error to stderr.
///
/// Returns whether the run succeeded.
pub fn print_outcome(outcome: &ExecutionOutcome) -> bool {
    use std::io::Write;

    print!("{}", outcome.output);
    if !outcome.output.is_empty() && !outcome.output.ends_with('\n') {
        println!();
    }
    let _ = std::io::stdout().flush();

    if outcome.truncated {
        eprintln!("[output truncated]");
    }

    match &outcome.error {
        None => true,
        Some(error) => {
            match &error.traceback {
                Some(traceback) => eprint!("{}", traceback),
                None => eprintln!("{}", error),
            }
            false
        }
    }
}

/// Truncate a string for display
pub fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_chars {
        s
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
