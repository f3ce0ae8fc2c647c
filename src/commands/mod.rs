pub mod run;

pub use run::RunSummary;

use crate::cli::Cli;
use crate::errors::CaseResult;
use crate::utils::config::{Config, FailurePolicy, WriteStrategy};
use std::path::Path;

/// Fold CLI flags into the loaded config, then run over `cli.path`.
pub fn handle_command(cli: Cli, config: &mut Config) -> CaseResult<RunSummary> {
    if cli.keep_going {
        config.run.on_error = FailurePolicy::Continue;
    }

    if cli.atomic {
        config.run.write_strategy = WriteStrategy::Atomic;
    }

    if cli.quiet {
        config.output.quiet = true;
    }

    let summary = run::handle(Path::new(&cli.path), &crate::utils::LUA, config)?;
    tracing::debug!(?summary, "run complete");
    Ok(summary)
}
