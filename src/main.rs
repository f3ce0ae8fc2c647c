mod cli;
mod commands;
mod errors;
mod normalize;
mod utils;
mod walk;

use crate::errors::CaseResult;
use crate::utils::Config;
use clap::Parser;
use cli::Cli;
use console::style;
use directories::ProjectDirs;
use std::fs;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::fmt::time;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

fn init_tracing() {
    // stdout is reserved for the per-file report.
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(time::UtcTime::rfc_3339());

    Registry::default()
        .with(EnvFilter::from_default_env())
        .with(fmt_layer)
        .init();
}

/// User config from the platform config dir, or defaults when there is none.
fn load_config(quiet: bool) -> CaseResult<Config> {
    let Some(proj_dirs) = ProjectDirs::from("dev", "commentcase", "commentcase") else {
        tracing::warn!("unable to determine a config directory, using defaults");
        return Ok(Config::default());
    };

    let config_dir = proj_dirs.config_dir();
    if let Err(e) = fs::create_dir_all(config_dir) {
        tracing::warn!("cannot create {}: {e}, using defaults", config_dir.display());
        return Ok(Config::default());
    }
    Config::load(config_dir, quiet)
}

fn main() -> ExitCode {
    let now = Instant::now();
    init_tracing();

    tracing::debug!("CLI starting up");
    let cli = Cli::parse();

    let result = load_config(cli.quiet).and_then(|mut config| {
        let summary = commands::handle_command(cli, &mut config)?;
        Ok((summary, config.output.quiet))
    });

    match result {
        Ok((summary, quiet)) => {
            if !quiet {
                eprintln!(
                    "{} {} file(s) in {:.3}s.",
                    style("Finished").green().bold(),
                    summary.processed,
                    now.elapsed().as_secs_f32()
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {e}", style("error").red().bold());
            ExitCode::FAILURE
        }
    }
}
