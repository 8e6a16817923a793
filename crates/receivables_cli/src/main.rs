//! `receivables` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration, logging and the evaluation date.
//! - Open the store and hand the parsed command to its handler.
//! - Turn failures into a stderr message and an exit code.

mod cli;
mod commands;
mod error;

use chrono::Local;
use clap::Parser;
use cli::Cli;
use commands::Context;
use error::CliError;
use receivables_core::{init_logging, open_db, AppConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_db_path_override(cli.db);

    if let Some(dir) = config.logging.dir.as_deref() {
        init_logging(&config.logging.level, dir).map_err(CliError::Logging)?;
    }

    let ctx = Context {
        today: cli.today.unwrap_or_else(|| Local::now().date_naive()),
        dashboard: config.dashboard_options(),
    };
    let conn = open_db(&config.database.path)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::execute(&conn, cli.command, &ctx, &mut out)
}
