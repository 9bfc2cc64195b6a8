mod commands;
mod config;
mod lock;

use anyhow::Result;
use clap::Parser;
use commands::Command;
use imis_core::{ErrorKind, RosterError};
use lock::RosterLocked;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: u8 = 1;
const EXIT_MISSING_SOURCE: u8 = 3;
const EXIT_INVALID_FORMAT: u8 = 4;
const EXIT_IO: u8 = 5;
const EXIT_INSUFFICIENT_CANDIDATES: u8 = 6;
const EXIT_LOCKED: u8 = 7;

#[derive(Parser)]
#[command(name = "imis-selector", version)]
#[command(about = "Maintain the iMIS member roster and draw newsletter winners", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,
    /// Config file to use instead of .imis/config.json
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = config::load_config(cli.config.as_deref())?;
    commands::handle_command(cli.command, &config)
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        let level = std::env::var("IMIS_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: logging already initialised");
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(roster_err) = cause.downcast_ref::<RosterError>() {
            return match roster_err.kind() {
                ErrorKind::MissingSource => EXIT_MISSING_SOURCE,
                ErrorKind::InvalidFormat => EXIT_INVALID_FORMAT,
                ErrorKind::Io => EXIT_IO,
                ErrorKind::InsufficientCandidates => EXIT_INSUFFICIENT_CANDIDATES,
            };
        }
        if cause.downcast_ref::<RosterLocked>().is_some() {
            return EXIT_LOCKED;
        }
    }
    EXIT_FAILURE
}
