//! # sw-paths: The Main Entry Point
//!
//! Command-line front end for the SpectrumWorx install-paths recorder. This module
//! handles Command Line Interface (CLI) parsing, logging initialization, and
//! dispatching to the library.
//!
//! The same logic is exported as MSI custom-action entry points for the installer
//! itself; this binary exists for scripted installs, support diagnostics, and
//! development.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{LevelFilter, error};
use simplelog::{Config, SimpleLogger};

use spectrumworx_paths::action::{self, DATA_PROPERTY};
use spectrumworx_paths::session::LocalSession;

/// The primary Command Line Interface (CLI) configuration.
///
/// Uses `clap` for sub-command parsing and help generation.
#[derive(Parser)]
#[command(name = "sw-paths")]
#[command(about = "Records and maintains the SpectrumWorx.paths install locator", long_about = None)]
struct Cli {
    /// The sub-command to execute (record, doctor, remove).
    #[command(subcommand)]
    command: Option<Commands>,

    /// Turn on verbose logging.
    ///
    /// - `-v`: Debug
    /// - `-vv`: Trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Available sub-commands for the recorder.
#[derive(Subcommand)]
enum Commands {
    /// Write the locator file from the installer's configuration string.
    ///
    /// Exits with the installer status code: 1 on success, 3 on failure.
    Record {
        /// Configuration data `<plugin dir>|<support dir>`.
        ///
        /// Read from the `CustomActionData` environment variable when omitted,
        /// matching how a wrapping installer would hand it over.
        #[arg(long)]
        data: Option<String>,

        /// Dry run: print the locator payload instead of writing it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Inspect an installed locator file and report issues.
    ///
    /// Checks for:
    /// - A readable, well-formed locator file.
    /// - An existing support root and presets folder.
    Doctor {
        /// Locator file to inspect. Discovered via the VST plugin folders when
        /// omitted.
        #[arg(long)]
        path: Option<PathBuf>,

        /// Emit the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Delete the locator file (uninstall cleanup).
    ///
    /// Exits with the installer status code: 1 on success, 3 on failure.
    Remove {
        /// Locator file to delete. Discovered when omitted.
        #[arg(long)]
        path: Option<PathBuf>,

        /// Dry run: report what would be removed without removing it.
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Determine log level based on verbosity flag
    let log_level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    // Initialize logger
    // We ignore the result here as logging failure shouldn't crash the startup
    let _ = SimpleLogger::init(log_level, Config::default());

    match &cli.command {
        Some(Commands::Record { data, dry_run }) => {
            let session = match data {
                Some(data) => LocalSession::with_property(DATA_PROPERTY, data),
                None => LocalSession::new(),
            };
            let status = action::run_record(&session, *dry_run);
            std::process::exit(status.code() as i32);
        }
        Some(Commands::Doctor { path, json }) => {
            let session = LocalSession::new();
            match action::doctor(&session, path.as_deref(), *json) {
                Ok(report) if report.healthy() => {}
                Ok(_) => std::process::exit(1),
                Err(e) => {
                    error!("Doctor check failed: {e:#}");
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Remove { path, dry_run }) => {
            let session = LocalSession::new();
            let status = action::run_remove(&session, path.as_deref(), *dry_run);
            std::process::exit(status.code() as i32);
        }
        None => {
            // Default behavior if no command: print the help message
            use clap::CommandFactory;
            let _ = Cli::command().print_help();
        }
    }
}
