//! Arklow command-line tool
//!
//! Lowers TypeScript/ArkTS files to three-address IR (`arklow lower`) and
//! reports parse errors and methods that could not be lowered
//! (`arklow check`).

mod commands;
mod output;

use clap::{ArgAction, Parser, Subcommand};
use commands::{Format, ProjectOptions};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "arklow")]
#[command(about = "Three-address IR for TypeScript and ArkTS sources", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Write logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Colored output: auto, always or never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the lowered IR of each file
    Lower {
        /// Files or directories to lower
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Only print methods with this name
        #[arg(long)]
        method: Option<String>,
        #[command(flatten)]
        project: ProjectOptions,
    },

    /// Parse and lower, reporting errors without printing IR
    Check {
        /// Files or directories to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Diagnostic format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        #[command(flatten)]
        project: ProjectOptions,
    },
}

fn setup_logging(verbose: u8, json: bool) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let formatter = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    if json {
        tracing_subscriber::registry()
            .with(formatter.json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(formatter)
            .with(filter)
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.log_json);
    let color = output::resolve_color_choice(cli.color.as_deref());

    let success = match cli.command {
        Commands::Lower {
            files,
            format,
            method,
            project,
        } => commands::lower::execute(&files, format, method.as_deref(), &project, color)?,
        Commands::Check {
            files,
            format,
            project,
        } => commands::check::execute(&files, format, &project, color)?,
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
