//! Imprint CLI - image provenance and tamper forensics tool.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use imprint_core::AnalysisProfile;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Invalid arguments or profile
  65  Image tampered or no payload found
  66  Input file unreadable or undecodable
  74  Output file could not be written";

#[derive(Parser)]
#[command(name = "imprint")]
#[command(author, version, about = "Image provenance and tamper forensics", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Print machine-readable JSON instead of the human summary
    #[arg(long, global = true)]
    json: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log core analysis steps to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Analysis profile (JSON); falls back to $IMPRINT_PROFILE
    #[arg(long, global = true, value_name = "FILE")]
    profile: Option<PathBuf>,

    /// When to use colors
    #[arg(long, global = true, value_enum, default_value = "auto")]
    color: ColorChoice,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

/// Serialization format for registration records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cbor,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed an identity payload and write a registration record
    Embed {
        /// Image to watermark
        #[arg(value_name = "IMAGE")]
        file: PathBuf,

        /// Subject identifier to embed
        #[arg(short, long)]
        subject: String,

        /// Capture location as LAT,LON
        #[arg(long, value_name = "LAT,LON")]
        gps: Option<String>,

        /// Output PNG (defaults to <IMAGE stem>.imprinted.png)
        #[arg(short, long, value_name = "PNG")]
        output: Option<PathBuf>,

        /// Record format
        #[arg(short, long, value_enum, default_value = "cbor")]
        format: OutputFormat,
    },

    /// Recover an embedded identity payload
    Extract {
        #[arg(value_name = "IMAGE")]
        file: PathBuf,
    },

    /// Print the content digest and perceptual fingerprint
    Hash {
        #[arg(value_name = "IMAGE")]
        file: PathBuf,
    },

    /// Show container metadata and platform attribution
    Inspect {
        #[arg(value_name = "IMAGE")]
        file: PathBuf,
    },

    /// Compare a candidate against a registration record
    Compare {
        /// Image under examination
        #[arg(value_name = "CANDIDATE")]
        candidate: PathBuf,

        /// Registration record (.imprint)
        #[arg(value_name = "RECORD")]
        record: PathBuf,
    },

    /// Classify the likely origin of an image
    Classify {
        #[arg(value_name = "IMAGE")]
        file: PathBuf,
    },
}

/// Settings every command receives.
pub struct Session {
    pub json: bool,
    pub quiet: bool,
    pub profile: AnalysisProfile,
}

impl Session {
    /// Whether the human-readable summary should be printed.
    pub fn human(&self) -> bool {
        !self.json && !self.quiet
    }
}

fn init_tracing(verbose: bool, quiet: bool, ansi: bool) {
    let default = if verbose {
        "imprint=debug,imprint_core=debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let session = Session {
        json: cli.json,
        quiet: cli.quiet,
        profile: utils::load_profile(cli.profile.as_deref())?,
    };

    match cli.command {
        Commands::Embed {
            file,
            subject,
            gps,
            output,
            format,
        } => commands::embed::execute(file, subject, gps, output, format, &session),
        Commands::Extract { file } => commands::extract::execute(file, &session),
        Commands::Hash { file } => commands::hash::execute(file, &session),
        Commands::Inspect { file } => commands::inspect::execute(file, &session),
        Commands::Compare { candidate, record } => {
            commands::compare::execute(candidate, record, &session)
        }
        Commands::Classify { file } => commands::classify::execute(file, &session),
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let ansi = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };
    match cli.color {
        ColorChoice::Auto => {}
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
    }
    init_tracing(cli.verbose, cli.quiet, ansi);

    match run(cli) {
        Ok(()) => std::process::ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            let exit = exit_codes::ExitCode::from_anyhow(&err);
            if let Some(message) = exit.message {
                eprintln!("{} {}", "error:".red().bold(), message);
            }
            std::process::ExitCode::from(exit.code as u8)
        }
    }
}
