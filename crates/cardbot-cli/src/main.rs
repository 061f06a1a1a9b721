//! # cardbot CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use std::process::ExitCode;

use clap::Parser;

/// cardbot: applicant profile validation.
#[derive(Parser, Debug)]
#[command(name = "cardbot", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Validate an applicant profile document.
    Validate(cardbot_cli::validate::ValidateArgs),
    /// List the field constraints in effect.
    Constraints(cardbot_cli::constraints::ConstraintsArgs),
}

fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr so stdout carries only the report.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate(args) => {
            if cardbot_cli::validate::run(&args)? {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Constraints(args) => {
            cardbot_cli::constraints::run(&args)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
