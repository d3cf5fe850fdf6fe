#![deny(missing_docs)]

//! # OAS Conform CLI
//!
//! Command Line Interface for the OpenAPI conformance checker.
//!
//! Supported Commands:
//! - `check`: Checks a recorded request/response exchange against a document.
//! - `routes`: Lists the operations a document declares.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::CliResult;

mod check;
mod error;
mod routes;

#[derive(Parser, Debug)]
#[clap(author, version, about = "OpenAPI conformance checker")]
struct Cli {
    /// Log resolution and selection decisions to stderr.
    #[clap(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a recorded exchange; exits non-zero when findings are reported.
    Check(check::CheckArgs),
    /// List `METHOD template` for every declared operation.
    Routes(routes::RoutesArgs),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Check(args) => {
            let report = check::execute(args)?;
            if report.is_empty() && !args.json {
                println!("Exchange conforms");
                return Ok(ExitCode::SUCCESS);
            }
            println!("{}", check::render(&report, args.json)?);
            if !report.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Routes(args) => {
            for line in routes::execute(args)? {
                println!("{}", line);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
