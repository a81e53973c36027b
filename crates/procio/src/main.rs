use std::process::ExitCode;

use anstream::eprintln;
use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;

use procio_logging::{Level, setup_logging};

use crate::cli::{Cli, Commands};
use crate::commands::ExitStatus;

mod cli;
mod commands;
mod value;

async fn run(cli: Cli) -> Result<ExitStatus> {
    setup_logging(Level::from_verbosity(cli.verbose))?;

    match cli.command {
        Commands::Run(args) => commands::run(args, cli.quiet).await,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed building the Runtime")
        .and_then(|runtime| {
            let result = runtime.block_on(run(cli));
            // A copy of our own stdin into the child may still be blocked on a read.
            runtime.shutdown_background();
            result
        });

    match result {
        Ok(code) => code.into(),
        Err(err) => {
            eprintln!("{}: {}", "error".red().bold(), err);
            for cause in err.chain().skip(1) {
                eprintln!("  {}: {}", "Caused by".red().bold(), cause);
            }
            ExitStatus::Error.into()
        }
    }
}
