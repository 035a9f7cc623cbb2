// crates/caseflow-contract/src/main.rs
// ============================================================================
// Binary: caseflow-contract
// Description: CLI for generating and verifying the caseflow wire contract.
// Purpose: Let CI regenerate the contract bundle and fail the build when a
//          developer's change drifted the on-disk artifacts.
// ============================================================================

//! Command-line entry point for the contract bundle generator.

use std::path::PathBuf;
use std::process::ExitCode;

use caseflow_contract::ContractBuilder;
use clap::Parser;
use clap::Subcommand;

/// Generates and verifies the caseflow wire contract bundle.
#[derive(Debug, Parser)]
#[command(name = "caseflow-contract", version, about)]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Regenerates the contract bundle on disk.
    Write {
        /// Output directory for generated artifacts.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Verifies the on-disk bundle matches what generation would produce.
    Verify {
        /// Directory containing the previously generated bundle.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Write { output_dir } => {
            let dir = output_dir.unwrap_or_else(ContractBuilder::default_output_dir);
            ContractBuilder::new(dir).write().map(|_| ())
        }
        Command::Verify { output_dir } => {
            let dir = output_dir.unwrap_or_else(ContractBuilder::default_output_dir);
            ContractBuilder::new(dir.clone()).verify_output(&dir)
        }
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("caseflow-contract: {err}");
            ExitCode::FAILURE
        }
    }
}
