//! Readmitir CLI
//!
//! Hospital readmission prediction workflow.
//!
//! # Usage
//!
//! ```bash
//! # Train and register a model
//! readmitir train encounters.csv --register hospital_readmission
//!
//! # Enrich a raw CSV without training
//! readmitir prepare encounters.csv --output processed.csv
//!
//! # Promote a version
//! readmitir promote hospital_readmission 1 Production
//!
//! # Serve predictions
//! readmitir serve --model models:/hospital_readmission/Production
//! ```

use clap::Parser;
use readmitir::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
