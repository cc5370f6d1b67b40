//! Command-line interface
//!
//! Five subcommands cover the workflow: `train` runs the full pipeline,
//! `prepare` writes the enriched frame without training, `serve` starts
//! the prediction API, `models` lists registry contents, and `promote`
//! moves a version between lifecycle stages.

mod commands;

pub use commands::run_command;

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Log level for CLI output
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Suppress all output
    Quiet,
    /// Normal output level
    Normal,
    /// Verbose output with additional details
    Verbose,
}

/// Log a message if the current level permits it
pub(crate) fn log(level: LogLevel, required: LogLevel, msg: &str) {
    if level != LogLevel::Quiet && (level == required || required == LogLevel::Normal) {
        println!("{msg}");
    }
}

/// Readmitir: hospital readmission prediction workflow
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "readmitir")]
#[command(version)]
#[command(about = "Predict 30-day hospital readmission: enrich, train, register, serve")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Train a readmission model and log the run
    Train(TrainArgs),

    /// Enrich a raw encounter CSV without training
    Prepare(PrepareArgs),

    /// Serve predictions over HTTP
    Serve(ServeArgs),

    /// List registered models and versions
    Models(ModelsArgs),

    /// Move a registered version to another lifecycle stage
    Promote(PromoteArgs),
}

/// Arguments for the train command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct TrainArgs {
    /// Raw encounter CSV with the readmitted label column
    #[arg(value_name = "DATA")]
    pub data: PathBuf,

    /// Store directory for runs and the registry
    #[arg(short, long, default_value = "store")]
    pub store: PathBuf,

    /// Admission-type id lookup CSV
    #[arg(long)]
    pub admission_type_map: Option<PathBuf>,

    /// Discharge-disposition id lookup CSV
    #[arg(long)]
    pub discharge_map: Option<PathBuf>,

    /// Admission-source id lookup CSV
    #[arg(long)]
    pub admission_source_map: Option<PathBuf>,

    /// Register the trained model under this name
    #[arg(short, long)]
    pub register: Option<String>,

    /// Human-readable run name
    #[arg(long)]
    pub run_name: Option<String>,

    /// Experiment name
    #[arg(long)]
    pub experiment: Option<String>,

    /// Override number of boosting rounds
    #[arg(long)]
    pub trees: Option<usize>,

    /// Override maximum tree depth
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Random seed for the split and the booster
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fraction of rows held out for validation
    #[arg(long)]
    pub validation_fraction: Option<f64>,

    /// Also write the enriched training frame here
    #[arg(long)]
    pub processed_out: Option<PathBuf>,
}

/// Arguments for the prepare command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct PrepareArgs {
    /// Raw encounter CSV
    #[arg(value_name = "DATA")]
    pub data: PathBuf,

    /// Where to write the enriched CSV
    #[arg(short, long, value_name = "OUT")]
    pub output: PathBuf,

    /// Admission-type id lookup CSV
    #[arg(long)]
    pub admission_type_map: Option<PathBuf>,

    /// Discharge-disposition id lookup CSV
    #[arg(long)]
    pub discharge_map: Option<PathBuf>,

    /// Admission-source id lookup CSV
    #[arg(long)]
    pub admission_source_map: Option<PathBuf>,
}

/// Arguments for the serve command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ServeArgs {
    /// Store directory for runs and the registry
    #[arg(short, long, default_value = "store")]
    pub store: PathBuf,

    /// Address to bind
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    pub address: SocketAddr,

    /// Model locator to load at startup, e.g.
    /// models:/hospital_readmission/Production
    #[arg(short, long)]
    pub model: Option<String>,
}

/// Arguments for the models command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ModelsArgs {
    /// Store directory for runs and the registry
    #[arg(short, long, default_value = "store")]
    pub store: PathBuf,

    /// Show every version of this model instead of the name list
    #[arg(value_name = "NAME")]
    pub name: Option<String>,
}

/// Arguments for the promote command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct PromoteArgs {
    /// Registered model name
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Version to move
    #[arg(value_name = "VERSION")]
    pub version: u32,

    /// Target stage: None, Staging, Production, or Archived
    #[arg(value_name = "STAGE")]
    pub stage: String,

    /// Store directory for runs and the registry
    #[arg(short, long, default_value = "store")]
    pub store: PathBuf,

    /// Who is promoting, recorded on the version
    #[arg(long)]
    pub by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parses_train_with_overrides() {
        let cli = Cli::parse_from([
            "readmitir",
            "train",
            "encounters.csv",
            "--store",
            "/tmp/store",
            "--register",
            "hospital_readmission",
            "--trees",
            "100",
            "--seed",
            "7",
        ]);
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.data, PathBuf::from("encounters.csv"));
        assert_eq!(args.register.as_deref(), Some("hospital_readmission"));
        assert_eq!(args.trees, Some(100));
        assert_eq!(args.seed, Some(7));
    }

    #[test]
    fn parses_serve_defaults() {
        let cli = Cli::parse_from(["readmitir", "serve"]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.address.port(), 8080);
        assert_eq!(args.store, PathBuf::from("store"));
        assert!(args.model.is_none());
    }

    #[test]
    fn parses_promote_positionals() {
        let cli = Cli::parse_from([
            "readmitir",
            "promote",
            "hospital_readmission",
            "2",
            "Production",
            "--by",
            "mlops",
        ]);
        let Command::Promote(args) = cli.command else {
            panic!("expected promote");
        };
        assert_eq!(args.name, "hospital_readmission");
        assert_eq!(args.version, 2);
        assert_eq!(args.stage, "Production");
        assert_eq!(args.by.as_deref(), Some("mlops"));
    }

    #[test]
    fn global_flags_apply_to_subcommands() {
        let cli = Cli::parse_from(["readmitir", "models", "--quiet"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
    }
}
