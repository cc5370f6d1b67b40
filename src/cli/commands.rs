//! CLI command implementations

use super::{
    log, Cli, Command, LogLevel, ModelsArgs, PrepareArgs, PromoteArgs, ServeArgs, TrainArgs,
};
use crate::boost::BoostParams;
use crate::data::{read_frame, write_frame, Cell, Lookups};
use crate::features::{enrich_and_clean, map_readmitted, RAW_LABEL_COLUMN, TARGET_COLUMN};
use crate::registry::{FsRegistry, ModelRegistry, ModelStage};
use crate::serve::ServerConfig;
use crate::train::{run_training, TrainOptions};

/// Execute a CLI command based on the parsed arguments
pub fn run_command(cli: Cli) -> Result<(), String> {
    let level = if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    };

    match cli.command {
        Command::Train(args) => run_train(args, level),
        Command::Prepare(args) => run_prepare(args, level),
        Command::Serve(args) => run_serve(args, level),
        Command::Models(args) => run_models(args, level),
        Command::Promote(args) => run_promote(args, level),
    }
}

fn run_train(args: TrainArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Training from {}", args.data.display()),
    );

    let mut options = TrainOptions::new(&args.data, &args.store);
    options.admission_type_csv = args.admission_type_map;
    options.discharge_disposition_csv = args.discharge_map;
    options.admission_source_csv = args.admission_source_map;
    options.register = args.register;
    options.run_name = args.run_name;
    options.processed_out = args.processed_out;
    if let Some(experiment) = args.experiment {
        options.experiment = experiment;
    }
    if let Some(fraction) = args.validation_fraction {
        options.validation_fraction = fraction;
    }

    let mut params = BoostParams::default();
    if let Some(trees) = args.trees {
        params.n_trees = trees;
    }
    if let Some(depth) = args.max_depth {
        params.max_depth = depth;
    }
    if let Some(lr) = args.learning_rate {
        params.learning_rate = lr;
    }
    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    options.params = params;

    let report = run_training(&options).map_err(|e| format!("Training error: {e}"))?;

    log(level, LogLevel::Normal, &format!("Run {}", report.run_id));
    log(
        level,
        LogLevel::Normal,
        &format!(
            "  roc_auc={:.4} pr_auc={:.4}",
            report.metrics.roc_auc, report.metrics.pr_auc
        ),
    );
    log(
        level,
        LogLevel::Verbose,
        &format!(
            "  rows={} features={} scale_pos_weight={:.3}",
            report.n_rows, report.n_features, report.scale_pos_weight
        ),
    );
    log(
        level,
        LogLevel::Verbose,
        &format!("  model: {}", report.model_path.display()),
    );
    if let Some(version) = report.registered {
        log(
            level,
            LogLevel::Normal,
            &format!("  registered {} v{}", version.name, version.version),
        );
    }
    Ok(())
}

fn run_prepare(args: PrepareArgs, level: LogLevel) -> Result<(), String> {
    let lookups = Lookups::from_paths(
        args.admission_type_map.as_deref(),
        args.discharge_map.as_deref(),
        args.admission_source_map.as_deref(),
    )
    .map_err(|e| format!("Lookup error: {e}"))?;

    let raw = read_frame(&args.data).map_err(|e| format!("Data error: {e}"))?;

    // derive the binary target when the label column is present
    let target: Option<Vec<Cell>> = raw.column(RAW_LABEL_COLUMN).map(|labels| {
        labels
            .iter()
            .map(|cell| Cell::Num(f64::from(map_readmitted(cell))))
            .collect()
    });

    let mut features = raw.clone();
    features.drop_column(RAW_LABEL_COLUMN);
    let mut enriched = enrich_and_clean(&features, &lookups);
    if let Some(target) = target {
        enriched
            .set_column(TARGET_COLUMN, target)
            .map_err(|e| format!("Data error: {e}"))?;
    }

    write_frame(&enriched, &args.output).map_err(|e| format!("Write error: {e}"))?;
    log(
        level,
        LogLevel::Normal,
        &format!(
            "Wrote {} rows x {} columns to {}",
            enriched.height(),
            enriched.width(),
            args.output.display()
        ),
    );
    Ok(())
}

fn run_serve(args: ServeArgs, level: LogLevel) -> Result<(), String> {
    let mut config = ServerConfig::default()
        .with_address(args.address)
        .with_store(&args.store);
    if let Some(model) = args.model {
        config = config.with_initial_model(model);
    }

    log(
        level,
        LogLevel::Normal,
        &format!("Starting server on {}", config.address),
    );

    let runtime = tokio::runtime::Runtime::new().map_err(|e| format!("Runtime error: {e}"))?;
    runtime
        .block_on(crate::serve::run(config))
        .map_err(|e| format!("Server error: {e}"))
}

fn run_models(args: ModelsArgs, level: LogLevel) -> Result<(), String> {
    let registry = FsRegistry::open(&args.store).map_err(|e| format!("Registry error: {e}"))?;

    match args.name {
        Some(name) => {
            let versions = registry
                .list_versions(&name)
                .map_err(|e| format!("Registry error: {e}"))?;
            for v in versions {
                let auc = v
                    .metrics
                    .get("roc_auc")
                    .map_or("-".to_string(), |m| format!("{m:.4}"));
                log(
                    level,
                    LogLevel::Normal,
                    &format!(
                        "{} v{} [{}] roc_auc={} run={}",
                        v.name, v.version, v.stage, auc, v.run_id
                    ),
                );
                log(
                    level,
                    LogLevel::Verbose,
                    &format!("  artifact: {}", v.artifact_path),
                );
            }
        }
        None => {
            let names = registry.list_models();
            if names.is_empty() {
                log(level, LogLevel::Normal, "No registered models");
            }
            for name in names {
                let latest = registry
                    .get_latest(&name)
                    .map_err(|e| format!("Registry error: {e}"))?;
                log(
                    level,
                    LogLevel::Normal,
                    &format!("{name} ({} versions)", latest.version),
                );
            }
        }
    }
    Ok(())
}

fn run_promote(args: PromoteArgs, level: LogLevel) -> Result<(), String> {
    let stage = ModelStage::parse(&args.stage)
        .ok_or_else(|| format!("Unknown stage '{}'", args.stage))?;

    let mut registry = FsRegistry::open(&args.store).map_err(|e| format!("Registry error: {e}"))?;
    let version = registry
        .transition_stage(&args.name, args.version, stage, args.by.as_deref())
        .map_err(|e| format!("Promotion error: {e}"))?;

    log(
        level,
        LogLevel::Normal,
        &format!("{} v{} is now {}", version.name, version.version, version.stage),
    );
    Ok(())
}
