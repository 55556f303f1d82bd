// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod record;
pub mod types;
pub mod workspace;

use std::path::Path;

use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::errors::Result;
use crate::exec::shell::quote;
use crate::pipeline::{log_config, BuildMode, Pipeline};
use crate::record::{interrupted_stage, read_ledger};

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the pipeline file, then either previews it
/// (`--dry-run`), writes a submission script (`--pbs-script`) or runs it to
/// its target.
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_and_validate(&args.config)?;
    if let Some(target) = &args.target {
        cfg.pipeline.target = target.clone();
    }
    log_config(&cfg);

    if args.dry_run {
        let pipeline = Pipeline::build(cfg, BuildMode::Preview)?;
        print!("{}", pipeline.render_plan()?);
        return Ok(());
    }

    if let Some(path) = &args.pbs_script {
        let pipeline = Pipeline::build(cfg, BuildMode::Preview)?;
        let cmd = rerun_command(&args);
        pipeline.write_pbs_script(path, &cmd)?;
        return Ok(());
    }

    report_previous_run(&cfg.pipeline.ledger_path());

    let mut pipeline = Pipeline::build(cfg, BuildMode::Execute)?;
    let report = pipeline.run().await?;
    info!(
        ran = report.succeeded().count(),
        skipped = report.skipped().count(),
        "all stages done"
    );
    Ok(())
}

/// Warn if the ledger left by the last run ends inside a stage.
fn report_previous_run(ledger_path: &Path) {
    if !ledger_path.is_file() {
        return;
    }
    match read_ledger(ledger_path) {
        Ok(entries) => {
            if let Some(stage) = interrupted_stage(&entries) {
                warn!(stage, "previous run was interrupted while this stage was running");
            }
        }
        Err(err) => warn!(error = %err, "could not read previous ledger"),
    }
}

/// Command line that re-runs this pipeline, for submission scripts.
fn rerun_command(args: &CliArgs) -> String {
    let config = std::fs::canonicalize(&args.config)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| args.config.clone());
    let mut words = vec!["stagedag".to_string(), "--config".to_string(), quote(&config)];
    if let Some(target) = &args.target {
        words.push("--target".to_string());
        words.push(quote(target));
    }
    words.join(" ")
}
