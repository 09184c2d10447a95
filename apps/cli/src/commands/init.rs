//! Init command implementation.

use super::open_session;
use crate::output;
use anyhow::Context;
use colored::Colorize;
use dmt_core::{DmtConfig, LinearModel};
use serde_json::json;
use std::path::PathBuf;

/// Execute the init command.
///
/// Writes a zero-weight baseline when none exists (or with `force`), copies
/// the dataset if one is given, then opens a session so the updatable copy
/// and the model id are in place.
pub async fn execute(config: DmtConfig, dataset: Option<PathBuf>, force: bool, json_output: bool) -> anyhow::Result<()> {
    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let baseline = config.baseline_artifact();
    let baseline_written = force || !baseline.exists();
    if baseline_written {
        if let Some(parent) = baseline.parent() {
            std::fs::create_dir_all(parent)?;
        }
        LinearModel::zeros(config.column_layout().num_numerical())
            .write(&baseline)
            .with_context(|| format!("Failed to write baseline {}", baseline.display()))?;
    }

    let dataset_path = config.dataset_path();
    if let Some(source) = dataset {
        if let Some(parent) = dataset_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&source, &dataset_path)
            .with_context(|| format!("Failed to copy dataset from {}", source.display()))?;
    }
    let dataset_present = dataset_path.is_file();

    let session = open_session(config, json_output)?;
    let model_id = session.store().model_id();

    if json_output {
        return output::print_json(&json!({
            "data_dir": data_dir,
            "baseline": baseline,
            "baseline_written": baseline_written,
            "dataset": dataset_path,
            "dataset_present": dataset_present,
            "model_id": model_id,
        }));
    }

    output::heading("DMT initialized");
    println!("  Data directory: {}", data_dir.display().to_string().green());
    let note = if baseline_written { "written" } else { "kept" };
    println!("  Baseline: {} ({})", baseline.display().to_string().green(), note.dimmed());
    if dataset_present {
        println!("  Dataset: {}", dataset_path.display().to_string().green());
    } else {
        println!("  Dataset: {}", format!("missing - {}", dataset_path.display()).yellow());
        println!("  {}", "Copy one into place with `dmt init --dataset <file>`".dimmed());
    }
    println!("  Model id: {}", model_id.cyan());
    println!();
    Ok(())
}
