//! Restore command implementation.

use super::open_session;
use crate::output;
use colored::Colorize;
use dmt_core::DmtConfig;
use dmt_store::StoreError;
use serde_json::json;

pub async fn execute(config: DmtConfig, model_id: &str, json_output: bool) -> anyhow::Result<()> {
    let session = open_session(config, json_output)?;
    match session.store().restore(model_id).await {
        Ok(()) => {}
        Err(StoreError::NotFound) => anyhow::bail!("No backup found for model id '{model_id}'"),
        Err(e) => return Err(e.into()),
    }

    if json_output {
        return output::print_json(&json!({ "model_id": model_id, "restored": true }));
    }

    println!();
    output::success("Model restored");
    println!("  From: {}", model_id.cyan());
    println!();
    Ok(())
}
