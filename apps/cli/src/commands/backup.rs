//! Backup command implementation.

use super::open_session;
use crate::output;
use colored::Colorize;
use dmt_core::DmtConfig;
use serde_json::json;

pub async fn execute(config: DmtConfig, json_output: bool) -> anyhow::Result<()> {
    let session = open_session(config, json_output)?;
    let model_id = session.store().model_id();
    session.store().backup().await?;

    if json_output {
        return output::print_json(&json!({ "model_id": model_id, "backed_up": true }));
    }

    println!();
    output::success("Model backed up");
    println!("  Model id: {}", model_id.cyan());
    println!();
    Ok(())
}
