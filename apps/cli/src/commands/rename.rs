//! Rename command implementation.

use super::open_session;
use crate::output;
use colored::Colorize;
use dmt_core::DmtConfig;
use dmt_store::StoreError;
use serde_json::json;

pub async fn execute(config: DmtConfig, new_id: &str, json_output: bool) -> anyhow::Result<()> {
    let session = open_session(config, json_output)?;
    let old_id = session.store().model_id();
    match session.store().rename(new_id).await {
        Ok(()) => {}
        Err(StoreError::RenameConflict) => anyhow::bail!("Model id '{new_id}' is already taken"),
        Err(e) => return Err(e.into()),
    }

    if json_output {
        return output::print_json(&json!({ "old_id": old_id, "model_id": session.store().model_id() }));
    }

    println!();
    output::success("Model id changed");
    println!("  {} -> {}", old_id.dimmed(), session.store().model_id().cyan());
    println!();
    Ok(())
}
