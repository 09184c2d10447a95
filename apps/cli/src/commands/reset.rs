//! Reset command implementation.

use super::open_session;
use crate::output;
use dmt_core::DmtConfig;
use serde_json::json;

pub async fn execute(config: DmtConfig, json_output: bool) -> anyhow::Result<()> {
    let mut session = open_session(config, json_output)?;
    session.reset_model()?;

    if json_output {
        return output::print_json(&json!({
            "reset": true,
            "proportions": session.proportions()?,
        }));
    }

    println!();
    output::success("Model reset to the baseline");
    Ok(())
}
