//! Evaluate command implementation.

use super::open_session;
use super::train::print_metrics;
use crate::output;
use dmt_core::DmtConfig;

pub async fn execute(config: DmtConfig, json_output: bool) -> anyhow::Result<()> {
    let mut session = open_session(config, json_output)?;
    let metrics = session.evaluate()?;

    if json_output {
        return output::print_json(&metrics);
    }
    print_metrics(&metrics);
    Ok(())
}
