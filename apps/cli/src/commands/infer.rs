//! Infer command implementation.

use super::open_session;
use crate::output;
use colored::Colorize;
use dmt_core::DmtConfig;

pub async fn execute(config: DmtConfig, sample: usize, json_output: bool) -> anyhow::Result<()> {
    let mut session = open_session(config, json_output)?;
    let item = session.infer_sample(sample)?;

    if json_output {
        return output::print_json(&item);
    }

    output::heading(&format!("Test sample {}", item.sample));
    println!("  Expected:    {}", format!("{:.4}", item.expected).bold());
    println!("  Pre-trained: {}", format!("{:.4}", item.baseline_prediction).cyan());
    println!("  Re-trained:  {}", format!("{:.4}", item.retrained_prediction).cyan());
    println!();
    Ok(())
}
