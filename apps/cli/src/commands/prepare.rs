//! Prepare command implementation.

use super::open_session;
use crate::output;
use colored::Colorize;
use dmt_core::DmtConfig;
use serde_json::json;

pub async fn execute(config: DmtConfig, train_percentage: Option<f64>, json_output: bool) -> anyhow::Result<()> {
    let ratio = train_percentage.unwrap_or_else(|| config.train_percentage());
    let seed = config.training.seed;
    let mut session = open_session(config, json_output)?;
    let data = session.prepare(ratio)?;

    if json_output {
        return output::print_json(&json!({
            "records": data.num_records,
            "train": data.num_train(),
            "test": data.num_test(),
            "numerical": data.num_numerical(),
            "categorical": data.num_categorical(),
            "labels": data.num_labels(),
            "proportions": data.proportions(),
            "seed": seed,
        }));
    }

    output::heading("Dataset");
    println!("  Records: {}", data.num_records.to_string().green());
    println!(
        "  Features: {} numerical, {} categorical",
        data.num_numerical().to_string().cyan(),
        data.num_categorical().to_string().cyan()
    );
    println!("  {}", data.proportions().bold());
    if seed.is_none() {
        println!("  {}", "No seed configured; every command draws a new split.".dimmed());
    }
    println!();
    Ok(())
}
