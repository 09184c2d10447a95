//! Train command implementation.

use super::open_session;
use crate::output;
use colored::Colorize;
use dmt_core::DmtConfig;
use dmt_training::{BackupOutcome, FinalMetrics};

pub async fn execute(config: DmtConfig, train_percentage: Option<f64>, json_output: bool) -> anyhow::Result<()> {
    let mut session = open_session(config, json_output)?;
    if let Some(ratio) = train_percentage {
        session.prepare(ratio)?;
    }
    let report = session.train().await?;

    if json_output {
        return output::print_json(&report);
    }

    println!();
    output::success("Training complete");
    println!("  Final loss: {}", format!("{:.6}", report.summary.final_loss).cyan());
    println!(
        "  Epochs: {}  Total loss: {:.4}",
        report.summary.metrics.epochs_completed, report.summary.metrics.total_loss
    );
    match &report.summary.backup {
        BackupOutcome::Skipped => {}
        BackupOutcome::Succeeded => println!("  Backup: {}", "uploaded".green()),
        BackupOutcome::Failed(reason) => println!("  Backup: {}", format!("failed - {reason}").yellow()),
    }
    match (&report.metrics, &report.evaluation_error) {
        (Some(metrics), _) => print_metrics(metrics),
        (None, Some(reason)) => println!("  Evaluation: {}", format!("failed - {reason}").yellow()),
        (None, None) => {}
    }
    Ok(())
}

pub(crate) fn print_metrics(metrics: &FinalMetrics) {
    output::heading(&format!("Metrics (test dataset: {} samples)", metrics.samples));
    println!("  {:<8} {:>12} {:>12}", "", "pre-trained", "re-trained");
    println!("  {:<8} {:>12.4} {:>12.4}", "MAE", metrics.mae_baseline, metrics.mae_retrained);
    println!("  {:<8} {:>12.4} {:>12.4}", "RMSE", metrics.rmse_baseline, metrics.rmse_retrained);
    println!();
}
