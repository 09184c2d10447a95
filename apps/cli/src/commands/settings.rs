//! Settings command implementation.

use super::{open_session, AugmentationAction, SettingsCommand};
use crate::output;
use colored::Colorize;
use dmt_abstraction::{SettingKey, SettingsStore, Toggle};
use dmt_core::DmtConfig;
use serde_json::json;

pub async fn execute(config: DmtConfig, command: SettingsCommand, json_output: bool) -> anyhow::Result<()> {
    let has_remote = config.remote.base_url.is_some();
    let session = open_session(config, json_output)?;

    match command {
        SettingsCommand::Show => {}
        SettingsCommand::Backup { state } => session.set_backup_enabled(state.is_on())?,
        SettingsCommand::Augmentation { action } => {
            match action {
                AugmentationAction::Toggle => {
                    session.toggle_data_augmentation()?;
                }
                AugmentationAction::On | AugmentationAction::Off => {
                    let value = Toggle::from(action == AugmentationAction::On);
                    session.context().settings().set_toggle(SettingKey::DataAugmentationEnabled, value)?;
                }
            }
        }
    }

    let model_id = session.store().model_id();
    let backup = Toggle::from(session.store().backup_enabled());
    let augmentation = Toggle::from(session.data_augmentation_enabled());
    let final_loss = session.last_final_loss();

    if json_output {
        return output::print_json(&json!({
            "model_id": model_id,
            "model_backup": backup,
            "data_augmentation": augmentation,
            "final_loss_of_last_training": final_loss,
            "remote_configured": has_remote,
        }));
    }

    let paint = |t: Toggle| if t.is_on() { t.as_str().green() } else { t.as_str().yellow() };
    output::heading("Settings");
    println!("  Model id: {}", model_id.cyan());
    println!("  Model backup: {}", paint(backup));
    if !has_remote {
        println!("    {}", "No backup service configured; set [remote] base_url".dimmed());
    }
    println!("  Data augmentation: {}", paint(augmentation));
    match final_loss {
        Some(loss) => println!("  Final loss of last training: {}", format!("{loss:.6}").cyan()),
        None => println!("  Final loss of last training: {}", "none".dimmed()),
    }
    println!();
    Ok(())
}
