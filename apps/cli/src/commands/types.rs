//! Shared subcommand types.

use clap::{Subcommand, ValueEnum};
use dmt_abstraction::Toggle;

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Show model id and preferences
    Show,

    /// Turn the post-training backup on or off
    Backup {
        /// on or off
        #[arg(value_parser = parse_toggle)]
        state: Toggle,
    },

    /// Change the data-augmentation preference
    Augmentation {
        #[arg(value_enum, default_value_t = AugmentationAction::Toggle)]
        action: AugmentationAction,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AugmentationAction {
    Toggle,
    On,
    Off,
}

fn parse_toggle(value: &str) -> Result<Toggle, String> {
    value.parse()
}
