//! DMT CLI - on-device model training from the command line
//!
//! The `dmt` command prepares the housing dataset, retrains the updatable
//! model, compares it against the baseline, and backs model versions up to a
//! remote service.

mod commands;
mod config;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{
    backup, evaluate, infer, init, prepare, rename, reset, restore, settings, train, SettingsCommand,
};

/// DMT CLI - incremental training of a tabular regression model
#[derive(Parser, Debug)]
#[command(
    name = "dmt",
    author,
    version,
    about = "Retrain a regression model on local data and keep its versions backed up",
    long_about = "dmt prepares a housing dataset, incrementally retrains an updatable copy of a baseline model,\nreports baseline versus retrained error, and backs model versions up to a remote service."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Configuration file layered over ~/.dmt/config.toml and ./.dmtrc
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides config and DMT_DATA_DIR)
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize the data directory
    ///
    /// Creates the data directory, writes a zero-weight baseline model if none
    /// exists, and optionally copies a dataset into place.
    Init {
        /// Dataset file to copy into the data directory
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Overwrite an existing baseline
        #[arg(long)]
        force: bool,
    },

    /// Prepare the dataset and show the train/test split
    Prepare {
        /// Share of records used for training, between 0 and 1
        #[arg(short, long)]
        train_percentage: Option<f64>,

        /// Shuffle seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Retrain the updatable model, then compare it with the baseline
    Train {
        /// Number of epochs (overrides config)
        #[arg(short, long)]
        epochs: Option<u32>,

        /// Share of records used for training, between 0 and 1
        #[arg(short, long)]
        train_percentage: Option<f64>,

        /// Shuffle seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Compute MAE and RMSE of both models on the test fold
    Evaluate {
        /// Shuffle seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Predict one test sample with both models
    Infer {
        /// 1-based index into the test fold
        sample: usize,

        /// Shuffle seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Replace the updatable model with a fresh copy of the baseline
    Reset,

    /// Upload the updatable model under the current model id
    Backup,

    /// Download a model version and make it the updatable model
    Restore {
        /// Model id to restore
        model_id: String,
    },

    /// Move the current backup to a new model id
    Rename {
        /// New model id
        new_id: String,
    },

    /// Show or change persisted preferences
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = config::load_config(args.config.as_deref(), args.data_dir.clone())?;

    let level_name = args.log_level.as_deref().or(config.log_level.as_deref()).unwrap_or("warn");
    let level = match level_name {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let command = if let Some(cmd) = args.command {
        cmd
    } else {
        Args::command().print_help()?;
        return Ok(());
    };

    let json = args.json;
    match command {
        Command::Init { dataset, force } => init::execute(config, dataset, force, json).await?,
        Command::Prepare { train_percentage, seed } => {
            prepare::execute(config::with_seed(config, seed), train_percentage, json).await?;
        }
        Command::Train { epochs, train_percentage, seed } => {
            let mut config = config::with_seed(config, seed);
            if epochs.is_some() {
                config.training.epochs = epochs;
            }
            train::execute(config, train_percentage, json).await?;
        }
        Command::Evaluate { seed } => evaluate::execute(config::with_seed(config, seed), json).await?,
        Command::Infer { sample, seed } => infer::execute(config::with_seed(config, seed), sample, json).await?,
        Command::Reset => reset::execute(config, json).await?,
        Command::Backup => backup::execute(config, json).await?,
        Command::Restore { model_id } => restore::execute(config, &model_id, json).await?,
        Command::Rename { new_id } => rename::execute(config, &new_id, json).await?,
        Command::Settings(cmd) => settings::execute(config, cmd, json).await?,
    }

    Ok(())
}
