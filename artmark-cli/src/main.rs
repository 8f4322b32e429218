use anyhow::Result;
use artmark_core::initialize_logging;
use clap::Parser;

mod args;
mod commands;
mod config;

use args::{Cli, Command, DatasetCommand};
use config::load_or_default;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_logging();

    let config = load_or_default(cli.global.config.as_deref())?;
    let quiet = cli.global.quiet;

    match cli.command {
        Command::Infer(args) => commands::run_infer(args, config, quiet).await,
        Command::Evaluate(args) => commands::run_evaluate(args, config),
        Command::Dataset { cmd } => match cmd {
            DatasetCommand::Subset(args) => commands::run_subset(args),
            DatasetCommand::Merge(args) => commands::run_merge(args),
            DatasetCommand::Split(args) => commands::run_split(args),
        },
        Command::Watermark(args) => commands::run_watermark(args, quiet),
        Command::Recipe(args) => commands::run_recipe(args, config),
    }
}
