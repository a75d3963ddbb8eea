use super::config::cmd_config;
use super::env::{CliArgs, Commands};
use super::mood::cmd_mood;
use super::scan::cmd_scan;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Scan(args) => cmd_scan(args, ctx).await,
        Commands::Config(args) => cmd_config(args, ctx).await,
        Commands::Mood(args) => cmd_mood(args, ctx).await,
    }
}
