use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use url::Url;

use crate::cli::context::CliContext;
use crate::cli::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Print the configuration file path in use
    Path,

    /// Check patterns, durations and the playback endpoint
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let mut config = ctx.config().clone();
            if config.mood.playback.token.is_some() {
                config.mood.playback.token = Some("<redacted>".to_string());
            }
            match ctx.output() {
                OutputFormat::Human => {
                    println!("Current configuration ({}):", ctx.config_path().display());
                    println!("{}", serde_yaml::to_string(&config)?);
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
            }
        }
        ConfigAction::Path => {
            println!("{}", ctx.config_path().display());
        }
        ConfigAction::Validate => {
            let config = ctx.config();
            config
                .scanner
                .heuristics
                .compile()
                .context("Invalid scanner heuristics")?;
            config.mood.tick_interval()?;
            config.mood.playback.timeout()?;
            Url::parse(&config.mood.playback.api_base).with_context(|| {
                format!(
                    "Invalid mood.playback.api_base `{}`",
                    config.mood.playback.api_base
                )
            })?;
            println!("Configuration is valid ({})", ctx.config_path().display());
        }
    }
    Ok(())
}
