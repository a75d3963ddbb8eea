use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use elementscan_cli::cli::{
    apply_env_overrides, dispatch, init_logging, load_config, CliArgs, CliContext,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug)?;
    info!("Starting elementscan v{}", env!("CARGO_PKG_VERSION"));

    let loaded = load_config(cli.config.as_ref()).await?;
    let mut config = loaded.config;
    apply_env_overrides(&mut config);
    let ctx = CliContext::new(config, loaded.path, cli.output);

    match dispatch(&cli, &ctx).await {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
