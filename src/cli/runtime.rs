use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app_settings::Config;

pub const PLAYBACK_TOKEN_ENV: &str = "ELEMENTSCAN_PLAYBACK_TOKEN";

/// Installs the global subscriber. `RUST_LOG` wins over `--log-level`; logs go to stderr
/// so JSON output on stdout stays parseable.
pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .context("Failed to read config file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded configuration from: {}", config_path.display());
        Ok(LoadedConfig {
            config,
            path: config_path,
        })
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Ok(LoadedConfig {
            config: Config::default(),
            path: config_path,
        })
    }
}

/// `./config/config.yaml` if present, else the per-user config directory.
fn default_config_path() -> Result<PathBuf> {
    let local_config = PathBuf::from("config/config.yaml");
    if local_config.exists() {
        return Ok(local_config);
    }
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push("elementscan");
    path.push("config.yaml");
    Ok(path)
}

pub fn apply_env_overrides(config: &mut Config) {
    if let Ok(token) = env::var(PLAYBACK_TOKEN_ENV) {
        if !token.trim().is_empty() {
            config.mood.playback.token = Some(token);
            info!("Using playback token from {}", PLAYBACK_TOKEN_ENV);
        }
    }
}
