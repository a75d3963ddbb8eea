pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod mood;
pub mod output;
pub mod runtime;
pub mod scan;

pub use context::CliContext;
pub use dispatch::dispatch;
pub use env::{CliArgs, Commands};
pub use output::OutputFormat;
pub use runtime::{apply_env_overrides, init_logging, load_config, LoadedConfig};
