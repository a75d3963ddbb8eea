use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::config::ConfigArgs;
use super::mood::MoodArgs;
use super::output::OutputFormat;
use super::scan::ScanArgs;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human, global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Scan a document snapshot for interactive elements
    Scan(ScanArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),

    /// Drive the mood bridge from a simulated emotion source
    Mood(MoodArgs),
}
