//! elementscan command-line application.
//!
//! Wires the element scanner and the mood bridge to a YAML configuration and a small
//! set of subcommands.

pub mod app_settings;
pub mod cli;

pub use app_settings::Config;
