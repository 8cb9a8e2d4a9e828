use clap::{Parser, Subcommand};

use cp_domain::config::Config;

/// collab-platform -- collaboration platform backend.
#[derive(Debug, Parser)]
#[command(name = "collab-platform", version, about)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
}

/// Load the configuration at `path`, falling back to defaults if the file
/// is absent.
pub fn load_config(path: &str) -> Config {
    Config::load_or_default(path)
}
