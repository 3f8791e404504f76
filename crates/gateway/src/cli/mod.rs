pub mod config;
pub mod repl;
pub mod run;
pub mod seed;

use clap::{Parser, Subcommand};

/// CrewAgent, a conversational front-end for the employee directory.
#[derive(Debug, Parser)]
#[command(name = "crewagent", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP gateway (default when no subcommand is given).
    Serve,
    /// Interactive chat in the terminal.
    Repl {
        /// Session id to resume or create.
        #[arg(long, default_value = "cli:repl")]
        session: String,
    },
    /// Send a single message through the pipeline and print the reply.
    Run {
        /// The message to send.
        message: String,
        /// Session id (defaults to "cli:run").
        #[arg(long, default_value = "cli:run")]
        session: String,
        /// Print the full reply as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Load employees from a JSON file and index their source text.
    Seed {
        /// Path to the seed file.
        file: String,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any issues.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `CA_CONFIG` (or
/// `config.toml` by default), falling back to defaults when the file is
/// absent. Env overrides apply after the file, so they always win.
/// Returns the parsed [`Config`] and the path that was used.
pub fn load_config() -> anyhow::Result<(ca_domain::config::Config, String)> {
    let config_path = std::env::var("CA_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let mut config: ca_domain::config::Config =
        if std::path::Path::new(&config_path).exists() {
            let raw = std::fs::read_to_string(&config_path)
                .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
            toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
        } else {
            ca_domain::config::Config::default()
        };
    config.apply_env_overrides();

    Ok((config, config_path))
}
