//! `clap`-derived CLI, collapsed to what this workspace actually needs: a
//! default `serve` plus config introspection.

use clap::{Parser, Subcommand};

use ac_domain::config::Config;

#[derive(Debug, Parser)]
#[command(name = "act-cache", version, about = "Read-through act metadata + concert cache")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP gateway, background queue drainer, and sweeper (default).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

/// Load config from `ACT_CACHE_CONFIG` (default `config.toml`), falling back
/// to built-in defaults when the file does not exist.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var("ACT_CACHE_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        Config::default()
    };

    Ok((config, config_path))
}

pub mod config {
    use ac_domain::config::{Config, ConfigSeverity};

    /// Parse and validate the config, printing any issues.
    ///
    /// Returns `true` when valid (no `Error`-severity issues).
    pub fn validate(config: &Config, config_path: &str) -> bool {
        let issues = config.validate();

        if issues.is_empty() {
            println!("Config OK ({config_path})");
            return true;
        }

        let error_count = issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count();
        let warning_count = issues.len() - error_count;

        for issue in &issues {
            println!("{issue}");
        }

        println!("\n{error_count} error(s), {warning_count} warning(s) in {config_path}");
        error_count == 0
    }

    /// Dump the resolved config (with all defaults filled in) as TOML.
    pub fn show(config: &Config) {
        match toml::to_string_pretty(config) {
            Ok(output) => print!("{output}"),
            Err(e) => {
                eprintln!("failed to serialize config: {e}");
                std::process::exit(1);
            }
        }
    }
}
