//! Command line interface and command execution

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use polyconf::{Configuration, EnvSource, Node, Variables};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "polyconf")]
#[command(about = "Inspect, query and convert configuration files", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Format of the input file, guessed from its extension when not given
    #[arg(short, long, global = true, env = "POLYCONF_FORMAT")]
    pub format: Option<String>,

    /// Replacement variable for interpolation (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var, global = true)]
    pub vars: Vec<(String, String)>,

    /// Replace `{name}` placeholders before output
    #[arg(short, long, global = true)]
    pub interpolate: bool,

    /// Add environment variables starting with this prefix
    #[arg(long, global = true, env = "POLYCONF_ENV_PREFIX")]
    pub env_prefix: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the whole configuration
    Show {
        /// Configuration file
        file: PathBuf,
    },

    /// Show one entry or section
    Get {
        /// Configuration file
        file: PathBuf,

        /// Dotted key, like `database.port`
        key: String,
    },

    /// List the dotted keys of every leaf entry
    Keys {
        /// Configuration file
        file: PathBuf,
    },

    /// Write the configuration in another format
    Convert {
        /// Configuration file
        file: PathBuf,

        /// Output format
        #[arg(short, long)]
        to: String,

        /// Output file, standard output when not given
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Parse a `NAME=VALUE` pair
pub fn parse_var(text: &str) -> Result<(String, String), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{text}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{text}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Executes one parsed command line
pub struct Application {
    cli: Cli,
}

impl Application {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the command and return the text to print
    pub fn run(&self) -> Result<String> {
        match &self.cli.command {
            Commands::Show { file } => {
                let config = self.load(file)?;
                Ok(config.to_string())
            }
            Commands::Get { file, key } => {
                let config = self.load(file)?;
                let node = config
                    .get(key.as_str())
                    .with_context(|| format!("Failed to look up '{key}' in {}", file.display()))?;
                Ok(match node {
                    Node::Entry(entry) => entry.value().to_string(),
                    Node::Section(section) => Configuration::from(section)
                        .with_name(key.as_str())
                        .to_string(),
                })
            }
            Commands::Keys { file } => {
                let config = self.load(file)?;
                Ok(config.leaf_keys().join("\n"))
            }
            Commands::Convert { file, to, output } => {
                let config = self.load(file)?;
                match output {
                    Some(path) => {
                        config
                            .as_file(path, Some(to.as_str()))
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        info!(output = %path.display(), format = %to, "Configuration converted");
                        Ok(String::new())
                    }
                    None => config
                        .as_str_pretty(to)
                        .with_context(|| format!("Failed to convert {} to {to}", file.display())),
                }
            }
        }
    }

    fn load(&self, file: &Path) -> Result<Configuration> {
        let mut config = Configuration::from_file(file, self.cli.format.as_deref())
            .with_context(|| format!("Failed to load configuration from {}", file.display()))?;

        if let Some(prefix) = &self.cli.env_prefix {
            config.update_from_env(&EnvSource::prefixed(prefix));
        }

        if self.cli.interpolate || !self.cli.vars.is_empty() {
            let variables = self
                .cli
                .vars
                .iter()
                .fold(Variables::new(), |vars, (name, value)| vars.var(name, value.as_str()));
            config = config.replace(&variables);
        }

        debug!(file = %file.display(), leafs = config.leaf_keys().len(), "Configuration loaded");
        Ok(config)
    }
}
