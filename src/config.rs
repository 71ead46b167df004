//! Configuration module for memline.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments for the interpreter
#[derive(Parser, Debug)]
#[command(name = "memline")]
#[command(author = "memline authors")]
#[command(version = "0.1.0")]
#[command(about = "Tokenize and parse memcached-style text commands", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Read commands from this file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Longest accepted line in bytes (0 = unlimited)
    #[arg(long)]
    pub max_line_length: Option<usize>,

    /// Do not write acknowledgements
    #[arg(long)]
    pub no_reply: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub interpreter: InterpreterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Interpreter-related configuration
#[derive(Debug, Deserialize)]
pub struct InterpreterConfig {
    /// Input file (stdin when absent)
    pub input: Option<PathBuf>,
    /// Longest accepted line in bytes
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    /// Whether to write acknowledgements
    #[serde(default = "default_acknowledge")]
    pub acknowledge: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            input: None,
            max_line_length: default_max_line_length(),
            acknowledge: default_acknowledge(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_max_line_length() -> usize {
    2048
}

fn default_acknowledge() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub input: Option<PathBuf>,
    pub max_line_length: usize,
    pub acknowledge: bool,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(Self::merge(cli, toml_config))
    }

    /// Merge CLI args with TOML config (CLI takes precedence)
    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        Config {
            input: cli.input.or(toml_config.interpreter.input),
            max_line_length: cli
                .max_line_length
                .unwrap_or(toml_config.interpreter.max_line_length),
            acknowledge: !cli.no_reply && toml_config.interpreter.acknowledge,
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        }
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
