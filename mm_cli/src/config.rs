//! CLI configuration management.
//!
//! Command-line flags take precedence over environment variables, which take
//! precedence over the built-in defaults. `.env` is loaded by `main` before
//! this runs.

use matchmaker::tournament::{DEFAULT_CALCULATOR, ExhaustionPolicy};
use pico_args::Arguments;
use std::path::PathBuf;

/// Complete CLI configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// PostgreSQL connection string; in-memory storage when absent
    pub database_url: Option<String>,
    /// JSON file of calculator tables to register at startup
    pub calculators_file: Option<PathBuf>,
    /// Calculator for tournaments created without naming one
    pub default_calculator: String,
    /// Whether rounds created from the CLI allow rematches by default
    pub allow_rematch: bool,
    /// Read commands from this file instead of stdin
    pub script: Option<PathBuf>,
    /// Print results as JSON
    pub json: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            calculators_file: None,
            default_calculator: DEFAULT_CALCULATOR.to_string(),
            allow_rematch: false,
            script: None,
            json: false,
        }
    }
}

impl CliConfig {
    /// Load configuration from command-line arguments and the process environment
    ///
    /// # Errors
    ///
    /// Returns error if a flag or variable is malformed or unknown arguments remain
    pub fn from_env_and_args(pargs: Arguments) -> Result<Self, ConfigError> {
        Self::resolve(pargs, |key| std::env::var(key).ok())
    }

    /// Load configuration with `env` standing in for the process environment
    ///
    /// # Arguments
    ///
    /// * `pargs` - Remaining command-line arguments (help already handled)
    /// * `env` - Lookup for environment variables
    pub fn resolve(
        mut pargs: Arguments,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let database_url = flag_value::<String>(&mut pargs, "--db-url")?
            .or_else(|| env("DATABASE_URL"))
            .filter(|url| !url.trim().is_empty());

        let calculators_file = flag_value::<PathBuf>(&mut pargs, "--calculators")?
            .or_else(|| env("MM_CALCULATORS_FILE").map(PathBuf::from));

        let default_calculator = flag_value::<String>(&mut pargs, "--default-calculator")?
            .or_else(|| env("MM_DEFAULT_CALCULATOR"))
            .map(|name| name.trim().to_string())
            .unwrap_or_else(|| DEFAULT_CALCULATOR.to_string());
        if default_calculator.is_empty() {
            return Err(ConfigError::Invalid {
                var: "MM_DEFAULT_CALCULATOR".to_string(),
                reason: "Must name a calculator".to_string(),
            });
        }

        let allow_rematch = if pargs.contains("--rematch") {
            true
        } else {
            match env("MM_ALLOW_REMATCH") {
                Some(value) => parse_bool("MM_ALLOW_REMATCH", &value)?,
                None => false,
            }
        };

        let script = flag_value::<PathBuf>(&mut pargs, "--script")?;
        let json = pargs.contains("--json");

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            return Err(ConfigError::UnexpectedArguments(
                remaining
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(" "),
            ));
        }

        Ok(CliConfig {
            database_url,
            calculators_file,
            default_calculator,
            allow_rematch,
            script,
            json,
        })
    }

    /// Exhaustion policy for rounds created from the CLI
    pub fn exhaustion(&self) -> ExhaustionPolicy {
        if self.allow_rematch {
            ExhaustionPolicy::Rematch
        } else {
            ExhaustionPolicy::Fail
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Unexpected arguments: {0}")]
    UnexpectedArguments(String),
}

fn flag_value<T>(pargs: &mut Arguments, flag: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    pargs
        .opt_value_from_str(flag)
        .map_err(|e| ConfigError::Invalid {
            var: flag.to_string(),
            reason: e.to_string(),
        })
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::Invalid {
            var: var.to_string(),
            reason: format!("Expected true or false, got '{}'", other),
        }),
    }
}
