//! Configuration system
//!
//! Supports multiple configuration sources with proper precedence:
//! 1. Command-line arguments (highest priority, applied by the binary)
//! 2. Environment variables (`ERRPROP_*`)
//! 3. Configuration file (`--config`, `ERRPROP_CONFIG`, or `.errprop.toml`)
//! 4. Built-in defaults (lowest priority)

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evaluator::DEFAULT_IMAG_TOLERANCE;
use crate::format::{OutputFormat, Precision};
use crate::parser::ParseOptions;
use crate::symbol::CollisionPolicy;
use crate::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES};

/// File looked up in the current directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = ".errprop.toml";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

/// Pipeline behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// What to do with a constant named like a variable
    pub collision_policy: CollisionPolicy,
    /// `|Im| <= tol * max(1, |Re|)` counts as real
    pub imag_tolerance: f64,
    /// Accept `2x` for `2*x`
    pub implicit_multiplication: bool,
    pub max_depth: usize,
    pub max_nodes: usize,
    /// Simplify partial derivatives and the error formula
    pub simplify: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            collision_policy: CollisionPolicy::default(),
            imag_tolerance: DEFAULT_IMAG_TOLERANCE,
            implicit_multiplication: true,
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
            simplify: true,
        }
    }
}

impl EngineConfig {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            implicit_multiplication: self.implicit_multiplication,
            max_depth: self.max_depth,
            max_nodes: self.max_nodes,
        }
    }
}

/// Result presentation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub precision: Precision,
    /// Also render both formulas as LaTeX
    pub latex: bool,
    pub format: OutputFormat,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(LogLevel::Off),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Configuration loader with multiple source support
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the file and the process environment
    ///
    /// `path` is the explicitly requested file (`--config` or
    /// `ERRPROP_CONFIG`); it must exist. Without it, `.errprop.toml` in the
    /// current directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load_from_file(&default)?
                } else {
                    log::debug!("No configuration file found, using defaults");
                    Config::default()
                }
            }
        };
        Self::apply_environment(&mut config, |key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Config, ConfigError> {
        log::info!("Loading configuration from: {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `ERRPROP_*` overrides read through `lookup`
    ///
    /// Unparsable values are ignored with a warning.
    pub fn apply_environment<F>(config: &mut Config, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn set<T: FromStr>(target: &mut T, key: &str, raw: Option<String>) {
            if let Some(raw) = raw {
                match raw.parse() {
                    Ok(value) => *target = value,
                    Err(_) => log::warn!("ignoring invalid value '{}' for {}", raw, key),
                }
            }
        }

        fn set_bool(target: &mut bool, key: &str, raw: Option<String>) {
            if let Some(raw) = raw {
                match parse_bool(&raw) {
                    Some(value) => *target = value,
                    None => log::warn!("ignoring invalid value '{}' for {}", raw, key),
                }
            }
        }

        let engine = &mut config.engine;
        let key = "ERRPROP_COLLISION_POLICY";
        set(&mut engine.collision_policy, key, lookup(key));
        let key = "ERRPROP_IMAG_TOLERANCE";
        set(&mut engine.imag_tolerance, key, lookup(key));
        let key = "ERRPROP_IMPLICIT_MUL";
        set_bool(&mut engine.implicit_multiplication, key, lookup(key));
        let key = "ERRPROP_MAX_DEPTH";
        set(&mut engine.max_depth, key, lookup(key));
        let key = "ERRPROP_MAX_NODES";
        set(&mut engine.max_nodes, key, lookup(key));
        let key = "ERRPROP_SIMPLIFY";
        set_bool(&mut engine.simplify, key, lookup(key));

        let display = &mut config.display;
        let key = "ERRPROP_PRECISION";
        set(&mut display.precision, key, lookup(key));
        let key = "ERRPROP_LATEX";
        set_bool(&mut display.latex, key, lookup(key));
        let key = "ERRPROP_FORMAT";
        set(&mut display.format, key, lookup(key));

        let key = "ERRPROP_LOG_LEVEL";
        set(&mut config.logging.level, key, lookup(key));
    }

    /// Default configuration as a TOML document
    pub fn sample() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&Config::default())?)
    }
}

/// Parse a boolean value from string with various formats
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.engine.collision_policy, CollisionPolicy::Reject);
        assert_eq!(config.engine.imag_tolerance, 1e-12);
        assert!(config.engine.implicit_multiplication);
        assert_eq!(config.display.precision, Precision::Significant(6));
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_toml_round_trip() {
        let sample = ConfigLoader::sample().unwrap();
        let parsed: Config = toml::from_str(&sample).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [engine]
            collision_policy = "variable-wins"

            [display]
            precision = "dec:3"
            latex = true
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.collision_policy, CollisionPolicy::VariableWins);
        assert_eq!(config.display.precision, Precision::Decimals(3));
        assert!(config.display.latex);
        assert_eq!(config.engine.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_bad_precision_in_file() {
        let result: Result<Config, _> = toml::from_str("[display]\nprecision = \"hex:3\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_overrides() {
        let env: FxHashMap<&str, &str> = [
            ("ERRPROP_COLLISION_POLICY", "variable-wins"),
            ("ERRPROP_PRECISION", "sig:3"),
            ("ERRPROP_SIMPLIFY", "off"),
            ("ERRPROP_MAX_DEPTH", "not a number"),
            ("ERRPROP_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        ConfigLoader::apply_environment(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.engine.collision_policy, CollisionPolicy::VariableWins);
        assert_eq!(config.display.precision, Precision::Significant(3));
        assert!(!config.engine.simplify);
        assert_eq!(config.engine.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = ConfigLoader::load(Some(Path::new("/nonexistent/errprop.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_bool_parsing() {
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
