// Configuration loading and parsing (config/hoopstats.toml).

use chrono::Datelike;
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::mapper::NumericPolicy;
use crate::schema::SchemaMode;

/// File name under `config/` (and `defaults/`).
pub const CONFIG_FILE: &str = "hoopstats.toml";

/// Years before the first season on record or past this are rejected.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1946..=2100;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Everything the pipeline needs, passed explicitly to each component.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub import: ImportConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file. Its parent directory is created on first open.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Directory searched for `NBA_*.csv` exports.
    pub data_dir: String,
    #[serde(default)]
    pub schema_mode: SchemaMode,
    /// Drop and recreate the target schema before importing.
    #[serde(default)]
    pub reset: bool,
    #[serde(default)]
    pub numeric_policy: NumericPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// First season included in the recent-high-scorers sample. Defaults to
    /// five years before the current calendar year.
    #[serde(default)]
    pub recent_since_year: Option<i32>,
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
}

fn default_sample_limit() -> usize {
    10
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            recent_since_year: None,
            sample_limit: default_sample_limit(),
        }
    }
}

impl ReportConfig {
    pub fn since_year(&self) -> i32 {
        self.recent_since_year
            .unwrap_or_else(|| chrono::Local::now().year() - 5)
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse and validate a config document.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

/// Load and validate `config/hoopstats.toml` relative to `base_dir`.
///
/// Does not bootstrap defaults; prefer `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    parse_config(&text, &path)
}

/// Seed `config/hoopstats.toml` from `defaults/hoopstats.toml`. Returns the
/// written path, or `None` when a config file is already in place. An
/// existing config file is never overwritten.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let default_file = base_dir.join("defaults").join(CONFIG_FILE);
    let target = base_dir.join("config").join(CONFIG_FILE);

    let content = match std::fs::read(&default_file) {
        Ok(content) => content,
        Err(_) if target.is_file() => return Ok(None),
        Err(e) => {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "cannot read {} and no {} exists: {e}",
                    default_file.display(),
                    target.display()
                ),
            })
        }
    };

    if let Some(config_dir) = target.parent() {
        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create config directory: {e}"),
        })?;
    }

    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(mut dest) => {
            dest.write_all(&content)
                .map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to write {}: {e}", target.display()),
                })?;
            Ok(Some(target))
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", target.display()),
        }),
    }
}

/// Load config relative to the current working directory, bootstrapping
/// `config/` from `defaults/` first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.database.path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    if config.import.data_dir.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "import.data_dir".into(),
            message: "must not be empty".into(),
        });
    }

    if config.report.sample_limit == 0 {
        return Err(ConfigError::ValidationError {
            field: "report.sample_limit".into(),
            message: "must be greater than 0".into(),
        });
    }

    if let Some(year) = config.report.recent_since_year {
        if !YEAR_RANGE.contains(&year) {
            return Err(ConfigError::ValidationError {
                field: "report.recent_since_year".into(),
                message: format!(
                    "must be between {} and {}, got {year}",
                    YEAR_RANGE.start(),
                    YEAR_RANGE.end()
                ),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
