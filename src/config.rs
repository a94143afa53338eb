//! Application configuration.
//!
//! [`AppConfig`] is read once (from a JSON file, with defaults for anything
//! missing), adjusted by command-line flags, and then handed to
//! [`crate::ingest::Pipeline::new`]. After that point it is never mutated.

use crate::error::{Result, SluiceError};
use crate::ingest::inference::InferencePolicyKind;
use crate::ingest::reader::ALLOWED_EXTENSIONS;
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 16 MiB, the reference deployment's request limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct UploadSettings {
    /// Files larger than this are rejected before parsing.
    pub max_upload_bytes: u64,
    /// May narrow, never widen, the formats the readers support.
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: ALLOWED_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect(),
        }
    }
}

impl UploadSettings {
    /// Case-insensitive membership test, ignoring a leading dot.
    pub fn allows(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ParseSettings {
    /// Rows polars scans when guessing CSV/TXT column types.
    pub infer_schema_length: usize,
    /// Parse ISO date and datetime strings in CSV/TXT into timestamps.
    pub try_parse_dates: bool,
}

impl Default for ParseSettings {
    fn default() -> Self {
        Self {
            infer_schema_length: 10_000,
            try_parse_dates: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct InferenceSettings {
    pub policy: InferencePolicyKind,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DbDriver {
    #[default]
    MySql,
    Sqlite,
}

impl FromStr for DbDriver {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!(
                "Unknown database driver '{other}' (expected 'mysql' or 'sqlite')"
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DbSettings {
    pub driver: DbDriver,
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Never written back out.
    #[serde(skip_serializing, deserialize_with = "deserialize_password")]
    pub password: SecretString,
    /// Database name for MySQL, file path for SQLite.
    pub database: String,
}

fn deserialize_password<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(SecretString::new(s.into()))
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            driver: DbDriver::MySql,
            host: "localhost".to_owned(),
            port: 3306,
            user: String::new(),
            password: SecretString::new(String::new().into()),
            database: String::new(),
        }
    }
}

impl DbSettings {
    /// Checks the fields a connection attempt needs.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::Config`] naming every missing field.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.database.trim().is_empty() {
            missing.push("database");
        }
        if self.driver == DbDriver::MySql {
            if self.host.trim().is_empty() {
                missing.push("host");
            }
            if self.user.trim().is_empty() {
                missing.push("user");
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SluiceError::Config(format!(
                "Please fill all required fields: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub upload: UploadSettings,
    pub parse: ParseSettings,
    pub inference: InferenceSettings,
    pub database: DbSettings,
}

/// `<config dir>/sluice/config.json`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sluice")
        .join("config.json")
}

/// Loads the configuration at `path`, falling back to defaults when the file
/// does not exist.
///
/// # Errors
///
/// Returns [`SluiceError::Config`] if the file exists but is not valid.
pub fn load_app_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    serde_json::from_str::<AppConfig>(&content).map_err(|e| {
        SluiceError::Config(format!("Invalid config file {}: {e}", path.display()))
    })
}
