//! Configuration loading and setting resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: a warning is logged and defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application directory name under the platform config directory
pub const APP_DIR_NAME: &str = "techno-remix";

/// Config file name inside [`APP_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable holding the functions base URL
pub const ENV_FUNCTIONS_URL: &str = "REMIX_FUNCTIONS_URL";

/// Environment variable holding the functions API key
pub const ENV_API_KEY: &str = "REMIX_API_KEY";

/// Environment variable holding the HTTP listen port
pub const ENV_PORT: &str = "REMIX_PORT";

/// Environment variable holding the bind address
pub const ENV_BIND: &str = "REMIX_BIND";

/// Compiled default listen port
pub const DEFAULT_PORT: u16 = 5750;

/// Compiled default bind address
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Compiled default timeout for calls to the AI functions
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Compiled default progress simulation interval
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 500;

/// Logging section of the TOML config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when RUST_LOG is unset (e.g. "info", "remix_engine=debug")
    pub level: Option<String>,
}

/// On-disk TOML configuration
///
/// Every field is optional so partial files are valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the AI functions (e.g. "https://xyz.example.co/functions/v1")
    pub functions_url: Option<String>,
    /// API key sent as `apikey` and bearer token
    pub api_key: Option<String>,
    /// Bind address for the HTTP surface
    pub bind: Option<String>,
    /// Listen port for the HTTP surface
    pub port: Option<u16>,
    /// Timeout for each AI function call, in seconds
    pub request_timeout_secs: Option<u64>,
    /// Progress simulation tick interval, in milliseconds
    pub progress_interval_ms: Option<u64>,
    /// Use the offline demo backend instead of the AI functions
    pub demo: Option<bool>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Load config from `path`, falling back to defaults when the file is absent
    ///
    /// A file that exists but cannot be read or parsed is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

/// Where a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    CommandLine,
    Environment,
    TomlFile,
}

impl std::fmt::Display for SettingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingSource::CommandLine => write!(f, "command line"),
            SettingSource::Environment => write!(f, "environment"),
            SettingSource::TomlFile => write!(f, "TOML config"),
        }
    }
}

/// Resolve one string setting from CLI → ENV → TOML
///
/// Blank values are treated as absent at every tier. Returns `None` when no
/// tier supplies a value, leaving the compiled default to the caller.
pub fn resolve_setting(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_value: Option<&str>,
) -> Option<(String, SettingSource)> {
    if let Some(value) = cli_arg.filter(|v| is_valid_value(v)) {
        return Some((value.trim().to_string(), SettingSource::CommandLine));
    }

    if let Ok(value) = std::env::var(env_var_name) {
        if is_valid_value(&value) {
            return Some((value.trim().to_string(), SettingSource::Environment));
        }
    }

    toml_value
        .filter(|v| is_valid_value(v))
        .map(|v| (v.trim().to_string(), SettingSource::TomlFile))
}

/// Non-empty, non-whitespace check used for keys and URLs
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Default config file path for the platform
///
/// `<config_dir>/techno-remix/config.toml`, or `./techno-remix.toml` when the
/// platform has no config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from("./techno-remix.toml"))
}
