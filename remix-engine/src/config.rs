//! Service configuration resolution
//!
//! Every setting resolves CLI → ENV → TOML → compiled default using the
//! shared resolver from `remix_common::config`.

use std::time::Duration;

use remix_common::config::{
    resolve_setting, TomlConfig, DEFAULT_BIND, DEFAULT_PORT, DEFAULT_PROGRESS_INTERVAL_MS,
    DEFAULT_REQUEST_TIMEOUT_SECS, ENV_API_KEY, ENV_BIND, ENV_FUNCTIONS_URL, ENV_PORT,
};
use remix_common::{Error, Result};
use tracing::info;

use crate::services::FunctionsConfig;

/// Latency of every demo backend call
pub const DEMO_LATENCY: Duration = Duration::from_millis(1500);

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub functions_url: Option<String>,
    pub api_key: Option<String>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub demo: bool,
}

/// Where the engine's analyses, matches and remixes come from
#[derive(Debug, Clone)]
pub enum BackendMode {
    Remote(FunctionsConfig),
    Demo,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub backend: BackendMode,
    pub bind: String,
    pub port: u16,
    pub progress_interval: Duration,
}

impl ServiceConfig {
    /// Resolve from CLI, environment, and TOML
    ///
    /// Without `demo`, a functions URL and API key are required.
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Result<Self> {
        let bind = resolve_setting(cli.bind.as_deref(), ENV_BIND, toml.bind.as_deref())
            .map(|(value, _)| value)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let port = resolve_port(cli.port, toml.port)?;

        let progress_interval = Duration::from_millis(
            toml.progress_interval_ms
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_PROGRESS_INTERVAL_MS),
        );

        let backend = if cli.demo || toml.demo.unwrap_or(false) {
            info!("Using offline demo backend");
            BackendMode::Demo
        } else {
            BackendMode::Remote(resolve_functions(cli, toml)?)
        };

        Ok(Self {
            backend,
            bind,
            port,
            progress_interval,
        })
    }

    /// "bind:port" for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn resolve_port(cli_port: Option<u16>, toml_port: Option<u16>) -> Result<u16> {
    let cli = cli_port.map(|p| p.to_string());
    let toml = toml_port.map(|p| p.to_string());

    match resolve_setting(cli.as_deref(), ENV_PORT, toml.as_deref()) {
        Some((value, source)) => value.parse::<u16>().map_err(|_| {
            Error::Config(format!("Invalid port '{}' from {}", value, source))
        }),
        None => Ok(DEFAULT_PORT),
    }
}

fn resolve_functions(cli: &CliOverrides, toml: &TomlConfig) -> Result<FunctionsConfig> {
    let url = resolve_setting(
        cli.functions_url.as_deref(),
        ENV_FUNCTIONS_URL,
        toml.functions_url.as_deref(),
    );
    let key = resolve_setting(cli.api_key.as_deref(), ENV_API_KEY, toml.api_key.as_deref());

    let (url, url_source) = url.ok_or_else(|| {
        missing("Functions URL", "--functions-url", ENV_FUNCTIONS_URL, "functions_url")
    })?;
    let (key, key_source) =
        key.ok_or_else(|| missing("API key", "--api-key", ENV_API_KEY, "api_key"))?;

    info!(url = %url, "Functions URL loaded from {}", url_source);
    info!("API key loaded from {}", key_source);

    let timeout = Duration::from_secs(
        toml.request_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
    );

    Ok(FunctionsConfig::new(url, key).with_timeout(timeout))
}

fn missing(what: &str, flag: &str, env_var: &str, toml_key: &str) -> Error {
    Error::Config(format!(
        "{} not configured. Please configure using one of:\n\
         1. Command line: {} <value>\n\
         2. Environment: {}=<value>\n\
         3. TOML config: {} ({} = \"<value>\")\n\
         \n\
         Or run with --demo to use the offline demo backend.",
        what,
        flag,
        env_var,
        remix_common::config::default_config_path().display(),
        toml_key
    ))
}
