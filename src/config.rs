use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration, deserialized from `.dep-diligence/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub registries: RegistryEndpoints,
}

/// Retry, timeout and concurrency settings for all outgoing requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Attempts in total per request, including the first.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Ceiling for one pipeline stage (registry lookup or OSV query) of one
    /// dependency, retries included.
    pub task_timeout_secs: u64,
    /// Dependencies processed at the same time.
    pub concurrency: usize,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_retries: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            task_timeout_secs: 120,
            concurrency: 16,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }
}

/// Base URLs of the registries and of the OSV API. Overridable so that
/// mirrors and test servers can stand in for the public services.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryEndpoints {
    pub pypi: String,
    pub npm: String,
    pub nuget: String,
    pub rubygems: String,
    pub packagist: String,
    pub crates_io: String,
    pub osv: String,
}

impl Default for RegistryEndpoints {
    fn default() -> Self {
        Self {
            pypi: "https://pypi.org".to_string(),
            npm: "https://registry.npmjs.org".to_string(),
            nuget: "https://api.nuget.org".to_string(),
            rubygems: "https://rubygems.org".to_string(),
            packagist: "https://repo.packagist.org".to_string(),
            crates_io: "https://crates.io".to_string(),
            osv: "https://api.osv.dev".to_string(),
        }
    }
}

impl RegistryEndpoints {
    /// Point every endpoint at the same base URL.
    pub fn all(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            pypi: base.clone(),
            npm: base.clone(),
            nuget: base.clone(),
            rubygems: base.clone(),
            packagist: base.clone(),
            crates_io: base.clone(),
            osv: base,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "network.concurrency must be at least 1".to_string(),
            ));
        }
        if self.network.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "network.max_retries must be at least 1".to_string(),
            ));
        }
        if self.network.max_delay_ms < self.network.base_delay_ms {
            return Err(ConfigError::Invalid(
                "network.max_delay_ms must not be below network.base_delay_ms".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<project_path>/.dep-diligence/config.toml`
/// 3. `~/.config/dep-diligence/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = project_path.join(".dep-diligence").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("dep-diligence")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = toml::from_str(&content).map_err(|source| ConfigError::ParseConfig {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Check that the scan target exists and is a readable directory.
pub fn validate_target(path: &Path) -> Result<PathBuf, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingTarget {
            path: path.to_path_buf(),
        });
    }
    if !path.is_dir() {
        return Err(ConfigError::NotADirectory {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_dir(path).map_err(|source| ConfigError::UnreadableTarget {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()))
}
