/*
[INPUT]:  YAML configuration file and WALLET_AUTH_* environment overrides
[OUTPUT]: Parsed application configuration and derived library settings
[POS]:    Configuration layer - CLI setup
[UPDATE]: When adding new configuration options
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use config::{Config, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use wallet_auth_adapter::{ChallengeConfig, ClientConfig, ConnectorConfig};

const APP_DIR: &str = "wallet-auth";
const ENV_PREFIX: &str = "WALLET_AUTH";

/// Top-level configuration for the wallet-auth CLI
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Backend base URL the auth endpoints hang off
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Application name shown in challenge messages
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Optional domain bound into challenge messages
    #[serde(default)]
    pub domain: Option<String>,
    /// Network reported by the local wallet
    #[serde(default)]
    pub network: Option<String>,
    /// Name of the local key to sign with
    #[serde(default = "default_wallet_name")]
    pub wallet_name: String,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Session token file; defaults to the user data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
    /// Key directory; defaults to the user data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_dir: Option<PathBuf>,
}

/// Timeouts in seconds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_request_secs")]
    pub request_secs: u64,
    #[serde(default = "default_connect_secs")]
    pub connect_secs: u64,
    /// How long a wallet connect prompt may stay unanswered
    #[serde(default = "default_wallet_connect_secs")]
    pub wallet_connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: default_request_secs(),
            connect_secs: default_connect_secs(),
            wallet_connect_secs: default_wallet_connect_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            app_name: default_app_name(),
            domain: None,
            network: None,
            wallet_name: default_wallet_name(),
            timeouts: TimeoutConfig::default(),
            token_file: None,
            key_dir: None,
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:3000/api/".to_string()
}

fn default_app_name() -> String {
    "Wallet Auth".to_string()
}

fn default_wallet_name() -> String {
    "default".to_string()
}

fn default_request_secs() -> u64 {
    30
}

fn default_connect_secs() -> u64 {
    10
}

fn default_wallet_connect_secs() -> u64 {
    120
}

impl AppConfig {
    /// Load configuration from `path` (or the default location when it
    /// exists) layered with `WALLET_AUTH_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Same as [`AppConfig::load`], reading overrides from `env` instead of
    /// the process environment when given.
    pub fn load_with_env(path: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    builder = builder.add_source(
                        File::from(default_path.as_path())
                            .format(FileFormat::Yaml)
                            .required(false),
                    );
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: Self = builder
            .build()
            .context("read configuration sources")?
            .try_deserialize()
            .context("parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/wallet-auth/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.yaml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(anyhow!("api_base_url cannot be empty"));
        }
        if self.wallet_name.is_empty() {
            return Err(anyhow!("wallet_name cannot be empty"));
        }
        if self.timeouts.wallet_connect_secs == 0 {
            return Err(anyhow!("timeouts.wallet_connect_secs must be positive"));
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("failed to serialize config to YAML")
    }

    pub fn token_path(&self) -> Result<PathBuf> {
        match &self.token_file {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("session.json")),
        }
    }

    pub fn key_path(&self) -> Result<PathBuf> {
        match &self.key_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("keys")),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_base_url.clone(),
            timeout: Duration::from_secs(self.timeouts.request_secs),
            connect_timeout: Duration::from_secs(self.timeouts.connect_secs),
        }
    }

    pub fn connector_config(&self) -> ConnectorConfig {
        ConnectorConfig {
            connect_timeout: Duration::from_secs(self.timeouts.wallet_connect_secs),
        }
    }

    pub fn challenge_config(&self) -> ChallengeConfig {
        ChallengeConfig {
            app_name: self.app_name.clone(),
            domain: self.domain.clone(),
        }
    }
}

fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| anyhow!("Could not determine data directory"))
}
