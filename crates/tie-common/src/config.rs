//! ---
//! tie_section: "01-core-functionality"
//! tie_subsection: "module"
//! tie_type: "source"
//! tie_scope: "code"
//! tie_description: "Shared primitives and utilities for the feed runtime."
//! tie_version: "v0.1.0"
//! tie_owner: "tbd"
//! ---
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds, DurationSecondsWithFrac};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

fn default_input() -> PathBuf {
    PathBuf::from("data/working.csv")
}

fn default_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_sending_app() -> String {
    "SUNNY_TIE".to_owned()
}

fn default_sending_facility() -> String {
    "SUNNYSIDE".to_owned()
}

fn default_receiving_app() -> String {
    "HANS".to_owned()
}

fn default_receiving_facility() -> String {
    "NHSENGLAND".to_owned()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_ack_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Primary configuration object for a feed run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no file was found and the built-in defaults apply.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "TIE_CONFIG";

    /// Load configuration together with the effective source path, respecting the
    /// `TIE_CONFIG` override.
    ///
    /// Unlike an explicit `TIE_CONFIG` path, missing candidates are not an
    /// error: the feed runs with zero arguments on the built-in defaults.
    /// The result is not validated; command-line overrides may still complete it,
    /// so callers run [`AppConfig::validate`] on the merged configuration.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!("no configuration file found; using defaults");
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.transport.validate()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    /// Parse only; see [`AppConfig::validate`].
    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        toml::from_str(content).with_context(|| "failed to parse configuration")
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// CSV file holding the patient demographics.
    #[serde(default = "default_input")]
    pub input: PathBuf,
    /// Pause between two deliveries, in (fractional) seconds.
    #[serde(default = "default_interval")]
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub interval: Duration,
    /// Seed for control identifiers and ward selection.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Stop one record short of the end of the input, as the legacy feed did.
    #[serde(default)]
    pub skip_final_record: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            interval: default_interval(),
            seed: None,
            skip_final_record: false,
        }
    }
}

/// MSH sender/receiver identifiers stamped on every message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_sending_app")]
    pub sending_app: String,
    #[serde(default = "default_sending_facility")]
    pub sending_facility: String,
    #[serde(default = "default_receiving_app")]
    pub receiving_app: String,
    #[serde(default = "default_receiving_facility")]
    pub receiving_facility: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            sending_app: default_sending_app(),
            sending_facility: default_sending_facility(),
            receiving_app: default_receiving_app(),
            receiving_facility: default_receiving_facility(),
        }
    }
}

/// Delivery mode for rendered messages.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Stdout,
    Http,
    Mllp,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportMode::Stdout => "stdout",
            TransportMode::Http => "http",
            TransportMode::Mllp => "mllp",
        };
        f.write_str(label)
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub mode: TransportMode,
    /// Destination host. For HTTP this includes the scheme (`https://example.com`).
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Request path for HTTP mode; `/` when unset.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_connect_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub connect_timeout: Duration,
    #[serde(default = "default_ack_timeout")]
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub ack_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::default(),
            host: None,
            port: None,
            path: None,
            connect_timeout: default_connect_timeout(),
            ack_timeout: default_ack_timeout(),
        }
    }
}

impl TransportConfig {
    /// Compose the HTTP target as `host[:port]path`, defaulting the path to `/`.
    pub fn http_target(&self) -> Option<String> {
        let host = self.host.as_deref()?;
        let port = self
            .port
            .map(|port| format!(":{}", port))
            .unwrap_or_default();
        let path = self.path.as_deref().unwrap_or("/");
        Some(format!("{}{}{}", host, port, path))
    }

    pub fn validate(&self) -> Result<()> {
        match self.mode {
            TransportMode::Stdout => Ok(()),
            TransportMode::Http => {
                let target = self
                    .http_target()
                    .ok_or_else(|| anyhow!("http mode requires a destination host"))?;
                Url::parse(&target)
                    .with_context(|| format!("http target {} is not a valid URL", target))?;
                Ok(())
            }
            TransportMode::Mllp => {
                if self.host.as_deref().map_or(true, |h| h.trim().is_empty()) {
                    return Err(anyhow!("mllp mode requires a destination host"));
                }
                if self.port.is_none() {
                    return Err(anyhow!("mllp mode requires a destination port"));
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the rolling JSON log file; file logging is off when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
