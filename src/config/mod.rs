//! Configuration management for mcupdate.
//!
//! Configuration is read from `~/.config/mcupdate/config.toml` (or `--config`) at startup.
//! If the file doesn't exist, a default configuration with comments is created.

pub mod interval;

pub use interval::{format_interval, parse_interval, MAX_INTERVAL_SECS};

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::domain::{default_feeds, FeedDescriptor};
use crate::fetcher::http_fetcher::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::notifier::DEFAULT_BANNER;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;
pub const STATE_FILE_NAME: &str = "state.json";

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between poll cycles.
    pub poll_interval: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Initial destinations, used until a destination list has been persisted.
    pub target_destinations: Vec<String>,
    /// Callers allowed to run privileged commands.
    pub admin_ids: Vec<String>,
    pub data_dir: Option<PathBuf>,
    pub banner: String,
    pub log_level: String,
    pub shutdown_grace_secs: u64,
    pub delivery: DeliveryConfig,
    pub feeds: Vec<FeedDescriptor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Relay that receives `{"destination", "message"}` posts. Logs only when unset.
    pub webhook_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            target_destinations: Vec::new(),
            admin_ids: Vec::new(),
            data_dir: None,
            banner: DEFAULT_BANNER.to_string(),
            log_level: "info".to_string(),
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
            delivery: DeliveryConfig::default(),
            feeds: default_feeds(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default path when `None`.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: config_path,
                source,
            },
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval == 0 {
            return Err(ConfigError::Invalid("poll_interval must be > 0".into()));
        }
        if self.poll_interval > MAX_INTERVAL_SECS {
            return Err(ConfigError::Invalid(format!(
                "poll_interval must be at most {} seconds",
                MAX_INTERVAL_SECS
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be > 0".into()));
        }
        if self.feeds.is_empty() {
            return Err(ConfigError::Invalid("at least one feed is required".into()));
        }

        let mut keys = HashSet::new();
        for feed in &self.feeds {
            if feed.name.is_empty() {
                return Err(ConfigError::Invalid("feed name must not be empty".into()));
            }
            url::Url::parse(&feed.url).map_err(|e| {
                ConfigError::Invalid(format!("feed {} has invalid url: {}", feed.name, e))
            })?;
            for key in [&feed.name, &feed.alias] {
                if !key.is_empty() && !keys.insert(key.to_lowercase()) {
                    return Err(ConfigError::Invalid(format!(
                        "feed name or alias {} is used more than once",
                        key
                    )));
                }
            }
        }

        if let Some(ref webhook) = self.delivery.webhook_url {
            url::Url::parse(webhook)
                .map_err(|e| ConfigError::Invalid(format!("invalid webhook_url: {}", e)))?;
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// `data_dir` if set, otherwise `<platform data dir>/mcupdate`.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match self.data_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|d| d.join("mcupdate"))
                .ok_or(ConfigError::NoDataDir),
        }
    }

    pub fn state_file_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join(STATE_FILE_NAME))
    }

    /// Get the default config file path: `~/.config/mcupdate/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("mcupdate").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# mcupdate configuration

# Seconds between checks
poll_interval = 60

# Per-request timeout in seconds
request_timeout_secs = 5

# Destinations notified on the first run. After that the list is managed with
# add-destination / remove-destination and stored in the data directory.
target_destinations = []

# Callers allowed to run manual-check, push-*, add-destination, remove-destination
admin_ids = []

# Where state.json lives (default: platform data dir + "/mcupdate")
# data_dir = "/var/lib/mcupdate"

# First line of every notification
banner = "Minecraft Feedback 发布了新的文章："

# Used when RUST_LOG is not set
log_level = "info"

# Seconds to wait for an in-flight check when stopping
shutdown_grace_secs = 10

[delivery]
# Relay that receives {"destination": ..., "message": ...} as JSON.
# Without it, notifications are only written to the log.
# webhook_url = "http://127.0.0.1:6185/send"

[[feeds]]
name = "fb_Beta"
alias = "beta"
label = "🔜 测试版 (Beta)"
url = "https://minecraftfeedback.zendesk.com/api/v2/help_center/en-us/sections/360001185332/articles?per_page=5"

[[feeds]]
name = "fb_Release"
alias = "release"
label = "🎉 正式版 (Release)"
url = "https://minecraftfeedback.zendesk.com/api/v2/help_center/en-us/sections/360001186971/articles?per_page=5"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
