//! Configuration management for Trailcast

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub caption: CaptionConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub meta: Option<MetaConfig>,
    pub youtube: Option<YouTubeConfig>,
    pub tiktok: Option<TikTokConfig>,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Caption generator gateway settings
///
/// With no `key_file` the gateway runs in fallback-only mode and produces
/// the deterministic template caption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionConfig {
    pub api_url: Option<String>,
    pub key_file: Option<String>,
    #[serde(default = "default_caption_model")]
    pub model: String,
    #[serde(default = "default_caption_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_hashtags")]
    pub hashtags: Vec<String>,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            key_file: None,
            model: default_caption_model(),
            timeout_secs: default_caption_timeout(),
            hashtags: default_hashtags(),
        }
    }
}

fn default_caption_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_caption_timeout() -> u64 {
    15
}

fn default_hashtags() -> Vec<String> {
    vec![
        "#Travel".to_string(),
        "#Wildlife".to_string(),
        "#Uganda".to_string(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between due-entry scans
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Per-platform publish deadline enforced by the dispatcher
    #[serde(default = "default_publish_timeout")]
    pub publish_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
            publish_timeout_secs: default_publish_timeout(),
        }
    }
}

fn default_tick_interval() -> u64 {
    60
}

fn default_publish_timeout() -> u64 {
    120
}

/// Facebook/Instagram page publishing via the Meta Graph API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub enabled: bool,
    pub page_id: String,
    pub token_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    pub enabled: bool,
    pub token_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TikTokConfig {
    pub enabled: bool,
    pub token_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            platforms: default_platforms(),
        }
    }
}

fn default_platforms() -> Vec<String> {
    vec!["facebook_instagram".to_string()]
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig {
                path: "~/.local/share/trailcast/trailcast.db".to_string(),
            },
            caption: CaptionConfig::default(),
            scheduler: SchedulerConfig::default(),
            meta: None,
            youtube: None,
            tiktok: None,
            defaults: DefaultsConfig::default(),
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TRAILCAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("trailcast").join("config.toml"))
}

/// Resolve the database path, honoring the `TRAILCAST_DB_PATH` override
pub fn resolve_db_path(configured: &str) -> String {
    let path = std::env::var("TRAILCAST_DB_PATH").unwrap_or_else(|_| configured.to_string());
    shellexpand::tilde(&path).to_string()
}
