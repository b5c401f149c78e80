// Configuration management module
// Handles loading, saving, and validating configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Poll interval used when the configured one is unset.
pub const DEFAULT_INTERVAL_MS: u64 = 10_000;

/// Which scrobbling service reports the current track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    LastFm,
    ListenBrainz,
}

impl std::str::FromStr for Service {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lastfm" | "lfm" => Ok(Self::LastFm),
            "listenbrainz" | "lbz" => Ok(Self::ListenBrainz),
            other => anyhow::bail!(
                "unknown service `{other}` (expected `lastfm` or `listenbrainz`)"
            ),
        }
    }
}

/// Main configuration structure. Owned by the embedding host in principle;
/// the engine only reads it, once per poll tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scrobbling service account to mirror
    pub user: String,

    /// Service that reports the current track
    pub service: Service,

    /// Poll interval in milliseconds
    pub interval_ms: u64,

    /// Display-name template; `{{ field }}` placeholders are expanded
    /// against the current track. Empty means the default name.
    pub template: String,

    /// Include an elapsed-time timestamp in the activity
    pub stamp: bool,

    /// Stand down while another player already reports a listening activity
    pub ignore_other_players: bool,

    /// Look up missing MusicBrainz ids to improve album-art resolution
    pub mbid_lookup: bool,

    /// Force the activity past the host's visibility filter
    pub always_share: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: String::new(),
            service: Service::LastFm,
            interval_ms: DEFAULT_INTERVAL_MS,
            template: String::new(),
            stamp: true,
            ignore_other_players: true,
            mbid_lookup: true,
            always_share: false,
        }
    }
}

impl Config {
    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;

        Ok(config_dir.join("scrobble-presence.toml"))
    }

    /// Load configuration from the default path, or create it if missing
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            log::info!("Config file not found, creating default at {:?}", config_path);
            let default_config = Self::default();
            default_config.save()?;
            return Ok(default_config);
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, content).context("Failed to write config file")?;

        log::info!("Config saved to {:?}", config_path);

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            anyhow::bail!("interval_ms must be greater than 0");
        }

        if self.user.is_empty() {
            log::warn!("No user handle configured; presence will stay clear");
        }

        Ok(())
    }

    /// Poll interval, falling back to the default when unset.
    pub fn interval(&self) -> Duration {
        let ms = if self.interval_ms == 0 {
            DEFAULT_INTERVAL_MS
        } else {
            self.interval_ms
        };
        Duration::from_millis(ms)
    }
}
