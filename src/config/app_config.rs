use crate::services::error_handling::{ExplorerError, ExplorerResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Plays shorter than this are counted as likely skipped
    pub skip_threshold_ms: u64,

    /// Plays longer than this are dropped at import (1 hour default)
    pub max_play_ms: u64,

    /// Length of the top artist / track / song lists
    pub top_n: usize,

    /// Minimum number of skips before a track shows up as most skipped
    pub min_skip_count: usize,

    /// Minimum plays for a track to be offered for forensics
    pub forensics_min_plays: usize,

    /// Maximum number of forensics candidates
    pub forensics_limit: usize,

    /// Rows in the recent activity table
    pub recent_limit: usize,

    /// Bins of the listen duration histogram
    pub histogram_bins: usize,

    /// Archive entries containing this marker (and ending in .json) are history files
    pub history_file_marker: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            skip_threshold_ms: 15_000,
            max_play_ms: 3_600_000,
            top_n: 10,
            min_skip_count: 3,
            forensics_min_plays: 2,
            forensics_limit: 100,
            recent_limit: 100,
            histogram_bins: 20,
            history_file_marker: "Streaming_History_Audio_".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an explicit file, the user config file, or defaults
    pub fn load(path: Option<&Path>) -> ExplorerResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => match Self::config_path() {
                Some(default_path) if default_path.exists() => Self::load_from(&default_path),
                _ => {
                    debug!("No configuration file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn load_from(path: &Path) -> ExplorerResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| ExplorerError::Config {
            message: format!("{}: {}", path.display(), e),
        })?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> ExplorerResult<()> {
        // Ensure config directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ExplorerError::Config {
            message: e.to_string(),
        })?;
        std::fs::write(path, content)?;

        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("spotlens").join("config.toml"))
    }

    pub fn validate(&self) -> ExplorerResult<()> {
        if self.top_n == 0 {
            return Err(invalid("top_n", "must be at least 1"));
        }
        if self.histogram_bins == 0 {
            return Err(invalid("histogram_bins", "must be at least 1"));
        }
        if self.history_file_marker.trim().is_empty() {
            return Err(invalid("history_file_marker", "cannot be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ExplorerError {
    ExplorerError::Config {
        message: format!("{} {}", field, reason),
    }
}
