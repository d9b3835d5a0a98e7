//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use fg_core::{PolicyError, UsagePolicy};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the exported usage snapshot.
    pub snapshot_dir: PathBuf,

    /// Engine thresholds.
    #[serde(default)]
    pub policy: UsagePolicy,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            snapshot_dir: data_dir.join("snapshot"),
            policy: UsagePolicy::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources override earlier ones: defaults, the user config file,
    /// `config_path`, then `FGTIME_*` environment variables. Nested keys use
    /// a double underscore, as in `FGTIME_POLICY__MERGE_WINDOW_MS`.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("FGTIME_").split("__"));

        figment.extract()
    }

    /// Checks the loaded policy.
    pub fn validate(&self) -> Result<(), PolicyError> {
        self.policy.validate()
    }
}

/// Returns the platform-specific config directory for fgtime.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("fgtime"))
}

/// Returns the platform-specific data directory for fgtime.
///
/// On Linux: `~/.local/share/fgtime`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("fgtime"))
}
