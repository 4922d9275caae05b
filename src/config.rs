//! Tool configuration
//!
//! Optional defaults live in `~/.tenant-user-sync/config.toml` (or
//! `config.<profile>.toml`). Command-line flags override them, and the merged
//! result is a [`SyncConfig`] passed explicitly to the loader and synchronizer.

use crate::client::DEFAULT_TIMEOUT;
use crate::error::{Error, Result};
use crate::reconcile::RolePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Asset directory used when nothing else is configured
pub const DEFAULT_ASSETS_DIR: &str = "assets";

/// Time zone given to created users without their own
pub const DEFAULT_TIME_ZONE: &str = "America/Toronto";

/// Contents of the config file
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub assets_dir: Option<PathBuf>,
    pub time_zone: Option<String>,
    pub prune_roles: Option<bool>,
    pub timeout_secs: Option<u64>,
}

impl Settings {
    /// Load the (profile) config file. A missing file yields empty settings.
    pub fn load(profile: Option<&str>) -> Result<Self> {
        match Self::config_path(profile) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content).map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
    }

    fn config_path(profile: Option<&str>) -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        let filename = match profile {
            Some(p) => format!("config.{}.toml", p),
            None => "config.toml".to_string(),
        };
        Some(home.join(".tenant-user-sync").join(filename))
    }
}

/// Everything a sync run needs besides the asset files themselves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub assets_dir: PathBuf,
    /// Tenant names to sync; empty means all
    pub targets: Vec<String>,
    pub role_policy: RolePolicy,
    pub dry_run: bool,
    pub default_time_zone: String,
    pub timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            targets: Vec::new(),
            role_policy: RolePolicy::Additive,
            dry_run: false,
            default_time_zone: DEFAULT_TIME_ZONE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SyncConfig {
    /// Start from file settings, falling back to built-in defaults
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = Self::default();
        Self {
            assets_dir: settings.assets_dir.clone().unwrap_or(defaults.assets_dir),
            role_policy: if settings.prune_roles.unwrap_or(false) {
                RolePolicy::Prune
            } else {
                RolePolicy::Additive
            },
            default_time_zone: settings
                .time_zone
                .clone()
                .unwrap_or(defaults.default_time_zone),
            timeout: settings
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            ..defaults
        }
    }
}
