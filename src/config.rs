//! Application configuration.
//!
//! Everything lives under one data directory (`~/.focus-timer` unless
//! `--data-dir` says otherwise):
//!
//! ```text
//! config.json             user configuration (optional)
//! owner-state.json        the daemon's persisted timer state
//! controller-state.json   the controller's standalone mirror
//! focus-timer.sock        daemon socket
//! ```
//!
//! Every field of `config.json` is optional. A missing or unreadable file
//! yields the defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::focus::FocusConfig;
use crate::types::TimerSettings;

// ============================================================================
// Constants
// ============================================================================

/// Data directory name under the home directory
const DATA_DIR_NAME: &str = ".focus-timer";

/// Configuration file name
const CONFIG_FILE: &str = "config.json";

/// Daemon state file name
const OWNER_STATE_FILE: &str = "owner-state.json";

/// Controller mirror file name
const CONTROLLER_STATE_FILE: &str = "controller-state.json";

/// Default socket file name
const SOCKET_FILE: &str = "focus-timer.sock";

/// Default `getState` timeout in milliseconds
const DEFAULT_GET_STATE_TIMEOUT_MS: u64 = 1000;

/// Default delay between daemon wakes in milliseconds
const DEFAULT_WAKE_INTERVAL_MS: u64 = 1000;

fn default_get_state_timeout_ms() -> u64 {
    DEFAULT_GET_STATE_TIMEOUT_MS
}

fn default_wake_interval_ms() -> u64 {
    DEFAULT_WAKE_INTERVAL_MS
}

// ============================================================================
// AppConfig
// ============================================================================

/// Application configuration.
///
/// # Example
///
/// ```
/// use focus_timer::config::AppConfig;
///
/// let config: AppConfig = serde_json::from_str(r#"{"allowList":["example.com"]}"#).unwrap();
/// assert_eq!(config.focus.allow_list, vec!["example.com".to_string()]);
/// assert_eq!(config.settings.work_time, 1500);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Directory holding state files and the socket
    #[serde(skip)]
    pub data_dir: PathBuf,

    /// Default durations and cycle length
    #[serde(default)]
    pub settings: TimerSettings,

    /// Allow-list and internal page prefixes
    #[serde(flatten)]
    pub focus: FocusConfig,

    /// Socket path override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,

    /// How long the controller waits for `getState` before going standalone
    #[serde(default = "default_get_state_timeout_ms")]
    pub get_state_timeout_ms: u64,

    /// Delay between daemon wakes while a phase runs
    #[serde(default = "default_wake_interval_ms")]
    pub wake_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            settings: TimerSettings::default(),
            focus: FocusConfig::default(),
            socket_path: None,
            get_state_timeout_ms: DEFAULT_GET_STATE_TIMEOUT_MS,
            wake_interval_ms: DEFAULT_WAKE_INTERVAL_MS,
        }
    }
}

impl AppConfig {
    /// Returns `~/.focus-timer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_data_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("home directory not found")?;
        Ok(home.join(DATA_DIR_NAME))
    }

    /// Loads the configuration from `data_dir`, or the default data directory.
    ///
    /// # Errors
    ///
    /// Returns an error only if no data directory can be determined.
    pub fn load(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => Self::default_data_dir()?,
        };
        Ok(Self::load_from(&data_dir))
    }

    /// Loads `config.json` from `data_dir`, falling back to defaults.
    pub fn load_from(data_dir: &Path) -> Self {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Ignoring unreadable config {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {:?}, using defaults", path);
                Self::default()
            }
            Err(e) => {
                warn!("Failed to read config {:?}: {}", path, e);
                Self::default()
            }
        };

        if let Err(e) = config.settings.validate() {
            warn!("Invalid settings in config, using defaults: {}", e);
            config.settings = TimerSettings::default();
        }
        config.data_dir = data_dir.to_path_buf();
        config
    }

    /// Path of `config.json`.
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    /// Path of the daemon socket.
    pub fn socket_path(&self) -> PathBuf {
        self.socket_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(SOCKET_FILE))
    }

    /// Path of the daemon's state file.
    pub fn owner_state_path(&self) -> PathBuf {
        self.data_dir.join(OWNER_STATE_FILE)
    }

    /// Path of the controller's mirror file.
    pub fn controller_state_path(&self) -> PathBuf {
        self.data_dir.join(CONTROLLER_STATE_FILE)
    }

    /// `getState` timeout.
    pub fn get_state_timeout(&self) -> Duration {
        Duration::from_millis(self.get_state_timeout_ms)
    }

    /// Delay between daemon wakes.
    pub fn wake_interval(&self) -> Duration {
        Duration::from_millis(self.wake_interval_ms)
    }
}

// ============================================================================
// Tests
// ============================================================================
