//! Application paths and persistent settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings file name
pub const SETTINGS_FILE: &str = "coraline.json";
/// Default log file name (used with `--log` without a path)
pub const LOG_FILE: &str = "coraline.log";
/// Environment override for the config directory
pub const CONFIG_DIR_ENV: &str = "CORALINE_CONFIG_DIR";
const APP_DIR: &str = "coraline";

/// Where settings and logs live.
///
/// Lookup order for both directories:
/// 1. `--config-dir` on the command line
/// 2. `CORALINE_CONFIG_DIR`
/// 3. the working directory, when it already holds `coraline.json` or `coraline.log`
/// 4. `<platform dir>/coraline` (config dir for settings, data dir for logs)
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Explicit override, from CLI or environment
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var_os(CONFIG_DIR_ENV).map(PathBuf::from));
        Self { config_dir }
    }

    pub fn config_dir(&self) -> PathBuf {
        self.resolve(dirs_next::config_dir())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.resolve(dirs_next::data_dir())
    }

    pub fn config_file(&self, name: &str) -> PathBuf {
        self.config_dir().join(name)
    }

    pub fn data_file(&self, name: &str) -> PathBuf {
        self.data_dir().join(name)
    }

    /// Create the config and data directories if missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        let mut dirs = vec![self.config_dir()];
        let data = self.data_dir();
        if !dirs.contains(&data) {
            dirs.push(data);
        }
        for dir in dirs.iter().filter(|d| !d.exists()) {
            std::fs::create_dir_all(dir).with_context(|| format!("Create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    fn resolve(&self, platform: Option<PathBuf>) -> PathBuf {
        if let Some(dir) = &self.config_dir {
            return dir.clone();
        }
        let local = std::env::current_dir()
            .ok()
            .filter(|cwd| [SETTINGS_FILE, LOG_FILE].iter().any(|f| cwd.join(f).exists()));
        local
            .or_else(|| platform.map(|dir| dir.join(APP_DIR)))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Persistent settings (`coraline.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Redraw interval while a Time node plays, in milliseconds
    pub timed_refresh_ms: u64,
    /// Run worker thread name prefix
    pub worker_name_prefix: String,
    /// Node log cap in bytes; older text is trimmed from the front
    pub max_log_len: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timed_refresh_ms: 500,
            worker_name_prefix: "coraline-run".to_string(),
            max_log_len: 64 * 1024,
        }
    }
}

impl Settings {
    pub fn timed_refresh(&self) -> Duration {
        Duration::from_millis(self.timed_refresh_ms)
    }

    /// Load settings; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).with_context(|| format!("Read settings: {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Parse settings: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Serialize settings")?;
        std::fs::write(path, json).with_context(|| format!("Write settings: {}", path.display()))
    }
}
