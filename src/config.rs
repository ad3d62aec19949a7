use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::session::{SessionConfig, DEFAULT_BASE_POINTS, DEFAULT_TIME_BUDGET_SECS};

/// Longest per-phrase budget the host accepts: one hour.
pub const MAX_TIME_BUDGET_SECS: u32 = 3_600;
pub const MAX_BASE_POINTS: u32 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub time_budget_secs: u32,
    pub base_points: u32,
    pub phrase_set: String,
    pub recognizer_latency_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_budget_secs: DEFAULT_TIME_BUDGET_SECS,
            base_points: DEFAULT_BASE_POINTS,
            phrase_set: "pangungusap".to_string(),
            recognizer_latency_ms: 300,
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            time_budget_secs: cfg.time_budget_secs.clamp(1, MAX_TIME_BUDGET_SECS),
            base_points: cfg.base_points.min(MAX_BASE_POINTS),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("bigkas_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), %err, "ignoring malformed config")
                }
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
