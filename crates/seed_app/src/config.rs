//! Host configuration, read from a RON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use seed_engine::{OrchestratorConfig, WindowSettings};
use seed_logging::{seed_info, seed_warn};
use serde::{Deserialize, Serialize};

use crate::worker::CatalogSettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub state_dir: PathBuf,
    pub job_id: String,
    /// Items the synthetic catalog exposes.
    pub item_count: u64,
    pub batch_size: u64,
    pub item_delay_ms: u64,
    pub discovery_delay_ms: u64,
    pub max_items: Option<u64>,
    pub window_start_delay_ms: u64,
    pub window_budget_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("./seed_state"),
            job_id: OrchestratorConfig::default().job_id,
            item_count: 250,
            batch_size: 50,
            item_delay_ms: 20,
            discovery_delay_ms: 100,
            max_items: None,
            window_start_delay_ms: 500,
            window_budget_ms: 30_000,
            poll_interval_ms: 250,
        }
    }
}

impl AppConfig {
    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            job_id: self.job_id.clone(),
            max_items: self.max_items,
            ..OrchestratorConfig::default()
        }
    }

    pub fn windows(&self) -> WindowSettings {
        WindowSettings {
            start_delay: Duration::from_millis(self.window_start_delay_ms),
            budget: Duration::from_millis(self.window_budget_ms),
        }
    }

    pub fn catalog(&self) -> CatalogSettings {
        CatalogSettings {
            item_count: self.item_count,
            batch_size: self.batch_size.max(1),
            item_delay: Duration::from_millis(self.item_delay_ms),
            discovery_delay: Duration::from_millis(self.discovery_delay_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }
}

/// Loads the config, falling back to defaults when the file is missing or
/// unreadable.
pub fn load(path: &Path) -> AppConfig {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            seed_info!("No config at {:?}; using defaults", path);
            return AppConfig::default();
        }
        Err(err) => {
            seed_warn!("Failed to read config from {:?}: {}", path, err);
            return AppConfig::default();
        }
    };

    match ron::from_str(&content) {
        Ok(config) => config,
        Err(err) => {
            seed_warn!("Failed to parse config from {:?}: {}", path, err);
            AppConfig::default()
        }
    }
}
