/// Engine configuration, read from a JSON file.
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Idle time after which `sweep` drops a collaborator.
    #[serde(default = "default_presence_ttl_secs")]
    pub presence_ttl_secs: u64,
    /// Age after which `sweep` drops an unacknowledged operation.
    #[serde(default = "default_operation_ttl_secs")]
    pub operation_ttl_secs: u64,
    /// Buffer size of the event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    #[serde(default = "default_max_visible_users")]
    pub max_visible_users: usize,
}

fn default_presence_ttl_secs() -> u64 {
    120
}

fn default_operation_ttl_secs() -> u64 {
    60
}

fn default_event_capacity() -> usize {
    256
}

fn default_max_visible_users() -> usize {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            presence_ttl_secs: default_presence_ttl_secs(),
            operation_ttl_secs: default_operation_ttl_secs(),
            event_capacity: default_event_capacity(),
            max_visible_users: default_max_visible_users(),
        }
    }
}

impl EngineConfig {
    pub fn presence_ttl(&self) -> Duration {
        Duration::from_secs(self.presence_ttl_secs)
    }

    pub fn operation_ttl(&self) -> Duration {
        Duration::from_secs(self.operation_ttl_secs)
    }
}

/// Load config from path. Returns defaults if the file is missing or invalid.
pub fn load_config(path: &Path) -> EngineConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("[taskboard.config] Failed to parse config {}: {}", path.display(), e);
            EngineConfig::default()
        }),
        Err(_) => {
            log::info!("[taskboard.config] No config at {}, using defaults", path.display());
            EngineConfig::default()
        }
    }
}
