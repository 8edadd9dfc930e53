use std::time::Duration;

use serde::{Deserialize, Serialize};

pub(crate) const CONFIG_FILE: &str = "marten_config.json";

const DEFAULT_TYPING_THROTTLE_MS: u64 = 15_000;

/// On-disk app config. Every field is optional; a missing or unreadable
/// file means defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct AppConfig {
    /// Minimum spacing between outgoing typing notifications, in ms.
    pub typing_throttle_ms: Option<u64>,
}

impl AppConfig {
    pub fn typing_throttle(&self) -> Duration {
        Duration::from_millis(self.typing_throttle_ms.unwrap_or(DEFAULT_TYPING_THROTTLE_MS))
    }
}

pub(crate) fn load_app_config(data_dir: &str) -> AppConfig {
    let path = std::path::Path::new(data_dir).join(CONFIG_FILE);
    let Ok(bytes) = std::fs::read(&path) else {
        return AppConfig::default();
    };
    match serde_json::from_slice(&bytes) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), %e, "unreadable app config, using defaults");
            AppConfig::default()
        }
    }
}
