//! Trainer configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MrtError, Result};
use crate::message::Mailbox;

/// Configuration for the trainer core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Ingestion defaults for historical listing.
    pub ingest: IngestConfig,

    /// Notification settings.
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Default mailbox for listings.
    pub mailbox: Mailbox,

    /// Result cap per historical query.
    pub max_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Whether a positive triage posts a notification.
    pub notify_on_match: bool,

    /// Notification channel identifier, created once at startup.
    pub channel_id: String,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            ingest: IngestConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            mailbox: Mailbox::Inbox,
            max_count: 30,
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            notify_on_match: true,
            channel_id: "smishing-alerts".to_string(),
        }
    }
}

impl TrainerConfig {
    /// Load configuration from a file, or defaults when it is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| MrtError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MrtError::Config(format!("Failed to create config dir: {e}")))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| MrtError::Config(format!("Failed to save config: {e}")))?;
        Ok(())
    }

    /// Default config file path under the platform config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mrt")
            .join("config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_product() {
        let config = TrainerConfig::default();
        assert_eq!(config.ingest.mailbox, Mailbox::Inbox);
        assert_eq!(config.ingest.max_count, 30);
        assert!(config.notify.notify_on_match);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = TrainerConfig::load(Path::new("/nonexistent/mrt/config.json")).unwrap();
        assert_eq!(config.ingest.max_count, 30);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = std::env::temp_dir().join(format!("mrt-config-test-{}", std::process::id()));
        let path = dir.join("config.json");

        let mut config = TrainerConfig::default();
        config.ingest.max_count = 7;
        config.notify.notify_on_match = false;
        config.save(&path).unwrap();

        let loaded = TrainerConfig::load(&path).unwrap();
        assert_eq!(loaded.ingest.max_count, 7);
        assert!(!loaded.notify.notify_on_match);
        assert_eq!(loaded.notify.channel_id, "smishing-alerts");

        std::fs::remove_dir_all(&dir).ok();
    }
}
