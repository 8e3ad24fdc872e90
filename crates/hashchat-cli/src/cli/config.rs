use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hashchat_core::CoreConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration that can be loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    /// Relay to join
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay_url: Option<String>,

    /// Where preferences, cache.db and hashchat.log live
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Stored sound preference to apply on startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_sound: Option<bool>,

    /// Audio file played on new unread activity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_sound: Option<PathBuf>,

    /// Key used for `/login`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

/// Nostr credentials configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// nsec or hex secret key
    pub key: String,
}

impl CliConfig {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CliConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Command-line values win over the file.
    pub fn with_overrides(mut self, data_dir: Option<PathBuf>, relay_url: Option<String>) -> Self {
        if data_dir.is_some() {
            self.data_dir = data_dir;
        }
        if relay_url.is_some() {
            self.relay_url = relay_url;
        }
        self
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn core_config(&self) -> CoreConfig {
        let mut config = CoreConfig::new(self.data_dir());
        config.relay_url = self.relay_url.clone().filter(|u| !u.trim().is_empty());
        config
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("hashchat"))
        .unwrap_or_else(|| PathBuf::from("hashchat_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_full() {
        let json = r#"{
            "relayUrl": "wss://relay.example.com",
            "dataDir": "/tmp/hashchat-test",
            "notificationSound": false,
            "credentials": { "key": "nsec1abc123" }
        }"#;
        let config: CliConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.relay_url.as_deref(), Some("wss://relay.example.com"));
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/hashchat-test"));
        assert_eq!(config.notification_sound, Some(false));
        assert_eq!(config.credentials.unwrap().key, "nsec1abc123");
    }

    #[test]
    fn test_parse_config_minimal() {
        let config: CliConfig = serde_json::from_str("{}").unwrap();
        assert!(config.relay_url.is_none());
        assert!(config.credentials.is_none());
        assert!(config.core_config().relay_url.is_none());
    }

    #[test]
    fn test_flags_override_file() {
        let config = CliConfig {
            relay_url: Some("wss://file.example.com".to_string()),
            ..Default::default()
        }
        .with_overrides(
            Some(PathBuf::from("/tmp/flag")),
            Some("wss://flag.example.com".to_string()),
        );
        let core = config.core_config();
        assert_eq!(core.relay_url.as_deref(), Some("wss://flag.example.com"));
        assert_eq!(core.data_dir, PathBuf::from("/tmp/flag"));
    }

    #[test]
    fn test_load_reports_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        let err = CliConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
