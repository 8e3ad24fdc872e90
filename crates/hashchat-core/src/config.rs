use std::path::{Path, PathBuf};

use crate::constants::{FALLBACK_METADATA_RELAY_URL, METADATA_RELAY_URL};

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    /// Relay to join on startup. Falls back to the stored preference when unset.
    pub relay_url: Option<String>,
    /// Relays queried for kind:0 alongside the active relay
    pub metadata_relays: Vec<String>,
    /// Connection log file; defaults to `<data_dir>/hashchat.log`
    pub log_path: Option<PathBuf>,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            relay_url: None,
            metadata_relays: vec![
                METADATA_RELAY_URL.to_string(),
                FALLBACK_METADATA_RELAY_URL.to_string(),
            ],
            log_path: None,
        }
    }

    pub fn with_relay_url(mut self, relay_url: impl Into<String>) -> Self {
        self.relay_url = Some(relay_url.into());
        self
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("hashchat.log"))
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new("hashchat_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_metadata_relays() {
        let config = CoreConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("hashchat_data"));
        assert_eq!(
            config.metadata_relays,
            vec![
                "wss://purplepag.es".to_string(),
                "wss://relay.primal.net".to_string()
            ]
        );
        assert!(config.relay_url.is_none());
    }

    #[test]
    fn test_log_path_defaults_into_data_dir() {
        let config = CoreConfig::new("/tmp/hc").with_relay_url("wss://relay.example.com");
        assert_eq!(config.log_path(), PathBuf::from("/tmp/hc/hashchat.log"));
        assert_eq!(config.relay_url.as_deref(), Some("wss://relay.example.com"));
    }
}
