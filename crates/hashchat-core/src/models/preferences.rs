use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_CHANNEL, SCHEMA_VERSION};

/// Scalar settings kept between sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default = "default_true")]
    pub notification_sound: bool,
    #[serde(default)]
    pub relay_url: Option<String>,
    #[serde(default)]
    pub nostr_public_key: Option<String>,
    #[serde(default)]
    pub selected_channel: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: None,
            notification_sound: true,
            relay_url: None,
            nostr_public_key: None,
            selected_channel: None,
        }
    }
}

pub struct PreferencesStorage {
    path: PathBuf,
    pub prefs: Preferences,
}

impl PreferencesStorage {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        let path = data_dir.as_ref().join("preferences.json");
        let prefs = Self::load_from_file(&path).unwrap_or_default();
        Self { path, prefs }
    }

    fn load_from_file(path: &Path) -> Option<Preferences> {
        let contents = fs::read_to_string(path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    fn save_to_file(&self) {
        match serde_json::to_string_pretty(&self.prefs) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.path, json) {
                    tracing::warn!("Failed to save preferences: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize preferences: {}", e),
        }
    }

    /// Stamp the schema version. Returns true when an older or missing version
    /// was found, in which case every stored preference has been dropped and
    /// the caller must wipe the cache too.
    pub fn ensure_version(&mut self) -> bool {
        if self.prefs.version.as_deref() == Some(SCHEMA_VERSION) {
            return false;
        }
        self.prefs = Preferences {
            version: Some(SCHEMA_VERSION.to_string()),
            ..Preferences::default()
        };
        self.save_to_file();
        true
    }

    pub fn clear(&mut self) {
        self.prefs = Preferences::default();
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove preferences: {}", e);
            }
        }
    }

    pub fn notification_sound(&self) -> bool {
        self.prefs.notification_sound
    }

    pub fn set_notification_sound(&mut self, enabled: bool) {
        self.prefs.notification_sound = enabled;
        self.save_to_file();
    }

    pub fn relay_url(&self) -> Option<&str> {
        self.prefs.relay_url.as_deref().filter(|u| !u.is_empty())
    }

    pub fn set_relay_url(&mut self, url: &str) {
        self.prefs.relay_url = Some(url.to_string());
        self.save_to_file();
    }

    pub fn nostr_public_key(&self) -> Option<&str> {
        self.prefs.nostr_public_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn set_nostr_public_key(&mut self, pubkey: &str) {
        self.prefs.nostr_public_key = Some(pubkey.to_string());
        self.save_to_file();
    }

    pub fn selected_channel(&self) -> &str {
        self.prefs
            .selected_channel
            .as_deref()
            .unwrap_or(DEFAULT_CHANNEL)
    }

    pub fn set_selected_channel(&mut self, channel: &str) {
        self.prefs.selected_channel = Some(channel.to_string());
        self.save_to_file();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_when_missing() {
        let dir = tempdir().unwrap();
        let prefs = PreferencesStorage::new(dir.path());
        assert!(prefs.notification_sound());
        assert!(prefs.relay_url().is_none());
        assert_eq!(prefs.selected_channel(), "#_");
    }

    #[test]
    fn test_values_survive_reload() {
        let dir = tempdir().unwrap();
        let mut prefs = PreferencesStorage::new(dir.path());
        prefs.ensure_version();
        prefs.set_relay_url("wss://relay.example.com");
        prefs.set_notification_sound(false);
        prefs.set_nostr_public_key("abcd");

        let reloaded = PreferencesStorage::new(dir.path());
        assert_eq!(reloaded.relay_url(), Some("wss://relay.example.com"));
        assert!(!reloaded.notification_sound());
        assert_eq!(reloaded.nostr_public_key(), Some("abcd"));
    }

    #[test]
    fn test_version_mismatch_resets_everything() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("preferences.json"),
            r#"{"version":"3","relayUrl":"wss://old.example.com","notificationSound":false}"#,
        )
        .unwrap();

        let mut prefs = PreferencesStorage::new(dir.path());
        assert_eq!(prefs.relay_url(), Some("wss://old.example.com"));
        assert!(prefs.ensure_version());
        assert!(prefs.relay_url().is_none());
        assert!(prefs.notification_sound());

        let mut reloaded = PreferencesStorage::new(dir.path());
        assert!(!reloaded.ensure_version());
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempdir().unwrap();
        let mut prefs = PreferencesStorage::new(dir.path());
        prefs.set_relay_url("wss://relay.example.com");
        prefs.clear();
        assert!(!dir.path().join("preferences.json").exists());
        assert!(prefs.relay_url().is_none());
    }
}
