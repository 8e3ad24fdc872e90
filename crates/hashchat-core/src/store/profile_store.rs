use std::collections::HashMap;

use serde_json::Value;

use crate::models::ProfileInfo;

/// Author pubkey -> profile metadata.
pub struct ProfileRegistry {
    profiles: HashMap<String, ProfileInfo>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    pub fn get(&self, pubkey: &str) -> Option<&ProfileInfo> {
        self.profiles.get(pubkey)
    }

    pub fn display_name(&self, pubkey: &str) -> Option<&str> {
        self.profiles
            .get(pubkey)
            .and_then(|p| p.name.as_deref())
            .filter(|n| !n.is_empty())
    }

    pub fn profiles(&self) -> impl Iterator<Item = &ProfileInfo> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn restore(&mut self, profiles: Vec<ProfileInfo>) {
        self.profiles = profiles
            .into_iter()
            .map(|p| (p.pubkey.clone(), p))
            .collect();
    }

    /// Record the nickname a geohash message carried. Replaces whatever was known.
    pub fn upsert_nick(&mut self, pubkey: &str, nick: &str) -> &ProfileInfo {
        let profile = ProfileInfo::from_nick(pubkey, nick);
        self.profiles.insert(pubkey.to_string(), profile);
        &self.profiles[pubkey]
    }

    /// Apply a kind:0 `content` payload.
    ///
    /// Unparseable or non-object content is logged and dropped. An existing `verified` flag is
    /// carried over untouched, so a metadata refresh never un-verifies anyone.
    pub fn merge_metadata(&mut self, pubkey: &str, content: &str) -> Option<&ProfileInfo> {
        let parsed: Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!("Error parsing metadata content for {}: {}", pubkey, e);
                return None;
            }
        };
        if !parsed.is_object() {
            tracing::debug!("Ignoring non-object metadata content for {}", pubkey);
            return None;
        }

        let field = |key: &str| {
            parsed
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let candidate = ProfileInfo {
            pubkey: pubkey.to_string(),
            verified: false,
            name: field("name"),
            nip05: field("nip05"),
        };

        match self.profiles.get_mut(pubkey) {
            Some(current) => current.merge_from(candidate),
            None => {
                self.profiles.insert(pubkey.to_string(), candidate);
            }
        }
        self.profiles.get(pubkey)
    }

    /// Returns true if the profile exists and was not already verified.
    pub fn mark_verified(&mut self, pubkey: &str) -> bool {
        match self.profiles.get_mut(pubkey) {
            Some(profile) if !profile.verified => {
                profile.verified = true;
                true
            }
            _ => false,
        }
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_metadata_creates_entry() {
        let mut registry = ProfileRegistry::new();
        let profile = registry
            .merge_metadata("pk", r#"{"name":"alice","nip05":"alice@example.com","about":"x"}"#)
            .cloned()
            .unwrap();
        assert_eq!(profile.name.as_deref(), Some("alice"));
        assert_eq!(profile.nip05.as_deref(), Some("alice@example.com"));
        assert!(!profile.verified);
    }

    #[test]
    fn test_malformed_content_is_dropped() {
        let mut registry = ProfileRegistry::new();
        assert!(registry.merge_metadata("pk", "{not json").is_none());
        assert!(registry.merge_metadata("pk", "null").is_none());
        assert!(registry.merge_metadata("pk", "42").is_none());
        assert!(registry.merge_metadata("pk", "[1]").is_none());
        assert!(registry.merge_metadata("pk", "\"alice\"").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_verified_flag_survives_metadata_refresh() {
        let mut registry = ProfileRegistry::new();
        registry.merge_metadata("pk", r#"{"name":"alice","nip05":"alice@example.com"}"#);
        assert!(registry.mark_verified("pk"));
        assert!(!registry.mark_verified("pk"));

        for content in [r#"{"name":"alice2"}"#, r#"{}"#, r#"{"nip05":"a@b.c"}"#] {
            registry.merge_metadata("pk", content);
            assert!(registry.get("pk").unwrap().verified);
        }
        let profile = registry.get("pk").unwrap();
        assert_eq!(profile.name.as_deref(), Some("alice2"));
        assert_eq!(profile.nip05.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn test_absent_fields_do_not_erase() {
        let mut registry = ProfileRegistry::new();
        registry.merge_metadata("pk", r#"{"name":"alice","nip05":"alice@example.com"}"#);
        registry.merge_metadata("pk", r#"{"name":""}"#);
        let profile = registry.get("pk").unwrap();
        assert_eq!(profile.name.as_deref(), Some("alice"));
        assert_eq!(profile.nip05.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn test_nick_upsert_and_display_name() {
        let mut registry = ProfileRegistry::new();
        registry.upsert_nick("0000abcd", "zed");
        assert_eq!(registry.display_name("0000abcd"), Some("zed#abcd"));
        assert_eq!(registry.display_name("unknown"), None);
    }

    #[test]
    fn test_mark_verified_unknown_author() {
        let mut registry = ProfileRegistry::new();
        assert!(!registry.mark_verified("nobody"));
    }
}
