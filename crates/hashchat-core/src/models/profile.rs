use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub pubkey: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nip05: Option<String>,
}

impl ProfileInfo {
    pub fn new(pubkey: impl Into<String>) -> Self {
        Self {
            pubkey: pubkey.into(),
            verified: false,
            name: None,
            nip05: None,
        }
    }

    /// Profile synthesized from a geohash message nickname: `nick#<last 4 of pubkey>`.
    pub fn from_nick(pubkey: &str, nick: &str) -> Self {
        let suffix_start = pubkey
            .char_indices()
            .rev()
            .nth(3)
            .map(|(i, _)| i)
            .unwrap_or(0);
        Self {
            pubkey: pubkey.to_string(),
            verified: false,
            name: Some(format!("{}#{}", nick, &pubkey[suffix_start..])),
            nip05: None,
        }
    }

    /// Overwrite with the candidate's non-empty fields. `verified` is left alone.
    pub fn merge_from(&mut self, candidate: ProfileInfo) {
        if let Some(name) = candidate.name.filter(|n| !n.is_empty()) {
            self.name = Some(name);
        }
        if let Some(nip05) = candidate.nip05.filter(|n| !n.is_empty()) {
            self.nip05 = Some(nip05);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_nick_uses_last_four() {
        let profile = ProfileInfo::from_nick("abcdef0123456789", "alice");
        assert_eq!(profile.name.as_deref(), Some("alice#6789"));
        assert!(!profile.verified);
        assert!(profile.nip05.is_none());
    }

    #[test]
    fn test_from_nick_with_short_pubkey() {
        let profile = ProfileInfo::from_nick("ab", "bob");
        assert_eq!(profile.name.as_deref(), Some("bob#ab"));
    }

    #[test]
    fn test_merge_ignores_empty_fields() {
        let mut current = ProfileInfo {
            pubkey: "pk".to_string(),
            verified: true,
            name: Some("old".to_string()),
            nip05: Some("old@example.com".to_string()),
        };
        current.merge_from(ProfileInfo {
            pubkey: "pk".to_string(),
            verified: false,
            name: Some(String::new()),
            nip05: Some("new@example.com".to_string()),
        });
        assert_eq!(current.name.as_deref(), Some("old"));
        assert_eq!(current.nip05.as_deref(), Some("new@example.com"));
        assert!(current.verified);
    }
}
