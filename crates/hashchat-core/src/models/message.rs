use nostr_sdk::prelude::*;
use serde::{Deserialize, Serialize};

/// A relay-delivered event, detached from the nostr-sdk types so the
/// classifier and stores can be exercised without signing anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEvent {
    pub id: String,
    pub pubkey: String,
    pub kind: u16,
    pub created_at: u64,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

impl SignedEvent {
    pub fn from_nostr(event: &Event) -> Self {
        Self {
            id: event.id.to_hex(),
            pubkey: event.pubkey.to_hex(),
            kind: event.kind.as_u16(),
            created_at: event.created_at.as_u64(),
            tags: event.tags.iter().map(|t| t.as_slice().to_vec()).collect(),
            content: event.content.clone(),
            sig: event.sig.to_string(),
        }
    }

    /// Second element of the first tag named `name`.
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.first().map(String::as_str) == Some(name))
            .and_then(|t| t.get(1))
            .map(String::as_str)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags
            .iter()
            .any(|t| t.first().map(String::as_str) == Some(name))
    }
}

/// A signed event that passed classification and was assigned a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    #[serde(flatten)]
    pub event: SignedEvent,
    /// Always `#`-prefixed
    pub channel: String,
    pub origin_relay: String,
}

impl MessageEvent {
    pub fn id(&self) -> &str {
        &self.event.id
    }

    pub fn pubkey(&self) -> &str {
        &self.event.pubkey
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Info,
    Help,
}

/// Locally synthesized line shown in a channel (errors, help text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemEvent {
    pub id: String,
    pub channel: String,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub created_at: u64,
    pub content: String,
}

impl SystemEvent {
    pub fn new(channel: &str, severity: Severity, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel: channel.to_string(),
            severity,
            created_at: unix_now(),
            content: content.into(),
        }
    }
}

/// What a channel sequence holds. Decided once at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "lowercase")]
pub enum ChannelEntry {
    Message(MessageEvent),
    System(SystemEvent),
}

impl ChannelEntry {
    pub fn id(&self) -> &str {
        match self {
            ChannelEntry::Message(m) => m.id(),
            ChannelEntry::System(s) => &s.id,
        }
    }

    pub fn channel(&self) -> &str {
        match self {
            ChannelEntry::Message(m) => &m.channel,
            ChannelEntry::System(s) => &s.channel,
        }
    }

    pub fn created_at(&self) -> u64 {
        match self {
            ChannelEntry::Message(m) => m.event.created_at,
            ChannelEntry::System(s) => s.created_at,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ChannelEntry::Message(m) => &m.event.content,
            ChannelEntry::System(s) => &s.content,
        }
    }

    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            ChannelEntry::Message(m) => Some(m),
            ChannelEntry::System(_) => None,
        }
    }
}

pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
