//! Turns raw relay events into channel-tagged messages.
//!
//! Classification is pure: it decides what an event is and what it implies,
//! and leaves every mutation to `ChatState`.

use std::sync::LazyLock;

use nostr_sdk::nips::nip19::{FromBech32, Nip19};
use nostr_sdk::prelude::*;
use regex::Regex;

use crate::constants::{kinds, SECONDARY_CHANNEL_PREFIX};
use crate::models::{is_valid_channel_name, MessageEvent, SignedEvent};

/// Bare or `nostr:`-prefixed NIP-19 profile references. The word boundary is
/// ASCII-only, so a reference glued to non-ASCII text still counts.
static NPROFILE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u:\b)(?:nostr:)?nprofile1[02-9ac-hj-np-z]+")
        .expect("nprofile regex should compile")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingChannelTag,
    MissingNickTag,
    InvalidChannelName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Chat {
        message: MessageEvent,
        mentions_operator: bool,
    },
    GeoChat {
        message: MessageEvent,
        nick: String,
    },
    Metadata {
        pubkey: String,
        content: String,
    },
    Rejected {
        kind: u16,
        reason: RejectReason,
    },
    Unrecognized {
        kind: u16,
    },
}

/// Facts about the receiving side that classification depends on.
#[derive(Debug, Clone, Copy)]
pub struct IngestContext<'a> {
    pub operator: Option<&'a str>,
    pub relay_url: &'a str,
    /// Local receipt time; replaces the author-asserted `created_at`
    pub received_at: u64,
}

pub fn classify(mut event: SignedEvent, ctx: &IngestContext) -> Classified {
    match event.kind {
        kinds::CHAT => {
            let name = event.tag_value("d").unwrap_or_default().to_string();
            if !is_valid_channel_name(&name) {
                return Classified::Rejected {
                    kind: event.kind,
                    reason: RejectReason::InvalidChannelName(name),
                };
            }
            let mentions_operator = ctx
                .operator
                .is_some_and(|op| mentions_pubkey(&event.content, op));
            event.created_at = ctx.received_at;
            Classified::Chat {
                message: MessageEvent {
                    event,
                    channel: format!("#{}", name),
                    origin_relay: ctx.relay_url.to_string(),
                },
                mentions_operator,
            }
        }
        kinds::GEO_CHAT => {
            let Some(name) = event.tag_value("g").map(str::to_string) else {
                let reason = if event.has_tag("g") {
                    RejectReason::InvalidChannelName(String::new())
                } else {
                    RejectReason::MissingChannelTag
                };
                return Classified::Rejected {
                    kind: event.kind,
                    reason,
                };
            };
            if !event.has_tag("n") {
                return Classified::Rejected {
                    kind: event.kind,
                    reason: RejectReason::MissingNickTag,
                };
            }
            if !is_valid_channel_name(&name) {
                return Classified::Rejected {
                    kind: event.kind,
                    reason: RejectReason::InvalidChannelName(name),
                };
            }
            let nick = event.tag_value("n").unwrap_or_default().to_string();
            event.created_at = ctx.received_at;
            Classified::GeoChat {
                message: MessageEvent {
                    event,
                    channel: format!("{}{}", SECONDARY_CHANNEL_PREFIX, name),
                    origin_relay: ctx.relay_url.to_string(),
                },
                nick,
            }
        }
        kinds::METADATA => Classified::Metadata {
            pubkey: event.pubkey,
            content: event.content,
        },
        kind => Classified::Unrecognized { kind },
    }
}

/// True if `content` carries an nprofile reference that decodes to `pubkey_hex`.
pub fn mentions_pubkey(content: &str, pubkey_hex: &str) -> bool {
    NPROFILE_REGEX.find_iter(content).any(|m| {
        let bech32 = m.as_str().strip_prefix("nostr:").unwrap_or(m.as_str());
        match Nip19::from_bech32(bech32) {
            Ok(Nip19::Profile(profile)) => profile.public_key.to_hex() == pubkey_hex,
            _ => false,
        }
    })
}

/// Fallback sender label: the first 12 characters of the author's npub.
pub fn short_npub(pubkey_hex: &str) -> String {
    match PublicKey::from_hex(pubkey_hex).map(|pk| pk.to_bech32()) {
        Ok(Ok(npub)) => npub.chars().take(12).collect(),
        _ => pubkey_hex.chars().take(12).collect(),
    }
}
