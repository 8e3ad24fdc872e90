//! The one owned aggregate behind the chat client.
//!
//! Relay ingestion, user commands and cache I/O all mutate through `ChatState`
//! methods on a single task; everything else reads borrows or snapshots.

use std::collections::{BTreeSet, HashSet};

use anyhow::Result;
use nostr_sdk::prelude::NostrSigner;

use crate::config::CoreConfig;
use crate::constants::DEFAULT_CHANNEL;
use crate::error::CoreError;
use crate::models::{
    unix_now, ChannelEntry, MessageEvent, PreferencesStorage, ProfileInfo, Severity, SignedEvent,
    SystemEvent,
};
use crate::nostr::auth;
use crate::nostr::classifier::{classify, short_npub, Classified, IngestContext};
use crate::store::db::CacheDb;
use crate::store::message_store::{AppendOutcome, MessageStore};
use crate::store::profile_store::ProfileRegistry;
use crate::tlog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub channel: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyRequest {
    pub pubkey: String,
    pub nip05: String,
}

/// Everything one relay event changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    pub kind: u16,
    /// Classified into something we keep (message or metadata)
    pub accepted: bool,
    pub channel: Option<String>,
    pub append: AppendOutcome,
    pub mention: Option<Mention>,
    /// Pubkey whose profile changed
    pub profile_updated: Option<String>,
    pub verify: Option<VerifyRequest>,
    pub refresh_metadata: bool,
}

pub struct ChatState {
    operator: Option<String>,
    relay_url: Option<String>,
    messages: MessageStore,
    profiles: ProfileRegistry,
    notification_sound: bool,
    foreground: bool,
    /// `pubkey:nip05` pairs already sent for verification this session
    verify_requested: HashSet<String>,
    prefs: PreferencesStorage,
    cache: CacheDb,
}

impl ChatState {
    pub fn open(config: &CoreConfig) -> Result<Self> {
        let cache = CacheDb::open(&config.data_dir)?;
        let prefs = PreferencesStorage::new(&config.data_dir);
        Ok(Self {
            operator: None,
            relay_url: config.relay_url.clone(),
            messages: MessageStore::new(),
            profiles: ProfileRegistry::new(),
            notification_sound: true,
            foreground: true,
            verify_requested: HashSet::new(),
            prefs,
            cache,
        })
    }

    // ===== Query Methods =====

    pub fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    pub fn relay_url(&self) -> Option<&str> {
        self.relay_url.as_deref()
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    pub fn notification_sound(&self) -> bool {
        self.notification_sound
    }

    pub fn foreground(&self) -> bool {
        self.foreground
    }

    /// Label for an author: profile name if known, else a short npub.
    pub fn sender_label(&self, pubkey: &str) -> String {
        self.profiles
            .display_name(pubkey)
            .map(str::to_string)
            .unwrap_or_else(|| short_npub(pubkey))
    }

    /// Distinct authors across stored messages, plus the operator.
    pub fn metadata_authors(&self) -> BTreeSet<String> {
        let mut authors: BTreeSet<String> = self
            .messages
            .all_entries()
            .filter_map(ChannelEntry::as_message)
            .map(|m| m.pubkey().to_string())
            .collect();
        if let Some(operator) = &self.operator {
            authors.insert(operator.clone());
        }
        authors
    }

    // ===== Settings =====

    pub fn set_foreground(&mut self, foreground: bool) {
        self.foreground = foreground;
    }

    pub fn set_notification_sound(&mut self, enabled: bool) {
        self.notification_sound = enabled;
        self.prefs.set_notification_sound(enabled);
    }

    pub fn set_relay_url(&mut self, url: &str) {
        self.relay_url = Some(url.to_string());
    }

    pub fn set_operator(&mut self, pubkey: &str) {
        self.operator = Some(pubkey.to_string());
    }

    /// Resolve the operator through the signing capability.
    pub async fn login<S>(&mut self, signer: Option<&S>) -> Result<String, CoreError>
    where
        S: NostrSigner + ?Sized,
    {
        match auth::login(signer).await {
            Ok(pubkey) => {
                tracing::info!("Logged in with Nostr public key: {}", pubkey);
                self.set_operator(&pubkey);
                Ok(pubkey)
            }
            Err(e) => {
                tracing::error!("Error logging in with Nostr: {}", e);
                Err(e)
            }
        }
    }

    // ===== Channels =====

    pub fn select_channel(&mut self, input: &str) -> Result<bool, CoreError> {
        self.messages.select_channel(input)
    }

    pub fn clear_empty_channels(&mut self) -> Vec<String> {
        self.messages.clear_empty_channels()
    }

    /// Append a locally generated line to `channel`.
    pub fn post_system(&mut self, channel: &str, severity: Severity, content: &str) -> AppendOutcome {
        let event = SystemEvent::new(channel, severity, content);
        self.messages
            .append(channel, ChannelEntry::System(event), self.foreground)
    }

    // ===== Ingestion =====

    /// Classify and absorb one relay event. Never fails: anything malformed
    /// is dropped and reported through the outcome.
    pub fn ingest(&mut self, event: SignedEvent, from_relay: &str) -> IngestOutcome {
        let kind = event.kind;
        let origin = self.relay_url.clone().unwrap_or_else(|| from_relay.to_string());
        let ctx = IngestContext {
            operator: self.operator.as_deref(),
            relay_url: &origin,
            received_at: unix_now(),
        };
        let classified = classify(event, &ctx);

        let mut outcome = IngestOutcome {
            kind,
            ..IngestOutcome::default()
        };

        match classified {
            Classified::Chat {
                message,
                mentions_operator,
            } => {
                if mentions_operator {
                    let label = self.sender_label(message.pubkey());
                    outcome.mention = Some(Mention {
                        channel: message.channel.clone(),
                        title: format!("{} mentioned you in {}", label, message.channel),
                        body: message.event.content.clone(),
                    });
                }
                self.absorb(message, &mut outcome);
            }
            Classified::GeoChat { message, nick } => {
                let author = message.pubkey().to_string();
                self.absorb(message, &mut outcome);
                if self.operator.as_deref() != Some(author.as_str()) {
                    self.profiles.upsert_nick(&author, &nick);
                    outcome.profile_updated = Some(author);
                }
            }
            Classified::Metadata { pubkey, content } => {
                if let Some(profile) = self.profiles.merge_metadata(&pubkey, &content).cloned() {
                    outcome.accepted = true;
                    outcome.verify = self.verify_candidate(profile);
                    outcome.profile_updated = Some(pubkey);
                }
            }
            Classified::Rejected { kind, reason } => {
                tracing::debug!("Dropped kind {} event: {:?}", kind, reason);
            }
            Classified::Unrecognized { kind } => {
                tracing::debug!("Ignoring kind {} event", kind);
            }
        }
        outcome
    }

    fn absorb(&mut self, message: MessageEvent, outcome: &mut IngestOutcome) {
        let channel = message.channel.clone();
        outcome.append = self
            .messages
            .append(&channel, ChannelEntry::Message(message), self.foreground);
        outcome.accepted = true;
        outcome.channel = Some(channel);
        outcome.refresh_metadata = true;
    }

    fn verify_candidate(&mut self, profile: ProfileInfo) -> Option<VerifyRequest> {
        if profile.verified {
            return None;
        }
        let nip05 = profile.nip05?;
        let key = format!("{}:{}", profile.pubkey, nip05);
        if !self.verify_requested.insert(key) {
            return None;
        }
        Some(VerifyRequest {
            pubkey: profile.pubkey,
            nip05,
        })
    }

    /// A NIP-05 lookup confirmed `pubkey`.
    pub fn mark_verified(&mut self, pubkey: &str) -> bool {
        self.profiles.mark_verified(pubkey)
    }

    // ===== Cache =====

    /// Restore preferences and the relay's cached timelines.
    ///
    /// A schema version change wipes both stores first.
    pub fn load_cache(&mut self) -> Result<()> {
        if self.prefs.ensure_version() {
            tlog!("CACHE", "Schema version changed, wiping cache");
            self.cache.wipe()?;
        }

        self.notification_sound = self.prefs.notification_sound();
        if self.relay_url.is_none() {
            self.relay_url = self.prefs.relay_url().map(str::to_string);
        }
        if let Some(pubkey) = self.prefs.nostr_public_key() {
            self.operator = Some(pubkey.to_string());
        }

        self.profiles.restore(self.cache.all_profiles()?);

        let Some(relay_url) = self.relay_url.clone() else {
            self.messages = MessageStore::new();
            return Ok(());
        };
        let entries = self.cache.messages_for_relay(&relay_url)?;
        let channels = self
            .cache
            .channels_for_relay(&relay_url)?
            .unwrap_or_else(|| vec![DEFAULT_CHANNEL.to_string()]);
        let unread = self.cache.unread_for_relay(&relay_url)?.unwrap_or_default();
        let selected = self.prefs.selected_channel().to_string();

        tlog!(
            "CACHE",
            "Loaded {} entries, {} channels, {} profiles for {}",
            entries.len(),
            channels.len(),
            self.profiles.len(),
            relay_url
        );
        self.messages
            .restore(channels, unread, Some(selected), entries);
        Ok(())
    }

    /// Persist everything. Each table is written independently; one failing
    /// write is logged and the rest still run.
    pub fn save_cache(&mut self) {
        let Some(relay_url) = self.relay_url.clone() else {
            tracing::debug!("save_cache skipped, no relay");
            return;
        };
        self.prefs.set_relay_url(&relay_url);

        let messages = self
            .messages
            .all_entries()
            .filter(|e| matches!(e, ChannelEntry::Message(_)));
        if let Err(e) = self.cache.bulk_put_messages(&relay_url, messages) {
            tlog!("ERROR", "Error saving messages to cache: {}", e);
        }
        if let Err(e) = self.cache.put_profiles(self.profiles.profiles()) {
            tlog!("ERROR", "Error saving profiles to cache: {}", e);
        }
        if let Err(e) = self.cache.put_channels(&relay_url, self.messages.channels()) {
            tlog!("ERROR", "Error saving channels to cache: {}", e);
        }
        if let Err(e) = self
            .cache
            .put_unread_channels(&relay_url, self.messages.unread())
        {
            tlog!("ERROR", "Error saving unread channels to cache: {}", e);
        }

        let selected = self.messages.selected().to_string();
        self.prefs.set_selected_channel(&selected);
        if let Some(operator) = self.operator.clone() {
            self.prefs.set_nostr_public_key(&operator);
        }
    }

    /// Forget everything: preferences, cache and in-memory state.
    pub fn clear_all_site_data(&mut self) -> Result<()> {
        self.prefs.clear();
        self.cache.wipe()?;
        self.operator = None;
        self.relay_url = None;
        self.messages = MessageStore::new();
        self.profiles = ProfileRegistry::new();
        self.notification_sound = true;
        self.verify_requested.clear();
        Ok(())
    }
}
