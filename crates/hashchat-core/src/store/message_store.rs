//! Per-channel timelines plus the channel registry and unread set.
//!
//! Sequences are kept in arrival order, deduplicated by event id for signed
//! messages, and capped at `MAX_MESSAGES_PER_CHANNEL` with oldest-first eviction.

use std::collections::{HashMap, VecDeque};

use crate::constants::{DEFAULT_CHANNEL, MAX_MESSAGES_PER_CHANNEL};
use crate::error::CoreError;
use crate::models::{normalize_channel_input, ChannelEntry};

/// What an append changed, for the notification path to react to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    pub new_channel: bool,
    /// Channel entered the unread set with this append
    pub newly_unread: bool,
    /// False when the entry was a duplicate and nothing was stored
    pub stored: bool,
}

pub struct MessageStore {
    channels: Vec<String>,
    unread: Vec<String>,
    selected: String,
    messages: HashMap<String, VecDeque<ChannelEntry>>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self {
            channels: vec![DEFAULT_CHANNEL.to_string()],
            unread: Vec::new(),
            selected: DEFAULT_CHANNEL.to_string(),
            messages: HashMap::new(),
        }
    }

    // ===== Query Methods =====

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn unread(&self) -> &[String] {
        &self.unread
    }

    pub fn is_unread(&self, channel: &str) -> bool {
        self.unread.iter().any(|c| c == channel)
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    pub fn entries(&self, channel: &str) -> Option<&VecDeque<ChannelEntry>> {
        self.messages.get(channel)
    }

    pub fn len(&self, channel: &str) -> usize {
        self.messages.get(channel).map_or(0, VecDeque::len)
    }

    pub fn all_entries(&self) -> impl Iterator<Item = &ChannelEntry> {
        self.messages.values().flat_map(|entries| entries.iter())
    }

    // ===== Mutation Methods =====

    /// Add an entry to `channel`, registering the channel and marking it unread
    /// when it is not being looked at.
    ///
    /// The unread check runs before deduplication, so a duplicate arriving for a
    /// background channel still flags it.
    pub fn append(&mut self, channel: &str, entry: ChannelEntry, foreground: bool) -> AppendOutcome {
        let mut outcome = AppendOutcome {
            new_channel: self.register(channel),
            ..AppendOutcome::default()
        };

        let watching = channel == self.selected && foreground;
        if !watching && !self.is_unread(channel) {
            self.unread.push(channel.to_string());
            outcome.newly_unread = true;
        }

        let entries = self.messages.entry(channel.to_string()).or_default();

        if let ChannelEntry::Message(incoming) = &entry {
            let duplicate = entries.iter().any(|existing| {
                existing
                    .as_message()
                    .is_some_and(|m| m.id() == incoming.id())
            });
            if duplicate {
                return outcome;
            }
        }

        entries.push_back(entry);
        while entries.len() > MAX_MESSAGES_PER_CHANNEL {
            entries.pop_front();
        }
        outcome.stored = true;
        outcome
    }

    /// Select a channel from user input (leading `#` optional).
    ///
    /// Returns `Ok(false)` when it was already selected.
    pub fn select_channel(&mut self, input: &str) -> Result<bool, CoreError> {
        let channel = normalize_channel_input(input).ok_or_else(|| CoreError::InvalidChannelName {
            name: input.to_string(),
        })?;

        if channel == self.selected {
            return Ok(false);
        }

        self.register(&channel);
        self.unread.retain(|c| c != &channel);
        self.selected = channel;
        Ok(true)
    }

    /// Drop every channel that holds no entries. The default channel always
    /// stays registered; selection falls back to it when the selected
    /// channel is dropped.
    pub fn clear_empty_channels(&mut self) -> Vec<String> {
        let empty: Vec<String> = self
            .channels
            .iter()
            .filter(|c| c.as_str() != DEFAULT_CHANNEL)
            .filter(|c| self.messages.get(c.as_str()).map_or(true, VecDeque::is_empty))
            .cloned()
            .collect();

        if !empty.is_empty() {
            self.channels.retain(|c| !empty.contains(c));
            self.unread.retain(|c| !empty.contains(c));
            for channel in &empty {
                self.messages.remove(channel);
            }
            if empty.contains(&self.selected) {
                self.selected = DEFAULT_CHANNEL.to_string();
            }
        }
        empty
    }

    /// Replace everything with cached state. Entries must already be in
    /// created_at order.
    pub fn restore(
        &mut self,
        channels: Vec<String>,
        unread: Vec<String>,
        selected: Option<String>,
        entries: Vec<ChannelEntry>,
    ) {
        *self = Self::new();
        for channel in channels {
            self.register(&channel);
        }
        for entry in entries {
            let channel = entry.channel().to_string();
            self.register(&channel);
            let sequence = self.messages.entry(channel).or_default();
            sequence.push_back(entry);
            while sequence.len() > MAX_MESSAGES_PER_CHANNEL {
                sequence.pop_front();
            }
        }
        for channel in unread {
            if self.channels.contains(&channel) && !self.is_unread(&channel) {
                self.unread.push(channel);
            }
        }
        if let Some(selected) = selected {
            self.register(&selected);
            self.selected = selected;
        }
    }

    fn register(&mut self, channel: &str) -> bool {
        if self.channels.iter().any(|c| c == channel) {
            return false;
        }
        self.channels.push(channel.to_string());
        true
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}
