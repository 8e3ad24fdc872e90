use std::collections::BTreeSet;

use anyhow::Result;

use crate::constants::kinds;
use crate::nostr::transport::RelayTransport;
use crate::tlog;

/// Owns the relay pool (through its transport) and the subscriptions on it.
pub struct SubscriptionManager<T: RelayTransport> {
    transport: T,
    metadata_relays: Vec<String>,
    active_relay: Option<String>,
    /// Authors of the metadata subscription currently open on this pool
    metadata_authors: Option<BTreeSet<String>>,
}

impl<T: RelayTransport> SubscriptionManager<T> {
    pub fn new(transport: T, metadata_relays: Vec<String>) -> Self {
        Self {
            transport,
            metadata_relays,
            active_relay: None,
            metadata_authors: None,
        }
    }

    pub fn active_relay(&self) -> Option<&str> {
        self.active_relay.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.active_relay.is_some()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Open a pool on `relay_url` and start the live chat subscription.
    ///
    /// Returns `Ok(false)` when there is nothing to do: no relay configured, or
    /// the pool is already on that relay.
    pub async fn connect(&mut self, relay_url: Option<&str>) -> Result<bool> {
        let Some(relay_url) = relay_url.filter(|u| !u.trim().is_empty()) else {
            tracing::debug!("connect skipped, no relay configured");
            return Ok(false);
        };
        if self.active_relay.as_deref() == Some(relay_url) {
            return Ok(false);
        }
        if self.active_relay.is_some() {
            self.teardown().await;
        }

        self.transport.open(relay_url).await?;
        self.active_relay = Some(relay_url.to_string());
        self.metadata_authors = None;

        if let Err(e) = self
            .transport
            .subscribe_live(relay_url, &[kinds::CHAT, kinds::GEO_CHAT])
            .await
        {
            self.teardown().await;
            return Err(e);
        }
        tlog!("CONN", "Subscribed to live chat on {}", relay_url);
        Ok(true)
    }

    /// Tear the pool down and open it again on the same relay.
    pub async fn reconnect(&mut self, relay_url: &str) -> Result<bool> {
        self.teardown().await;
        self.connect(Some(relay_url)).await
    }

    /// Issue the kind:0 subscription for `authors`.
    ///
    /// Skipped when the set is empty, there is no pool, or the same set is
    /// already subscribed on this pool.
    pub async fn refresh_metadata(&mut self, authors: BTreeSet<String>) -> Result<bool> {
        if authors.is_empty() {
            return Ok(false);
        }
        let Some(active) = self.active_relay.clone() else {
            return Ok(false);
        };
        if self.metadata_authors.as_ref() == Some(&authors) {
            return Ok(false);
        }

        let relays = self.metadata_relay_set(&active);
        let author_list: Vec<String> = authors.iter().cloned().collect();
        self.transport
            .subscribe_metadata(&relays, &author_list)
            .await?;
        tlog!(
            "META",
            "Metadata subscription for {} author(s) on {:?}",
            author_list.len(),
            relays
        );
        self.metadata_authors = Some(authors);
        Ok(true)
    }

    /// First metadata relay, then the active relay, then the rest.
    fn metadata_relay_set(&self, active: &str) -> Vec<String> {
        let mut relays: Vec<String> = Vec::with_capacity(self.metadata_relays.len() + 1);
        let mut push = |url: &str| {
            if !relays.iter().any(|r| r == url) {
                relays.push(url.to_string());
            }
        };
        let mut rest = self.metadata_relays.iter();
        if let Some(first) = rest.next() {
            push(first);
        }
        push(active);
        for url in rest {
            push(url);
        }
        relays
    }

    pub async fn teardown(&mut self) {
        self.transport.teardown().await;
        self.active_relay = None;
        self.metadata_authors = None;
    }
}
