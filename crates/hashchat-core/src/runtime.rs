//! The single event-handling loop.
//!
//! Relay traffic, user commands, NIP-05 results and the reconnect timer are all
//! consumed here, one at a time, so `ChatState` never sees concurrent writers.

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::CoreConfig;
use crate::events::{CoreCommand, CoreEvent};
use crate::models::ChannelEntry;
use crate::nostr::nip05::{Nip05Outcome, Nip05Verifier};
use crate::nostr::reconnect::{CloseDecision, ConnectionState, ReconnectController};
use crate::nostr::subscriptions::SubscriptionManager;
use crate::nostr::transport::{NostrSdkTransport, RelayTransport, TransportEvent};
use crate::nostr::set_log_path;
use crate::notifications::NotificationTrigger;
use crate::stats::SharedEventStats;
use crate::store::message_store::AppendOutcome;
use crate::store::state::{ChatState, IngestOutcome, VerifyRequest};
use crate::tlog;

pub struct CoreRuntime<T: RelayTransport> {
    state: ChatState,
    subscriptions: SubscriptionManager<T>,
    reconnect: ReconnectController,
    notifier: NotificationTrigger,
    verifier: Nip05Verifier,
    stats: SharedEventStats,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    command_rx: mpsc::UnboundedReceiver<CoreCommand>,
    events_tx: mpsc::UnboundedSender<CoreEvent>,
    verified_tx: mpsc::UnboundedSender<String>,
    verified_rx: mpsc::UnboundedReceiver<String>,
    reconnect_at: Option<Instant>,
}

impl CoreRuntime<NostrSdkTransport> {
    /// Runtime backed by a real nostr-sdk relay pool.
    pub fn with_nostr_sdk(
        config: CoreConfig,
        command_rx: mpsc::UnboundedReceiver<CoreCommand>,
        events_tx: mpsc::UnboundedSender<CoreEvent>,
        notifier: NotificationTrigger,
    ) -> Result<Self> {
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let transport = NostrSdkTransport::new(transport_tx);
        Self::new(config, transport, transport_rx, command_rx, events_tx, notifier)
    }
}

impl<T: RelayTransport> CoreRuntime<T> {
    pub fn new(
        config: CoreConfig,
        transport: T,
        transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
        command_rx: mpsc::UnboundedReceiver<CoreCommand>,
        events_tx: mpsc::UnboundedSender<CoreEvent>,
        notifier: NotificationTrigger,
    ) -> Result<Self> {
        set_log_path(config.log_path());
        let state = ChatState::open(&config)?;
        let (verified_tx, verified_rx) = mpsc::unbounded_channel();

        Ok(Self {
            state,
            subscriptions: SubscriptionManager::new(transport, config.metadata_relays.clone()),
            reconnect: ReconnectController::new(),
            notifier,
            verifier: Nip05Verifier::new(),
            stats: SharedEventStats::new(),
            transport_rx,
            command_rx,
            events_tx,
            verified_tx,
            verified_rx,
            reconnect_at: None,
        })
    }

    // ===== Query Methods =====

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn stats(&self) -> SharedEventStats {
        self.stats.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.reconnect.state()
    }

    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect_at
    }

    pub fn transport(&self) -> &T {
        self.subscriptions.transport()
    }

    fn emit(&self, event: CoreEvent) {
        let _ = self.events_tx.send(event);
    }

    fn emit_connection(&self) {
        self.emit(CoreEvent::ConnectionChanged {
            state: self.reconnect.state(),
            relay_url: self.reconnect.relay_url().map(str::to_string),
        });
    }

    // ===== Lifecycle =====

    /// Load the cache and join the configured relay.
    pub async fn start(&mut self) -> Result<()> {
        if let Err(e) = self.state.load_cache() {
            tlog!("ERROR", "Failed to load cache: {}", e);
        }
        self.connect().await;
        Ok(())
    }

    pub async fn connect(&mut self) {
        let Some(relay_url) = self.state.relay_url().map(str::to_string) else {
            tracing::info!("No relay configured, staying offline");
            self.emit_connection();
            return;
        };

        self.reconnect.on_connecting(&relay_url);
        self.emit_connection();
        match self.subscriptions.connect(Some(&relay_url)).await {
            Ok(_) => {
                self.reconnect.on_connected();
                self.emit_connection();
                self.refresh_metadata().await;
            }
            Err(e) => {
                let decision = self.reconnect.on_connect_failed(&e.to_string());
                self.apply_close_decision(decision);
            }
        }
    }

    /// Consume events until `Shutdown` arrives. Call `start` first.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let deadline = self.reconnect_at;
            tokio::select! {
                biased;

                Some(event) = self.transport_rx.recv() => {
                    self.handle_transport_event(event).await;
                }
                Some(pubkey) = self.verified_rx.recv() => {
                    self.handle_verified(&pubkey);
                }
                _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                    self.fire_reconnect_timer().await;
                }
                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => {
                            if !self.handle_command(command).await {
                                break;
                            }
                        }
                        None => {
                            tlog!("CONN", "Command channel closed, shutting down");
                            self.shutdown().await;
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub async fn shutdown(&mut self) {
        self.reconnect.on_intentional_close();
        self.reconnect_at = None;
        self.subscriptions.teardown().await;
        self.state.save_cache();
        self.emit_connection();
    }

    // ===== Relay Events =====

    pub async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Event {
                relay_url,
                subscription_id,
                event,
            } => {
                tracing::trace!("event {} via {} ({})", event.id, relay_url, subscription_id);
                let outcome = self.state.ingest(event, &relay_url);
                self.stats.record(outcome.kind, outcome.accepted);
                self.apply_ingest(outcome).await;
            }
            TransportEvent::Closed { relay_url, reasons } => {
                if self.subscriptions.active_relay() != Some(relay_url.as_str()) {
                    tracing::debug!("Ignoring close from inactive relay {}", relay_url);
                    return;
                }
                let decision = self.reconnect.on_closed(&reasons);
                self.apply_close_decision(decision);
            }
        }
    }

    async fn apply_ingest(&mut self, outcome: IngestOutcome) {
        if let Some(channel) = &outcome.channel {
            self.apply_append(channel, outcome.append);
        }
        if let Some(mention) = outcome.mention {
            self.notifier.notify(&mention.title, &mention.body);
            self.emit(CoreEvent::Mention {
                channel: mention.channel,
                title: mention.title,
                body: mention.body,
            });
        }
        if let Some(pubkey) = outcome.profile_updated {
            self.emit_profile(&pubkey);
        }
        if let Some(request) = outcome.verify {
            self.spawn_verification(request);
        }
        if outcome.refresh_metadata {
            self.refresh_metadata().await;
        }
    }

    fn apply_append(&mut self, channel: &str, append: AppendOutcome) {
        if append.new_channel {
            self.emit(CoreEvent::NewChannel(channel.to_string()));
        }
        if append.newly_unread {
            self.notifier
                .notify_with_sound(self.state.notification_sound());
            self.emit(CoreEvent::ChannelUnread(channel.to_string()));
        }
        if !append.stored {
            return;
        }
        let last = self
            .state
            .messages()
            .entries(channel)
            .and_then(|entries| entries.back());
        if let Some(entry) = last {
            let event = CoreEvent::MessageAppended {
                channel: channel.to_string(),
                id: entry.id().to_string(),
                author: match entry {
                    ChannelEntry::Message(m) => Some(self.state.sender_label(m.pubkey())),
                    ChannelEntry::System(_) => None,
                },
                content: entry.content().to_string(),
            };
            self.emit(event);
        }
    }

    fn emit_profile(&self, pubkey: &str) {
        if let Some(profile) = self.state.profiles().get(pubkey) {
            self.emit(CoreEvent::ProfileUpdated {
                pubkey: profile.pubkey.clone(),
                name: profile.name.clone(),
                verified: profile.verified,
            });
        }
    }

    async fn refresh_metadata(&mut self) {
        let authors = self.state.metadata_authors();
        if let Err(e) = self.subscriptions.refresh_metadata(authors).await {
            tlog!("ERROR", "Metadata subscription failed: {}", e);
        }
    }

    // ===== Reconnection =====

    fn apply_close_decision(&mut self, decision: CloseDecision) {
        match decision {
            CloseDecision::Terminate => {
                self.reconnect_at = None;
                self.emit_connection();
            }
            CloseDecision::Schedule(delay) => {
                self.reconnect_at = Some(Instant::now() + delay);
                self.emit_connection();
            }
            CloseDecision::Ignore => {}
        }
    }

    /// The reconnect delay elapsed: drop the old pool and connect again.
    pub async fn fire_reconnect_timer(&mut self) {
        self.reconnect_at = None;
        let Some(relay_url) = self.reconnect.on_timer_fired() else {
            return;
        };
        self.stats.record_reconnect();
        self.emit_connection();

        match self.subscriptions.reconnect(&relay_url).await {
            Ok(_) => {
                self.reconnect.on_connected();
                self.emit_connection();
                self.refresh_metadata().await;
            }
            Err(e) => {
                let decision = self.reconnect.on_connect_failed(&e.to_string());
                self.apply_close_decision(decision);
            }
        }
    }

    // ===== Verification =====

    fn spawn_verification(&self, request: VerifyRequest) {
        let verifier = self.verifier.clone();
        let verified_tx = self.verified_tx.clone();
        tokio::spawn(async move {
            match verifier.verify(&request.nip05, &request.pubkey).await {
                Ok(Nip05Outcome::Verified) => {
                    let _ = verified_tx.send(request.pubkey);
                }
                Ok(outcome) => {
                    tracing::debug!("NIP-05 {} for {}: {:?}", request.nip05, request.pubkey, outcome);
                }
                Err(e) => {
                    tlog!("ERROR", "Error verifying NIP-05 {}: {}", request.nip05, e);
                }
            }
        });
    }

    fn handle_verified(&mut self, pubkey: &str) {
        if self.state.mark_verified(pubkey) {
            self.emit_profile(pubkey);
        }
    }

    // ===== Commands =====

    /// Returns false once the runtime should stop.
    pub async fn handle_command(&mut self, command: CoreCommand) -> bool {
        match command {
            CoreCommand::SelectChannel { name, response_tx } => {
                let result = self.state.select_channel(&name);
                match &result {
                    Ok(true) => {
                        self.emit(CoreEvent::ChannelSelected(
                            self.state.messages().selected().to_string(),
                        ))
                    }
                    Ok(false) => {}
                    Err(e) if response_tx.is_none() => self.emit(CoreEvent::Error(e.to_string())),
                    Err(_) => {}
                }
                if let Some(tx) = response_tx {
                    let _ = tx.send(result);
                }
            }
            CoreCommand::SetForeground(foreground) => self.state.set_foreground(foreground),
            CoreCommand::SetNotificationSound(enabled) => {
                self.state.set_notification_sound(enabled)
            }
            CoreCommand::Login {
                signer,
                response_tx,
            } => {
                let result = self.state.login(signer.as_deref()).await;
                match &result {
                    Ok(pubkey) => {
                        self.emit(CoreEvent::LoggedIn(pubkey.clone()));
                        self.refresh_metadata().await;
                    }
                    Err(e) if response_tx.is_none() => self.emit(CoreEvent::Error(e.to_string())),
                    Err(_) => {}
                }
                if let Some(tx) = response_tx {
                    let _ = tx.send(result);
                }
            }
            CoreCommand::PostSystem {
                channel,
                severity,
                content,
            } => {
                let append = self.state.post_system(&channel, severity, &content);
                self.apply_append(&channel, append);
            }
            CoreCommand::ClearEmptyChannels { response_tx } => {
                let selected = self.state.messages().selected().to_string();
                let removed = self.state.clear_empty_channels();
                if !removed.is_empty() {
                    self.emit(CoreEvent::ChannelsRemoved(removed.clone()));
                }
                if self.state.messages().selected() != selected {
                    self.emit(CoreEvent::ChannelSelected(
                        self.state.messages().selected().to_string(),
                    ));
                }
                if let Some(tx) = response_tx {
                    let _ = tx.send(removed);
                }
            }
            CoreCommand::SaveCache => self.state.save_cache(),
            CoreCommand::Verify { pubkey, nip05 } => {
                self.spawn_verification(VerifyRequest { pubkey, nip05 })
            }
            CoreCommand::Shutdown => {
                self.shutdown().await;
                return false;
            }
        }
        true
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
