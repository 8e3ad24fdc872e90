//! Relay connection pool behind a small trait.
//!
//! `NostrSdkTransport` drives a real `nostr_sdk::Client`; everything it hears is
//! funneled into one `TransportEvent` channel so the runtime can mutate state
//! from a single task.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use nostr_sdk::prelude::*;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, watch};

use crate::constants::{CLOSED_BY_US, METADATA_SUBSCRIPTION_ID};
use crate::models::SignedEvent;
use crate::tlog;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Event {
        relay_url: String,
        subscription_id: String,
        event: SignedEvent,
    },
    Closed {
        relay_url: String,
        reasons: Vec<String>,
    },
}

pub trait RelayTransport {
    /// Open a fresh pool against `relay_url`.
    fn open(&mut self, relay_url: &str) -> impl Future<Output = Result<()>> + Send;

    /// Live-only subscription (`limit: 0`) for `kinds` on `relay_url`.
    fn subscribe_live(
        &mut self,
        relay_url: &str,
        kinds: &[u16],
    ) -> impl Future<Output = Result<()>> + Send;

    /// kind:0 subscription for `authors` on `relays`, always under the same
    /// subscription id so a re-issue replaces the previous one.
    fn subscribe_metadata(
        &mut self,
        relays: &[String],
        authors: &[String],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Drop the pool. Handlers stop before the sockets close, so a teardown
    /// never reports itself as a disconnect.
    fn teardown(&mut self) -> impl Future<Output = ()> + Send;
}

fn same_relay(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

pub struct NostrSdkTransport {
    client: Option<Client>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    cancel_tx: Option<watch::Sender<bool>>,
}

impl NostrSdkTransport {
    pub fn new(events_tx: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            client: None,
            events_tx,
            cancel_tx: None,
        }
    }

    fn client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No client"))
    }

    fn spawn_notification_handler(&self, client: Client, relay_url: String) {
        let events_tx = self.events_tx.clone();
        let mut cancel_rx = match self.cancel_tx.as_ref() {
            Some(tx) => tx.subscribe(),
            None => return,
        };

        tokio::spawn(async move {
            let mut notifications = client.notifications();
            let mut status_poll = tokio::time::interval(STATUS_POLL_INTERVAL);
            let mut was_connected = false;
            tlog!("CONN", "Notification handler started for {}", relay_url);

            loop {
                tokio::select! {
                    biased;

                    _ = cancel_rx.changed() => {
                        if *cancel_rx.borrow() {
                            tlog!("CONN", "Notification handler received cancellation signal, exiting");
                            break;
                        }
                    }
                    result = notifications.recv() => {
                        match result {
                            Ok(RelayPoolNotification::Event { relay_url: from, subscription_id, event }) => {
                                let _ = events_tx.send(TransportEvent::Event {
                                    relay_url: from.to_string(),
                                    subscription_id: subscription_id.to_string(),
                                    event: SignedEvent::from_nostr(&event),
                                });
                            }
                            Ok(RelayPoolNotification::Message { relay_url: from, message }) => {
                                if let RelayMessage::Closed { subscription_id, message } = &message {
                                    let subscription_id = subscription_id.to_string();
                                    tlog!("CONN", "CLOSED from {} sub={} reason={}", from, subscription_id, message);
                                    if subscription_id != METADATA_SUBSCRIPTION_ID
                                        && same_relay(from.as_str(), &relay_url)
                                    {
                                        let _ = events_tx.send(TransportEvent::Closed {
                                            relay_url: relay_url.clone(),
                                            reasons: vec![message.to_string()],
                                        });
                                    }
                                }
                            }
                            Ok(RelayPoolNotification::Shutdown) => {
                                tlog!("CONN", "Relay pool shut down");
                                let _ = events_tx.send(TransportEvent::Closed {
                                    relay_url: relay_url.clone(),
                                    reasons: vec![CLOSED_BY_US.to_string()],
                                });
                                break;
                            }
                            Err(RecvError::Lagged(skipped)) => {
                                tlog!("ERROR", "Notification handler lagged, skipped {} notifications", skipped);
                            }
                            Err(RecvError::Closed) => {
                                tlog!("CONN", "Notification channel closed, handler exiting");
                                let _ = events_tx.send(TransportEvent::Closed {
                                    relay_url: relay_url.clone(),
                                    reasons: vec!["notification channel closed".to_string()],
                                });
                                break;
                            }
                        }
                    }
                    _ = status_poll.tick() => {
                        let relays = client.relays().await;
                        let status = relays
                            .iter()
                            .find(|(url, _)| same_relay(url.as_str(), &relay_url))
                            .map(|(_, relay)| relay.status());
                        match status {
                            Some(RelayStatus::Connected) => was_connected = true,
                            Some(status @ (RelayStatus::Disconnected | RelayStatus::Terminated)) if was_connected => {
                                was_connected = false;
                                tlog!("CONN", "Relay {} went {:?}", relay_url, status);
                                let _ = events_tx.send(TransportEvent::Closed {
                                    relay_url: relay_url.clone(),
                                    reasons: vec![format!("relay status: {:?}", status)],
                                });
                            }
                            _ => {}
                        }
                    }
                }
            }
            tlog!("CONN", "Notification handler stopped");
        });
    }
}

impl RelayTransport for NostrSdkTransport {
    async fn open(&mut self, relay_url: &str) -> Result<()> {
        self.teardown().await;

        let client = Client::default();
        client.add_relay(relay_url).await?;

        tlog!("CONN", "Starting relay connect to {}...", relay_url);
        let connect_start = std::time::Instant::now();
        if tokio::time::timeout(CONNECT_TIMEOUT, client.connect())
            .await
            .is_err()
        {
            tlog!("CONN", "Connect TIMED OUT after {:?}", connect_start.elapsed());
            return Err(anyhow::anyhow!(
                "Connection timed out after {:?}",
                connect_start.elapsed()
            ));
        }
        tlog!("CONN", "Connect completed in {:?}", connect_start.elapsed());

        let (cancel_tx, _cancel_rx) = watch::channel(false);
        self.cancel_tx = Some(cancel_tx);
        self.spawn_notification_handler(client.clone(), relay_url.to_string());
        self.client = Some(client);
        Ok(())
    }

    async fn subscribe_live(&mut self, relay_url: &str, kinds: &[u16]) -> Result<()> {
        let client = self.client()?;
        let filter = Filter::new()
            .kinds(kinds.iter().copied().map(Kind::from))
            .limit(0);
        let output = client.subscribe_to([relay_url], filter, None).await?;
        tlog!("CONN", "Live subscription {} on {} kinds={:?}", output.val, relay_url, kinds);
        Ok(())
    }

    async fn subscribe_metadata(&mut self, relays: &[String], authors: &[String]) -> Result<()> {
        let client = self.client()?;
        let authors: Vec<PublicKey> = authors
            .iter()
            .filter_map(|a| PublicKey::from_hex(a).ok())
            .collect();
        if authors.is_empty() {
            return Ok(());
        }

        for url in relays {
            client.add_relay(url.as_str()).await?;
        }
        client.connect().await;

        let filter = Filter::new().kind(Kind::Metadata).authors(authors);
        client
            .subscribe_with_id_to(
                relays.iter().map(String::as_str),
                SubscriptionId::new(METADATA_SUBSCRIPTION_ID),
                filter,
                None,
            )
            .await?;
        Ok(())
    }

    async fn teardown(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(true);
            tlog!("CONN", "Sent cancellation signal to notification handler");
        }
        if let Some(client) = self.client.take() {
            client.disconnect().await;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory pool that records what was asked of it.

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Open(String),
        Live(String, Vec<u16>),
        Metadata(Vec<String>, Vec<String>),
        Teardown,
    }

    #[derive(Default)]
    pub struct RecordingTransport {
        pub calls: Vec<Call>,
        pub fail_open: bool,
    }

    impl RecordingTransport {
        pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| pred(c)).count()
        }
    }

    impl RelayTransport for RecordingTransport {
        async fn open(&mut self, relay_url: &str) -> Result<()> {
            self.calls.push(Call::Open(relay_url.to_string()));
            if self.fail_open {
                anyhow::bail!("connection refused");
            }
            Ok(())
        }

        async fn subscribe_live(&mut self, relay_url: &str, kinds: &[u16]) -> Result<()> {
            self.calls
                .push(Call::Live(relay_url.to_string(), kinds.to_vec()));
            Ok(())
        }

        async fn subscribe_metadata(&mut self, relays: &[String], authors: &[String]) -> Result<()> {
            self.calls
                .push(Call::Metadata(relays.to_vec(), authors.to_vec()));
            Ok(())
        }

        async fn teardown(&mut self) {
            self.calls.push(Call::Teardown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_relay_ignores_trailing_slash() {
        assert!(same_relay("wss://relay.example.com/", "wss://relay.example.com"));
        assert!(!same_relay("wss://a.example.com", "wss://b.example.com"));
    }

    #[tokio::test]
    async fn test_sdk_transport_requires_open_before_subscribing() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut transport = NostrSdkTransport::new(tx);
        let err = transport
            .subscribe_live("wss://relay.example.com", &[23333])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No client"));
        // teardown without a pool is harmless
        transport.teardown().await;
    }
}
