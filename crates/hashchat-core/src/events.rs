//! Messages between the runtime and whoever drives it.

use std::sync::Arc;

use nostr_sdk::prelude::NostrSigner;
use tokio::sync::oneshot;

use crate::error::CoreError;
use crate::models::Severity;
use crate::nostr::reconnect::ConnectionState;

/// Requests into the runtime.
pub enum CoreCommand {
    SelectChannel {
        name: String,
        response_tx: Option<oneshot::Sender<Result<bool, CoreError>>>,
    },
    SetForeground(bool),
    SetNotificationSound(bool),
    /// `None` reports `NoSigner`
    Login {
        signer: Option<Arc<dyn NostrSigner>>,
        response_tx: Option<oneshot::Sender<Result<String, CoreError>>>,
    },
    PostSystem {
        channel: String,
        severity: Severity,
        content: String,
    },
    ClearEmptyChannels {
        response_tx: Option<oneshot::Sender<Vec<String>>>,
    },
    SaveCache,
    /// Look up a NIP-05 identifier for `pubkey`
    Verify { pubkey: String, nip05: String },
    Shutdown,
}

/// What changed, for the presentation side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    MessageAppended {
        channel: String,
        id: String,
        author: Option<String>,
        content: String,
    },
    NewChannel(String),
    ChannelUnread(String),
    ChannelSelected(String),
    ChannelsRemoved(Vec<String>),
    Mention {
        channel: String,
        title: String,
        body: String,
    },
    ProfileUpdated {
        pubkey: String,
        name: Option<String>,
        verified: bool,
    },
    ConnectionChanged {
        state: ConnectionState,
        relay_url: Option<String>,
    },
    LoggedIn(String),
    Error(String),
}
