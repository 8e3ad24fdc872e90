//! Application-wide constants
//!
//! Relay endpoints, event kinds and limits shared by the ingestion path.

/// Relay that indexes profile metadata for most of the network
pub const METADATA_RELAY_URL: &str = "wss://purplepag.es";

/// Additional well-known relay queried for profile metadata
pub const FALLBACK_METADATA_RELAY_URL: &str = "wss://relay.primal.net";

/// Channel every registry starts with
pub const DEFAULT_CHANNEL: &str = "#_";

/// Prefix for channels derived from geohash-tagged messages
pub const SECONDARY_CHANNEL_PREFIX: &str = "#bc_";

/// Hard cap on entries kept per channel; oldest are evicted first
pub const MAX_MESSAGES_PER_CHANNEL: usize = 500;

/// Fixed delay before re-opening a relay connection that dropped
pub const RECONNECT_DELAY_SECS: u64 = 5;

/// Close reason reported when this client shut the connection down itself
pub const CLOSED_BY_US: &str = "relay connection closed by us";

/// Subscription id reused for every metadata request so relays replace it
pub const METADATA_SUBSCRIPTION_ID: &str = "metadata";

/// Preference/cache schema tag. A mismatch wipes both stores.
pub const SCHEMA_VERSION: &str = "4";

/// NIP-05 domains that cannot be looked up from this client
pub const NIP05_SKIP_DOMAINS: &[&str] = &["bitcoinbarks.com"];

/// Icon shown alongside desktop notifications
pub const NOTIFICATION_ICON: &str = "favicon-32x32.png";

pub mod kinds {
    /// Profile metadata (NIP-01 kind:0)
    pub const METADATA: u16 = 0;
    /// Channel chat message, channel in the `d` tag
    pub const CHAT: u16 = 23333;
    /// Geohash chat message, channel in `g`, nickname in `n`
    pub const GEO_CHAT: u16 = 20000;
}
