pub mod auth;
pub mod classifier;
pub mod log;
pub mod nip05;
pub mod reconnect;
pub mod subscriptions;
pub mod transport;

pub use classifier::{classify, Classified, IngestContext, RejectReason};
pub use log::{elapsed_ms, log_to_file, set_log_path};
pub use nip05::Nip05Verifier;
pub use reconnect::{CloseDecision, ConnectionState, ReconnectController};
pub use subscriptions::SubscriptionManager;
pub use transport::{NostrSdkTransport, RelayTransport, TransportEvent};
