pub mod channel;
pub mod message;
pub mod preferences;
pub mod profile;

pub use channel::{is_valid_channel_name, normalize_channel_input};
pub use message::{unix_now, ChannelEntry, MessageEvent, Severity, SignedEvent, SystemEvent};
pub use preferences::{Preferences, PreferencesStorage};
pub use profile::ProfileInfo;
