pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod models;
pub mod nostr;
pub mod notifications;
pub mod runtime;
pub mod stats;
pub mod store;

pub use config::CoreConfig;
pub use error::CoreError;
pub use events::{CoreCommand, CoreEvent};
pub use runtime::CoreRuntime;
