pub mod db;
pub mod message_store;
pub mod profile_store;
pub mod state;

pub use db::CacheDb;
pub use message_store::{AppendOutcome, MessageStore};
pub use profile_store::ProfileRegistry;
pub use state::{ChatState, IngestOutcome, Mention, VerifyRequest};
