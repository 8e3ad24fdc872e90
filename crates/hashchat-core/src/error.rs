use thiserror::Error;

/// Failures reported back to whoever initiated an operation.
///
/// The relay ingestion path never produces these; it drops bad input and logs.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid channel name '{name}'. No special characters. And 12 characters max.")]
    InvalidChannelName { name: String },

    #[error("No signer available")]
    NoSigner,

    #[error("Signer failed: {0}")]
    Signer(String),

    #[error("No relay configured")]
    NoRelay,
}
