pub mod commands;
pub mod config;
pub mod notifier;
pub mod tracing_setup;
pub mod view;

pub use commands::{parse_line, LineCommand};
pub use config::{CliConfig, Credentials};
pub use notifier::TerminalNotifier;
pub use view::ChannelView;
