use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Stderr logging filtered by `HASHCHAT_LOG` (default `info`), plus a debug
/// file layer when `HASHCHAT_LOG_FILE` is set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("HASHCHAT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let file_logging = std::env::var("HASHCHAT_LOG_FILE").ok();

    let registry = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter),
    );

    let Some(log_path) = file_logging else {
        registry.init();
        return;
    };

    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => {
            let file_layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);

            registry.with(file_layer).init();
            eprintln!("File logging enabled: {}", log_path);
        }
        Err(e) => {
            registry.init();
            tracing::warn!("Failed to open log file {}: {}", log_path, e);
        }
    }
}
