//! Tagged, timestamped file log shared by the relay plumbing.
//!
//! Lines look like `[    1234ms] [CONN] Connect completed in 210ms`. The
//! process-wide log is created on first use; `set_log_path` only has an effect
//! before that.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;

use parking_lot::Mutex;

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static GLOBAL: OnceLock<FileLog> = OnceLock::new();

/// Append-only log file. The handle is opened lazily and dropped after a
/// failed write so the next line retries the open.
pub struct FileLog {
    path: PathBuf,
    started: Instant,
    file: Mutex<Option<File>>,
}

impl FileLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            started: Instant::now(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn write(&self, tag: &str, msg: &str) {
        let line = format_line(self.elapsed_ms(), tag, msg);
        tracing::trace!(target: "hashchat::tlog", "{}", line);

        let mut file = self.file.lock();
        if file.is_none() {
            *file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .ok();
        }
        let failed = match file.as_mut() {
            Some(f) => writeln!(f, "{}", line).is_err(),
            None => false,
        };
        if failed {
            *file = None;
        }
    }
}

fn format_line(ms: u64, tag: &str, msg: &str) -> String {
    format!("[{:>8}ms] [{}] {}", ms, tag, msg)
}

fn global() -> &'static FileLog {
    GLOBAL.get_or_init(|| {
        FileLog::new(
            LOG_PATH
                .get()
                .cloned()
                .unwrap_or_else(|| std::env::temp_dir().join("hashchat.log")),
        )
    })
}

/// Set the log file path. Must be called before any logging occurs.
pub fn set_log_path(path: PathBuf) {
    let _ = LOG_PATH.set(path);
}

pub fn elapsed_ms() -> u64 {
    global().elapsed_ms()
}

pub fn log_to_file(tag: &str, msg: &str) {
    global().write(tag, msg);
}

#[macro_export]
macro_rules! tlog {
    ($tag:expr, $($arg:tt)*) => {
        $crate::nostr::log::log_to_file($tag, &format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_line_format_pads_elapsed() {
        assert_eq!(format_line(42, "CONN", "up"), "[      42ms] [CONN] up");
    }

    #[test]
    fn test_lines_are_appended() {
        let dir = tempdir().unwrap();
        let log = FileLog::new(dir.path().join("relay.log"));
        log.write("CONN", "opening wss://relay.example.com");
        log.write("RECONNECT", "scheduled in 5s");

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[CONN] opening wss://relay.example.com"));
        assert!(lines[1].ends_with("[RECONNECT] scheduled in 5s"));
    }

    #[test]
    fn test_unwritable_path_is_silent() {
        let dir = tempdir().unwrap();
        let log = FileLog::new(dir.path().join("missing").join("relay.log"));
        log.write("CONN", "dropped");
        assert!(!log.path().exists());
    }
}
