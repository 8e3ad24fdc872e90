//! SQLite cache of timelines, profiles and per-relay channel lists.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{ChannelEntry, ProfileInfo};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    relay_url TEXT NOT NULL,
    channel TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    entry TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_relay_channel ON messages(relay_url, channel);
CREATE TABLE IF NOT EXISTS profiles (
    pubkey TEXT PRIMARY KEY,
    profile TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS channels (
    relay_url TEXT PRIMARY KEY,
    channels TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS unread_channels (
    relay_url TEXT PRIMARY KEY,
    channels TEXT NOT NULL
);
"#;

#[derive(Clone)]
pub struct CacheDb {
    conn: Arc<Mutex<Connection>>,
}

impl CacheDb {
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;

        let path = data_dir.join("cache.db");
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create cache schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ===== Writes =====

    /// Upsert every entry in one transaction. Entries keep their own channel.
    pub fn bulk_put_messages<'a, I>(&self, relay_url: &str, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a ChannelEntry>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO messages (id, relay_url, channel, created_at, entry)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for entry in entries {
                let json = serde_json::to_string(entry)?;
                stmt.execute(params![
                    entry.id(),
                    relay_url,
                    entry.channel(),
                    entry.created_at() as i64,
                    json
                ])?;
                written += 1;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    pub fn put_profiles<'a, I>(&self, profiles: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a ProfileInfo>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt =
                tx.prepare("INSERT OR REPLACE INTO profiles (pubkey, profile) VALUES (?1, ?2)")?;
            for profile in profiles {
                stmt.execute(params![profile.pubkey, serde_json::to_string(profile)?])?;
                written += 1;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    pub fn put_channels(&self, relay_url: &str, channels: &[String]) -> Result<()> {
        self.put_channel_list("channels", relay_url, channels)
    }

    pub fn put_unread_channels(&self, relay_url: &str, channels: &[String]) -> Result<()> {
        self.put_channel_list("unread_channels", relay_url, channels)
    }

    fn put_channel_list(&self, table: &str, relay_url: &str, channels: &[String]) -> Result<()> {
        let json = serde_json::to_string(channels)?;
        self.conn.lock().execute(
            &format!("INSERT OR REPLACE INTO {table} (relay_url, channels) VALUES (?1, ?2)"),
            params![relay_url, json],
        )?;
        Ok(())
    }

    // ===== Query Methods =====

    /// Every cached entry for a relay, oldest first. Rows that no longer
    /// deserialize are skipped.
    pub fn messages_for_relay(&self, relay_url: &str) -> Result<Vec<ChannelEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT entry FROM messages WHERE relay_url = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![relay_url], |row| row.get::<_, String>(0))?;

        let mut entries = Vec::new();
        for row in rows {
            match serde_json::from_str::<ChannelEntry>(&row?) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping unreadable cached message: {}", e),
            }
        }
        Ok(entries)
    }

    pub fn all_profiles(&self) -> Result<Vec<ProfileInfo>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT profile FROM profiles")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut profiles = Vec::new();
        for row in rows {
            match serde_json::from_str::<ProfileInfo>(&row?) {
                Ok(profile) => profiles.push(profile),
                Err(e) => tracing::warn!("Skipping unreadable cached profile: {}", e),
            }
        }
        Ok(profiles)
    }

    pub fn channels_for_relay(&self, relay_url: &str) -> Result<Option<Vec<String>>> {
        self.channel_list("channels", relay_url)
    }

    pub fn unread_for_relay(&self, relay_url: &str) -> Result<Option<Vec<String>>> {
        self.channel_list("unread_channels", relay_url)
    }

    fn channel_list(&self, table: &str, relay_url: &str) -> Result<Option<Vec<String>>> {
        let json: Option<String> = self
            .conn
            .lock()
            .query_row(
                &format!("SELECT channels FROM {table} WHERE relay_url = ?1"),
                params![relay_url],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| serde_json::from_str(&j).context("Corrupt channel list"))
            .transpose()
    }

    pub fn message_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Delete everything in every table.
    pub fn wipe(&self) -> Result<()> {
        self.conn.lock().execute_batch(
            "DELETE FROM messages; DELETE FROM profiles; DELETE FROM channels; DELETE FROM unread_channels;",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Severity, SystemEvent};
    use tempfile::tempdir;

    const RELAY: &str = "wss://relay.example.com";

    fn system(channel: &str, content: &str, created_at: u64) -> ChannelEntry {
        let mut event = SystemEvent::new(channel, Severity::Info, content);
        event.created_at = created_at;
        ChannelEntry::System(event)
    }

    #[test]
    fn test_database_creation() {
        let dir = tempdir().unwrap();
        let db = CacheDb::open(dir.path()).unwrap();
        assert!(dir.path().join("cache.db").exists());
        assert_eq!(db.message_count().unwrap(), 0);
        assert!(db.channels_for_relay(RELAY).unwrap().is_none());
    }

    #[test]
    fn test_messages_scoped_by_relay_and_ordered() {
        let db = CacheDb::in_memory().unwrap();
        let late = system("#_", "late", 20);
        let early = system("#news", "early", 10);
        db.bulk_put_messages(RELAY, [&late, &early]).unwrap();
        db.bulk_put_messages("wss://other.example.com", [&system("#_", "elsewhere", 5)])
            .unwrap();

        let entries = db.messages_for_relay(RELAY).unwrap();
        let contents: Vec<&str> = entries.iter().map(|e| e.content()).collect();
        assert_eq!(contents, vec!["early", "late"]);
        assert_eq!(entries[0].channel(), "#news");

        // re-putting the same ids replaces rather than duplicates
        db.bulk_put_messages(RELAY, [&late, &early]).unwrap();
        assert_eq!(db.message_count().unwrap(), 3);
    }

    #[test]
    fn test_profiles_and_channel_lists() {
        let db = CacheDb::in_memory().unwrap();
        let mut profile = ProfileInfo::new("aa");
        profile.name = Some("alice".to_string());
        profile.verified = true;
        db.put_profiles([&profile]).unwrap();
        assert_eq!(db.all_profiles().unwrap(), vec![profile]);

        let channels = vec!["#_".to_string(), "#news".to_string()];
        db.put_channels(RELAY, &channels).unwrap();
        db.put_unread_channels(RELAY, &channels[1..]).unwrap();
        assert_eq!(db.channels_for_relay(RELAY).unwrap(), Some(channels.clone()));
        assert_eq!(
            db.unread_for_relay(RELAY).unwrap(),
            Some(vec!["#news".to_string()])
        );

        db.wipe().unwrap();
        assert!(db.all_profiles().unwrap().is_empty());
        assert!(db.channels_for_relay(RELAY).unwrap().is_none());
        assert!(db.unread_for_relay(RELAY).unwrap().is_none());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempdir().unwrap();
        {
            let db = CacheDb::open(dir.path()).unwrap();
            db.put_channels(RELAY, &["#_".to_string()]).unwrap();
        }
        let db = CacheDb::open(dir.path()).unwrap();
        assert_eq!(
            db.channels_for_relay(RELAY).unwrap(),
            Some(vec!["#_".to_string()])
        );
    }
}
