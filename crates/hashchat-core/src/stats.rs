use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Per-kind counts of what arrived from the relays
#[derive(Debug, Default, Clone)]
pub struct EventStats {
    /// kind -> events received
    pub received_by_kind: HashMap<u16, u64>,
    /// kind -> events that were stored or merged
    pub accepted_by_kind: HashMap<u16, u64>,
    /// kind -> events dropped as malformed
    pub rejected_by_kind: HashMap<u16, u64>,
    /// Total events received
    pub total: u64,
    pub reconnects: u64,
}

impl EventStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: u16, accepted: bool) {
        self.total += 1;
        *self.received_by_kind.entry(kind).or_insert(0) += 1;
        let bucket = if accepted {
            &mut self.accepted_by_kind
        } else {
            &mut self.rejected_by_kind
        };
        *bucket.entry(kind).or_insert(0) += 1;
    }

    /// Get list of kinds sorted by received count (descending)
    pub fn kinds_by_count(&self) -> Vec<(u16, u64)> {
        let mut kinds: Vec<_> = self
            .received_by_kind
            .iter()
            .map(|(&k, &c)| (k, c))
            .collect();
        kinds.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        kinds
    }

    pub fn summary(&self) -> String {
        let per_kind: Vec<String> = self
            .kinds_by_count()
            .into_iter()
            .map(|(kind, count)| {
                let accepted = self.accepted_by_kind.get(&kind).copied().unwrap_or(0);
                format!("kind {}: {} ({} kept)", kind, count, accepted)
            })
            .collect();
        format!(
            "{} events, {} reconnects{}{}",
            self.total,
            self.reconnects,
            if per_kind.is_empty() { "" } else { "; " },
            per_kind.join(", ")
        )
    }
}

/// Thread-safe wrapper for event stats
#[derive(Debug, Clone)]
pub struct SharedEventStats {
    inner: Arc<RwLock<EventStats>>,
}

impl Default for SharedEventStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedEventStats {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(EventStats::new())),
        }
    }

    pub fn record(&self, kind: u16, accepted: bool) {
        if let Ok(mut stats) = self.inner.write() {
            stats.record(kind, accepted);
        }
    }

    pub fn record_reconnect(&self) {
        if let Ok(mut stats) = self.inner.write() {
            stats.reconnects += 1;
        }
    }

    pub fn snapshot(&self) -> EventStats {
        self.inner.read().map(|s| s.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_splits_accepted_and_rejected() {
        let stats = SharedEventStats::new();
        stats.record(23333, true);
        stats.record(23333, false);
        stats.record(20000, true);
        stats.record_reconnect();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.received_by_kind[&23333], 2);
        assert_eq!(snapshot.rejected_by_kind[&23333], 1);
        assert_eq!(snapshot.kinds_by_count(), vec![(23333, 2), (20000, 1)]);
        assert_eq!(
            snapshot.summary(),
            "3 events, 1 reconnects; kind 23333: 2 (1 kept), kind 20000: 1 (1 kept)"
        );
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(EventStats::new().summary(), "0 events, 0 reconnects");
    }
}
