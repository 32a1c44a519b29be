//! Memory of notifications already dispatched.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identity of one reminder obligation: an event at a given lead time.
///
/// Built from the raw label and start text, so an edit to either in the
/// source creates a fresh obligation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationKey {
    pub label: String,
    pub start: String,
    pub threshold: u32,
}

impl NotificationKey {
    pub fn new(label: &str, start: &str, threshold: u32) -> Self {
        Self {
            label: label.to_string(),
            start: start.to_string(),
            threshold,
        }
    }
}

impl fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.label, self.start, self.threshold)
    }
}

/// Dispatch instants keyed by [`NotificationKey`], bounded by a retention
/// window.
#[derive(Debug, Clone)]
pub struct SentCache {
    entries: HashMap<NotificationKey, DateTime<Utc>>,
    retention: Duration,
}

impl SentCache {
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            retention,
        }
    }

    /// Drop entries dispatched more than the retention window before `now`.
    /// Returns how many were removed.
    pub fn purge(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let retention = self.retention;
        self.entries.retain(|_, sent_at| now - *sent_at <= retention);
        before - self.entries.len()
    }

    pub fn contains(&self, key: &NotificationKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: NotificationKey, sent_at: DateTime<Utc>) {
        self.entries.insert(key, sent_at);
    }

    pub fn sent_at(&self, key: &NotificationKey) -> Option<DateTime<Utc>> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-12-24T15:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_key_display() {
        let key = NotificationKey::new("Board Meeting", "25/12/2024 10:00", 24);
        assert_eq!(key.to_string(), "Board Meeting-25/12/2024 10:00-24");
    }

    #[test]
    fn test_keys_differ_by_threshold() {
        let a = NotificationKey::new("Standup", "01/01/2025 09:00", 24);
        let b = NotificationKey::new("Standup", "01/01/2025 09:00", 1);
        assert_ne!(a, b);

        let mut cache = SentCache::new(Duration::hours(24));
        cache.insert(a.clone(), t0());
        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
    }

    #[test]
    fn test_eviction_after_retention() {
        let key = NotificationKey::new("Standup", "01/01/2025 09:00", 48);

        let mut cache = SentCache::new(Duration::hours(24));
        cache.insert(key.clone(), t0());
        assert_eq!(cache.purge(t0() + Duration::hours(23)), 0);
        assert!(cache.contains(&key));
        assert_eq!(cache.sent_at(&key), Some(t0()));

        assert_eq!(cache.purge(t0() + Duration::hours(25)), 1);
        assert!(!cache.contains(&key));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entry_at_exact_retention_is_kept() {
        let key = NotificationKey::new("Standup", "01/01/2025 09:00", 1);
        let mut cache = SentCache::new(Duration::hours(24));
        cache.insert(key.clone(), t0());
        cache.purge(t0() + Duration::hours(24));
        assert_eq!(cache.len(), 1);
    }
}
