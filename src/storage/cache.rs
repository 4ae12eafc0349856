//! Per-user latest-trip-end cache.
//!
//! The time-feasibility check needs "when did this user's last trip end"
//! on every submission; caching the derived value avoids a full store
//! query each time. Entries carry a short TTL and are invalidated
//! whenever the user submits a new trip.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

struct CacheEntry {
    /// `None` means "user has no trips" - a cacheable fact in itself.
    end_time: Option<DateTime<Utc>>,
    cached_at: Instant,
}

pub struct EndTimeCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl EndTimeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Cached end time for a user. Outer `None` = miss or expired; inner
    /// `None` = the user is known to have no trips.
    pub fn get(&self, user_id: &str) -> Option<Option<DateTime<Utc>>> {
        let entries = self.entries.read();
        let entry = entries.get(user_id)?;
        if entry.cached_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.end_time)
    }

    pub fn put(&self, user_id: &str, end_time: Option<DateTime<Utc>>) {
        self.entries.write().insert(
            user_id.to_string(),
            CacheEntry {
                end_time,
                cached_at: Instant::now(),
            },
        );
    }

    /// Drop the entry for a user; called after every insert for that user.
    pub fn invalidate(&self, user_id: &str) {
        self.entries.write().remove(user_id);
    }

    /// Age of a user's entry in seconds (for logging).
    pub fn age_secs(&self, user_id: &str) -> Option<u64> {
        self.entries
            .read()
            .get(user_id)
            .map(|e| e.cached_at.elapsed().as_secs())
    }
}
