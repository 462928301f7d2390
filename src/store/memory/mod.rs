mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

use crate::Bins;
use crate::store::{Database, Key, Record, RecordExistsAction, Result, WritePolicy, ensure_bins};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct StoredRecord {
    bins: Bins,
    expires_at: Option<Instant>,
}

impl StoredRecord {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map(|e| e > now).unwrap_or(true)
    }
}

/// An in-memory database.
///
/// Records live in a concurrent map and expire against a [`Clock`], which
/// defaults to the system clock. Expired records are never returned and are
/// dropped lazily on access or by [`purge_expired`](MemoryDatabase::purge_expired).
///
/// ### Note
///
/// Data is lost when the process exits.
#[derive(Debug)]
pub struct MemoryDatabase<C: Clock = SystemClock> {
    namespace: String,
    default_ttl: Option<Duration>,
    clock: C,
    records: DashMap<Key, StoredRecord>,
}

impl MemoryDatabase {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self::with_clock(namespace, SystemClock)
    }
}

impl<C: Clock> MemoryDatabase<C> {
    pub fn with_clock(namespace: impl Into<String>, clock: C) -> Self {
        Self {
            namespace: namespace.into(),
            default_ttl: None,
            clock,
            records: DashMap::new(),
        }
    }

    /// Sets the time-to-live applied to writes using the namespace default.
    ///
    /// Without one, such records never expire.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.records.iter().filter(|r| r.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every expired record, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.records.retain(|_, record| {
            let live = record.is_live(now);
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }
}

impl<C: Clock> Database for MemoryDatabase<C> {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get(&self, key: &Key) -> Result<Option<Record>> {
        let now = self.clock.now();

        let record = match self.records.get(key) {
            Some(stored) if stored.is_live(now) => Some(Record {
                bins: stored.bins.clone(),
                ttl: stored.expires_at.map(|e| e.saturating_duration_since(now)),
            }),
            _ => None,
        };

        if record.is_none() {
            self.records.remove_if(key, |_, stored| !stored.is_live(now));
        }

        Ok(record)
    }

    async fn put(&self, policy: &WritePolicy, key: &Key, bins: &Bins) -> Result<()> {
        ensure_bins(bins)?;

        let now = self.clock.now();
        let expires_at = policy
            .expiration
            .resolve(self.default_ttl)
            .map(|ttl| now + ttl);

        match self.records.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let stored = entry.get_mut();
                if policy.record_exists_action == RecordExistsAction::Update && stored.is_live(now)
                {
                    stored
                        .bins
                        .extend(bins.iter().map(|(k, v)| (k.clone(), v.clone())));
                } else {
                    stored.bins = bins.clone();
                }
                stored.expires_at = expires_at;
            }
            Entry::Vacant(entry) => {
                entry.insert(StoredRecord {
                    bins: bins.clone(),
                    expires_at,
                });
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &Key) -> Result<bool> {
        let now = self.clock.now();
        Ok(self
            .records
            .remove(key)
            .map(|(_, stored)| stored.is_live(now))
            .unwrap_or(false))
    }
}
