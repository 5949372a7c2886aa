//! Time-to-live cache of temperature records.
//!
//! Readers take the published `Arc<Vec<TemperatureRecord>>` without waiting
//! on a refresh in progress. A stale read triggers one coordinated refresh:
//! every record is re-read on its own blocking task, results are applied by
//! index to a copy, and the copy is published before the timestamp advances.
//! At most one refresh runs at a time.

use crate::device::{DeviceReader, TemperatureRecord};
use crate::Error;
use futures::future::join_all;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// A device whose refresh failed; its previous reading was kept.
#[derive(Debug)]
pub struct RefreshFailure {
    pub path: String,
    pub error: Error,
}

/// Result of [`TemperatureCache::get_or_refresh`].
#[derive(Debug)]
pub struct Snapshot {
    /// Records in catalog order.
    pub records: Arc<Vec<TemperatureRecord>>,
    /// Devices that failed during a refresh triggered by this call.
    pub failures: Vec<RefreshFailure>,
}

/// Shared temperature cache.
pub struct TemperatureCache {
    records: RwLock<Arc<Vec<TemperatureRecord>>>,
    /// Unix seconds of the last coordinated refresh.
    last_refresh: AtomicI64,
    ttl: i64,
    refresh_lock: Mutex<()>,
    reader: Arc<dyn DeviceReader>,
}

impl TemperatureCache {
    /// Creates a cache that is stale until its first refresh.
    pub fn new(
        records: Vec<TemperatureRecord>,
        ttl_secs: u64,
        reader: Arc<dyn DeviceReader>,
    ) -> Self {
        Self {
            records: RwLock::new(Arc::new(records)),
            last_refresh: AtomicI64::new(0),
            ttl: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
            refresh_lock: Mutex::new(()),
            reader,
        }
    }

    /// Marks the records as refreshed at `timestamp` (unix seconds).
    pub fn with_last_refresh(self, timestamp: i64) -> Self {
        self.last_refresh.store(timestamp, Ordering::Release);
        self
    }

    /// Unix seconds of the last refresh, `0` if none happened yet.
    pub fn last_refresh(&self) -> i64 {
        self.last_refresh.load(Ordering::Acquire)
    }

    /// Currently published records.
    pub fn records(&self) -> Arc<Vec<TemperatureRecord>> {
        Arc::clone(&self.records.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns true if the records are within the TTL at `now`.
    pub fn is_fresh_at(&self, now: i64) -> bool {
        now.saturating_sub(self.last_refresh()) <= self.ttl
    }

    /// Returns the current records, refreshing them first if stale.
    pub async fn get_or_refresh(&self) -> Snapshot {
        self.get_or_refresh_at(unix_now()).await
    }

    /// Same as [`get_or_refresh`](Self::get_or_refresh) with an explicit clock.
    ///
    /// The timestamp advances to `now` even when some devices fail, so a
    /// broken sensor is retried once per TTL rather than on every call.
    /// Dropping the returned future before completion publishes nothing.
    pub async fn get_or_refresh_at(&self, now: i64) -> Snapshot {
        if self.is_fresh_at(now) {
            return self.snapshot(Vec::new());
        }

        let _guard = self.refresh_lock.lock().await;
        // another caller may have refreshed while we waited
        if self.is_fresh_at(now) {
            return self.snapshot(Vec::new());
        }

        let failures = self.refresh(now).await;
        self.snapshot(failures)
    }

    fn snapshot(&self, failures: Vec<RefreshFailure>) -> Snapshot {
        Snapshot {
            records: self.records(),
            failures,
        }
    }

    /// Re-reads every record in parallel. Caller must hold `refresh_lock`.
    async fn refresh(&self, now: i64) -> Vec<RefreshFailure> {
        let started = Instant::now();
        let current = self.records();

        let tasks = current.iter().enumerate().map(|(index, record)| {
            let reader = Arc::clone(&self.reader);
            let variant = record.variant();
            let path = record.source_path().to_string();
            async move {
                let task_path = path.clone();
                let outcome = tokio::task::spawn_blocking(move || reader.read(variant, &task_path))
                    .await
                    .unwrap_or_else(|e| Err(Error::aborted(&path, e)));
                (index, path, outcome)
            }
        });
        let outcomes = join_all(tasks).await;

        let mut next = Vec::clone(&current);
        let mut failures = Vec::new();
        for (index, path, outcome) in outcomes {
            match outcome {
                Ok(temperature) => next[index].temperature = temperature,
                Err(error) => {
                    warn!("Error updating temperature for {}: {}", path, error);
                    failures.push(RefreshFailure { path, error });
                }
            }
        }

        *self.records.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        self.last_refresh.store(now, Ordering::Release);

        debug!(
            "Refreshed {} devices in {:?} ({} failed)",
            current.len(),
            started.elapsed(),
            failures.len()
        );
        failures
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceIdentity, DeviceVariant};
    use crate::{ErrorKind, Result};
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Reader returning `base + calls` and failing for configured paths.
    struct CountingReader {
        calls: AtomicUsize,
        failing: HashSet<String>,
        delay: Duration,
    }

    impl CountingReader {
        fn new(failing: &[&str], delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failing: failing.iter().map(|p| p.to_string()).collect(),
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DeviceReader for CountingReader {
        fn read(&self, _variant: DeviceVariant, path: &str) -> Result<f64> {
            std::thread::sleep(self.delay);
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(path) {
                return Err(Error::Command {
                    tool: "smartctl".to_string(),
                    path: path.to_string(),
                    detail: "exit status: 2".to_string(),
                });
            }
            Ok(60.0 + n as f64)
        }

        fn identify(&self, _variant: DeviceVariant, path: &str) -> Result<DeviceIdentity> {
            Ok(DeviceIdentity {
                id: path.to_string(),
                model: String::new(),
            })
        }
    }

    fn record(path: &str, temperature: f64) -> TemperatureRecord {
        TemperatureRecord::new(
            DeviceVariant::SpinningDisk,
            DeviceIdentity {
                id: path.to_string(),
                model: String::new(),
            },
            path,
            temperature,
        )
    }

    const NOW: i64 = 1_700_000_000;

    #[tokio::test]
    async fn test_fresh_returns_same_snapshot() {
        let reader = CountingReader::new(&[], Duration::ZERO);
        let cache = TemperatureCache::new(vec![record("/dev/sda", 35.0)], 60, reader.clone())
            .with_last_refresh(NOW - 10);

        let first = cache.get_or_refresh_at(NOW).await;
        let second = cache.get_or_refresh_at(NOW + 50).await;

        assert_eq!(reader.calls(), 0);
        assert!(first.failures.is_empty() && second.failures.is_empty());
        assert!(Arc::ptr_eq(&first.records, &second.records));
        assert_eq!(first.records[0].temperature(), 35.0);
    }

    #[tokio::test]
    async fn test_ttl_boundary() {
        let reader = CountingReader::new(&[], Duration::ZERO);
        let cache = TemperatureCache::new(vec![record("/dev/sda", 35.0)], 60, reader.clone())
            .with_last_refresh(NOW - 60);

        cache.get_or_refresh_at(NOW).await;
        assert_eq!(reader.calls(), 0);

        cache.get_or_refresh_at(NOW + 1).await;
        assert_eq!(reader.calls(), 1);
        assert_eq!(cache.last_refresh(), NOW + 1);
    }

    #[tokio::test]
    async fn test_new_cache_refreshes_on_first_access() {
        let reader = CountingReader::new(&[], Duration::ZERO);
        let cache = TemperatureCache::new(
            vec![record("/dev/sda", 35.0), record("/dev/sdb", 36.0)],
            60,
            reader.clone(),
        );
        assert_eq!(cache.last_refresh(), 0);

        let snapshot = cache.get_or_refresh_at(NOW).await;

        assert_eq!(reader.calls(), 2);
        assert!(snapshot.failures.is_empty());
        assert_eq!(cache.last_refresh(), NOW);
        let mut temps: Vec<f64> = snapshot.records.iter().map(|r| r.temperature()).collect();
        temps.sort_by(f64::total_cmp);
        assert_eq!(temps, vec![60.0, 61.0]);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_previous_value() {
        let reader = CountingReader::new(&["/dev/sda"], Duration::ZERO);
        let cache = TemperatureCache::new(
            vec![record("/dev/sda", 35.0), record("/dev/sdb", 36.0)],
            60,
            reader.clone(),
        )
        .with_last_refresh(NOW - 61);

        let snapshot = cache.get_or_refresh_at(NOW).await;

        assert_eq!(snapshot.records[0].source_path(), "/dev/sda");
        assert_eq!(snapshot.records[0].temperature(), 35.0);
        assert_eq!(snapshot.records[1].source_path(), "/dev/sdb");
        assert!(snapshot.records[1].temperature() >= 60.0);
        assert_eq!(snapshot.failures.len(), 1);
        assert_eq!(snapshot.failures[0].path, "/dev/sda");
        assert_eq!(snapshot.failures[0].error.kind(), ErrorKind::Command);
        assert_eq!(cache.last_refresh(), NOW);

        // the broken device is not retried until the TTL runs out again
        let again = cache.get_or_refresh_at(NOW + 30).await;
        assert!(again.failures.is_empty());
        assert_eq!(reader.calls(), 2);
        assert_eq!(again.records[0].temperature(), 35.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_refresh() {
        let reader = CountingReader::new(&[], Duration::from_millis(50));
        let records = (0..3).map(|i| record(&format!("/dev/sd{}", i), 30.0)).collect();
        let cache = Arc::new(
            TemperatureCache::new(records, 60, reader.clone()).with_last_refresh(NOW - 120),
        );

        let callers: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_or_refresh_at(NOW).await })
            })
            .collect();

        let mut snapshots = Vec::new();
        for caller in callers {
            snapshots.push(caller.await.unwrap());
        }

        assert_eq!(reader.calls(), 3);
        assert_eq!(cache.last_refresh(), NOW);
        for snapshot in &snapshots {
            assert!(snapshot.failures.is_empty());
            assert!(snapshot.records.iter().all(|r| r.temperature() >= 60.0));
        }
    }

    #[tokio::test]
    async fn test_abandoned_refresh_publishes_nothing() {
        let reader = CountingReader::new(&[], Duration::from_millis(200));
        let cache = TemperatureCache::new(vec![record("/dev/sda", 35.0)], 60, reader.clone())
            .with_last_refresh(NOW - 61);

        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), cache.get_or_refresh_at(NOW)).await;

        assert!(abandoned.is_err());
        assert_eq!(cache.last_refresh(), NOW - 61);
        assert_eq!(cache.records()[0].temperature(), 35.0);
    }
}
