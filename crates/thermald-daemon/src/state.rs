//! Application state management.

use chrono::{Local, TimeZone};
use std::sync::Arc;
use thermald_sensors::{RefreshFailure, TemperatureCache, TemperatureRecord};

/// Shared application state.
pub struct AppState {
    /// Temperature cache, the only mutable shared resource
    cache: TemperatureCache,

    /// HTTP path serving the snapshot
    endpoint: String,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(cache: TemperatureCache, endpoint: String) -> Self {
        Self { cache, endpoint }
    }

    /// Returns the snapshot endpoint path.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns current records, refreshing stale ones first.
    ///
    /// Reports the first device that failed to refresh; the others are
    /// already logged by the cache.
    pub async fn temperatures(&self) -> Result<Arc<Vec<TemperatureRecord>>, RefreshFailure> {
        let snapshot = self.cache.get_or_refresh().await;
        match snapshot.failures.into_iter().next() {
            Some(failure) => Err(failure),
            None => Ok(snapshot.records),
        }
    }

    /// Local time of the last refresh, `YYYY-MM-DD HH:MM:SS`.
    pub fn cache_time(&self) -> String {
        Local
            .timestamp_opt(self.cache.last_refresh(), 0)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string())
    }
}
