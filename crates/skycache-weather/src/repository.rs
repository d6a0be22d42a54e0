//! Weather repository: refresh orchestration and validated cache reads.
//!
//! The repository owns all writes to the cache store and the last-fetch
//! timestamp. Reads go through [`WeatherRepository::observe`], which
//! re-validates the stored record on every change and propagates a
//! consistency error instead of silently dropping a corrupt record.

use chrono::Duration;
use std::sync::Arc;

use skycache_core::Clock;

use crate::api::WeatherApi;
use crate::error::{ApiError, WeatherError};
use crate::settings::Settings;
use crate::staleness::is_stale;
use crate::store::CacheStore;
use crate::types::WeatherSnapshot;

/// Settings key under which the last successful fetch instant is stored.
pub const DB_TIMESTAMP_KEY: &str = "weather_fetch_timestamp";

pub struct WeatherRepository {
    store: Arc<dyn CacheStore>,
    settings: Arc<dyn Settings>,
    api: Arc<dyn WeatherApi>,
    clock: Arc<dyn Clock>,
    location: String,
    stale_threshold: Duration,
}

impl WeatherRepository {
    pub fn new(
        store: Arc<dyn CacheStore>,
        settings: Arc<dyn Settings>,
        api: Arc<dyn WeatherApi>,
        clock: Arc<dyn Clock>,
        location: impl Into<String>,
        stale_threshold: Duration,
    ) -> Self {
        Self {
            store,
            settings,
            api,
            clock,
            location: location.into(),
            stale_threshold,
        }
    }

    /// Refresh only when the cached data is stale.
    ///
    /// Returns whether a fetch was performed; the fresh-cache no-op is a
    /// success.
    ///
    /// # Errors
    /// Same failure modes as [`WeatherRepository::refresh`].
    pub async fn refresh_if_stale(&self) -> Result<bool, WeatherError> {
        let last_fetch = self.settings.get_timestamp(DB_TIMESTAMP_KEY);
        if !is_stale(last_fetch, self.clock.now(), self.stale_threshold) {
            tracing::debug!("cached weather still fresh, skipping refresh");
            return Ok(false);
        }

        self.refresh().await?;
        Ok(true)
    }

    /// Forced refresh: one remote fetch, bypassing the staleness check.
    ///
    /// # Errors
    /// - [`WeatherError::Provider`] when the remote source is unreachable or
    ///   answers with a transport-level failure.
    /// - [`WeatherError::Consistency`] when the payload cannot be decoded or
    ///   violates the snapshot invariants.
    ///
    /// The cache and timestamp are left untouched on every failure path.
    pub async fn refresh(&self) -> Result<(), WeatherError> {
        let payload = match self.api.fetch_current(&self.location).await {
            Ok(payload) => payload,
            Err(ApiError::Decode(message)) => {
                return Err(WeatherError::Consistency(message));
            }
            Err(e) => return Err(WeatherError::Provider(e)),
        };

        // Reject a structurally invalid payload before touching the cache.
        payload.validate()?;

        self.store.replace_all(&payload)?;
        self.settings
            .put_timestamp(DB_TIMESTAMP_KEY, self.clock.now())?;

        tracing::info!(location = %payload.location_name, "stored fresh weather");
        Ok(())
    }

    /// Continuous stream of validated cache content.
    ///
    /// The subscription yields the current content immediately, then one
    /// item per store change: `Ok(Some(..))` for a valid record, `Ok(None)`
    /// for an empty cache, `Err(..)` for a corrupt record.
    pub fn observe(&self) -> CacheSubscription {
        CacheSubscription {
            rx: self.store.subscribe(),
            store: Arc::clone(&self.store),
            pending_initial: true,
        }
    }

    /// Age of the cached data, computed against the clock at call time.
    pub fn data_age(&self) -> Option<Duration> {
        self.settings
            .get_timestamp(DB_TIMESTAMP_KEY)
            .map(|fetched_at| self.clock.now() - fetched_at)
    }
}

/// Live subscription to the validated cache stream.
pub struct CacheSubscription {
    rx: tokio::sync::watch::Receiver<u64>,
    store: Arc<dyn CacheStore>,
    pending_initial: bool,
}

impl CacheSubscription {
    /// Wait for the next cache emission. `None` when the store is gone.
    pub async fn next(&mut self) -> Option<Result<Option<WeatherSnapshot>, WeatherError>> {
        if self.pending_initial {
            self.pending_initial = false;
        } else if self.rx.changed().await.is_err() {
            return None;
        }
        Some(self.read())
    }

    fn read(&self) -> Result<Option<WeatherSnapshot>, WeatherError> {
        match self.store.load()? {
            None => Ok(None),
            Some(record) => record.validate().map(Some),
        }
    }
}
