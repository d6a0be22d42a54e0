//! Weather view model: combines the one-shot refresh attempt with the
//! continuous cache stream into an ordered sequence of view states.
//!
//! Two producer tasks feed latest-value slots behind a mutex; each producer
//! then runs the single recompute step while still holding the lock, so no
//! two recomputations for the same view model ever run concurrently and
//! emissions stay ordered. Consumers subscribe through a watch channel.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::repository::WeatherRepository;
use crate::view_state::{reconcile, CacheContent, RefreshOutcome, WeatherViewState};

/// Latest value seen from each of the two producers.
#[derive(Default)]
struct Latest {
    refresh: RefreshOutcome,
    cache: CacheContent,
}

pub struct WeatherViewModel {
    repository: Arc<WeatherRepository>,
    state_tx: Arc<watch::Sender<WeatherViewState>>,
    latest: Arc<Mutex<Latest>>,
    cancel: CancellationToken,
}

impl WeatherViewModel {
    /// Start observing: spawns the cache observation and exactly one
    /// staleness-checked refresh attempt for this view model's lifetime.
    pub fn new(repository: Arc<WeatherRepository>) -> Self {
        let model = Self {
            repository,
            state_tx: Arc::new(watch::channel(WeatherViewState::loading()).0),
            latest: Arc::new(Mutex::new(Latest::default())),
            cancel: CancellationToken::new(),
        };
        model.spawn_initial_refresh();
        model.spawn_cache_observation();
        model
    }

    /// Subscribe to the composite state sequence.
    pub fn state(&self) -> watch::Receiver<WeatherViewState> {
        self.state_tx.subscribe()
    }

    /// User-triggered refresh: shows the loading flag immediately, forces a
    /// fetch bypassing the staleness check, and folds the outcome into the
    /// state with the usual precedence rules.
    ///
    /// Returns a handle that completes when the attempt has been applied;
    /// dropping it does not cancel the attempt.
    pub fn trigger_refresh(&self) -> JoinHandle<()> {
        tracing::debug!("manual weather refresh requested");
        self.state_tx.send_modify(|state| state.is_loading = true);

        let repository = Arc::clone(&self.repository);
        let state_tx = Arc::clone(&self.state_tx);
        let latest = Arc::clone(&self.latest);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = repository.refresh() => result,
            };
            let error = match result {
                Ok(()) => None,
                Err(e) => {
                    tracing::error!("manual weather refresh failed: {e}");
                    Some(e.kind())
                }
            };

            let mut slots = latest.lock();
            slots.refresh = RefreshOutcome::Done(error);
            publish(&slots, &state_tx, &repository);
        })
    }

    /// Stop both producers. The in-flight refresh result, if any, is
    /// discarded; no further emissions occur.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn spawn_initial_refresh(&self) {
        let repository = Arc::clone(&self.repository);
        let state_tx = Arc::clone(&self.state_tx);
        let latest = Arc::clone(&self.latest);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = repository.refresh_if_stale() => result,
            };
            let error = match result {
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("initial weather refresh failed: {e}");
                    Some(e.kind())
                }
            };

            let mut slots = latest.lock();
            slots.refresh = RefreshOutcome::Done(error);
            publish(&slots, &state_tx, &repository);
        });
    }

    fn spawn_cache_observation(&self) {
        let repository = Arc::clone(&self.repository);
        let state_tx = Arc::clone(&self.state_tx);
        let latest = Arc::clone(&self.latest);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let mut subscription = repository.observe();
            loop {
                let item = tokio::select! {
                    _ = cancel.cancelled() => break,
                    item = subscription.next() => item,
                };
                let Some(item) = item else { break };

                let content = match item {
                    Ok(Some(snapshot)) => CacheContent::Snapshot(snapshot),
                    Ok(None) => CacheContent::Empty,
                    Err(e) => {
                        tracing::warn!("cached weather failed validation: {e}");
                        CacheContent::Corrupt(e.kind())
                    }
                };

                let mut slots = latest.lock();
                slots.cache = content;
                publish(&slots, &state_tx, &repository);
            }
        });
    }
}

impl Drop for WeatherViewModel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The single recompute entry point; callers hold the slot lock, which
/// serializes recomputation and keeps emissions ordered.
fn publish(
    slots: &Latest,
    state_tx: &watch::Sender<WeatherViewState>,
    repository: &WeatherRepository,
) {
    let age = repository.data_age();
    state_tx.send_modify(|state| {
        *state = reconcile(state, slots.refresh, &slots.cache, age);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::WeatherApi;
    use crate::error::ErrorKind;
    use crate::repository::DB_TIMESTAMP_KEY;
    use crate::settings::{MemorySettings, Settings};
    use crate::store::{CacheStore, MemoryCacheStore};
    use crate::test_support::{brno1, brno2, corrupt, MockClock, ScriptedApi};
    use chrono::Duration;
    use skycache_core::Clock;
    use std::time::Duration as StdDuration;

    struct Harness {
        store: Arc<MemoryCacheStore>,
        settings: Arc<MemorySettings>,
        api: Arc<ScriptedApi>,
        clock: Arc<MockClock>,
    }

    fn harness() -> Harness {
        Harness {
            store: Arc::new(MemoryCacheStore::new()),
            settings: Arc::new(MemorySettings::new()),
            api: Arc::new(ScriptedApi::new()),
            clock: Arc::new(MockClock::default()),
        }
    }

    impl Harness {
        fn view_model(&self) -> WeatherViewModel {
            let repository = Arc::new(WeatherRepository::new(
                Arc::clone(&self.store) as Arc<dyn CacheStore>,
                Arc::clone(&self.settings) as Arc<dyn Settings>,
                Arc::clone(&self.api) as Arc<dyn WeatherApi>,
                Arc::clone(&self.clock) as Arc<dyn Clock>,
                "Brno",
                Duration::hours(2),
            ));
            WeatherViewModel::new(repository)
        }

        fn set_data_age(&self, age: Duration) {
            self.settings
                .put_timestamp(DB_TIMESTAMP_KEY, self.clock.now() - age)
                .unwrap();
        }
    }

    async fn wait_for(
        rx: &mut watch::Receiver<WeatherViewState>,
        predicate: impl Fn(&WeatherViewState) -> bool,
    ) -> WeatherViewState {
        tokio::time::timeout(StdDuration::from_secs(2), async {
            loop {
                let state = rx.borrow_and_update().clone();
                if predicate(&state) {
                    return state;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap()
    }

    fn settled(state: &WeatherViewState) -> bool {
        !state.is_loading
    }

    #[tokio::test]
    async fn test_initial_state_is_loading() {
        let h = harness();
        h.api.push_ok(brno1());
        let model = h.view_model();
        // The channel starts at the loading state before any producer runs.
        assert!(WeatherViewState::loading().is_loading);
        let state = wait_for(&mut model.state(), settled).await;
        assert!(!state.is_loading);
    }

    // Scenario: no prior fetch, the provider answers with a valid payload.
    #[tokio::test]
    async fn test_first_fetch_without_cache() {
        let h = harness();
        h.api.push_ok(brno1());

        let model = h.view_model();
        let mut rx = model.state();

        let state = wait_for(&mut rx, |s| settled(s) && s.weather.is_some()).await;
        assert_eq!(state.weather.unwrap().location_name, "Brno1");
        assert_eq!(state.last_updated, Some(Duration::zero()));
        assert!(state.error.is_none());
        assert!(!state.is_empty);
        assert_eq!(h.api.call_count(), 1);
    }

    // Scenario: fresh cache, provider primed with different data; no call.
    #[tokio::test]
    async fn test_fresh_cache_skips_provider() {
        let h = harness();
        h.api.push_ok(brno2());
        h.store.replace_all(&brno1()).unwrap();
        h.set_data_age(Duration::seconds(1));

        let model = h.view_model();
        let state = wait_for(&mut model.state(), |s| settled(s) && s.weather.is_some()).await;

        assert_eq!(state.weather.unwrap().location_name, "Brno1");
        assert_eq!(state.last_updated, Some(Duration::seconds(1)));
        assert_eq!(h.api.call_count(), 0);
    }

    // Scenario: stale timestamp, empty cache, provider unreachable.
    #[tokio::test]
    async fn test_stale_empty_cache_with_transport_error() {
        let h = harness();
        h.api.push_status(503);
        h.set_data_age(Duration::hours(2));

        let model = h.view_model();
        let state = wait_for(&mut model.state(), settled).await;

        assert_eq!(state.error, Some(ErrorKind::DataProvider));
        assert!(state.weather.is_none());
        assert!(!state.is_empty);
        assert_eq!(h.api.call_count(), 1);
    }

    // A stale-but-present snapshot still wins over the failed refresh.
    #[tokio::test]
    async fn test_stale_cache_with_transport_error_keeps_snapshot() {
        let h = harness();
        h.api.push_status(503);
        h.store.replace_all(&brno1()).unwrap();
        h.set_data_age(Duration::hours(2));

        let model = h.view_model();
        let state = wait_for(&mut model.state(), |s| settled(s) && s.weather.is_some()).await;

        assert_eq!(state.weather.unwrap().location_name, "Brno1");
        assert!(state.error.is_none());
        assert_eq!(h.api.call_count(), 1);
    }

    // Scenario: fresh cache, user-triggered refresh fails; snapshot
    // preserved, error suppressed, exactly one provider call.
    #[tokio::test]
    async fn test_failed_manual_refresh_keeps_fresh_snapshot() {
        let h = harness();
        h.store.replace_all(&brno1()).unwrap();
        h.set_data_age(Duration::seconds(1));

        let model = h.view_model();
        let mut rx = model.state();
        wait_for(&mut rx, |s| settled(s) && s.weather.is_some()).await;
        assert_eq!(h.api.call_count(), 0);

        h.api.push_status(500);
        model.trigger_refresh().await.unwrap();

        let state = wait_for(&mut rx, |s| settled(s)).await;
        assert_eq!(state.weather.unwrap().location_name, "Brno1");
        assert!(state.error.is_none());
        assert_eq!(h.api.call_count(), 1);
    }

    // Scenario: corrupt stored record surfaces until a valid one replaces it.
    #[tokio::test]
    async fn test_corrupt_record_surfaces_until_replaced() {
        let h = harness();
        h.store.replace_all(&corrupt()).unwrap();
        h.set_data_age(Duration::seconds(1));

        let model = h.view_model();
        let mut rx = model.state();

        let state = wait_for(&mut rx, |s| settled(s) && s.error.is_some()).await;
        assert_eq!(state.error, Some(ErrorKind::DataConsistency));
        assert!(state.weather.is_none());

        h.api.push_ok(brno2());
        model.trigger_refresh().await.unwrap();

        let state = wait_for(&mut rx, |s| s.weather.is_some()).await;
        assert_eq!(state.weather.unwrap().location_name, "Brno2");
        assert!(state.error.is_none());
    }

    // Success path of a user-triggered refresh with an already-fresh cache.
    #[tokio::test]
    async fn test_manual_refresh_replaces_snapshot() {
        let h = harness();
        h.store.replace_all(&brno1()).unwrap();
        h.set_data_age(Duration::seconds(1));

        let model = h.view_model();
        let mut rx = model.state();
        wait_for(&mut rx, |s| settled(s) && s.weather.is_some()).await;

        h.api.push_ok(brno2());
        model.trigger_refresh().await.unwrap();

        let state = wait_for(&mut rx, |s| {
            settled(s)
                && s.weather
                    .as_ref()
                    .is_some_and(|w| w.location_name == "Brno2")
        })
        .await;
        assert_eq!(state.last_updated, Some(Duration::zero()));
        assert_eq!(h.api.call_count(), 1);
    }

    // A user-triggered refresh shows the loading flag right away, with the
    // prior snapshot still on display, before the attempt resolves.
    #[tokio::test]
    async fn test_trigger_refresh_emits_loading_before_outcome() {
        let h = harness();
        h.store.replace_all(&brno1()).unwrap();
        h.set_data_age(Duration::seconds(1));

        let model = h.view_model();
        let mut rx = model.state();
        wait_for(&mut rx, |s| settled(s) && s.weather.is_some()).await;

        h.api.push_status(500);
        let handle = model.trigger_refresh();

        // Current-thread runtime: the spawned attempt cannot have run yet,
        // so the intermediate emission is still the current value.
        let state = rx.borrow_and_update().clone();
        assert!(state.is_loading);
        assert_eq!(state.weather.as_ref().unwrap().location_name, "Brno1");
        assert!(state.error.is_none());

        handle.await.unwrap();
        let state = wait_for(&mut rx, settled).await;
        assert_eq!(state.weather.unwrap().location_name, "Brno1");
        assert!(state.error.is_none());
        assert_eq!(h.api.call_count(), 1);
    }

    // Empty cache and a successful no-op refresh resolve to "empty".
    #[tokio::test]
    async fn test_empty_cache_with_fresh_timestamp_is_empty() {
        let h = harness();
        h.set_data_age(Duration::seconds(1));

        let model = h.view_model();
        let state = wait_for(&mut model.state(), settled).await;

        assert!(state.is_empty);
        assert!(state.weather.is_none());
        assert!(state.error.is_none());
        assert_eq!(h.api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_emissions() {
        let h = harness();
        h.api.push_ok(brno1());

        let model = h.view_model();
        let mut rx = model.state();
        wait_for(&mut rx, |s| settled(s) && s.weather.is_some()).await;

        model.shutdown();
        tokio::time::sleep(StdDuration::from_millis(50)).await;

        rx.borrow_and_update();
        h.store.replace_all(&brno2()).unwrap();
        tokio::time::sleep(StdDuration::from_millis(100)).await;

        assert!(!rx.has_changed().unwrap());
    }
}
