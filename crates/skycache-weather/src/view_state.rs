//! Composite display state and the precedence rules that produce it.
//!
//! Each reconciliation builds a fresh [`WeatherViewState`] from the latest
//! refresh outcome and the latest cache content. The rules favour
//! availability: a present snapshot always wins over a failed refresh,
//! while a corrupt *stored* record always surfaces because it reflects the
//! currently persisted state, not a failed background attempt.

use chrono::Duration;

use crate::error::ErrorKind;
use crate::types::WeatherSnapshot;

/// The state observed by the consumer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherViewState {
    /// Snapshot to display, when one exists.
    pub weather: Option<WeatherSnapshot>,
    /// Age of the snapshot at the instant of composition.
    pub last_updated: Option<Duration>,
    /// Surfaced failure, mutually exclusive with `weather`.
    pub error: Option<ErrorKind>,
    /// True until the initial refresh attempt resolves, and during a
    /// user-triggered refresh.
    pub is_loading: bool,
    /// True when there is genuinely nothing to show: no snapshot, no error,
    /// refresh resolved.
    pub is_empty: bool,
}

impl WeatherViewState {
    /// Initial state: nothing known yet, refresh outstanding.
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }
}

/// Latest value seen from the one-shot refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum RefreshOutcome {
    /// Not yet resolved; composites stay in the loading state.
    #[default]
    Pending,
    /// Resolved; `None` means success (including the fresh-cache no-op).
    Done(Option<ErrorKind>),
}

impl RefreshOutcome {
    fn resolved(self) -> bool {
        matches!(self, RefreshOutcome::Done(_))
    }

    fn error(self) -> Option<ErrorKind> {
        match self {
            RefreshOutcome::Pending => None,
            RefreshOutcome::Done(error) => error,
        }
    }
}

/// Latest value seen from the cache stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) enum CacheContent {
    /// No record, or the stream has not emitted yet.
    #[default]
    Empty,
    /// A validated record.
    Snapshot(WeatherSnapshot),
    /// The stored record failed validation.
    Corrupt(ErrorKind),
}

/// One combine step: derive the next composite state.
///
/// `age` is the age of the cached data at this instant; it is only
/// attached when a snapshot is surfaced.
pub(crate) fn reconcile(
    prev: &WeatherViewState,
    refresh: RefreshOutcome,
    cache: &CacheContent,
    age: Option<Duration>,
) -> WeatherViewState {
    let is_loading = !refresh.resolved();

    match cache {
        // The persisted record itself is bad: never hidden, regardless of
        // how the refresh attempt went.
        CacheContent::Corrupt(kind) => WeatherViewState {
            weather: None,
            last_updated: None,
            error: Some(*kind),
            is_loading,
            is_empty: false,
        },
        // A present snapshot wins over any refresh failure.
        CacheContent::Snapshot(snapshot) => WeatherViewState {
            weather: Some(snapshot.clone()),
            last_updated: age,
            error: None,
            is_loading,
            is_empty: false,
        },
        CacheContent::Empty => {
            // With nothing to show, a refresh failure surfaces; a previous
            // error is carried forward until data arrives.
            let error = refresh.error().or(prev.error);
            WeatherViewState {
                weather: None,
                last_updated: None,
                error,
                is_loading,
                is_empty: !is_loading && error.is_none(),
            }
        }
    }
}
