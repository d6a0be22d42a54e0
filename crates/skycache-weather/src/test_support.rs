//! Shared test doubles and fixture records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use skycache_core::Clock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::api::WeatherApi;
use crate::error::ApiError;
use crate::types::{RawCondition, RawMain, RawSys, RawWeather, RawWind};

/// Clock pinned to a fixed instant, adjustable per test.
pub(crate) struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for MockClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(
                DateTime::from_timestamp(1_646_810_000, 0).unwrap_or_else(Utc::now),
            ),
        }
    }
}

impl MockClock {
    #[allow(dead_code)]
    pub(crate) fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Provider double that replays a scripted queue of responses and counts
/// calls. An unscripted call reports as unreachable.
pub(crate) struct ScriptedApi {
    responses: Mutex<VecDeque<Result<RawWeather, ApiError>>>,
    calls: AtomicUsize,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn push_ok(&self, payload: RawWeather) {
        self.responses.lock().push_back(Ok(payload));
    }

    pub(crate) fn push_status(&self, status: u16) {
        self.responses.lock().push_back(Err(ApiError::Status {
            status,
            message: "scripted failure".into(),
        }));
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherApi for ScriptedApi {
    async fn fetch_current(&self, _location: &str) -> Result<RawWeather, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses.lock().pop_front().unwrap_or(Err(ApiError::Status {
            status: 599,
            message: "no scripted response".into(),
        }))
    }
}

fn record(
    location_name: &str,
    temperature: &str,
    pressure: &str,
    humidity: &str,
    speed: &str,
    direction: &str,
    sunrise: &str,
    sunset: &str,
) -> RawWeather {
    RawWeather {
        conditions: vec![RawCondition {
            code: "800".into(),
            title: "Clear".into(),
            description: "clear sky".into(),
            icon: "01d".into(),
        }],
        location_name: location_name.into(),
        main: RawMain {
            temperature: temperature.into(),
            pressure: pressure.into(),
            humidity: humidity.into(),
        },
        wind: RawWind {
            speed: speed.into(),
            direction: direction.into(),
        },
        rain: None,
        sys: RawSys {
            sunrise: sunrise.into(),
            sunset: sunset.into(),
        },
    }
}

pub(crate) fn brno1() -> RawWeather {
    record(
        "Brno1",
        "265.90",
        "1021",
        "45",
        "4.6",
        "345",
        "1646803774",
        "1646844989",
    )
}

pub(crate) fn brno2() -> RawWeather {
    record(
        "Brno2",
        "260.90",
        "1025",
        "55",
        "4.7",
        "355",
        "1646806774",
        "1646842989",
    )
}

/// Record that decodes fine but fails validation: no conditions.
pub(crate) fn corrupt() -> RawWeather {
    let mut raw = brno1();
    raw.conditions.clear();
    raw
}
