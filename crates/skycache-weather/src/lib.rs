//! Cached current-weather data with reactive view-state composition.
//!
//! The crate is layered: [`api`] talks to the provider, [`store`] and
//! [`settings`] persist the last good record and its fetch timestamp,
//! [`repository`] ties them together with the staleness policy, and
//! [`view_model`] folds refresh outcomes and cache changes into a single
//! ordered stream of [`WeatherViewState`] values.
//!
//! Each collaborator ships in two flavours: SQLite-backed for durable
//! consumers, and [`MemoryCacheStore`]/[`MemorySettings`] for embedders
//! that want the engine without persistence (and for test harnesses).

pub mod api;
pub mod error;
pub mod repository;
pub mod settings;
pub mod staleness;
pub mod store;
pub mod types;
pub mod view_model;
pub mod view_state;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{OpenWeatherApi, WeatherApi};
pub use error::{ApiError, ErrorKind, StoreError, WeatherError};
pub use repository::{CacheSubscription, WeatherRepository};
pub use settings::{MemorySettings, Settings, SqliteSettings};
pub use store::{CacheStore, MemoryCacheStore, SqliteCacheStore};
pub use types::{RawWeather, WeatherSnapshot};
pub use view_model::WeatherViewModel;
pub use view_state::WeatherViewState;
