use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use skycache_core::{Config, SystemClock};
use skycache_weather::{
    CacheStore, OpenWeatherApi, Settings, SqliteCacheStore, SqliteSettings, WeatherApi,
    WeatherRepository, WeatherViewModel, WeatherViewState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging and shared plumbing
    skycache_core::init()?;

    let (config, _validation) = Config::load_validated()?;

    let Some(api_key) = config.weather.api_key.clone() else {
        bail!("no API key configured; set OPENWEATHER_API_KEY or weather.api_key");
    };

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;

    let store = Arc::new(SqliteCacheStore::new(config.data_dir.join("weather.db"))?);
    let settings = Arc::new(SqliteSettings::new(config.data_dir.join("settings.db"))?);
    let api = Arc::new(OpenWeatherApi::new(
        config.weather.api_url.clone(),
        api_key,
        Duration::from_secs(config.weather.request_timeout_secs),
    )?);

    let repository = Arc::new(WeatherRepository::new(
        store as Arc<dyn CacheStore>,
        settings as Arc<dyn Settings>,
        api as Arc<dyn WeatherApi>,
        Arc::new(SystemClock),
        config.weather.location.clone(),
        config.weather.stale_threshold(),
    ));

    tracing::info!(location = %config.weather.location, "watching weather");

    let model = WeatherViewModel::new(repository);
    let mut state_rx = model.state();

    loop {
        print_state(&state_rx.borrow_and_update());
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    model.shutdown();
    tracing::info!("shutting down");
    Ok(())
}

fn print_state(state: &WeatherViewState) {
    if state.is_loading {
        println!("loading...");
    }
    if let Some(kind) = state.error {
        println!("error: {kind}");
    }
    if let Some(weather) = &state.weather {
        let conditions = weather
            .conditions
            .iter()
            .map(|c| c.description.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let age = state
            .last_updated
            .map_or_else(|| "unknown age".to_string(), |d| format!("{}m old", d.num_minutes()));
        println!(
            "{}: {:.1} K, {} hPa, {}% humidity, wind {:.1} m/s, {conditions} ({age})",
            weather.location_name,
            weather.main.temperature,
            weather.main.pressure,
            weather.main.humidity,
            weather.wind.speed,
        );
    } else if state.is_empty {
        println!("no weather data yet");
    }
}
