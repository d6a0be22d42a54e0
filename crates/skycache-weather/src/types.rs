//! Weather data shapes: the raw persisted/remote record and the validated
//! snapshot derived from it.
//!
//! `RawWeather` mirrors the provider's current-weather payload and is what
//! the cache store persists. Numeric fields stay as strings so a malformed
//! magnitude is representable and classified at validation time instead of
//! failing JSON decoding. `WeatherSnapshot` exists only as the output of
//! [`RawWeather::validate`]; a record that fails any invariant is corrupt
//! and never surfaces as a snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

use crate::error::WeatherError;

/// Accept both `"1021"` and `1021` for numeric-ish fields.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        S(String),
        N(serde_json::Number),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::S(s) => s,
        StringOrNumber::N(n) => n.to_string(),
    })
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "string_or_number")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
}

/// One condition descriptor as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCondition {
    #[serde(rename = "id", deserialize_with = "string_or_number")]
    pub code: String,
    #[serde(rename = "main")]
    pub title: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMain {
    #[serde(rename = "temp", deserialize_with = "string_or_number")]
    pub temperature: String,
    #[serde(deserialize_with = "string_or_number")]
    pub pressure: String,
    #[serde(deserialize_with = "string_or_number")]
    pub humidity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawWind {
    #[serde(deserialize_with = "string_or_number")]
    pub speed: String,
    #[serde(rename = "deg", deserialize_with = "string_or_number")]
    pub direction: String,
}

/// Precipitation amounts; the provider omits the whole object when dry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RawRain {
    #[serde(
        rename = "1h",
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub one_hour: Option<String>,
    #[serde(
        rename = "3h",
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub three_hour: Option<String>,
}

/// Sun events as unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSys {
    #[serde(deserialize_with = "string_or_number")]
    pub sunrise: String,
    #[serde(deserialize_with = "string_or_number")]
    pub sunset: String,
}

/// The raw weather record: remote payload shape and persisted cache shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawWeather {
    #[serde(rename = "weather")]
    pub conditions: Vec<RawCondition>,
    #[serde(rename = "name")]
    pub location_name: String,
    pub main: RawMain,
    pub wind: RawWind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain: Option<RawRain>,
    pub sys: RawSys,
}

/// Validated condition descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub code: String,
    pub title: String,
    pub description: String,
    pub icon: String,
}

/// Validated main measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurements {
    pub temperature: f64,
    pub pressure: u32,
    pub humidity: u32,
}

/// Validated wind reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Wind {
    pub speed: f64,
    pub direction: f64,
}

/// Validated precipitation amounts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Precipitation {
    pub one_hour: Option<f64>,
    pub three_hour: Option<f64>,
}

/// Validated sun events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunEvents {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

/// One complete, validated weather record.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub conditions: Vec<Condition>,
    pub location_name: String,
    pub main: Measurements,
    pub wind: Wind,
    pub rain: Option<Precipitation>,
    pub sun: SunEvents,
}

fn parse_field<T: FromStr>(value: &str, field: &'static str) -> Result<T, WeatherError> {
    value.trim().parse().map_err(|_| {
        WeatherError::Consistency(format!("field `{field}` has unparseable value `{value}`"))
    })
}

fn parse_instant(value: &str, field: &'static str) -> Result<DateTime<Utc>, WeatherError> {
    let secs: i64 = parse_field(value, field)?;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        WeatherError::Consistency(format!("field `{field}` is out of range: `{value}`"))
    })
}

impl RawWeather {
    /// Check the snapshot invariants and produce the validated value.
    ///
    /// # Errors
    /// Returns [`WeatherError::Consistency`] if the condition list is empty
    /// or any numeric field fails to parse as its magnitude type.
    pub fn validate(&self) -> Result<WeatherSnapshot, WeatherError> {
        if self.conditions.is_empty() {
            return Err(WeatherError::Consistency(
                "condition list must not be empty".into(),
            ));
        }

        let conditions = self
            .conditions
            .iter()
            .map(|c| Condition {
                code: c.code.clone(),
                title: c.title.clone(),
                description: c.description.clone(),
                icon: c.icon.clone(),
            })
            .collect();

        let main = Measurements {
            temperature: parse_field(&self.main.temperature, "main.temperature")?,
            pressure: parse_field(&self.main.pressure, "main.pressure")?,
            humidity: parse_field(&self.main.humidity, "main.humidity")?,
        };

        let wind = Wind {
            speed: parse_field(&self.wind.speed, "wind.speed")?,
            direction: parse_field(&self.wind.direction, "wind.direction")?,
        };

        let rain = match &self.rain {
            None => None,
            Some(r) => Some(Precipitation {
                one_hour: r
                    .one_hour
                    .as_deref()
                    .map(|v| parse_field(v, "rain.one_hour"))
                    .transpose()?,
                three_hour: r
                    .three_hour
                    .as_deref()
                    .map(|v| parse_field(v, "rain.three_hour"))
                    .transpose()?,
            }),
        };

        let sun = SunEvents {
            sunrise: parse_instant(&self.sys.sunrise, "sys.sunrise")?,
            sunset: parse_instant(&self.sys.sunset, "sys.sunset")?,
        };

        Ok(WeatherSnapshot {
            conditions,
            location_name: self.location_name.clone(),
            main,
            wind,
            rain,
            sun,
        })
    }
}
