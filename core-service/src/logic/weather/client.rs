//! Weather Provider
//!
//! `WeatherProvider` is the narrow interface the pipeline consumes.
//! `OpenWeatherClient` implements it against the OpenWeather REST API.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use super::types::{
    Coordinates, ForecastPoint, GeocodeCandidate, MonitoredLocation, Units, WeatherObservation,
};
use crate::logic::feeds::error::{with_timeout, FeedError, FeedResult};

const OPENWEATHER_BASE: &str = "https://api.openweathermap.org";

/// Forecast API returns 3-hour steps, capped at 5 days
const FORECAST_STEPS_PER_DAY: u32 = 8;
const FORECAST_MAX_STEPS: u32 = 40;

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn get_current_weather(
        &self,
        lat: f64,
        lon: f64,
        name: Option<&str>,
        units: Units,
    ) -> FeedResult<WeatherObservation>;

    async fn geocode(&self, query: &str, limit: usize) -> FeedResult<Vec<GeocodeCandidate>>;

    async fn get_forecast(
        &self,
        lat: f64,
        lon: f64,
        days: u32,
        units: Units,
    ) -> FeedResult<Vec<ForecastPoint>>;

    /// Per-call timeout used by `get_multiple`
    fn call_timeout(&self) -> Duration {
        Duration::from_secs(crate::constants::DEFAULT_FETCH_TIMEOUT)
    }
}

/// Fetch every location concurrently, each call bounded by `call_timeout`.
///
/// Partial results: a failing, stalled or panicking location is logged and
/// left out. Successful observations keep the order of `locations`.
pub async fn get_multiple(
    provider: &Arc<dyn WeatherProvider>,
    locations: &[MonitoredLocation],
    units: Units,
) -> Vec<WeatherObservation> {
    let mut tasks = JoinSet::new();
    for (index, location) in locations.iter().cloned().enumerate() {
        let provider = Arc::clone(provider);
        tasks.spawn(async move {
            let fetch = provider.get_current_weather(
                location.coordinates.lat,
                location.coordinates.lng,
                Some(location.name.as_str()),
                units,
            );
            (index, with_timeout(provider.call_timeout(), fetch).await)
        });
    }

    let mut fetched = Vec::with_capacity(locations.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Ok(observation))) => fetched.push((index, observation)),
            Ok((index, Err(e))) => {
                log::warn!("Weather fetch failed for {}: {}", locations[index].name, e)
            }
            Err(e) => log::error!("Weather fetch task aborted: {}", e),
        }
    }

    fetched.sort_by_key(|(index, _)| *index);
    fetched.into_iter().map(|(_, observation)| observation).collect()
}

// ============================================================================
// OPENWEATHER IMPLEMENTATION
// ============================================================================

pub struct OpenWeatherClient {
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> FeedResult<Self> {
        Self::with_base_url(api_key, OPENWEATHER_BASE, timeout)
    }

    pub fn with_base_url(
        api_key: Option<String>,
        base_url: &str,
        timeout: Duration,
    ) -> FeedResult<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            http_client,
        })
    }

    fn key(&self) -> FeedResult<&str> {
        self.api_key
            .as_deref()
            .ok_or(FeedError::NotConfigured("OPENWEATHER_API_KEY"))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> FeedResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http_client.get(&url).query(query).send().await?;

        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn get_current_weather(
        &self,
        lat: f64,
        lon: f64,
        name: Option<&str>,
        units: Units,
    ) -> FeedResult<WeatherObservation> {
        let query = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("units", units.as_str().to_string()),
            ("appid", self.key()?.to_string()),
        ];
        let raw: CurrentResponse = self.get_json("/data/2.5/weather", &query).await?;
        Ok(raw.into_observation(Coordinates::new(lat, lon), name))
    }

    async fn geocode(&self, query: &str, limit: usize) -> FeedResult<Vec<GeocodeCandidate>> {
        let params = [
            ("q", query.to_string()),
            ("limit", limit.to_string()),
            ("appid", self.key()?.to_string()),
        ];
        self.get_json("/geo/1.0/direct", &params).await
    }

    async fn get_forecast(
        &self,
        lat: f64,
        lon: f64,
        days: u32,
        units: Units,
    ) -> FeedResult<Vec<ForecastPoint>> {
        let steps = days
            .saturating_mul(FORECAST_STEPS_PER_DAY)
            .clamp(1, FORECAST_MAX_STEPS);
        let query = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("units", units.as_str().to_string()),
            ("cnt", steps.to_string()),
            ("appid", self.key()?.to_string()),
        ];
        let raw: ForecastResponse = self.get_json("/data/2.5/forecast", &query).await?;
        Ok(raw.list.into_iter().map(ForecastEntry::into_point).collect())
    }

    fn call_timeout(&self) -> Duration {
        self.timeout
    }
}

// ============================================================================
// API RESPONSE TYPES (for parsing OpenWeather)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct MainBlock {
    temp: Option<f32>,
    humidity: Option<f32>,
    pressure: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct WindBlock {
    speed: Option<f32>,
    deg: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct CloudBlock {
    all: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct PrecipBlock {
    #[serde(rename = "1h")]
    one_hour: Option<f32>,
    #[serde(rename = "3h")]
    three_hours: Option<f32>,
}

impl PrecipBlock {
    fn amount(&self) -> Option<f32> {
        self.one_hour.or(self.three_hours)
    }
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    main: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    name: Option<String>,
    #[serde(default)]
    main: MainBlock,
    #[serde(default)]
    wind: WindBlock,
    #[serde(default)]
    clouds: CloudBlock,
    rain: Option<PrecipBlock>,
    snow: Option<PrecipBlock>,
    /// Meters
    visibility: Option<f32>,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    dt: Option<i64>,
}

impl CurrentResponse {
    fn into_observation(self, coordinates: Coordinates, name: Option<&str>) -> WeatherObservation {
        let location = name
            .map(str::to_string)
            .or(self.name)
            .unwrap_or_else(|| format!("{:.4}, {:.4}", coordinates.lat, coordinates.lng));

        // No rain/snow block means no precipitation in the last hour
        let precipitation = self
            .rain
            .as_ref()
            .and_then(PrecipBlock::amount)
            .or_else(|| self.snow.as_ref().and_then(PrecipBlock::amount))
            .unwrap_or(0.0);

        let mut observation = WeatherObservation::new(location, coordinates);
        observation.temperature = self.main.temp;
        observation.humidity = self.main.humidity;
        observation.pressure = self.main.pressure;
        observation.wind_speed = self.wind.speed;
        observation.wind_direction = self.wind.deg;
        observation.precipitation = Some(precipitation);
        observation.visibility = self.visibility.map(|m| m / 1000.0);
        observation.cloud_cover = self.clouds.all;
        observation.condition = self.weather.into_iter().next().and_then(|w| w.main);
        if let Some(ts) = self.dt.and_then(|dt| Utc.timestamp_opt(dt, 0).single()) {
            observation.observed_at = ts;
        }
        observation
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt: i64,
    #[serde(default)]
    main: MainBlock,
    #[serde(default)]
    wind: WindBlock,
    #[serde(default)]
    clouds: CloudBlock,
    rain: Option<PrecipBlock>,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
}

impl ForecastEntry {
    fn into_point(self) -> ForecastPoint {
        ForecastPoint {
            timestamp: Utc.timestamp_opt(self.dt, 0).single().unwrap_or_else(Utc::now),
            temperature: self.main.temp,
            humidity: self.main.humidity,
            pressure: self.main.pressure,
            wind_speed: self.wind.speed,
            precipitation: Some(self.rain.as_ref().and_then(PrecipBlock::amount).unwrap_or(0.0)),
            cloud_cover: self.clouds.all,
            condition: self.weather.into_iter().next().and_then(|w| w.main),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::weather::types::WeatherAttribute;

    const CURRENT_SAMPLE: &str = r#"{
        "coord": {"lon": -122.42, "lat": 37.77},
        "weather": [{"id": 500, "main": "Rain", "description": "light rain"}],
        "main": {"temp": 14.2, "pressure": 1009, "humidity": 88},
        "visibility": 8000,
        "wind": {"speed": 6.7, "deg": 240},
        "clouds": {"all": 90},
        "rain": {"1h": 1.3},
        "dt": 1700000000,
        "name": "San Francisco"
    }"#;

    #[test]
    fn test_parse_current_weather() {
        let raw: CurrentResponse = serde_json::from_str(CURRENT_SAMPLE).unwrap();
        let obs = raw.into_observation(Coordinates::new(37.77, -122.42), Some("San Francisco, CA"));

        assert_eq!(obs.location, "San Francisco, CA");
        assert_eq!(obs.get(WeatherAttribute::Temperature), Some(14.2));
        assert_eq!(obs.get(WeatherAttribute::Pressure), Some(1009.0));
        assert_eq!(obs.get(WeatherAttribute::Visibility), Some(8.0));
        assert_eq!(obs.get(WeatherAttribute::Precipitation), Some(1.3));
        assert_eq!(obs.get(WeatherAttribute::CloudCover), Some(90.0));
        assert_eq!(obs.condition.as_deref(), Some("Rain"));
        assert_eq!(obs.observed_at.timestamp(), 1700000000);
    }

    #[test]
    fn test_parse_current_without_rain_or_visibility() {
        let raw: CurrentResponse = serde_json::from_str(
            r#"{"main": {"temp": 30.0, "humidity": 20, "pressure": 1015}, "wind": {"speed": 3.0}}"#,
        )
        .unwrap();
        let obs = raw.into_observation(Coordinates::new(1.0, 2.0), None);

        assert_eq!(obs.location, "1.0000, 2.0000");
        assert_eq!(obs.precipitation, Some(0.0));
        assert_eq!(obs.visibility, None);
        assert_eq!(obs.wind_direction, None);
    }

    #[test]
    fn test_parse_forecast() {
        let raw: ForecastResponse = serde_json::from_str(
            r#"{"list": [
                {"dt": 1700000000, "main": {"temp": 10.0}, "rain": {"3h": 2.5}, "weather": [{"main": "Rain"}]},
                {"dt": 1700010800, "main": {"temp": 11.0}}
            ]}"#,
        )
        .unwrap();
        let points: Vec<ForecastPoint> = raw.list.into_iter().map(ForecastEntry::into_point).collect();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].precipitation, Some(2.5));
        assert_eq!(points[1].precipitation, Some(0.0));
        assert_eq!(points[1].temperature, Some(11.0));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_not_configured() {
        let client = OpenWeatherClient::new(None, Duration::from_secs(1)).unwrap();
        let err = client
            .get_current_weather(0.0, 0.0, None, Units::Metric)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::NotConfigured(_)));
    }
}
