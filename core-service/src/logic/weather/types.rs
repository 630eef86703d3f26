//! Weather Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Named numeric attributes carried by every observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherAttribute {
    Temperature,
    Humidity,
    Pressure,
    WindSpeed,
    WindDirection,
    Precipitation,
    Visibility,
    CloudCover,
}

impl WeatherAttribute {
    pub const ALL: [WeatherAttribute; 8] = [
        WeatherAttribute::Temperature,
        WeatherAttribute::Humidity,
        WeatherAttribute::Pressure,
        WeatherAttribute::WindSpeed,
        WeatherAttribute::WindDirection,
        WeatherAttribute::Precipitation,
        WeatherAttribute::Visibility,
        WeatherAttribute::CloudCover,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherAttribute::Temperature => "temperature",
            WeatherAttribute::Humidity => "humidity",
            WeatherAttribute::Pressure => "pressure",
            WeatherAttribute::WindSpeed => "wind_speed",
            WeatherAttribute::WindDirection => "wind_direction",
            WeatherAttribute::Precipitation => "precipitation",
            WeatherAttribute::Visibility => "visibility",
            WeatherAttribute::CloudCover => "cloud_cover",
        }
    }
}

impl fmt::Display for WeatherAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation for one location, produced once per ingestion cycle.
///
/// Attributes are optional because providers omit fields; the feature mapper
/// rejects an observation that lacks what a hazard schema needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub location: String,
    pub coordinates: Coordinates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precipitation: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_cover: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl WeatherObservation {
    /// Empty observation; fill attributes with `with`
    pub fn new(location: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            location: location.into(),
            coordinates,
            temperature: None,
            humidity: None,
            pressure: None,
            wind_speed: None,
            wind_direction: None,
            precipitation: None,
            visibility: None,
            cloud_cover: None,
            condition: None,
            observed_at: Utc::now(),
        }
    }

    pub fn with(mut self, attribute: WeatherAttribute, value: f32) -> Self {
        *self.slot(attribute) = Some(value);
        self
    }

    pub fn get(&self, attribute: WeatherAttribute) -> Option<f32> {
        match attribute {
            WeatherAttribute::Temperature => self.temperature,
            WeatherAttribute::Humidity => self.humidity,
            WeatherAttribute::Pressure => self.pressure,
            WeatherAttribute::WindSpeed => self.wind_speed,
            WeatherAttribute::WindDirection => self.wind_direction,
            WeatherAttribute::Precipitation => self.precipitation,
            WeatherAttribute::Visibility => self.visibility,
            WeatherAttribute::CloudCover => self.cloud_cover,
        }
    }

    fn slot(&mut self, attribute: WeatherAttribute) -> &mut Option<f32> {
        match attribute {
            WeatherAttribute::Temperature => &mut self.temperature,
            WeatherAttribute::Humidity => &mut self.humidity,
            WeatherAttribute::Pressure => &mut self.pressure,
            WeatherAttribute::WindSpeed => &mut self.wind_speed,
            WeatherAttribute::WindDirection => &mut self.wind_direction,
            WeatherAttribute::Precipitation => &mut self.precipitation,
            WeatherAttribute::Visibility => &mut self.visibility,
            WeatherAttribute::CloudCover => &mut self.cloud_cover,
        }
    }

    /// All present attributes as (name, value), in canonical order
    pub fn named_attributes(&self) -> Vec<(&'static str, f32)> {
        WeatherAttribute::ALL
            .iter()
            .filter_map(|attr| self.get(*attr).map(|v| (attr.as_str(), v)))
            .collect()
    }
}

/// Unit system requested from the weather provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    /// Lenient parse; anything unknown falls back to metric
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "imperial" => Units::Imperial,
            "standard" => Units::Standard,
            _ => Units::Metric,
        }
    }
}

/// One forecast step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    pub pressure: Option<f32>,
    pub wind_speed: Option<f32>,
    pub precipitation: Option<f32>,
    pub cloud_cover: Option<f32>,
    pub condition: Option<String>,
}

/// Geocoding candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeCandidate {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl GeocodeCandidate {
    /// "Name, State Country"
    pub fn display_name(&self) -> String {
        let mut name = self.name.clone();
        if let Some(state) = self.state.as_deref().filter(|s| !s.is_empty()) {
            name.push_str(", ");
            name.push_str(state);
        }
        if let Some(country) = self.country.as_deref().filter(|s| !s.is_empty()) {
            name.push(' ');
            name.push_str(country);
        }
        name
    }
}

/// A location polled by the ingestion loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredLocation {
    pub name: String,
    pub coordinates: Coordinates,
}

impl MonitoredLocation {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: name.into(),
            coordinates: Coordinates::new(lat, lng),
        }
    }
}
