//! Derived sensor readings
//!
//! Each observation fans out into one reading per sensor kind, keyed
//! `sensor_<location>_<kind>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::weather::{Coordinates, WeatherAttribute, WeatherObservation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Temperature,
    Humidity,
    Pressure,
    Wind,
    Precipitation,
}

impl SensorKind {
    pub const ALL: [SensorKind; 5] = [
        SensorKind::Temperature,
        SensorKind::Humidity,
        SensorKind::Pressure,
        SensorKind::Wind,
        SensorKind::Precipitation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Pressure => "pressure",
            SensorKind::Wind => "wind",
            SensorKind::Precipitation => "precipitation",
        }
    }

    /// (source attribute, unit)
    fn source(&self) -> (WeatherAttribute, &'static str) {
        match self {
            SensorKind::Temperature => (WeatherAttribute::Temperature, "celsius"),
            SensorKind::Humidity => (WeatherAttribute::Humidity, "percent"),
            SensorKind::Pressure => (WeatherAttribute::Pressure, "hPa"),
            SensorKind::Wind => (WeatherAttribute::WindSpeed, "m/s"),
            SensorKind::Precipitation => (WeatherAttribute::Precipitation, "mm"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: String,
    pub kind: SensorKind,
    pub station_id: String,
    pub location: String,
    pub coordinates: Coordinates,
    pub value: f32,
    pub unit: String,
    pub reading_time: DateTime<Utc>,
}

/// `sensor_New_York_NY_wind` for "New York, NY"
pub fn sensor_id(location: &str, kind: SensorKind) -> String {
    format!("sensor_{}_{}", location.replace(' ', "_").replace(',', ""), kind.as_str())
}

/// Readings for every kind whose source attribute is present
pub fn derive_readings(observation: &WeatherObservation) -> Vec<SensorReading> {
    SensorKind::ALL
        .iter()
        .filter_map(|&kind| {
            let (attribute, unit) = kind.source();
            let value = observation.get(attribute)?;
            Some(SensorReading {
                id: sensor_id(&observation.location, kind),
                kind,
                station_id: format!("weather_station_{}", observation.location),
                location: observation.location.clone(),
                coordinates: observation.coordinates,
                value,
                unit: unit.to_string(),
                reading_time: observation.observed_at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_readings() {
        let obs = WeatherObservation::new("New York, NY", Coordinates::new(40.71, -74.0))
            .with(WeatherAttribute::Temperature, 21.0)
            .with(WeatherAttribute::WindSpeed, 6.5)
            .with(WeatherAttribute::Precipitation, 0.0);

        let readings = derive_readings(&obs);
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].id, "sensor_New_York_NY_temperature");
        assert_eq!(readings[1].kind, SensorKind::Wind);
        assert_eq!(readings[1].unit, "m/s");
        assert_eq!(readings[1].value, 6.5);
    }
}
