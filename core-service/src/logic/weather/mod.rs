//! Weather Module - Observation source
//!
//! # Components
//! - `types.rs`: `WeatherObservation`, attributes, forecast/geocode records
//! - `client.rs`: `WeatherProvider` trait, concurrent `get_multiple`, OpenWeather implementation
//! - `locations.rs`: monitored cities

pub mod client;
pub mod locations;
pub mod types;

pub use client::{get_multiple, OpenWeatherClient, WeatherProvider};
pub use locations::default_locations;
pub use types::{
    Coordinates, ForecastPoint, GeocodeCandidate, MonitoredLocation, Units, WeatherAttribute,
    WeatherObservation,
};
