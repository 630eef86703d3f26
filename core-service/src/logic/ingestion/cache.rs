//! Shared caches written by the ingestion loop
//!
//! Every snapshot is immutable behind an `Arc`; replacing one is a pointer
//! swap under a write lock, so readers see either the old or the new
//! snapshot and never a mix.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use super::sensors::{derive_readings, SensorReading};
use crate::logic::feeds::{DeclarationRecord, EventRecord};
use crate::logic::weather::WeatherObservation;

#[derive(Debug, Clone, Default, Serialize)]
pub struct WeatherSnapshot {
    pub observations: Vec<WeatherObservation>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SensorSnapshot {
    pub readings: Vec<SensorReading>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedSnapshot<T> {
    pub records: Vec<T>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for FeedSnapshot<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            updated_at: None,
        }
    }
}

impl<T> FeedSnapshot<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Default)]
struct WeatherSlot {
    weather: Arc<WeatherSnapshot>,
    sensors: Arc<SensorSnapshot>,
}

#[derive(Default)]
pub struct ObservationCache {
    weather: RwLock<WeatherSlot>,
    declarations: RwLock<Arc<FeedSnapshot<DeclarationRecord>>>,
    events: RwLock<Arc<FeedSnapshot<EventRecord>>>,
}

impl ObservationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weather(&self) -> Arc<WeatherSnapshot> {
        Arc::clone(&self.weather.read().weather)
    }

    pub fn sensors(&self) -> Arc<SensorSnapshot> {
        Arc::clone(&self.weather.read().sensors)
    }

    pub fn declarations(&self) -> Arc<FeedSnapshot<DeclarationRecord>> {
        self.declarations.read().clone()
    }

    pub fn events(&self) -> Arc<FeedSnapshot<EventRecord>> {
        self.events.read().clone()
    }

    /// Replace observations and their derived sensors in one swap
    pub fn replace_weather(
        &self,
        observations: Vec<WeatherObservation>,
    ) -> (Arc<WeatherSnapshot>, Arc<SensorSnapshot>) {
        let now = Utc::now();
        let sensors = Arc::new(SensorSnapshot {
            readings: observations.iter().flat_map(derive_readings).collect(),
            updated_at: Some(now),
        });
        let weather = Arc::new(WeatherSnapshot {
            observations,
            updated_at: Some(now),
        });

        let mut slot = self.weather.write();
        slot.weather = Arc::clone(&weather);
        slot.sensors = Arc::clone(&sensors);
        (weather, sensors)
    }

    pub fn replace_declarations(&self, records: Vec<DeclarationRecord>) -> Arc<FeedSnapshot<DeclarationRecord>> {
        let snapshot = Arc::new(FeedSnapshot {
            records,
            updated_at: Some(Utc::now()),
        });
        *self.declarations.write() = Arc::clone(&snapshot);
        snapshot
    }

    pub fn replace_events(&self, records: Vec<EventRecord>) -> Arc<FeedSnapshot<EventRecord>> {
        let snapshot = Arc::new(FeedSnapshot {
            records,
            updated_at: Some(Utc::now()),
        });
        *self.events.write() = Arc::clone(&snapshot);
        snapshot
    }
}
