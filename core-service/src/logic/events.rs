//! Event Broadcaster - Topic-based Fan-out
//!
//! One `tokio::sync::broadcast` channel per topic. Publishing is best-effort:
//! no subscribers or lagging subscribers never fail the publisher.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::logic::feeds::{DeclarationRecord, EventRecord};
use crate::logic::ingestion::cache::{FeedSnapshot, SensorSnapshot, WeatherSnapshot};
use crate::logic::ingestion::prediction::RiskPrediction;

/// Event names
pub mod names {
    pub const WEATHER_UPDATE: &str = "weather_update";
    pub const SENSOR_UPDATE: &str = "sensor_update";
    pub const NEW_PREDICTION: &str = "new_prediction";
    pub const DISASTERS_UPDATE: &str = "disasters_update";
    pub const NEW_DISASTER: &str = "new_disaster";
    pub const EONET_UPDATE: &str = "eonet_update";
    pub const NEW_EONET_EVENT: &str = "new_eonet_event";
}

/// Default per-topic buffer
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Weather,
    Sensors,
    Predictions,
    Declarations,
    Events,
}

impl Topic {
    pub const ALL: [Topic; 5] = [
        Topic::Weather,
        Topic::Sensors,
        Topic::Predictions,
        Topic::Declarations,
        Topic::Events,
    ];
}

/// Snapshots are shared, not copied, per subscriber
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Weather(Arc<WeatherSnapshot>),
    Sensors(Arc<SensorSnapshot>),
    Prediction(Arc<RiskPrediction>),
    Declarations(Arc<FeedSnapshot<DeclarationRecord>>),
    Declaration(Arc<DeclarationRecord>),
    Events(Arc<FeedSnapshot<EventRecord>>),
    Event(Arc<EventRecord>),
}

#[derive(Debug, Clone, Serialize)]
pub struct BroadcastEvent {
    pub name: &'static str,
    pub topic: Topic,
    pub payload: Payload,
    pub emitted_at: DateTime<Utc>,
}

pub struct Broadcaster {
    channels: HashMap<Topic, broadcast::Sender<BroadcastEvent>>,
    published: Mutex<BTreeMap<&'static str, u64>>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let channels = Topic::ALL
            .into_iter()
            .map(|topic| (topic, broadcast::channel(capacity.max(1)).0))
            .collect();
        Self {
            channels,
            published: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn subscribe(&self, topic: Topic) -> Option<broadcast::Receiver<BroadcastEvent>> {
        self.channels.get(&topic).map(|tx| tx.subscribe())
    }

    /// Deliver to current subscribers; returns how many received it
    pub fn publish(&self, topic: Topic, name: &'static str, payload: Payload) -> usize {
        *self.published.lock().entry(name).or_insert(0) += 1;

        let Some(tx) = self.channels.get(&topic) else {
            return 0;
        };
        let event = BroadcastEvent {
            name,
            topic,
            payload,
            emitted_at: Utc::now(),
        };
        match tx.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                log::debug!("No subscribers for '{}', event dropped", name);
                0
            }
        }
    }

    /// How many times `name` was published
    pub fn published(&self, name: &str) -> u64 {
        self.published.lock().get(name).copied().unwrap_or(0)
    }

    pub fn publish_counts(&self) -> BTreeMap<&'static str, u64> {
        self.published.lock().clone()
    }

    pub fn emit_weather_update(&self, snapshot: Arc<WeatherSnapshot>) {
        self.publish(Topic::Weather, names::WEATHER_UPDATE, Payload::Weather(snapshot));
    }

    pub fn emit_sensor_update(&self, snapshot: Arc<SensorSnapshot>) {
        self.publish(Topic::Sensors, names::SENSOR_UPDATE, Payload::Sensors(snapshot));
    }

    pub fn emit_new_prediction(&self, prediction: Arc<RiskPrediction>) {
        self.publish(Topic::Predictions, names::NEW_PREDICTION, Payload::Prediction(prediction));
    }

    pub fn emit_disasters_update(&self, snapshot: Arc<FeedSnapshot<DeclarationRecord>>) {
        self.publish(Topic::Declarations, names::DISASTERS_UPDATE, Payload::Declarations(snapshot));
    }

    pub fn emit_new_disaster(&self, record: DeclarationRecord) {
        self.publish(Topic::Declarations, names::NEW_DISASTER, Payload::Declaration(Arc::new(record)));
    }

    pub fn emit_eonet_update(&self, snapshot: Arc<FeedSnapshot<EventRecord>>) {
        self.publish(Topic::Events, names::EONET_UPDATE, Payload::Events(snapshot));
    }

    pub fn emit_new_eonet_event(&self, record: EventRecord) {
        self.publish(Topic::Events, names::NEW_EONET_EVENT, Payload::Event(Arc::new(record)));
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
