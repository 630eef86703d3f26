//! Ingestion Loop
//!
//! Every period: fetch weather and both external feeds concurrently, swap the
//! caches, score each observation, and publish snapshots and deltas. A
//! failing source is skipped for the cycle; a failing (even panicking) cycle
//! is logged and the loop carries on.

pub mod cache;
pub mod prediction;
pub mod sensors;


use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::logic::config::PipelineConfig;
use crate::logic::feeds::{
    with_timeout, DeclarationFeed, DeclarationRecord, EventFeed, EventRecord, FeedResult, KnownIds,
};
use crate::logic::model::threshold::is_reportable;
use crate::logic::state::SharedState;
use crate::logic::weather::{get_multiple, WeatherObservation, WeatherProvider};
use prediction::{RiskPrediction, TIMEFRAME_INGESTION};

/// External collaborators polled each cycle
#[derive(Clone)]
pub struct IngestionSources {
    pub weather: Arc<dyn WeatherProvider>,
    pub declarations: Arc<dyn DeclarationFeed>,
    pub events: Arc<dyn EventFeed>,
}

/// Outcome of one cycle; `None` means the feed was unavailable
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub observations: usize,
    pub predictions: usize,
    pub declarations: Option<usize>,
    pub new_declarations: usize,
    pub events: Option<usize>,
    pub new_events: usize,
    pub elapsed: Duration,
}

pub struct IngestionLoop {
    state: SharedState,
    sources: IngestionSources,
    config: PipelineConfig,
    known_declarations: Mutex<KnownIds>,
    known_events: Mutex<KnownIds>,
    started: AtomicU64,
    completed: AtomicU64,
}

impl IngestionLoop {
    pub fn new(state: SharedState, sources: IngestionSources, config: PipelineConfig) -> Self {
        Self {
            state,
            sources,
            config,
            known_declarations: Mutex::new(KnownIds::new()),
            known_events: Mutex::new(KnownIds::new()),
            started: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        }
    }

    pub fn cycles_completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Spawn the periodic loop; stops when `shutdown` turns true or its sender drops
    pub fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            log::info!("Ingestion loop started (every {:?})", self.config.interval);

            while !*shutdown.borrow() {
                // Own task so a panic surfaces as a JoinError instead of killing the loop
                let this = Arc::clone(&self);
                match tokio::spawn(async move { this.run_cycle().await }).await {
                    Ok(report) => log_report(&report),
                    Err(e) => log::error!("Ingestion cycle aborted: {}", e),
                }

                tokio::select! {
                    _ = tokio::time::sleep(self.config.interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }

            log::info!("Ingestion loop stopped after {} cycles", self.cycles_completed());
        })
    }

    /// One full cycle. Never fails; unavailable sources are logged and skipped.
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let cycle = self.started.fetch_add(1, Ordering::Relaxed) + 1;
        let config = &self.config;

        let (observations, declarations, events) = tokio::join!(
            get_multiple(&self.sources.weather, &config.locations, config.units),
            with_timeout(
                config.fetch_timeout,
                self.sources
                    .declarations
                    .fetch_recent(config.lookback_days, None, config.feed_limit),
            ),
            with_timeout(
                config.fetch_timeout,
                self.sources.events.fetch_events(
                    &config.event_status,
                    config.feed_limit,
                    Some(config.lookback_days),
                    None,
                ),
            ),
        );

        let mut report = CycleReport {
            cycle,
            observations: observations.len(),
            ..Default::default()
        };

        report.predictions = self.ingest_weather(observations).await;
        (report.declarations, report.new_declarations) = self.ingest_declarations(declarations);
        (report.events, report.new_events) = self.ingest_events(events);

        report.elapsed = started.elapsed();
        self.completed.fetch_add(1, Ordering::Relaxed);
        report
    }

    /// Swap caches and score; an empty result leaves the previous cache in place
    async fn ingest_weather(&self, observations: Vec<WeatherObservation>) -> usize {
        if observations.is_empty() {
            log::warn!("No weather observations this cycle; keeping previous cache");
            return 0;
        }

        let (weather, sensors) = self.state.cache.replace_weather(observations);
        self.state.broadcaster.emit_weather_update(Arc::clone(&weather));
        self.state.broadcaster.emit_sensor_update(sensors);

        // Narratives for the whole cycle run concurrently, then record in order
        let mut reportable = Vec::new();
        for (index, observation) in weather.observations.iter().enumerate() {
            for (hazard, score) in self.state.registry.predict_all(observation) {
                if is_reportable(score, self.config.reporting_threshold) {
                    reportable.push((index, hazard, score));
                }
            }
        }

        let requests = reportable
            .iter()
            .map(|&(index, hazard, score)| (hazard, score, weather.observations[index].clone()))
            .collect();
        let narratives = self
            .state
            .narrate_batch(requests, self.config.fetch_timeout)
            .await;

        let recorded = reportable.len();
        for ((index, hazard, score), narrative) in reportable.into_iter().zip(narratives) {
            self.state.record_prediction(RiskPrediction::new(
                hazard,
                score,
                &weather.observations[index],
                TIMEFRAME_INGESTION,
                narrative,
            ));
        }
        recorded
    }

    fn ingest_declarations(
        &self,
        fetched: FeedResult<Vec<DeclarationRecord>>,
    ) -> (Option<usize>, usize) {
        let records = match fetched {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Declaration feed unavailable this cycle: {}", e);
                return (None, 0);
            }
        };

        let fresh: Vec<_> = self
            .known_declarations
            .lock()
            .register(&records)
            .into_iter()
            .cloned()
            .collect();
        let total = records.len();

        let broadcaster = &self.state.broadcaster;
        broadcaster.emit_disasters_update(self.state.cache.replace_declarations(records));
        let new_count = fresh.len();
        for record in fresh {
            broadcaster.emit_new_disaster(record);
        }
        (Some(total), new_count)
    }

    fn ingest_events(
        &self,
        fetched: FeedResult<Vec<EventRecord>>,
    ) -> (Option<usize>, usize) {
        let records = match fetched {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Event feed unavailable this cycle: {}", e);
                return (None, 0);
            }
        };

        let fresh: Vec<_> = self
            .known_events
            .lock()
            .register(&records)
            .into_iter()
            .cloned()
            .collect();
        let total = records.len();

        let broadcaster = &self.state.broadcaster;
        broadcaster.emit_eonet_update(self.state.cache.replace_events(records));
        let new_count = fresh.len();
        for record in fresh {
            broadcaster.emit_new_eonet_event(record);
        }
        (Some(total), new_count)
    }
}

fn log_report(report: &CycleReport) {
    let feed = |n: Option<usize>| n.map(|n| n.to_string()).unwrap_or_else(|| "unavailable".to_string());
    log::info!(
        "Cycle {}: {} observations, {} predictions, declarations {} ({} new), events {} ({} new) in {:?}",
        report.cycle,
        report.observations,
        report.predictions,
        feed(report.declarations),
        report.new_declarations,
        feed(report.events),
        report.new_events,
        report.elapsed
    );
}
