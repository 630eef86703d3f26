//! Hazard Risk Core - Main Entry Point
//!
//! Loads hazard models, starts the ingestion loop and runs until Ctrl-C.

use std::sync::Arc;

use hazard_risk_core::constants;
use hazard_risk_core::logic::config::PipelineConfig;
use hazard_risk_core::logic::feeds::{EonetClient, OpenFemaClient};
use hazard_risk_core::logic::ingestion::{IngestionLoop, IngestionSources};
use hazard_risk_core::logic::model::training::{SyntheticLabels, TrainingConfig};
use hazard_risk_core::logic::narrative::{GeminiNarrator, Narrator, SilentNarrator};
use hazard_risk_core::logic::registry::{FileModelStore, HazardRegistry};
use hazard_risk_core::logic::state::SharedState;
use hazard_risk_core::logic::weather::OpenWeatherClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}...", constants::APP_NAME, constants::APP_VERSION);

    let config = PipelineConfig::from_env();
    config.log_summary();

    // ========================================================================
    // MODELS
    // ========================================================================

    let training = TrainingConfig::default();
    let registry = HazardRegistry::new(
        Arc::new(FileModelStore::new(config.model_dir.clone())),
        Arc::new(SyntheticLabels::new(training.seed)),
    )
    .with_policy(config.earthquake.clone())
    .with_training(training, config.training.samples);
    let registry = Arc::new(registry);

    let states = registry.initialize();
    log::info!(
        "Models: {}/{} servable from {}",
        registry.servable_count(),
        states.len(),
        config.model_dir.display()
    );

    if config.training.on_startup {
        let trainer = Arc::clone(&registry);
        let (epochs, batch_size) = (config.training.epochs, config.training.batch_size);
        log::info!("Training all hazard models ({} epochs)...", epochs);
        tokio::task::spawn_blocking(move || trainer.train_all(epochs, batch_size)).await?;
        log::info!("Models: {} servable after training", registry.servable_count());
    } else if registry.servable_count() == 0 {
        log::warn!("No trained models found; set TRAIN_ON_STARTUP=true to train them");
    }

    // ========================================================================
    // COLLABORATORS
    // ========================================================================

    let weather = OpenWeatherClient::new(constants::get_openweather_api_key(), config.fetch_timeout)?;
    let sources = IngestionSources {
        weather: Arc::new(weather),
        declarations: Arc::new(OpenFemaClient::new(config.fetch_timeout)?),
        events: Arc::new(EonetClient::new(config.fetch_timeout)?),
    };

    let narrator: Arc<dyn Narrator> = match constants::get_gemini_api_key() {
        Some(key) => {
            log::info!("Narrative summaries enabled");
            Arc::new(GeminiNarrator::new(key, config.fetch_timeout)?)
        }
        None => Arc::new(SilentNarrator),
    };

    // ========================================================================
    // RUN
    // ========================================================================

    let state = SharedState::new(registry, narrator);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let ingestion = Arc::new(IngestionLoop::new(state, sources, config));
    let handle = ingestion.start(shutdown_rx);

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down...");
    let _ = shutdown_tx.send(true);
    handle.await?;

    Ok(())
}
