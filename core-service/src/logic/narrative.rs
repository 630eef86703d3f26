//! Narrative summaries for predictions
//!
//! Best-effort: every implementation returns empty text instead of an error.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::logic::features::HazardType;
use crate::logic::feeds::error::{FeedError, FeedResult};
use crate::logic::weather::WeatherObservation;

const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_MODEL: &str = "gemini-1.5-flash";

#[async_trait]
pub trait Narrator: Send + Sync {
    /// Short analyst summary, or empty text when unavailable
    async fn summarize(
        &self,
        hazard: HazardType,
        location: &str,
        observation: &WeatherObservation,
        score: f32,
    ) -> String;
}

/// Always empty; used when no narrative backend is configured
pub struct SilentNarrator;

#[async_trait]
impl Narrator for SilentNarrator {
    async fn summarize(&self, _: HazardType, _: &str, _: &WeatherObservation, _: f32) -> String {
        String::new()
    }
}

/// Gemini-backed summaries
pub struct GeminiNarrator {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl GeminiNarrator {
    pub fn new(api_key: String, timeout: Duration) -> FeedResult<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            base_url: GEMINI_BASE.to_string(),
            http_client,
        })
    }

    async fn generate(&self, prompt: String) -> FeedResult<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, GEMINI_MODEL);
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        let body: Value = response.json().await?;
        extract_text(&body).ok_or_else(|| FeedError::Parse("no candidate text".to_string()))
    }
}

#[async_trait]
impl Narrator for GeminiNarrator {
    async fn summarize(
        &self,
        hazard: HazardType,
        location: &str,
        observation: &WeatherObservation,
        score: f32,
    ) -> String {
        match self.generate(build_prompt(hazard, location, observation, score)).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Narrative generation failed for {} at {}: {}", hazard, location, e);
                String::new()
            }
        }
    }
}

pub fn build_prompt(hazard: HazardType, location: &str, observation: &WeatherObservation, score: f32) -> String {
    let weather: serde_json::Map<String, Value> = observation
        .named_attributes()
        .into_iter()
        .map(|(name, value)| (name.to_string(), json!(value)))
        .collect();

    format!(
        "You are a disaster risk analyst. Given live weather features and an AI risk score, \
         write a concise (2-3 sentences) professional summary for a potential {hazard} at {location}. \
         Focus on risk drivers (e.g., wind, precipitation), expected timeframe (~24-72h), and a clear actionable note.\n\n\
         Disaster: {hazard}\nLocation: {location}\nRisk score (0-1): {score:.2}\nWeather: {weather}\n",
        hazard = hazard,
        location = location,
        score = score,
        weather = Value::Object(weather),
    )
}

fn extract_text(body: &Value) -> Option<String> {
    let text = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()?
        .trim();
    Some(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::weather::{Coordinates, WeatherAttribute};

    #[test]
    fn test_prompt_mentions_inputs() {
        let obs = WeatherObservation::new("Denver, CO", Coordinates::new(39.7, -104.9))
            .with(WeatherAttribute::WindSpeed, 22.0);
        let prompt = build_prompt(HazardType::Storm, "Denver, CO", &obs, 0.456);

        assert!(prompt.contains("potential storm at Denver, CO"));
        assert!(prompt.contains("Risk score (0-1): 0.46"));
        assert!(prompt.contains("\"wind_speed\":22.0"));
    }

    #[test]
    fn test_extract_text() {
        let body = json!({"candidates": [{"content": {"parts": [{"text": "  Heavy rain expected. "}]}}]});
        assert_eq!(extract_text(&body).as_deref(), Some("Heavy rain expected."));
        assert_eq!(extract_text(&json!({"candidates": []})), None);
    }

    #[tokio::test]
    async fn test_silent_narrator_is_empty() {
        let obs = WeatherObservation::new("x", Coordinates::new(0.0, 0.0));
        assert!(SilentNarrator.summarize(HazardType::Flood, "x", &obs, 0.5).await.is_empty());
    }
}
