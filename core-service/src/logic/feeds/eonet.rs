//! NASA EONET Event Feed

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::error::{FeedError, FeedResult};
use super::types::EventRecord;

const EONET_BASE: &str = "https://eonet.gsfc.nasa.gov/api/v3";

#[async_trait]
pub trait EventFeed: Send + Sync {
    async fn fetch_events(
        &self,
        status: &str,
        limit: usize,
        days: Option<u32>,
        category: Option<&str>,
    ) -> FeedResult<Vec<EventRecord>>;
}

pub struct EonetClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl EonetClient {
    pub fn new(timeout: Duration) -> FeedResult<Self> {
        Self::with_base_url(EONET_BASE, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> FeedResult<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }
}

#[async_trait]
impl EventFeed for EonetClient {
    async fn fetch_events(
        &self,
        status: &str,
        limit: usize,
        days: Option<u32>,
        category: Option<&str>,
    ) -> FeedResult<Vec<EventRecord>> {
        let mut query = vec![("status", status.to_string()), ("limit", limit.to_string())];
        if let Some(days) = days {
            query.push(("days", days.to_string()));
        }
        if let Some(category) = category.filter(|c| !c.is_empty()) {
            query.push(("category", category.to_string()));
        }

        let url = format!("{}/events", self.base_url);
        let response = self.http_client.get(&url).query(&query).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        let body: Value = response.json().await?;
        parse_events(&body)
    }
}

/// Parse the response body; malformed items are skipped
pub fn parse_events(body: &Value) -> FeedResult<Vec<EventRecord>> {
    let items = body
        .get("events")
        .and_then(Value::as_array)
        .ok_or_else(|| FeedError::Parse("missing 'events' array".to_string()))?;

    Ok(items.iter().filter_map(parse_item).collect())
}

fn list(item: &Value, key: &str) -> Vec<Value> {
    item.get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn parse_item(item: &Value) -> Option<EventRecord> {
    let id = match item.get("id")? {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    Some(EventRecord {
        id,
        title: item.get("title")?.as_str()?.to_string(),
        status: item
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("open")
            .to_string(),
        link: item.get("link").and_then(Value::as_str).map(str::to_string),
        categories: list(item, "categories"),
        geometry: list(item, "geometry"),
        sources: list(item, "sources"),
        closed: item.get("closed").and_then(Value::as_str).map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_events() {
        let body = json!({
            "title": "EONET Events",
            "events": [
                {
                    "id": "EONET_6512",
                    "title": "Wildfire - Riverside County",
                    "link": "https://eonet.gsfc.nasa.gov/api/v3/events/EONET_6512",
                    "closed": null,
                    "categories": [{"id": "wildfires", "title": "Wildfires"}],
                    "sources": [{"id": "InciWeb", "url": "https://inciweb.example"}],
                    "geometry": [{"type": "Point", "coordinates": [-117.1, 33.9]}]
                },
                { "title": "no id" }
            ]
        });

        let events = parse_events(&body).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "EONET_6512");
        assert_eq!(events[0].status, "open");
        assert_eq!(events[0].closed, None);
        assert_eq!(events[0].category_names(), vec!["wildfires", "wildfires"]);
    }
}
