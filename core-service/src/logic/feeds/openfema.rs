//! OpenFEMA Declaration Feed

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::Value;
use std::time::Duration;

use super::error::{FeedError, FeedResult};
use super::types::DeclarationRecord;

const OPENFEMA_BASE: &str = "https://www.fema.gov/api/open/v2";
const COLLECTION: &str = "DisasterDeclarationsSummaries";

#[async_trait]
pub trait DeclarationFeed: Send + Sync {
    /// Declarations from the last `days` days, newest first, at most `top`
    async fn fetch_recent(
        &self,
        days: u32,
        state: Option<&str>,
        top: usize,
    ) -> FeedResult<Vec<DeclarationRecord>>;
}

pub struct OpenFemaClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl OpenFemaClient {
    pub fn new(timeout: Duration) -> FeedResult<Self> {
        Self::with_base_url(OPENFEMA_BASE, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> FeedResult<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }
}

/// OData `$filter` for the lookback window and optional state
pub fn build_filter(days: u32, state: Option<&str>) -> String {
    let since = (Utc::now() - ChronoDuration::days(i64::from(days))).format("%Y-%m-%d");
    let mut filters = vec![format!("declarationDate ge '{}'", since)];
    if let Some(state) = state.filter(|s| !s.trim().is_empty()) {
        filters.push(format!("state eq '{}'", state.trim().to_uppercase()));
    }
    filters.join(" and ")
}

#[async_trait]
impl DeclarationFeed for OpenFemaClient {
    async fn fetch_recent(
        &self,
        days: u32,
        state: Option<&str>,
        top: usize,
    ) -> FeedResult<Vec<DeclarationRecord>> {
        let url = format!("{}/{}", self.base_url, COLLECTION);
        let query = [
            ("$filter", build_filter(days, state)),
            ("$orderby", "declarationDate desc".to_string()),
            ("$top", top.to_string()),
        ];

        let response = self.http_client.get(&url).query(&query).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        let body: Value = response.json().await?;
        parse_declarations(&body)
    }
}

/// Parse the response body; malformed items are skipped
pub fn parse_declarations(body: &Value) -> FeedResult<Vec<DeclarationRecord>> {
    let items = body
        .get(COLLECTION)
        .and_then(Value::as_array)
        .ok_or_else(|| FeedError::Parse(format!("missing '{}' array", COLLECTION)))?;

    let records: Vec<DeclarationRecord> = items.iter().filter_map(parse_item).collect();
    if records.len() < items.len() {
        log::debug!("OpenFEMA: skipped {} malformed items", items.len() - records.len());
    }
    Ok(records)
}

fn text(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_item(item: &Value) -> Option<DeclarationRecord> {
    let disaster_number = item.get("disasterNumber")?.as_i64()?;
    let id = text(item, "id").unwrap_or_else(|| disaster_number.to_string());
    let incident_type = text(item, "incidentType")?;

    Some(DeclarationRecord {
        id,
        disaster_number,
        declaration_date: text(item, "declarationDate")?,
        state: text(item, "state")?,
        title: text(item, "title").or_else(|| Some(incident_type.clone())),
        incident_type,
        declaration_type: text(item, "declarationType"),
        county: text(item, "declaredCountyArea"),
        place_code: text(item, "placeCode"),
        fema_region: text(item, "femaRegion"),
        incident_begin_date: text(item, "incidentBeginDate"),
        incident_end_date: text(item, "incidentEndDate"),
    })
}
