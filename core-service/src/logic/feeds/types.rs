//! External Feed Types

use serde::{Deserialize, Serialize};

/// Anything with a stable identifier used for cross-cycle deduplication
pub trait ExternalRecord {
    fn record_id(&self) -> &str;
}

/// Disaster declaration (OpenFEMA DisasterDeclarationsSummaries)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationRecord {
    pub id: String,
    pub disaster_number: i64,
    pub declaration_date: String,
    pub state: String,
    pub incident_type: String,
    pub declaration_type: Option<String>,
    pub title: Option<String>,
    pub county: Option<String>,
    pub place_code: Option<String>,
    pub fema_region: Option<String>,
    pub incident_begin_date: Option<String>,
    pub incident_end_date: Option<String>,
}

impl ExternalRecord for DeclarationRecord {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Natural hazard event (NASA EONET v3)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    pub status: String,
    pub link: Option<String>,
    #[serde(default)]
    pub categories: Vec<serde_json::Value>,
    #[serde(default)]
    pub geometry: Vec<serde_json::Value>,
    #[serde(default)]
    pub sources: Vec<serde_json::Value>,
    pub closed: Option<String>,
}

impl EventRecord {
    /// Category ids/titles, lowercase
    pub fn category_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .flat_map(|c| {
                ["id", "title"]
                    .iter()
                    .filter_map(|k| c.get(*k).and_then(|v| v.as_str()).map(str::to_lowercase))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl ExternalRecord for EventRecord {
    fn record_id(&self) -> &str {
        &self.id
    }
}
