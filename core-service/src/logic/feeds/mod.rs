//! External Feeds Module
//!
//! Disaster declarations (OpenFEMA) and natural hazard events (NASA EONET),
//! plus the known-identifier sets used to detect new records across cycles.

pub mod eonet;
pub mod error;
pub mod known;
pub mod openfema;
pub mod types;

pub use eonet::{EonetClient, EventFeed};
pub use error::{with_timeout, FeedError, FeedResult};
pub use known::KnownIds;
pub use openfema::{DeclarationFeed, OpenFemaClient};
pub use types::{DeclarationRecord, EventRecord, ExternalRecord};
