//! IO modules - external system interfaces
//!
//! - `aftership` - HTTP tracking source
//! - `geocoding` - HTTP geocoding and timezone lookup
//! - `state` - JSON state file (device attributes, last proactive event)
//!
//! The pipeline only sees the [`TrackingSource`] and [`Geocoder`] traits so
//! tests can swap in in-memory fakes.

pub mod aftership;
pub mod geocoding;
pub mod state;

use crate::domain::types::{CourierNames, GeoAddress, RawTrackingRecord};
use crate::error::Result;
use crate::services::query::TrackingQuery;
use async_trait::async_trait;
use chrono_tz::Tz;

pub use aftership::AftershipClient;
pub use geocoding::GoogleMapsClient;
pub use state::{DeviceState, StateStore, StoredState};

/// Source of tracking records
#[async_trait]
pub trait TrackingSource: Send + Sync {
    /// Courier slug to display name
    async fn fetch_courier_names(&self) -> Result<CourierNames>;

    async fn fetch_trackings(&self, query: &TrackingQuery) -> Result<Vec<RawTrackingRecord>>;
}

/// Address and timezone resolution
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve free text to an address; `Ok(None)` when nothing matched
    async fn resolve_address(&self, text: &str) -> Result<Option<GeoAddress>>;

    /// IANA timezone at the given coordinates
    async fn resolve_timezone(&self, lat: f64, lng: f64) -> Result<Option<Tz>>;
}
