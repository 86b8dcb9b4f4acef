//! AfterShip tracking source over HTTP
//!
//! Records are decoded one at a time so a single malformed entry is skipped
//! instead of failing the whole response.

use crate::domain::types::{CourierNames, RawTrackingRecord};
use crate::error::{BriefingError, Result};
use crate::io::TrackingSource;
use crate::services::query::TrackingQuery;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const API_KEY_HEADER: &str = "aftership-api-key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[cold]
fn log_record_skipped(index: usize, e: &serde_json::Error) {
    warn!(index = index, error = %e, "tracking_record_undecodable");
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct CouriersData {
    #[serde(default)]
    couriers: Vec<Courier>,
}

#[derive(Debug, Deserialize)]
struct Courier {
    slug: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TrackingsData {
    #[serde(default)]
    trackings: Vec<Value>,
}

pub struct AftershipClient {
    endpoint: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl AftershipClient {
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self> {
        // Create HTTP client once for reuse (connection pooling)
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BriefingError::Configuration(format!("http client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http_client,
        })
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let response = self
            .http_client
            .get(format!("{}{}", self.endpoint, path))
            .header(API_KEY_HEADER, &self.api_key)
            .query(params)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Value>().await?)
    }
}

/// Decode each tracking entry, skipping the ones that don't fit
pub fn decode_trackings(entries: Vec<Value>) -> Vec<RawTrackingRecord> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                log_record_skipped(index, &e);
                None
            }
        })
        .collect()
}

fn unexpected_body(e: serde_json::Error) -> BriefingError {
    BriefingError::SourceFetch(format!("unexpected response body: {e}"))
}

#[async_trait]
impl TrackingSource for AftershipClient {
    async fn fetch_courier_names(&self) -> Result<CourierNames> {
        let body = self.get("/couriers/all", &[]).await?;
        let envelope: Envelope<CouriersData> = serde_json::from_value(body).map_err(unexpected_body)?;
        let couriers: CourierNames =
            envelope.data.couriers.into_iter().map(|c| (c.slug, c.name)).collect();
        debug!(couriers = couriers.len(), "courier_names_fetched");
        Ok(couriers)
    }

    async fn fetch_trackings(&self, query: &TrackingQuery) -> Result<Vec<RawTrackingRecord>> {
        let body = self.get("/trackings", &query.parameters()).await?;
        let envelope: Envelope<TrackingsData> = serde_json::from_value(body).map_err(unexpected_body)?;
        Ok(decode_trackings(envelope.data.trackings))
    }
}
