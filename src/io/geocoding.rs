//! Google Maps geocoding and timezone lookup

use crate::domain::types::GeoAddress;
use crate::error::{BriefingError, Result};
use crate::io::Geocoder;
use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const STATUS_OK: &str = "OK";
const STATUS_ZERO_RESULTS: &str = "ZERO_RESULTS";

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    address_components: Vec<AddressComponent>,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimezoneResponse {
    status: String,
    #[serde(default)]
    time_zone_id: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

impl GeocodeResult {
    fn into_address(self) -> GeoAddress {
        let mut address = GeoAddress {
            lat: self.geometry.location.lat,
            lng: self.geometry.location.lng,
            ..Default::default()
        };
        for component in self.address_components {
            let has = |kind: &str| component.types.iter().any(|t| t == kind);
            if has("postal_code") {
                address.zipcode = Some(component.long_name);
            } else if has("locality") {
                address.city = Some(component.long_name);
            } else if has("sublocality") {
                // Locality wins when both are present
                if address.city.is_none() {
                    address.city = Some(component.long_name);
                }
            } else if has("administrative_area_level_1") {
                address.state = Some(component.long_name);
            } else if has("country") {
                address.country = Some(component.long_name);
            }
        }
        address
    }
}

fn geocode_error(e: impl std::fmt::Display) -> BriefingError {
    BriefingError::Geocode(e.to_string())
}

fn api_status_error(status: &str, message: Option<String>) -> BriefingError {
    BriefingError::Geocode(match message {
        Some(message) => format!("{status}: {message}"),
        None => status.to_string(),
    })
}

pub struct GoogleMapsClient {
    endpoint: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl GoogleMapsClient {
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self> {
        if api_key.is_empty() {
            warn!("google_maps_api_key_missing");
        }
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

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        self.http_client
            .get(format!("{}{}", self.endpoint, path))
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(geocode_error)?
            .json::<T>()
            .await
            .map_err(geocode_error)
    }
}

/// Parse a geocode response body into the first matching address
fn first_address(response: GeocodeResponse) -> Result<Option<GeoAddress>> {
    match response.status.as_str() {
        STATUS_OK => Ok(response.results.into_iter().next().map(GeocodeResult::into_address)),
        STATUS_ZERO_RESULTS => Ok(None),
        status => Err(api_status_error(status, response.error_message)),
    }
}

/// Validate a timezone response; unknown zone ids are ignored
fn timezone_of(response: TimezoneResponse) -> Result<Option<Tz>> {
    match response.status.as_str() {
        STATUS_OK => Ok(response.time_zone_id.and_then(|id| match id.parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(_) => {
                warn!(timezone = %id, "timezone_id_unknown");
                None
            }
        })),
        STATUS_ZERO_RESULTS => Ok(None),
        status => Err(api_status_error(status, response.error_message)),
    }
}

#[async_trait]
impl Geocoder for GoogleMapsClient {
    async fn resolve_address(&self, text: &str) -> Result<Option<GeoAddress>> {
        let response: GeocodeResponse =
            self.get("/geocode/json", &[("address", text.to_string())]).await?;
        let address = first_address(response)?;
        debug!(query = %text, found = address.is_some(), "geocode_resolved");
        Ok(address)
    }

    async fn resolve_timezone(&self, lat: f64, lng: f64) -> Result<Option<Tz>> {
        let params = [
            ("location", format!("{},{}", lat, lng)),
            ("timestamp", Utc::now().timestamp().to_string()),
        ];
        let response: TimezoneResponse = self.get("/timezone/json", &params).await?;
        timezone_of(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geocode_body() -> &'static str {
        r#"{
            "status": "OK",
            "results": [{
                "address_components": [
                    {"long_name": "78701", "short_name": "78701", "types": ["postal_code"]},
                    {"long_name": "Downtown", "short_name": "Downtown", "types": ["sublocality", "political"]},
                    {"long_name": "Austin", "short_name": "Austin", "types": ["locality", "political"]},
                    {"long_name": "Texas", "short_name": "TX", "types": ["administrative_area_level_1", "political"]},
                    {"long_name": "United States", "short_name": "US", "types": ["country", "political"]}
                ],
                "geometry": {"location": {"lat": 30.27, "lng": -97.74}}
            }]
        }"#
    }

    #[test]
    fn test_first_address_maps_components() {
        let response: GeocodeResponse = serde_json::from_str(geocode_body()).unwrap();
        let address = first_address(response).unwrap().unwrap();
        assert_eq!(address.city.as_deref(), Some("Austin"));
        assert_eq!(address.state.as_deref(), Some("Texas"));
        assert_eq!(address.country.as_deref(), Some("United States"));
        assert_eq!(address.zipcode.as_deref(), Some("78701"));
        assert_eq!(address.lat, 30.27);
    }

    #[test]
    fn test_zero_results_is_none() {
        let response: GeocodeResponse = serde_json::from_str(r#"{"status": "ZERO_RESULTS", "results": []}"#).unwrap();
        assert!(first_address(response).unwrap().is_none());
    }

    #[test]
    fn test_denied_is_geocode_error() {
        let response: GeocodeResponse = serde_json::from_str(
            r#"{"status": "REQUEST_DENIED", "error_message": "bad key", "results": []}"#,
        )
        .unwrap();
        let err = first_address(response).unwrap_err();
        assert!(matches!(err, BriefingError::Geocode(ref m) if m == "REQUEST_DENIED: bad key"));
    }

    #[test]
    fn test_timezone_validation() {
        let ok: TimezoneResponse =
            serde_json::from_str(r#"{"status": "OK", "timeZoneId": "America/Chicago"}"#).unwrap();
        assert_eq!(timezone_of(ok).unwrap(), Some(Tz::America__Chicago));

        let bogus: TimezoneResponse =
            serde_json::from_str(r#"{"status": "OK", "timeZoneId": "Mars/Olympus"}"#).unwrap();
        assert_eq!(timezone_of(bogus).unwrap(), None);
    }
}
