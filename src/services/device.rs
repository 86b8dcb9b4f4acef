//! Device location and timezone resolution
//!
//! The device's configured country/postal code is geocoded, then the
//! timezone at those coordinates is looked up. Failures fall back to the
//! attributes stored by a previous run, then to the default timezone with
//! footnotes telling the listener about it.

use crate::domain::types::{DeviceContext, GeoAddress};
use crate::io::state::DeviceState;
use crate::io::Geocoder;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

pub const LOCATION_FAILED_FOOTNOTE: &str =
    "The device location couldn't be determined. Please check the logs.";

pub fn defaulted_timezone_footnote(tz: Tz) -> String {
    format!("All timestamps are defaulted to {} timezone.", tz)
}

#[derive(Debug, Clone)]
pub struct DeviceResolution {
    pub ctx: DeviceContext,
    pub footnotes: Vec<String>,
    /// Freshly resolved attributes to persist, if the lookup succeeded
    pub resolved: Option<DeviceState>,
}

impl DeviceResolution {
    /// Context from stored attributes only, without any lookup
    pub fn from_stored(stored: Option<&DeviceState>, default_tz: Tz, now: DateTime<Utc>) -> Self {
        match stored {
            Some(device) => {
                let tz = device.tz().unwrap_or(default_tz);
                Self {
                    ctx: DeviceContext::new(now, tz, device.location.clone()),
                    footnotes: Vec::new(),
                    resolved: None,
                }
            }
            None => {
                warn!(timezone = %default_tz, "device_timezone_defaulted");
                Self {
                    ctx: DeviceContext::new(now, default_tz, None),
                    footnotes: vec![
                        defaulted_timezone_footnote(default_tz),
                        LOCATION_FAILED_FOOTNOTE.to_string(),
                    ],
                    resolved: None,
                }
            }
        }
    }
}

async fn lookup(geocoder: &dyn Geocoder, query: &str) -> Option<(GeoAddress, Option<Tz>)> {
    let address = match geocoder.resolve_address(query).await {
        Ok(Some(address)) => address,
        Ok(None) => {
            warn!(query = %query, "device_location_not_found");
            return None;
        }
        Err(e) => {
            warn!(query = %query, error = %e, "device_location_failed");
            return None;
        }
    };

    let tz = match geocoder.resolve_timezone(address.lat, address.lng).await {
        Ok(tz) => tz,
        Err(e) => {
            warn!(error = %e, "device_timezone_failed");
            None
        }
    };
    Some((address, tz))
}

/// Resolve the device context for this run
pub async fn resolve_device(
    geocoder: &dyn Geocoder,
    address_query: Option<&str>,
    stored: Option<&DeviceState>,
    default_tz: Tz,
    now: DateTime<Utc>,
) -> DeviceResolution {
    let found = match address_query {
        Some(query) => lookup(geocoder, query).await,
        None => None,
    };

    let Some((address, tz)) = found else {
        if stored.is_some() {
            warn!("device_using_stored_location");
        }
        return DeviceResolution::from_stored(stored, default_tz, now);
    };

    let tz = tz.or_else(|| stored.and_then(DeviceState::tz)).unwrap_or(default_tz);
    info!(timezone = %tz, city = ?address.city, "device_resolved");

    DeviceResolution {
        ctx: DeviceContext::new(now, tz, Some(address.clone())),
        footnotes: Vec::new(),
        resolved: Some(DeviceState { timezone: tz.name().to_string(), location: Some(address) }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BriefingError, Result};
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct FakeGeocoder {
        address: Option<GeoAddress>,
        tz: Option<Tz>,
        fail: bool,
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn resolve_address(&self, _text: &str) -> Result<Option<GeoAddress>> {
            if self.fail {
                return Err(BriefingError::Geocode("offline".to_string()));
            }
            Ok(self.address.clone())
        }

        async fn resolve_timezone(&self, _lat: f64, _lng: f64) -> Result<Option<Tz>> {
            Ok(self.tz)
        }
    }

    fn austin() -> GeoAddress {
        GeoAddress { city: Some("Austin".to_string()), lat: 30.27, lng: -97.74, ..Default::default() }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_successful_lookup() {
        let geocoder = FakeGeocoder { address: Some(austin()), tz: Some(Tz::America__Chicago), fail: false };
        let res = resolve_device(&geocoder, Some("US,78701"), None, Tz::US__Eastern, now()).await;

        assert_eq!(res.ctx.timezone, Tz::America__Chicago);
        assert_eq!(res.ctx.location, Some(austin()));
        assert!(res.footnotes.is_empty());
        assert_eq!(res.resolved.unwrap().timezone, "America/Chicago");
    }

    #[tokio::test]
    async fn test_failure_uses_stored_state() {
        let geocoder = FakeGeocoder { address: None, tz: None, fail: true };
        let stored = DeviceState { timezone: "America/Denver".to_string(), location: Some(austin()) };
        let res = resolve_device(&geocoder, Some("US,78701"), Some(&stored), Tz::US__Eastern, now()).await;

        assert_eq!(res.ctx.timezone, Tz::America__Denver);
        assert!(res.footnotes.is_empty());
        assert!(res.resolved.is_none());
    }

    #[tokio::test]
    async fn test_failure_without_state_adds_footnotes() {
        let geocoder = FakeGeocoder { address: None, tz: None, fail: false };
        let res = resolve_device(&geocoder, Some("US,78701"), None, Tz::US__Eastern, now()).await;

        assert_eq!(res.ctx.timezone, Tz::US__Eastern);
        assert_eq!(
            res.footnotes,
            vec![
                "All timestamps are defaulted to US/Eastern timezone.".to_string(),
                LOCATION_FAILED_FOOTNOTE.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_timezone_keeps_location() {
        let geocoder = FakeGeocoder { address: Some(austin()), tz: None, fail: false };
        let res = resolve_device(&geocoder, Some("US,78701"), None, Tz::US__Eastern, now()).await;
        assert_eq!(res.ctx.timezone, Tz::US__Eastern);
        assert_eq!(res.ctx.location, Some(austin()));
        assert!(res.footnotes.is_empty());
    }
}
