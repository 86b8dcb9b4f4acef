//! Delivery address resolution
//!
//! Each distinct delivery location is geocoded once, concurrently. Lookup
//! failures only withhold the friendly address for the affected packages.

use crate::domain::types::{AggregatedPackage, DeviceContext, GeoAddress, ResolvedAddress};
use crate::error::BriefingError;
use crate::infra::metrics::Metrics;
use crate::io::Geocoder;
use futures::future::join_all;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

#[cold]
fn log_geocode_failed(location: &str, e: &BriefingError) {
    warn!(location = %location, error = %e, "geocode_failed_ignored");
}

/// Friendly form of a geocoded address relative to the device
///
/// | condition                                         | result            |
/// |---------------------------------------------------|-------------------|
/// | device location known, same place                 | `Here`            |
/// | domestic (no country or default), city and state  | "{city}, {state}" |
/// | domestic, city only                               | "{city}"          |
/// | foreign, city and country                         | "{city}, {country}" |
/// | foreign, country only                             | "{country}"       |
/// | otherwise                                         | none              |
pub fn classify(
    address: &GeoAddress,
    device: Option<&GeoAddress>,
    default_country: &str,
) -> Option<ResolvedAddress> {
    if device.is_some_and(|device| address.same_place_as(device)) {
        return Some(ResolvedAddress::Here);
    }

    let city = address.city.as_deref().filter(|s| !s.is_empty());
    let state = address.state.as_deref().filter(|s| !s.is_empty());
    let country = address.country.as_deref().filter(|s| !s.is_empty());
    let domestic = country.map_or(true, |c| c == default_country);

    let text = match (domestic, city, state, country) {
        (true, Some(city), Some(state), _) => format!("{}, {}", city, state),
        (true, Some(city), None, _) => city.to_string(),
        (false, Some(city), _, Some(country)) => format!("{}, {}", city, country),
        (false, None, _, Some(country)) => country.to_string(),
        _ => return None,
    };
    Some(ResolvedAddress::Place(text))
}

/// Attach resolved addresses to packages with a delivery location
pub async fn resolve_addresses(
    packages: &mut [AggregatedPackage],
    geocoder: &dyn Geocoder,
    ctx: &DeviceContext,
    default_country: &str,
    metrics: &Metrics,
) {
    let mut locations: Vec<String> = Vec::new();
    for location in packages.iter().filter_map(|p| p.delivery_location.as_ref()) {
        if !locations.contains(location) {
            locations.push(location.clone());
        }
    }
    if locations.is_empty() {
        return;
    }

    let lookups = locations.iter().map(|location| geocoder.resolve_address(location));
    let results = join_all(lookups).await;

    let mut resolved: FxHashMap<&str, ResolvedAddress> = FxHashMap::default();
    for (location, result) in locations.iter().zip(results) {
        match result {
            Ok(Some(address)) => {
                if let Some(friendly) = classify(&address, ctx.location.as_ref(), default_country) {
                    resolved.insert(location.as_str(), friendly);
                }
            }
            Ok(None) => debug!(location = %location, "geocode_no_match"),
            Err(e) => {
                metrics.record_geocode_failure();
                log_geocode_failed(location, &e);
            }
        }
    }

    for package in packages.iter_mut() {
        package.resolved_address = package
            .delivery_location
            .as_deref()
            .and_then(|location| resolved.get(location).cloned());
    }
}
