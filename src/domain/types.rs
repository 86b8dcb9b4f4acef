//! Shared types for the tracking pipeline

use crate::domain::status::StatusTag;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::collections::HashMap;

/// Courier slug to display name
pub type CourierNames = HashMap<String, String>;

/// One carrier-reported event in a shipment's history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub tag: Option<StatusTag>,
    /// Carrier timestamp, usually without offset (local to the checkpoint)
    #[serde(default)]
    pub checkpoint_time: Option<String>,
    /// Time the tracking source recorded the checkpoint
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country_name: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
}

impl Checkpoint {
    /// Key used to collapse repeated checkpoints
    pub fn dedup_key(&self) -> Option<&str> {
        self.created_at.as_deref().or(self.checkpoint_time.as_deref())
    }

    /// Present location fields joined with ", "
    pub fn location(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.city, &self.state, &self.country_name, &self.zip]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Tracking record as returned by the tracking source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrackingRecord {
    pub tracking_number: String,
    pub tag: StatusTag,
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub last_updated_at: Option<String>,
    #[serde(default)]
    pub expected_delivery: Option<String>,
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
}

/// One surviving tracking record, timestamps in the device timezone
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPackage {
    pub id: String,
    pub status: StatusTag,
    pub slug: String,
    pub courier_name: Option<String>,
    pub title: String,
    pub delivery_date: Option<DateTime<Tz>>,
    pub delivery_location: Option<String>,
    pub last_updated: DateTime<Tz>,
    /// Unique checkpoints that already reached the current status
    pub occurrence_count: usize,
}

impl NormalizedPackage {
    /// Courier display name, falling back to the slug
    pub fn courier(&self) -> &str {
        self.courier_name.as_deref().unwrap_or(&self.slug)
    }
}

/// Friendly form of a geocoded delivery location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAddress {
    /// Same place as the device
    Here,
    Place(String),
}

/// One or more indistinguishable packages narrated as a unit
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedPackage {
    pub status: StatusTag,
    pub slug: String,
    pub courier_name: Option<String>,
    pub title: String,
    pub delivery_date: Option<DateTime<Tz>>,
    pub delivery_location: Option<String>,
    pub last_updated: DateTime<Tz>,
    pub occurrence_count: usize,
    /// Tracking ids in arrival order
    pub member_ids: SmallVec<[String; 4]>,
    pub resolved_address: Option<ResolvedAddress>,
}

impl AggregatedPackage {
    /// Start a new group from its first member
    pub fn seed(package: NormalizedPackage) -> Self {
        Self {
            status: package.status,
            slug: package.slug,
            courier_name: package.courier_name,
            title: package.title,
            delivery_date: package.delivery_date,
            delivery_location: package.delivery_location,
            last_updated: package.last_updated,
            occurrence_count: package.occurrence_count,
            member_ids: smallvec![package.id],
            resolved_address: None,
        }
    }

    pub fn add_member(&mut self, id: String) {
        self.member_ids.push(id);
    }

    /// Number of physical packages in the group
    #[inline]
    pub fn count(&self) -> usize {
        self.member_ids.len()
    }

    pub fn courier(&self) -> &str {
        self.courier_name.as_deref().unwrap_or(&self.slug)
    }
}

/// Geocoded location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

impl GeoAddress {
    /// Non-coordinate fields as (present value, other's value) pairs
    fn named_fields<'a>(&'a self, other: &'a GeoAddress) -> [(Option<&'a str>, Option<&'a str>); 4] {
        [
            (self.city.as_deref(), other.city.as_deref()),
            (self.state.as_deref(), other.state.as_deref()),
            (self.country.as_deref(), other.country.as_deref()),
            (self.zipcode.as_deref(), other.zipcode.as_deref()),
        ]
    }

    /// True if every named field present here has the same value in `other`
    pub fn same_place_as(&self, other: &GeoAddress) -> bool {
        let fields = self.named_fields(other);
        fields.iter().any(|(mine, _)| mine.is_some())
            && fields.iter().all(|(mine, theirs)| mine.is_none() || mine == theirs)
    }
}

/// Read-only device context threaded through the pipeline
#[derive(Debug, Clone)]
pub struct DeviceContext {
    pub timezone: Tz,
    pub now: DateTime<Tz>,
    pub location: Option<GeoAddress>,
}

impl DeviceContext {
    pub fn new(now: DateTime<Utc>, timezone: Tz, location: Option<GeoAddress>) -> Self {
        Self { timezone, now: now.with_timezone(&timezone), location }
    }

    /// Calendar date of "now" in the device timezone
    #[inline]
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn address(city: Option<&str>, state: Option<&str>, country: Option<&str>) -> GeoAddress {
        GeoAddress {
            city: city.map(String::from),
            state: state.map(String::from),
            country: country.map(String::from),
            zipcode: None,
            lat: 0.0,
            lng: 0.0,
        }
    }

    #[test]
    fn test_checkpoint_location_joins_present_fields() {
        let checkpoint = Checkpoint {
            city: Some("Memphis".to_string()),
            state: Some("TN".to_string()),
            zip: Some("38118".to_string()),
            ..Default::default()
        };
        assert_eq!(checkpoint.location(), Some("Memphis, TN, 38118".to_string()));
        assert_eq!(Checkpoint::default().location(), None);
    }

    #[test]
    fn test_checkpoint_dedup_key_prefers_created_at() {
        let checkpoint = Checkpoint {
            checkpoint_time: Some("2024-03-01T10:00:00".to_string()),
            created_at: Some("2024-03-01T15:00:00Z".to_string()),
            ..Default::default()
        };
        assert_eq!(checkpoint.dedup_key(), Some("2024-03-01T15:00:00Z"));
    }

    #[test]
    fn test_raw_record_deserializes() {
        let json = r#"{
            "tracking_number": "1Z999",
            "tag": "OutForDelivery",
            "slug": "ups",
            "title": "Books",
            "note": null,
            "last_updated_at": "2024-03-01T15:00:00+00:00",
            "expected_delivery": null,
            "checkpoints": [{"tag": "InTransit", "checkpoint_time": "2024-02-29T08:00:00", "city": "Louisville"}]
        }"#;
        let record: RawTrackingRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.tag, StatusTag::OutForDelivery);
        assert_eq!(record.checkpoints.len(), 1);
        assert_eq!(record.checkpoints[0].tag, Some(StatusTag::InTransit));
    }

    #[test]
    fn test_same_place_as() {
        let device = address(Some("Austin"), Some("Texas"), Some("United States"));
        assert!(address(Some("Austin"), Some("Texas"), Some("United States")).same_place_as(&device));
        assert!(address(Some("Austin"), None, None).same_place_as(&device));
        assert!(!address(Some("Dallas"), Some("Texas"), None).same_place_as(&device));
        assert!(!address(None, None, None).same_place_as(&device));
    }

    #[test]
    fn test_aggregated_count_tracks_members() {
        let tz: Tz = "US/Eastern".parse().unwrap();
        let now = tz.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut group = AggregatedPackage::seed(NormalizedPackage {
            id: "a".to_string(),
            status: StatusTag::InTransit,
            slug: "fedex".to_string(),
            courier_name: None,
            title: "Shoes".to_string(),
            delivery_date: None,
            delivery_location: None,
            last_updated: now,
            occurrence_count: 1,
        });
        group.add_member("b".to_string());

        assert_eq!(group.count(), 2);
        assert_eq!(group.member_ids.as_slice(), &["a".to_string(), "b".to_string()]);
        assert_eq!(group.courier(), "fedex");
    }

    #[test]
    fn test_device_context_today_uses_timezone() {
        let tz: Tz = "US/Pacific".parse().unwrap();
        let utc = Utc.with_ymd_and_hms(2024, 3, 2, 3, 0, 0).unwrap();
        let ctx = DeviceContext::new(utc, tz, None);
        assert_eq!(ctx.today(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }
}
