//! Tracking query builder
//!
//! Turns a spoken keyword into exactly one tracking-source filter:
//! courier slug, status tag, or free-text keyword.

use crate::domain::status::StatusTag;
use crate::domain::types::CourierNames;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tracing::debug;

/// Record fields requested from the tracking source
pub const TRACKING_FIELDS: &str =
    "tracking_number,title,slug,tag,last_updated_at,expected_delivery,note,checkpoints";

/// Separator between slugs sharing one display name
const SLUG_SEPARATOR: &str = ",";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingFilter {
    /// Everything in the lookback window
    All,
    Slug(String),
    Tag(StatusTag),
    Keyword(String),
}

/// Query descriptor consumed by the tracking source
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingQuery {
    /// Keyword with any leading preposition removed, for display
    pub keyword: Option<String>,
    pub filter: TrackingFilter,
    pub created_at_min: DateTime<Utc>,
}

impl TrackingQuery {
    /// Query without any filter
    pub fn unfiltered(now: DateTime<Utc>, days_search: u32) -> Self {
        // Saturates at the earliest representable instant instead of overflowing
        let created_at_min = Duration::try_days(i64::from(days_search))
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { keyword: None, filter: TrackingFilter::All, created_at_min }
    }

    /// Request parameters for the tracking source
    pub fn parameters(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("created_at_min", self.created_at_min.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("fields", TRACKING_FIELDS.to_string()),
        ];
        match &self.filter {
            TrackingFilter::All => {}
            TrackingFilter::Slug(slug) => params.push(("slug", slug.clone())),
            TrackingFilter::Tag(tag) => params.push(("tag", tag.to_string())),
            TrackingFilter::Keyword(keyword) => params.push(("keyword", keyword.clone())),
        }
        params
    }

    /// Status tag filter, if one is active
    pub fn tag(&self) -> Option<&StatusTag> {
        match &self.filter {
            TrackingFilter::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    /// True when results are limited by courier or free text
    pub fn is_source_filtered(&self) -> bool {
        matches!(self.filter, TrackingFilter::Slug(_) | TrackingFilter::Keyword(_))
    }
}

/// Build the query for a spoken keyword
pub fn build_query(
    keyword: Option<&str>,
    couriers: &CourierNames,
    now: DateTime<Utc>,
    days_search: u32,
) -> TrackingQuery {
    let mut query = TrackingQuery::unfiltered(now, days_search);

    let Some(keyword) = keyword.map(strip_preposition).filter(|k| !k.is_empty()) else {
        debug!(created_at_min = %query.created_at_min, "tracking_query_unfiltered");
        return query;
    };

    let mut slugs: Vec<&str> = couriers
        .iter()
        .filter(|(_, name)| name.to_lowercase() == keyword.to_lowercase())
        .map(|(slug, _)| slug.as_str())
        .collect();
    slugs.sort_unstable();

    query.filter = if !slugs.is_empty() {
        TrackingFilter::Slug(slugs.join(SLUG_SEPARATOR))
    } else if let Some(tag) = StatusTag::known(&pascal_case(keyword)) {
        TrackingFilter::Tag(tag)
    } else {
        TrackingFilter::Keyword(keyword.to_string())
    };
    query.keyword = Some(keyword.to_string());

    debug!(keyword = %keyword, filter = ?query.filter, "tracking_query_built");
    query
}

/// Remove a leading "from " / "for " (any case)
fn strip_preposition(keyword: &str) -> &str {
    let keyword = keyword.trim();
    for preposition in ["from", "for"] {
        let Some(head) = keyword.get(..preposition.len()) else {
            continue;
        };
        let rest = &keyword[preposition.len()..];
        if head.eq_ignore_ascii_case(preposition) && rest.starts_with(char::is_whitespace) {
            return rest.trim_start();
        }
    }
    keyword
}

/// "out for delivery" -> "OutForDelivery"
fn pascal_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
