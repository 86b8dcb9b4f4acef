//! Package ranking
//!
//! Closest delivery date first (past or future), definitive statuses first
//! among equal distances, undated packages last in their original order.

use crate::domain::types::AggregatedPackage;
use crate::services::temporal::days_from_today;
use chrono::NaiveDate;
use std::cmp::{Ordering, Reverse};

/// Distance in calendar days from today, if dated
#[inline]
pub fn day_distance(package: &AggregatedPackage, today: NaiveDate) -> Option<i64> {
    package.delivery_date.as_ref().map(|date| days_from_today(date, today).abs())
}

fn compare(a: &AggregatedPackage, b: &AggregatedPackage, today: NaiveDate) -> Ordering {
    match (day_distance(a, today), day_distance(b, today)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(da), Some(db)) => (da, Reverse(a.status.priority()))
            .cmp(&(db, Reverse(b.status.priority()))),
    }
}

/// Stable in-place ranking
pub fn rank(packages: &mut [AggregatedPackage], today: NaiveDate) {
    packages.sort_by(|a, b| compare(a, b, today));
}

/// Keep only the first `limit` packages
pub fn limit(packages: &mut Vec<AggregatedPackage>, limit: usize) {
    packages.truncate(limit);
}
