//! Package aggregator
//!
//! Folds normalized packages into groups of indistinguishable shipments.
//! Each package gets a composite equivalence key; the key indexes the group
//! list so lookups are O(1) while output keeps first-seen order.

use crate::domain::status::StatusBucket;
use crate::domain::types::{AggregatedPackage, NormalizedPackage};
use crate::services::temporal::start_of_hour;
use chrono::{NaiveDateTime, NaiveTime};
use rustc_hash::FxHashMap;
use serde::Deserialize;

/// Granularity at which delivery dates are considered equal
///
/// `Hour` compares fixed UTC hour buckets, not a sliding one-hour window:
/// 8:59 and 9:01 fall in different buckets and are narrated separately.
/// `Day` compares calendar dates in the device timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateTolerance {
    #[default]
    Hour,
    Day,
}

/// Grouping rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupingPolicy {
    pub date_tolerance: DateTolerance,
    /// AvailableForPickup forms its own bucket instead of joining "expected"
    pub separate_pickup: bool,
}

impl Default for GroupingPolicy {
    fn default() -> Self {
        Self { date_tolerance: DateTolerance::Hour, separate_pickup: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey<'a> {
    bucket: StatusBucket,
    courier: &'a str,
    title: &'a str,
    location: Option<&'a str>,
    date: Option<NaiveDateTime>,
}

impl GroupingPolicy {
    fn key<'a>(&self, package: &'a NormalizedPackage) -> GroupKey<'a> {
        GroupKey {
            bucket: package.status.bucket(self.separate_pickup),
            courier: package.courier(),
            title: &package.title,
            location: package.delivery_location.as_deref(),
            date: package.delivery_date.as_ref().map(|date| match self.date_tolerance {
                DateTolerance::Hour => start_of_hour(date),
                DateTolerance::Day => date.date_naive().and_time(NaiveTime::MIN),
            }),
        }
    }
}

/// Group equivalent packages, keeping first-seen order
pub fn aggregate(packages: &[NormalizedPackage], policy: GroupingPolicy) -> Vec<AggregatedPackage> {
    let mut groups: Vec<AggregatedPackage> = Vec::with_capacity(packages.len());
    let mut index: FxHashMap<GroupKey<'_>, usize> = FxHashMap::default();

    for package in packages {
        match index.get(&policy.key(package)) {
            Some(&slot) => groups[slot].add_member(package.id.clone()),
            None => {
                index.insert(policy.key(package), groups.len());
                groups.push(AggregatedPackage::seed(package.clone()));
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::status::StatusTag;
    use chrono::{DateTime, TimeZone};
    use chrono_tz::Tz;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Tz> {
        Tz::US__Eastern.with_ymd_and_hms(2024, 3, d, h, m, 0).unwrap()
    }

    fn package(id: &str, status: StatusTag, title: &str, date: Option<DateTime<Tz>>) -> NormalizedPackage {
        NormalizedPackage {
            id: id.to_string(),
            status,
            slug: "fedex".to_string(),
            courier_name: Some("FedEx".to_string()),
            title: title.to_string(),
            delivery_date: date,
            delivery_location: Some("Austin, TX".to_string()),
            last_updated: at(1, 9, 0),
            occurrence_count: 1,
        }
    }

    #[test]
    fn test_groups_equivalent_packages() {
        let packages = vec![
            package("a", StatusTag::OutForDelivery, "Shoes", Some(at(1, 8, 0))),
            package("b", StatusTag::OutForDelivery, "Shoes", Some(at(1, 8, 0))),
            package("c", StatusTag::Delivered, "Books", Some(at(1, 8, 0))),
        ];
        let groups = aggregate(&packages, GroupingPolicy::default());

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].count(), 2);
        assert_eq!(groups[0].member_ids.as_slice(), &["a".to_string(), "b".to_string()]);
        assert_eq!(groups[1].count(), 1);
        assert_eq!(groups[1].title, "Books");
    }

    #[test]
    fn test_last_updated_and_occurrence_not_part_of_key() {
        let mut second = package("b", StatusTag::InTransit, "Shoes", None);
        second.last_updated = at(1, 11, 0);
        second.occurrence_count = 4;
        let packages = vec![package("a", StatusTag::InTransit, "Shoes", None), second];

        assert_eq!(aggregate(&packages, GroupingPolicy::default()).len(), 1);
    }

    #[test]
    fn test_expected_statuses_share_a_bucket() {
        let packages = vec![
            package("a", StatusTag::InTransit, "Shoes", Some(at(4, 0, 0))),
            package("b", StatusTag::InfoReceived, "Shoes", Some(at(4, 0, 0))),
            package("c", StatusTag::Unknown("Mystery".to_string()), "Shoes", Some(at(4, 0, 0))),
        ];
        let groups = aggregate(&packages, GroupingPolicy::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].status, StatusTag::InTransit);
        assert_eq!(groups[0].count(), 3);
    }

    #[test]
    fn test_pickup_bucket_follows_policy() {
        let packages = vec![
            package("a", StatusTag::InTransit, "Shoes", None),
            package("b", StatusTag::AvailableForPickup, "Shoes", None),
        ];
        assert_eq!(aggregate(&packages, GroupingPolicy::default()).len(), 2);

        let merged = GroupingPolicy { separate_pickup: false, ..GroupingPolicy::default() };
        assert_eq!(aggregate(&packages, merged).len(), 1);
    }

    #[test]
    fn test_date_tolerance() {
        let packages = vec![
            package("a", StatusTag::Delivered, "Shoes", Some(at(1, 8, 5))),
            package("b", StatusTag::Delivered, "Shoes", Some(at(1, 8, 55))),
            package("c", StatusTag::Delivered, "Shoes", Some(at(1, 14, 0))),
        ];
        let hourly = aggregate(&packages, GroupingPolicy::default());
        assert_eq!(hourly.len(), 2);
        assert_eq!(hourly[0].count(), 2);

        let daily = GroupingPolicy { date_tolerance: DateTolerance::Day, ..GroupingPolicy::default() };
        assert_eq!(aggregate(&packages, daily).len(), 1);
    }

    #[test]
    fn test_hour_buckets_are_fixed_not_sliding() {
        let packages = vec![
            package("a", StatusTag::Delivered, "Shoes", Some(at(1, 8, 59))),
            package("b", StatusTag::Delivered, "Shoes", Some(at(1, 9, 1))),
        ];
        assert_eq!(aggregate(&packages, GroupingPolicy::default()).len(), 2);
    }

    #[test]
    fn test_repeated_dst_hour_is_not_merged() {
        // 1:30 EDT and 1:30 EST on 2024-11-03, an hour apart
        let first = chrono::Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap();
        let second = chrono::Utc.with_ymd_and_hms(2024, 11, 3, 6, 30, 0).unwrap();
        let edt = first.with_timezone(&Tz::US__Eastern);
        let est = second.with_timezone(&Tz::US__Eastern);
        assert_eq!(edt.naive_local(), est.naive_local());

        let packages = vec![
            package("a", StatusTag::Delivered, "Shoes", Some(edt)),
            package("b", StatusTag::Delivered, "Shoes", Some(est)),
        ];
        assert_eq!(aggregate(&packages, GroupingPolicy::default()).len(), 2);
    }

    #[test]
    fn test_null_fields_only_match_null() {
        let mut no_location = package("b", StatusTag::InTransit, "Shoes", None);
        no_location.delivery_location = None;
        let packages = vec![
            package("a", StatusTag::InTransit, "Shoes", None),
            no_location,
            package("c", StatusTag::InTransit, "Shoes", Some(at(4, 0, 0))),
        ];
        assert_eq!(aggregate(&packages, GroupingPolicy::default()).len(), 3);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[], GroupingPolicy::default()).is_empty());
    }
}
