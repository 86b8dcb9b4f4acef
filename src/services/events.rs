//! Proactive event emitter
//!
//! Selects packages updated after a cutoff whose status warrants a
//! notification and builds one event per physical package. Pure: delivery
//! and persisting the new cutoff belong to the caller.

use crate::domain::event::{DeliveryDetails, OrderState, OrderStatus, ProactiveEvent};
use crate::domain::status::StatusTag;
use crate::domain::types::{AggregatedPackage, DeviceContext};
use crate::services::temporal::end_of_day;
use chrono::{DateTime, Duration, Utc};

/// Reference point for "new since"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    /// Time of the last successfully delivered event batch
    Since(DateTime<Utc>),
    /// Rolling window ending now
    Interval(Duration),
}

impl Cutoff {
    pub fn instant(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Cutoff::Since(at) => at,
            Cutoff::Interval(window) => now - window,
        }
    }
}

/// Notification code for a status, and whether every occurrence notifies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationRule {
    pub status: OrderStatus,
    pub always: bool,
}

pub fn notification_rule(tag: &StatusTag) -> Option<NotificationRule> {
    match tag {
        StatusTag::InTransit => Some(NotificationRule { status: OrderStatus::OrderShipped, always: false }),
        StatusTag::OutForDelivery => {
            Some(NotificationRule { status: OrderStatus::OrderOutForDelivery, always: true })
        }
        StatusTag::Delivered => Some(NotificationRule { status: OrderStatus::OrderDelivered, always: true }),
        _ => None,
    }
}

/// Events for packages that changed after the cutoff
pub fn emit_events(packages: &[AggregatedPackage], ctx: &DeviceContext, cutoff: Cutoff) -> Vec<ProactiveEvent> {
    let now = ctx.now.with_timezone(&Utc);
    let threshold = cutoff.instant(now);
    let expiry = end_of_day(&ctx.now).with_timezone(&Utc);

    let mut events = Vec::new();
    for package in packages {
        if package.last_updated.with_timezone(&Utc) <= threshold {
            continue;
        }
        let Some(rule) = notification_rule(&package.status) else {
            continue;
        };
        if !rule.always && package.occurrence_count != 1 {
            continue;
        }

        let state = OrderState {
            status: rule.status,
            enter_time_stamp: package.last_updated.with_timezone(&Utc),
            delivered_on: match rule.status {
                OrderStatus::OrderDelivered => package.delivery_date.map(|d| d.with_timezone(&Utc)),
                _ => None,
            },
            delivery_details: match rule.status {
                OrderStatus::OrderShipped => package
                    .delivery_date
                    .as_ref()
                    .map(|d| DeliveryDetails { expected_arrival: end_of_day(d).with_timezone(&Utc) }),
                _ => None,
            },
        };

        events.extend(package.member_ids.iter().map(|id| {
            ProactiveEvent::new(id.clone(), now, expiry, state.clone(), package.title.clone())
        }));
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::NormalizedPackage;
    use chrono::TimeZone;
    use chrono_tz::Tz;

    fn ctx() -> DeviceContext {
        // 10:00 US/Eastern
        DeviceContext::new(Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap(), Tz::US__Eastern, None)
    }

    fn package(status: StatusTag, occurrences: usize, minutes_ago: i64) -> AggregatedPackage {
        AggregatedPackage::seed(NormalizedPackage {
            id: "1Z1".to_string(),
            status,
            slug: "ups".to_string(),
            courier_name: Some("UPS".to_string()),
            title: "Books".to_string(),
            delivery_date: Some(Tz::US__Eastern.with_ymd_and_hms(2024, 3, 1, 9, 40, 0).unwrap()),
            delivery_location: None,
            last_updated: ctx().now - Duration::minutes(minutes_ago),
            occurrence_count: occurrences,
        })
    }

    fn half_hour() -> Cutoff {
        Cutoff::Interval(Duration::minutes(30))
    }

    #[test]
    fn test_out_for_delivery_always_notifies() {
        let events = emit_events(&[package(StatusTag::OutForDelivery, 2, 5)], &ctx(), half_hour());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status(), OrderStatus::OrderOutForDelivery);
        assert_eq!(events[0].reference_id, "1Z1");
    }

    #[test]
    fn test_in_transit_notifies_once() {
        assert!(emit_events(&[package(StatusTag::InTransit, 2, 5)], &ctx(), half_hour()).is_empty());

        let events = emit_events(&[package(StatusTag::InTransit, 1, 5)], &ctx(), half_hour());
        assert_eq!(events.len(), 1);
        let state = &events[0].event.payload.state;
        assert_eq!(state.status, OrderStatus::OrderShipped);
        let arrival = state.delivery_details.as_ref().unwrap().expected_arrival;
        // End of 2024-03-01 in US/Eastern
        assert_eq!(arrival, Utc.with_ymd_and_hms(2024, 3, 2, 4, 59, 59).unwrap() + Duration::milliseconds(999));
        assert!(state.delivered_on.is_none());
    }

    #[test]
    fn test_delivered_carries_delivered_on() {
        let events = emit_events(&[package(StatusTag::Delivered, 1, 5)], &ctx(), half_hour());
        let state = &events[0].event.payload.state;
        assert_eq!(state.delivered_on, Some(Utc.with_ymd_and_hms(2024, 3, 1, 14, 40, 0).unwrap()));
        assert!(state.delivery_details.is_none());
    }

    #[test]
    fn test_ineligible_statuses_and_old_updates_skipped() {
        let packages = vec![
            package(StatusTag::Exception, 1, 5),
            package(StatusTag::AvailableForPickup, 1, 5),
            package(StatusTag::Delivered, 1, 45),
        ];
        assert!(emit_events(&packages, &ctx(), half_hour()).is_empty());
    }

    #[test]
    fn test_cutoff_is_strict() {
        let at_cutoff = package(StatusTag::Delivered, 1, 30);
        assert!(emit_events(&[at_cutoff.clone()], &ctx(), half_hour()).is_empty());

        let since = Cutoff::Since((ctx().now - Duration::minutes(31)).with_timezone(&Utc));
        assert_eq!(emit_events(&[at_cutoff], &ctx(), since).len(), 1);
    }

    #[test]
    fn test_one_event_per_member() {
        let mut group = package(StatusTag::OutForDelivery, 1, 5);
        group.add_member("1Z2".to_string());
        group.add_member("1Z3".to_string());
        let events = emit_events(&[group], &ctx(), half_hour());
        let ids: Vec<&str> = events.iter().map(|e| e.reference_id.as_str()).collect();
        assert_eq!(ids, vec!["1Z1", "1Z2", "1Z3"]);
        assert!(events.iter().all(|e| e.localized_attributes[0].seller_name == "Books"));
    }

    #[test]
    fn test_expiry_is_end_of_device_day() {
        let events = emit_events(&[package(StatusTag::Delivered, 1, 5)], &ctx(), half_hour());
        assert_eq!(events[0].timestamp, Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap());
        assert_eq!(
            events[0].expiry_time,
            Utc.with_ymd_and_hms(2024, 3, 2, 4, 59, 59).unwrap() + Duration::milliseconds(999)
        );
    }
}
