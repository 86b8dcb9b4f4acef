//! Proactive order-status notification payloads
//!
//! Serialized shape matches the voice platform's `AMAZON.OrderStatus.Updated`
//! schema; delivery of these objects is left to the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const ORDER_STATUS_EVENT: &str = "AMAZON.OrderStatus.Updated";
const SELLER_NAME_ATTRIBUTE: &str = "localizedattribute:sellerName";
const DEFAULT_LOCALE: &str = "en-US";

/// Status transition announced by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    OrderShipped,
    OrderOutForDelivery,
    OrderDelivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::OrderShipped => "ORDER_SHIPPED",
            OrderStatus::OrderOutForDelivery => "ORDER_OUT_FOR_DELIVERY",
            OrderStatus::OrderDelivered => "ORDER_DELIVERED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProactiveEvent {
    pub timestamp: DateTime<Utc>,
    /// Tracking number of the physical package
    pub reference_id: String,
    pub expiry_time: DateTime<Utc>,
    pub event: EventBody,
    pub localized_attributes: Vec<LocalizedAttributes>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventBody {
    pub name: &'static str,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPayload {
    pub state: OrderState,
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderState {
    pub status: OrderStatus,
    pub enter_time_stamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_on: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_details: Option<DeliveryDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDetails {
    pub expected_arrival: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub seller: Seller,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Seller {
    pub name: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedAttributes {
    pub locale: &'static str,
    pub seller_name: String,
}

impl ProactiveEvent {
    /// Build an event whose seller name is the package title
    pub fn new(
        reference_id: String,
        timestamp: DateTime<Utc>,
        expiry_time: DateTime<Utc>,
        state: OrderState,
        seller_name: String,
    ) -> Self {
        Self {
            timestamp,
            reference_id,
            expiry_time,
            event: EventBody {
                name: ORDER_STATUS_EVENT,
                payload: EventPayload {
                    state,
                    order: Order { seller: Seller { name: SELLER_NAME_ATTRIBUTE } },
                },
            },
            localized_attributes: vec![LocalizedAttributes {
                locale: DEFAULT_LOCALE,
                seller_name,
            }],
        }
    }

    pub fn status(&self) -> OrderStatus {
        self.event.payload.state.status
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_serialized_shape() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
        let event = ProactiveEvent::new(
            "1Z999".to_string(),
            now,
            now,
            OrderState {
                status: OrderStatus::OrderDelivered,
                enter_time_stamp: now,
                delivered_on: Some(now),
                delivery_details: None,
            },
            "Books".to_string(),
        );

        let parsed: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(parsed["referenceId"], "1Z999");
        assert_eq!(parsed["event"]["name"], "AMAZON.OrderStatus.Updated");
        assert_eq!(parsed["event"]["payload"]["state"]["status"], "ORDER_DELIVERED");
        assert!(parsed["event"]["payload"]["state"]["deliveredOn"].is_string());
        assert!(parsed["event"]["payload"]["state"].get("deliveryDetails").is_none());
        assert_eq!(
            parsed["event"]["payload"]["order"]["seller"]["name"],
            "localizedattribute:sellerName"
        );
        assert_eq!(parsed["localizedAttributes"][0]["sellerName"], "Books");
        assert_eq!(parsed["localizedAttributes"][0]["locale"], "en-US");
    }

    #[test]
    fn test_order_status_as_str_matches_serde() {
        for status in [
            OrderStatus::OrderShipped,
            OrderStatus::OrderOutForDelivery,
            OrderStatus::OrderDelivered,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
