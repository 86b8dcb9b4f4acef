//! Tracking status tags, grouping buckets and their spoken phrases

use serde::{Deserialize, Serialize};
use std::fmt;

/// Carrier-reported delivery status
///
/// Tags the tracking source does not document are kept verbatim in
/// `Unknown` and treated like any forward-looking "expected" status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatusTag {
    InfoReceived,
    InTransit,
    AvailableForPickup,
    OutForDelivery,
    AttemptFail,
    Delivered,
    Exception,
    Pending,
    Unknown(String),
}

impl StatusTag {
    /// All tags the tracking source documents
    pub const KNOWN: [StatusTag; 8] = [
        StatusTag::InfoReceived,
        StatusTag::InTransit,
        StatusTag::AvailableForPickup,
        StatusTag::OutForDelivery,
        StatusTag::AttemptFail,
        StatusTag::Delivered,
        StatusTag::Exception,
        StatusTag::Pending,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            StatusTag::InfoReceived => "InfoReceived",
            StatusTag::InTransit => "InTransit",
            StatusTag::AvailableForPickup => "AvailableForPickup",
            StatusTag::OutForDelivery => "OutForDelivery",
            StatusTag::AttemptFail => "AttemptFail",
            StatusTag::Delivered => "Delivered",
            StatusTag::Exception => "Exception",
            StatusTag::Pending => "Pending",
            StatusTag::Unknown(s) => s,
        }
    }

    /// Parse a tag only if it is one of the documented values
    pub fn known(s: &str) -> Option<StatusTag> {
        match s.parse::<StatusTag>() {
            Ok(StatusTag::Unknown(_)) | Err(_) => None,
            Ok(tag) => Some(tag),
        }
    }

    /// Human status phrase used in summaries and detail sentences
    pub fn phrase(&self) -> &'static str {
        match self {
            StatusTag::InfoReceived => "waiting to be received by the carrier",
            StatusTag::InTransit => "in transit",
            StatusTag::AvailableForPickup => "available for pickup",
            StatusTag::OutForDelivery => "out for delivery",
            StatusTag::AttemptFail => "failed to be delivered by the carrier",
            StatusTag::Delivered => "delivered",
            StatusTag::Exception => "undelivered, returned to sender, or in custom hold",
            StatusTag::Pending => "pending tracking information being available",
            StatusTag::Unknown(_) => EXPECTED_DELIVERY,
        }
    }

    /// Tie-break priority among packages at the same day distance (higher first)
    pub fn priority(&self) -> u8 {
        match self {
            StatusTag::Delivered => 5,
            StatusTag::AttemptFail => 4,
            StatusTag::Exception => 3,
            StatusTag::OutForDelivery => 2,
            StatusTag::AvailableForPickup => 1,
            _ => 0,
        }
    }

    /// Statuses whose delivery date/location come from the latest matching checkpoint
    pub fn uses_checkpoint_delivery(&self) -> bool {
        matches!(
            self,
            StatusTag::AvailableForPickup | StatusTag::OutForDelivery | StatusTag::Delivered
        )
    }

    /// Grouping/summary bucket for this tag
    ///
    /// With `separate_pickup` unset, AvailableForPickup collapses into the
    /// expected bucket the way older revisions of the grouping rule did.
    pub fn bucket(&self, separate_pickup: bool) -> StatusBucket {
        match self {
            StatusTag::AttemptFail => StatusBucket::AttemptFail,
            StatusTag::AvailableForPickup if separate_pickup => StatusBucket::AvailableForPickup,
            StatusTag::Exception => StatusBucket::Exception,
            StatusTag::Delivered => StatusBucket::Delivered,
            StatusTag::OutForDelivery => StatusBucket::OutForDelivery,
            _ => StatusBucket::Expected,
        }
    }
}

impl std::str::FromStr for StatusTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "InfoReceived" => StatusTag::InfoReceived,
            "InTransit" => StatusTag::InTransit,
            "AvailableForPickup" => StatusTag::AvailableForPickup,
            "OutForDelivery" => StatusTag::OutForDelivery,
            "AttemptFail" => StatusTag::AttemptFail,
            "Delivered" => StatusTag::Delivered,
            "Exception" => StatusTag::Exception,
            "Pending" => StatusTag::Pending,
            other => StatusTag::Unknown(other.to_string()),
        })
    }
}

impl From<String> for StatusTag {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(tag) => tag,
            Err(never) => match never {},
        }
    }
}

impl From<StatusTag> for String {
    fn from(tag: StatusTag) -> Self {
        tag.as_str().to_string()
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phrase for the catch-all forward-looking bucket
pub const EXPECTED_DELIVERY: &str = "on the way";
/// Expected date today or later
pub const EXPECTED_PRESENT: &str = "should arrive";
/// Expected date already passed
pub const EXPECTED_PAST: &str = "should have arrived";

/// Status-equivalence bucket used for grouping and the summary sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusBucket {
    AttemptFail,
    AvailableForPickup,
    Exception,
    Delivered,
    OutForDelivery,
    Expected,
}

impl StatusBucket {
    pub fn phrase(&self) -> &'static str {
        match self {
            StatusBucket::AttemptFail => StatusTag::AttemptFail.phrase(),
            StatusBucket::AvailableForPickup => StatusTag::AvailableForPickup.phrase(),
            StatusBucket::Exception => StatusTag::Exception.phrase(),
            StatusBucket::Delivered => StatusTag::Delivered.phrase(),
            StatusBucket::OutForDelivery => StatusTag::OutForDelivery.phrase(),
            StatusBucket::Expected => EXPECTED_DELIVERY,
        }
    }
}
