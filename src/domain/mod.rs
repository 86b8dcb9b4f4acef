//! Domain models - tracking records, packages and notification events
//!
//! This module contains the canonical data types used throughout the pipeline:
//! - `StatusTag` / `StatusBucket` - carrier status and its grouping bucket
//! - `RawTrackingRecord` - record as returned by the tracking source
//! - `NormalizedPackage` - one surviving record in device time
//! - `AggregatedPackage` - the de-duplicated unit of narration
//! - `ProactiveEvent` - order-status notification payload

pub mod event;
pub mod status;
pub mod types;

// Re-export commonly used types at module level
pub use event::{OrderStatus, ProactiveEvent};
pub use status::{StatusBucket, StatusTag};
pub use types::{
    AggregatedPackage, Checkpoint, CourierNames, DeviceContext, GeoAddress, NormalizedPackage,
    RawTrackingRecord, ResolvedAddress,
};
