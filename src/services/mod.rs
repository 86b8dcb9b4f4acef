//! Services - the tracking pipeline
//!
//! - `query` - keyword to tracking-source filter
//! - `normalizer` - raw records to normalized packages
//! - `aggregator` - grouping of indistinguishable packages
//! - `ranker` - urgency ordering and count limit
//! - `address` - geocoding fan-out and friendly address classification
//! - `narrative` - speech markup rendering
//! - `events` - proactive notification selection
//! - `briefing` - the two pipeline entry points
//! - `device` - device location and timezone resolution
//! - `temporal`, `speech` - pure date and markup helpers

pub mod address;
pub mod aggregator;
pub mod briefing;
pub mod device;
pub mod events;
pub mod narrative;
pub mod normalizer;
pub mod query;
pub mod ranker;
pub mod speech;
pub mod temporal;

pub use briefing::{Briefing, BriefingSettings};
pub use events::Cutoff;
