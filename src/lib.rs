//! Tracking briefing library
//!
//! Turns shipment-tracking records into a spoken narrative and proactive
//! notification events. Exposes modules for integration testing and binary
//! reuse.

pub mod domain;
pub mod error;
pub mod infra;
pub mod io;
pub mod services;
