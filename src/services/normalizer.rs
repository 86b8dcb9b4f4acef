//! Record normalizer
//!
//! Converts raw tracking records into [`NormalizedPackage`]s in the device
//! timezone, dropping records that fail the note filter or that were
//! delivered too long ago. Malformed records are logged and skipped.

use crate::domain::status::StatusTag;
use crate::domain::types::{CourierNames, DeviceContext, NormalizedPackage, RawTrackingRecord};
use crate::error::{BriefingError, Result};
use crate::infra::metrics::Metrics;
use crate::services::temporal::{days_to_today, normalize_timestamp};
use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

/// Normalizer settings taken from configuration
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions<'a> {
    pub note_filter: Option<&'a Regex>,
    pub days_past_delivered: u32,
}

/// Result of normalizing one well-formed record
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Kept(NormalizedPackage),
    NoteFiltered,
    Stale,
}

/// Normalize a batch, preserving input order
pub fn normalize(
    records: &[RawTrackingRecord],
    couriers: &CourierNames,
    ctx: &DeviceContext,
    options: NormalizeOptions<'_>,
    metrics: &Metrics,
) -> Vec<NormalizedPackage> {
    let mut packages = Vec::with_capacity(records.len());

    for record in records {
        match normalize_record(record, couriers, ctx, options) {
            Ok(Normalized::Kept(package)) => packages.push(package),
            Ok(Normalized::NoteFiltered) => {
                metrics.record_note_filtered();
                debug!(id = %record.tracking_number, "record_note_filtered");
            }
            Ok(Normalized::Stale) => {
                metrics.record_stale();
                debug!(id = %record.tracking_number, "record_stale_delivered");
            }
            Err(e) => {
                metrics.record_malformed();
                log_malformed(&e);
            }
        }
    }

    packages
}

#[cold]
fn log_malformed(e: &BriefingError) {
    match e {
        BriefingError::MalformedRecord { id, reason } => {
            warn!(id = %id, reason = %reason, "record_malformed")
        }
        other => warn!(error = %other, "record_malformed"),
    }
}

/// Normalize a single record
pub fn normalize_record(
    record: &RawTrackingRecord,
    couriers: &CourierNames,
    ctx: &DeviceContext,
    options: NormalizeOptions<'_>,
) -> Result<Normalized> {
    if record.tracking_number.trim().is_empty() {
        return Err(BriefingError::malformed("<none>", "missing tracking number"));
    }

    if let Some(filter) = options.note_filter {
        // A missing note only passes a filter that matches the empty string
        if !filter.is_match(record.note.as_deref().unwrap_or("")) {
            return Ok(Normalized::NoteFiltered);
        }
    }

    let raw_updated = record
        .last_updated_at
        .as_deref()
        .ok_or_else(|| BriefingError::malformed(&record.tracking_number, "missing last_updated_at"))?;
    let last_updated = normalize_timestamp(raw_updated, ctx.timezone).ok_or_else(|| {
        BriefingError::malformed(
            &record.tracking_number,
            format!("unparseable last_updated_at {raw_updated:?}"),
        )
    })?;

    let (delivery_date, delivery_location) = if record.tag.uses_checkpoint_delivery() {
        match record.checkpoints.iter().rev().find(|c| c.tag.as_ref() == Some(&record.tag)) {
            Some(checkpoint) => (
                checkpoint
                    .checkpoint_time
                    .as_deref()
                    .and_then(|raw| normalize_timestamp(raw, ctx.timezone)),
                checkpoint.location(),
            ),
            None => (None, None),
        }
    } else {
        (
            record
                .expected_delivery
                .as_deref()
                .and_then(|raw| normalize_timestamp(raw, ctx.timezone)),
            None,
        )
    };

    if record.tag == StatusTag::Delivered {
        let reference = delivery_date.as_ref().unwrap_or(&last_updated);
        if days_to_today(reference, ctx.today()) > i64::from(options.days_past_delivered) {
            return Ok(Normalized::Stale);
        }
    }

    Ok(Normalized::Kept(NormalizedPackage {
        id: record.tracking_number.clone(),
        status: record.tag.clone(),
        slug: record.slug.clone(),
        courier_name: couriers.get(&record.slug).cloned(),
        title: record
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| record.tracking_number.clone()),
        delivery_date,
        delivery_location,
        last_updated,
        occurrence_count: occurrence_count(record),
    }))
}

/// Unique checkpoints that share the record's current status
fn occurrence_count(record: &RawTrackingRecord) -> usize {
    let mut seen = FxHashSet::default();
    record
        .checkpoints
        .iter()
        .filter(|c| c.tag.as_ref() == Some(&record.tag))
        .filter(|c| seen.insert(c.dedup_key()))
        .count()
}
