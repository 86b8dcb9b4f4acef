//! Briefing entry points
//!
//! Wires the pipeline stages together:
//! query -> fetch -> normalize -> aggregate -> rank -> limit, then either
//! address resolution and narrative, or proactive event emission.

use crate::domain::event::ProactiveEvent;
use crate::domain::types::{AggregatedPackage, DeviceContext};
use crate::error::{BriefingError, Result};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::{Geocoder, TrackingSource};
use crate::services::address::resolve_addresses;
use crate::services::aggregator::{aggregate, GroupingPolicy};
use crate::services::events::{emit_events, Cutoff};
use crate::services::narrative::{compose, NarrativeOptions};
use crate::services::normalizer::{normalize, NormalizeOptions};
use crate::services::query::{build_query, TrackingQuery};
use crate::services::ranker::{limit, rank};
use chrono::Utc;
use regex::Regex;
use std::sync::Arc;
use tracing::{error, info};

#[cold]
fn log_source_failed(e: &BriefingError) {
    error!(error = %e, "tracking_source_failed");
}

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct BriefingSettings {
    pub days_search: u32,
    pub days_past_delivered: u32,
    pub note_filter: Option<Regex>,
    pub tracking_count_limit: usize,
    pub default_country: String,
    pub mute_footnotes: bool,
    pub grouping: GroupingPolicy,
}

impl Default for BriefingSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl BriefingSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            days_search: config.days_search(),
            days_past_delivered: config.days_past_delivered(),
            note_filter: config.note_filter().cloned(),
            tracking_count_limit: config.tracking_count_limit(),
            default_country: config.default_country().to_string(),
            mute_footnotes: config.mute_footnotes(),
            grouping: config.grouping(),
        }
    }
}

/// Builds narratives and proactive events from the tracking source
pub struct Briefing {
    source: Arc<dyn TrackingSource>,
    geocoder: Arc<dyn Geocoder>,
    settings: BriefingSettings,
    metrics: Arc<Metrics>,
}

impl Briefing {
    pub fn new(
        source: Arc<dyn TrackingSource>,
        geocoder: Arc<dyn Geocoder>,
        settings: BriefingSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { source, geocoder, settings, metrics }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Spoken narrative for an optional keyword
    pub async fn build_narrative(
        &self,
        ctx: &DeviceContext,
        keyword: Option<&str>,
        footnotes: &[String],
    ) -> Result<String> {
        let (query, mut packages) = self.collect(ctx, keyword).await?;

        resolve_addresses(
            &mut packages,
            self.geocoder.as_ref(),
            ctx,
            &self.settings.default_country,
            &self.metrics,
        )
        .await;

        let narrative = compose(
            &packages,
            &query,
            ctx.today(),
            NarrativeOptions {
                footnotes,
                mute_footnotes: self.settings.mute_footnotes,
                separate_pickup: self.settings.grouping.separate_pickup,
            },
        );
        info!(packages = packages.len(), "narrative_built");
        Ok(narrative)
    }

    /// Proactive events for everything updated after `cutoff`
    pub async fn build_proactive_events(
        &self,
        ctx: &DeviceContext,
        cutoff: Cutoff,
    ) -> Result<Vec<ProactiveEvent>> {
        let (_, packages) = self.collect(ctx, None).await?;
        let events = emit_events(&packages, ctx, cutoff);
        self.metrics.record_events_emitted(events.len());
        info!(events = events.len(), "proactive_events_built");
        Ok(events)
    }

    /// Fetch, normalize, aggregate, rank and limit
    async fn collect(
        &self,
        ctx: &DeviceContext,
        keyword: Option<&str>,
    ) -> Result<(TrackingQuery, Vec<AggregatedPackage>)> {
        self.metrics.record_run();

        let couriers = self.source.fetch_courier_names().await.inspect_err(|e| {
            self.metrics.record_source_failure();
            log_source_failed(e);
        })?;

        let query = build_query(keyword, &couriers, ctx.now.with_timezone(&Utc), self.settings.days_search);

        let records = self.source.fetch_trackings(&query).await.inspect_err(|e| {
            self.metrics.record_source_failure();
            log_source_failed(e);
        })?;
        self.metrics.record_trackings_fetched(records.len());
        info!(records = records.len(), "trackings_fetched");

        let normalized = normalize(
            &records,
            &couriers,
            ctx,
            NormalizeOptions {
                note_filter: self.settings.note_filter.as_ref(),
                days_past_delivered: self.settings.days_past_delivered,
            },
            &self.metrics,
        );

        let mut packages = aggregate(&normalized, self.settings.grouping);
        rank(&mut packages, ctx.today());
        limit(&mut packages, self.settings.tracking_count_limit);
        self.metrics.record_packages_aggregated(packages.len());

        Ok((query, packages))
    }
}
