//! Narrative generator
//!
//! Renders ranked packages as speech markup: a summary sentence counting
//! packages per status bucket, one detail sentence per package, and optional
//! footnotes after a pause.

use crate::domain::status::{StatusBucket, StatusTag, EXPECTED_PAST, EXPECTED_PRESENT};
use crate::domain::types::{AggregatedPackage, ResolvedAddress};
use crate::services::query::TrackingQuery;
use crate::services::speech::{escape, escape_and_tag_numbers, say_as, SayAs};
use crate::services::temporal::{calendar, clock_time, days_from_today};
use chrono::NaiveDate;

/// Pause inserted before footnotes
pub const FOOTNOTE_BREAK: &str = "<break time=\"1s\"/>";

#[derive(Debug, Clone, Copy)]
pub struct NarrativeOptions<'a> {
    pub footnotes: &'a [String],
    pub mute_footnotes: bool,
    /// Summarize AvailableForPickup separately from expected deliveries
    pub separate_pickup: bool,
}

/// Full narrative for a ranked package list
pub fn compose(
    packages: &[AggregatedPackage],
    query: &TrackingQuery,
    today: NaiveDate,
    options: NarrativeOptions<'_>,
) -> String {
    let details: Vec<String> = packages.iter().map(|p| detail_sentence(p, today)).collect();

    let body = match details.as_slice() {
        [] => summary(packages, query, options.separate_pickup),
        [only] => only.clone(),
        _ => format!(
            "{}</p>\n<p>{}",
            summary(packages, query, options.separate_pickup),
            details.join("\n")
        ),
    };

    let mut out = format!("<p>{}</p>", body);
    if !options.mute_footnotes && !options.footnotes.is_empty() {
        out.push('\n');
        out.push_str(FOOTNOTE_BREAK);
        for footnote in options.footnotes {
            out.push_str("\n<p>");
            out.push_str(footnote);
            out.push_str("</p>");
        }
    }
    out
}

/// "Currently, you have ..." summary, terminated with ":" when details follow
pub fn summary(packages: &[AggregatedPackage], query: &TrackingQuery, separate_pickup: bool) -> String {
    // Buckets in order of first appearance
    let mut counts: Vec<(StatusBucket, usize)> = Vec::new();
    for package in packages {
        let bucket = package.status.bucket(separate_pickup);
        match counts.iter_mut().find(|(b, _)| *b == bucket) {
            Some((_, count)) => *count += package.count(),
            None => counts.push((bucket, package.count())),
        }
    }

    let mut out = String::from("Currently, you have ");
    if counts.is_empty() {
        out.push_str("no package");
        if let Some(tag) = query.tag() {
            out.push(' ');
            out.push_str(tag.phrase());
        }
    } else {
        let last = counts.len() - 1;
        for (i, (bucket, count)) in counts.iter().enumerate() {
            if i > 0 {
                out.push_str(if i == last { ", and " } else { ", " });
            }
            out.push_str(&format!(
                "{} {} {}",
                count,
                if *count > 1 { "packages" } else { "package" },
                bucket.phrase()
            ));
        }
    }

    if query.is_source_filtered() {
        if let Some(keyword) = &query.keyword {
            out.push_str(" from ");
            out.push_str(&escape(keyword));
        }
    }

    out.push(if counts.is_empty() { '.' } else { ':' });
    out
}

/// One spoken sentence describing a package
pub fn detail_sentence(package: &AggregatedPackage, today: NaiveDate) -> String {
    let single = package.count() == 1;
    let mut words: Vec<String> = vec![
        if single { "A".to_string() } else { say_as(&package.count().to_string(), SayAs::Cardinal) },
        escape(package.courier()),
        if single { "package" } else { "packages" }.to_string(),
        "from".to_string(),
        escape_and_tag_numbers(&package.title),
    ];
    words.extend(status_clause(package, today));
    words.retain(|word| !word.is_empty());
    format!("{}.", words.join(" "))
}

fn address_words(address: Option<&ResolvedAddress>, here: &str) -> String {
    match address {
        Some(ResolvedAddress::Place(place)) => format!("in {}", say_as(&escape(place), SayAs::Address)),
        Some(ResolvedAddress::Here) => here.to_string(),
        None => String::new(),
    }
}

fn status_clause(package: &AggregatedPackage, today: NaiveDate) -> Vec<String> {
    let single = package.count() == 1;
    let is_are = if single { "is" } else { "are" };
    let date = package.delivery_date.as_ref();
    let address = package.resolved_address.as_ref();

    match &package.status {
        StatusTag::AttemptFail => vec![
            StatusTag::AttemptFail.phrase().to_string(),
            date.map(|d| calendar(d, today)).unwrap_or_default(),
        ],
        StatusTag::Exception => vec![
            is_are.to_string(),
            StatusTag::Exception.phrase().to_string(),
            date.map(|d| format!("as of {}", calendar(d, today))).unwrap_or_default(),
        ],
        StatusTag::Delivered => vec![
            if single { "was" } else { "were" }.to_string(),
            if date.is_none() { "marked as" } else { "" }.to_string(),
            StatusTag::Delivered.phrase().to_string(),
            address_words(address, "here"),
            calendar(date.unwrap_or(&package.last_updated), today),
            date.map(|d| format!("at {}", clock_time(d))).unwrap_or_default(),
        ],
        StatusTag::OutForDelivery => vec![
            is_are.to_string(),
            StatusTag::OutForDelivery.phrase().to_string(),
            address_words(address, "towards here"),
            date.map(|d| format!("since {}", clock_time(d))).unwrap_or_default(),
        ],
        StatusTag::AvailableForPickup => vec![
            is_are.to_string(),
            StatusTag::AvailableForPickup.phrase().to_string(),
            address_words(address, ""),
            date.map(|d| format!("since {}", clock_time(d))).unwrap_or_default(),
        ],
        other => match date {
            Some(d) => {
                let verb = if days_from_today(d, today) >= 0 { EXPECTED_PRESENT } else { EXPECTED_PAST };
                vec![verb.to_string(), calendar(d, today)]
            }
            None => vec![is_are.to_string(), other.phrase().to_string()],
        },
    }
}
