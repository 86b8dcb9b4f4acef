//! Error taxonomy for the tracking pipeline

/// Errors raised while building a briefing
#[derive(Debug, thiserror::Error)]
pub enum BriefingError {
    /// Tracking or courier list fetch failed; fatal to the current build
    #[error("tracking source fetch failed: {0}")]
    SourceFetch(String),
    /// A single address lookup failed
    #[error("geocoding failed: {0}")]
    Geocode(String),
    /// One record is missing required fields
    #[error("malformed tracking record {id}: {reason}")]
    MalformedRecord { id: String, reason: String },
    /// Detected before the pipeline runs
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl BriefingError {
    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        BriefingError::MalformedRecord { id: id.into(), reason: reason.into() }
    }
}

impl From<reqwest::Error> for BriefingError {
    fn from(e: reqwest::Error) -> Self {
        BriefingError::SourceFetch(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BriefingError>;
