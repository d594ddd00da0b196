//! Shared error taxonomy for the act-cache core (spec §7).
//!
//! Every fallible operation in `ac-store`, `ac-upstream`, `ac-enrich`,
//! `ac-service`, `ac-queue`, and `ac-sweeper` returns this type. Kinds are
//! chosen by *meaning*, never by which crate raised them, so the request
//! path can pattern-match on "is this a store outage" without caring
//! whether the JSON file or a future backend tripped it.

use std::fmt;

/// The upstream provider an [`Error::UpstreamFetch`] or logged error
/// originated from. Mirrors the `errorSource` enum from spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSource {
    Musicbrainz,
    Bandsintown,
    Cache,
    Unknown,
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Musicbrainz => write!(f, "musicbrainz"),
            Self::Bandsintown => write!(f, "bandsintown"),
            Self::Cache => write!(f, "cache"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl ErrorSource {
    /// Classify a free-form error message the way the queue drainer and
    /// sweeper do when journaling (spec §7: "derived from the error
    /// message").
    pub fn classify(message: &str) -> Self {
        if message.contains("musicbrainz") || message.contains("MB_") {
            Self::Musicbrainz
        } else if message.contains("bandsintown") {
            Self::Bandsintown
        } else if message.contains("DB_") || message.contains("cache") {
            Self::Cache
        } else {
            Self::Unknown
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A required configuration value is missing or malformed.
    #[error("misconfiguration: {0}")]
    Misconfiguration(String),

    /// The persistence backend is unreachable, timed out, or an operation
    /// was not acknowledged.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Malformed input to the core (empty id list, blank id, record
    /// missing a required key).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A call to an upstream provider failed, tagged with which one.
    #[error("upstream fetch failed ({source}): {message}")]
    UpstreamFetch { source: ErrorSource, message: String },

    /// Transform-level rejection of one or more raw event blobs.
    /// Never surfaced to clients — logged only.
    #[error("event data error: {0}")]
    EventData(String),

    /// The informational "N acts not cached" signal (spec §4.5 step 4).
    #[error("{missing_count} acts not cached. Background fetch initiated. Please try again in a few minutes.")]
    PartialCacheMiss { missing_count: usize, cached_count: usize },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The stable error-code token surfaced to HTTP clients (spec §6).
    pub fn code(&self) -> &'static str {
        match self {
            Error::Misconfiguration(_) => "SVC_001",
            Error::StoreUnavailable(_) => "SVC_002",
            Error::InvalidRequest(_) => "DB_001",
            Error::UpstreamFetch { source: ErrorSource::Musicbrainz, .. } => "DB_010",
            Error::UpstreamFetch { source: ErrorSource::Bandsintown, .. } => "DB_011",
            Error::UpstreamFetch { .. } => "DB_012",
            Error::EventData(_) => "DB_020",
            Error::PartialCacheMiss { .. } => "DB_002",
            Error::Io(_) => "DB_027",
            Error::Json(_) => "DB_026",
        }
    }

    /// Best-effort classification of this error's source, for journaling
    /// (spec §7 propagation policy).
    pub fn source_kind(&self) -> ErrorSource {
        match self {
            Error::UpstreamFetch { source, .. } => *source,
            Error::StoreUnavailable(_) | Error::Io(_) | Error::Json(_) => ErrorSource::Cache,
            other => ErrorSource::classify(&other.to_string()),
        }
    }

    pub fn upstream(source: ErrorSource, message: impl Into<String>) -> Self {
        Error::UpstreamFetch { source, message: message.into() }
    }
}
