//! Canonical data model (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The canonical act record persisted in the cache store and returned to
/// clients. `updatedAt` is a formatted Berlin-zone string, not a
/// machine timestamp — see [`crate::clock::format_berlin`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Act {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disambiguation: Option<String>,
    pub ended: bool,
    pub status: String,
    #[serde(default)]
    pub relations: BTreeMap<String, String>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

/// A single scheduled event, element of [`Act::events`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    /// ISO date `YYYY-MM-DD`.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "localTime")]
    pub local_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: Address,
    pub geo: Option<Geo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geo {
    pub lat: f64,
    pub lon: f64,
}

/// Per-act bookkeeping the cache keeps but never returns to clients
/// (spec §3 "Act metadata").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActMetadata {
    pub id: String,
    #[serde(rename = "lastRequestedAt")]
    pub last_requested_at: DateTime<Utc>,
    #[serde(default, rename = "updatesSinceLastRequest")]
    pub updates_since_last_request: u32,
}

/// The eviction threshold from spec §3 lifecycle: an act is destroyed by
/// the sweeper once its metadata counter reaches this value.
pub const EVICTION_THRESHOLD: u32 = 14;

/// A journaled failure, TTL-expired after [`UPDATE_ERROR_TTL_DAYS`] (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub id: String,
    #[serde(rename = "errorMessage")]
    pub error_message: String,
    #[serde(rename = "errorSource")]
    pub error_source: crate::error::ErrorSource,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

pub const UPDATE_ERROR_TTL_DAYS: i64 = 7;

/// Recognised MusicBrainz relation types retained verbatim under a
/// normalised key (spec §4.3).
pub const RECOGNISED_RELATION_TYPES: &[&str] = &[
    "allmusic",
    "bandcamp",
    "bandsintown",
    "discogs",
    "lastfm",
    "lyrics",
    "myspace",
    "setlistfm",
    "songkick",
    "soundcloud",
    "viaf",
    "wikidata",
    "youtubeMusic",
];

/// Social-network URL substrings mapped to their canonical relation key
/// (spec §4.3, relation type `social network`).
pub const SOCIAL_PLATFORM_MARKERS: &[(&str, &str)] = &[
    ("twitter.com", "twitter"),
    ("facebook.com", "facebook"),
    ("instagram.com", "instagram"),
    ("tiktok.com", "tiktok"),
];
