//! Raw upstream shapes (spec §4.2). These are the documents C2 hands to
//! the C3 transformers — deliberately close to what the real providers
//! return, not yet normalised into the canonical schema.

use serde::{Deserialize, Serialize};

/// A raw MusicBrainz artist lookup result (the relevant subset of fields).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAct {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub disambiguation: Option<String>,
    /// Upstream-supplied status, passed through unchanged unless events
    /// override it (spec §4.3 "Status derivation").
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "life-span")]
    pub life_span: LifeSpan,
    #[serde(default)]
    pub relations: Vec<RawRelation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifeSpan {
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub ended: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRelation {
    #[serde(rename = "type")]
    pub rel_type: String,
    pub url: RawUrl,
    #[serde(default)]
    pub ended: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawUrl {
    pub resource: String,
}

/// A single raw JSON-LD `MusicEvent` block as embedded on a Bandsintown
/// artist page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub location: Option<RawLocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLocation {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<RawAddress>,
    #[serde(default)]
    pub geo: Option<RawGeo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAddress {
    #[serde(default, rename = "addressLocality")]
    pub address_locality: Option<String>,
    #[serde(default, rename = "addressCountry")]
    pub address_country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGeo {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}
