//! Event transform (spec §4.3): maps raw LD+JSON blobs to canonical
//! events, rejecting malformed or past entries with a machine-readable
//! reason. Running this twice on the same input yields the same
//! `{events, rejected}` — it is pure and takes "today" as a parameter
//! rather than reading the clock itself.

use chrono::NaiveDate;

use ac_domain::model::{Address, Event, Geo, Location};
use ac_upstream::raw::RawEvent;

/// Why a raw event blob was discarded (spec §3 "Rejection reason").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    MissingName,
    MissingDate,
    UnparseableDate,
    PastEvent,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingName => "missing_name",
            Self::MissingDate => "missing_date",
            Self::UnparseableDate => "unparseable_date",
            Self::PastEvent => "past_event",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rejected {
    pub reason: RejectionReason,
}

pub struct EventTransformResult {
    pub events: Vec<Event>,
    pub rejected: Vec<Rejected>,
}

/// `today` is the UTC calendar date the comparison in spec I2 ("today or
/// later") is anchored to.
pub fn transform_events(raw_events: &[RawEvent], today: NaiveDate) -> EventTransformResult {
    let mut events = Vec::new();
    let mut rejected = Vec::new();

    for raw in raw_events {
        let name = match raw.name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(n) => n.to_owned(),
            None => {
                rejected.push(Rejected { reason: RejectionReason::MissingName });
                continue;
            }
        };

        let date_str = match raw.start_date.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(d) => d,
            None => {
                rejected.push(Rejected { reason: RejectionReason::MissingDate });
                continue;
            }
        };

        let date = match parse_date_prefix(date_str) {
            Some(d) => d,
            None => {
                rejected.push(Rejected { reason: RejectionReason::UnparseableDate });
                continue;
            }
        };

        if date < today {
            rejected.push(Rejected { reason: RejectionReason::PastEvent });
            continue;
        }

        let location = raw.location.as_ref();
        let address = Address {
            venue: location.and_then(|l| l.name.clone()),
            city: location.and_then(|l| l.address.as_ref()).and_then(|a| a.address_locality.clone()),
            country: location.and_then(|l| l.address.as_ref()).and_then(|a| a.address_country.clone()),
        };
        let geo = location.and_then(|l| l.geo.as_ref()).and_then(|g| match (g.latitude, g.longitude) {
            (Some(lat), Some(lon)) => Some(Geo { lat, lon }),
            _ => None,
        });

        events.push(Event {
            name,
            date: date.format("%Y-%m-%d").to_string(),
            local_time: None,
            url: raw.url.clone(),
            location: Location { address, geo },
        });
    }

    EventTransformResult { events, rejected }
}

/// Accepts either a bare `YYYY-MM-DD` date or a full ISO-8601 timestamp and
/// extracts the calendar date.
fn parse_date_prefix(s: &str) -> Option<NaiveDate> {
    let date_part = s.split('T').next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
