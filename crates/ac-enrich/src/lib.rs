//! C4 Enricher (spec §4.4).
//!
//! Composes C2 (upstream clients) and C3 (transformers) into a complete
//! canonical act record. Deliberately depends on nothing from C1 (the
//! store) or C5/C6 — per spec §9's design note, splitting the Enricher
//! into its own unit this way is what lets both the Act Service and the
//! Fetch Queue depend on it without a circular import, instead of the
//! source's lazy-require workaround.

use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Instant;

use regex::Regex;

use ac_domain::clock::{format_berlin, Clock};
use ac_domain::error::{Error, Result};
use ac_domain::model::Act;
use ac_domain::trace::TraceEvent;
use ac_transform::{derive_status, transform_act, transform_events};
use ac_upstream::{BandsintownClient, MusicBrainzClient};

fn bandsintown_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://(www\.)?bandsintown\.com/a/\d+$").expect("static regex is valid")
    })
}

/// Composes a complete [`Act`] record for one id (spec §4.4).
pub struct Enricher {
    musicbrainz: Arc<dyn MusicBrainzClient>,
    bandsintown: Arc<dyn BandsintownClient>,
    clock: Arc<dyn Clock>,
}

impl Enricher {
    pub fn new(
        musicbrainz: Arc<dyn MusicBrainzClient>,
        bandsintown: Arc<dyn BandsintownClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { musicbrainz, bandsintown, clock }
    }

    /// `silent` suppresses Bandsintown transport failures (queue/sweeper
    /// callers) rather than propagating them (inline single-miss caller).
    pub async fn enrich(&self, id: &str, silent: bool) -> Result<Act> {
        let start = Instant::now();
        let result = self.enrich_inner(id, silent).await;
        TraceEvent::EnrichAttempt {
            id: id.to_owned(),
            silent,
            ok: result.is_ok(),
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();
        result
    }

    async fn enrich_inner(&self, id: &str, silent: bool) -> Result<Act> {
        // 1-2. Fetch + transform the act. Always propagates on failure.
        let raw_act = self.musicbrainz.fetch_act(id).await?;
        let core = transform_act(&raw_act);

        // 3. Validate the Bandsintown URL; absent/invalid means no events.
        let bandsintown_url = core.relations.get("bandsintown").filter(|url| bandsintown_url_re().is_match(url));

        let raw_events = match bandsintown_url {
            Some(url) => {
                // 4. Fetch events; silent callers swallow transport errors.
                match self.bandsintown.fetch_events(url).await {
                    Ok(events) => events,
                    Err(e) if silent => {
                        tracing::warn!(id, error = %e, "bandsintown fetch failed, silent enrich continues with no events");
                        Vec::new()
                    }
                    Err(e) => return Err(e),
                }
            }
            None => Vec::new(),
        };

        // 5. Transform events, logging (never propagating) rejections.
        let today = self.clock.now().date_naive();
        let transformed = transform_events(&raw_events, today);
        for rejection in &transformed.rejected {
            TraceEvent::EventRejected { id: id.to_owned(), reason: rejection.reason.as_str().to_owned() }.emit();
        }

        // 6. Derive status.
        let upstream_status = core.upstream_status.clone().unwrap_or_else(|| "unknown".to_owned());
        let status = derive_status(&transformed.events, &upstream_status, today);

        // 7-8. Stamp updatedAt and assemble the record.
        Ok(Act {
            id: core.id,
            name: core.name,
            country: core.country,
            region: core.region,
            disambiguation: core.disambiguation,
            ended: core.ended,
            status,
            relations: core.relations,
            events: transformed.events,
            updated_at: format_berlin(self.clock.now()),
        })
    }
}

/// A `StoreUnavailable` result would be a bug in an `Enricher` caller —
/// it only ever surfaces `UpstreamFetch` (or, for malformed configuration,
/// `Misconfiguration`). Kept here so call sites can assert on it without
/// reaching into `ac_domain` themselves.
pub fn is_upstream_error(err: &Error) -> bool {
    matches!(err, Error::UpstreamFetch { .. })
}
