//! Structured trace events emitted across the act-cache core.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    CacheHit {
        id: String,
    },
    CacheMiss {
        id: String,
    },
    StaleHit {
        id: String,
        updated_at: Option<String>,
    },
    HealthFlagFlipped {
        healthy: bool,
        reason: String,
    },
    ProbeAttempt {
        ok: bool,
    },
    EnrichAttempt {
        id: String,
        silent: bool,
        ok: bool,
        duration_ms: u64,
    },
    EventRejected {
        id: String,
        reason: String,
    },
    QueueAdd {
        ids: Vec<String>,
        pending_after: usize,
    },
    QueueDrainTick {
        id: String,
        ok: bool,
    },
    SweepCycleStarted {
        total_ids: usize,
        slice_ms: u64,
    },
    SweepCycleFinished {
        evicted: usize,
    },
    UpdateErrorLogged {
        id: String,
        source: crate::error::ErrorSource,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ac_event");
    }
}
