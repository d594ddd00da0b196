//! C6 Fetch Queue (spec §4.6).
//!
//! A de-duplicating set of pending ids drained by a single background
//! worker, paced at a fixed inter-fetch delay. A single lock guards the
//! pending set and the `draining` flag together, so `Add` and the drain
//! loop can never observe a torn state (spec §9: "keep the queue's
//! internal state private to its owning object; expose only `Add`").

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use ac_domain::clock::Clock;
use ac_domain::error::ErrorSource;
use ac_domain::model::UpdateErrorRecord;
use ac_domain::trace::TraceEvent;
use ac_enrich::Enricher;
use ac_store::CacheStore;

struct State {
    pending: BTreeSet<String>,
    draining: bool,
}

struct Inner {
    store: Arc<dyn CacheStore>,
    enricher: Arc<Enricher>,
    clock: Arc<dyn Clock>,
    delay: Duration,
    state: Mutex<State>,
}

/// `D`, the fixed inter-fetch delay between consecutive drainer fetches
/// (spec §4.6). `FetchQueue::new` takes it as a parameter so tests can
/// inject a short delay instead of waiting out the real 30s.
#[derive(Clone)]
pub struct FetchQueue {
    inner: Arc<Inner>,
}

impl FetchQueue {
    pub fn new(store: Arc<dyn CacheStore>, enricher: Arc<Enricher>, clock: Arc<dyn Clock>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                enricher,
                clock,
                delay,
                state: Mutex::new(State { pending: BTreeSet::new(), draining: false }),
            }),
        }
    }

    /// Inserts all ids into `Pending` (duplicates silently collapse). If no
    /// drainer is running, starts one. Returns immediately.
    pub fn add(&self, ids: impl IntoIterator<Item = String>) {
        let added: Vec<String> = ids.into_iter().collect();
        let mut start_drainer = false;
        let pending_after = {
            let mut state = self.inner.state.lock();
            for id in &added {
                state.pending.insert(id.clone());
            }
            if !state.draining {
                state.draining = true;
                start_drainer = true;
            }
            state.pending.len()
        };

        TraceEvent::QueueAdd { ids: added, pending_after }.emit();

        if start_drainer {
            let inner = self.inner.clone();
            tokio::spawn(async move { drain(inner).await });
        }
    }

    /// Current snapshot of `Pending`, for tests only.
    #[doc(hidden)]
    pub fn pending_snapshot(&self) -> Vec<String> {
        self.inner.state.lock().pending.iter().cloned().collect()
    }

    #[doc(hidden)]
    pub fn is_draining(&self) -> bool {
        self.inner.state.lock().draining
    }
}

async fn drain(inner: Arc<Inner>) {
    loop {
        let next_id = {
            let mut state = inner.state.lock();
            let id = state.pending.iter().next().cloned();
            if let Some(ref id) = id {
                state.pending.remove(id);
            }
            id
        };

        let Some(id) = next_id else { break };

        let ok = process_one(&inner, &id).await;
        TraceEvent::QueueDrainTick { id: id.clone(), ok }.emit();

        let more_pending = !inner.state.lock().pending.is_empty();
        if more_pending {
            tokio::time::sleep(inner.delay).await;
        } else {
            break;
        }
    }

    inner.state.lock().draining = false;
}

/// `Enrich(id, silent=true)` then `Put`; any failure in either step is
/// swallowed and journaled, never raised (spec §4.6 step 1c).
async fn process_one(inner: &Inner, id: &str) -> bool {
    match inner.enricher.enrich(id, true).await {
        Ok(record) => {
            if let Err(e) = inner.store.put(record).await {
                journal(inner, id, &e.to_string()).await;
                return false;
            }
            true
        }
        Err(e) => {
            journal(inner, id, &e.to_string()).await;
            false
        }
    }
}

async fn journal(inner: &Inner, id: &str, message: &str) {
    let now = inner.clock.now();
    let record = UpdateErrorRecord {
        timestamp: now,
        id: id.to_owned(),
        error_message: message.to_owned(),
        error_source: ErrorSource::classify(message),
        created_at: now,
    };
    if let Err(e) = inner.store.log_error(record).await {
        tracing::warn!(id, error = %e, "failed to journal queue drainer error");
    }
}
