//! C5 Act Service (spec §4.5) — the request-time read-through path.
//!
//! Holds the process-local `cacheHealthy` flag (spec §9: "an atomic
//! boolean suffices... races between flag-check and op are acceptable
//! because the op itself will discover the failure") and fans out bounded
//! Store `Get` calls concurrently, one per requested id.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ac_domain::clock::{parse_berlin, Clock};
use ac_domain::error::{Error, Result};
use ac_domain::model::Act;
use ac_domain::trace::TraceEvent;
use ac_enrich::Enricher;
use ac_queue::FetchQueue;
use ac_store::CacheStore;

pub struct ActService {
    store: Arc<dyn CacheStore>,
    enricher: Arc<Enricher>,
    queue: FetchQueue,
    clock: Arc<dyn Clock>,
    healthy: AtomicBool,
    store_deadline: Duration,
    staleness: chrono::Duration,
}

impl ActService {
    pub fn new(
        store: Arc<dyn CacheStore>,
        enricher: Arc<Enricher>,
        queue: FetchQueue,
        clock: Arc<dyn Clock>,
        store_deadline: Duration,
        staleness_ms: i64,
    ) -> Self {
        Self {
            store,
            enricher,
            queue,
            clock,
            healthy: AtomicBool::new(true),
            store_deadline,
            staleness: chrono::Duration::milliseconds(staleness_ms),
        }
    }

    /// `FetchMany(ids) → {acts} | {error}` (spec §4.5).
    pub async fn fetch_many(&self, ids: &[String]) -> Result<Vec<Act>> {
        if ids.is_empty() {
            return Err(Error::InvalidRequest("id list must not be empty".to_owned()));
        }

        self.ensure_healthy().await?;

        // Fan out a bounded Get per requested id (spec §4.5 step 1:
        // "Concurrently Get(id) for each requested id").
        let gets = futures_util::future::join_all(ids.iter().enumerate().map(|(idx, id)| {
            let store = self.store.clone();
            let deadline = self.store_deadline;
            let id = id.clone();
            async move { (idx, id.clone(), tokio::time::timeout(deadline, store.get(&id)).await) }
        }))
        .await;

        let mut cached: Vec<(usize, Act)> = Vec::new();
        let mut missing: Vec<String> = Vec::new();

        for (idx, id, result) in gets {
            match result {
                Ok(Ok(Some(act))) => cached.push((idx, act)),
                Ok(Ok(None)) => missing.push(id),
                Ok(Err(e)) => {
                    self.set_unhealthy(&format!("get failed: {e}"));
                    missing.push(id);
                }
                Err(_) => {
                    self.set_unhealthy("get timed out");
                    missing.push(id);
                }
            }
        }

        let stale_ids: Vec<String> =
            cached.iter().filter(|(_, act)| self.is_stale(act)).map(|(_, act)| act.id.clone()).collect();
        if !stale_ids.is_empty() {
            for id in &stale_ids {
                TraceEvent::StaleHit { id: id.clone(), updated_at: None }.emit();
            }
            self.queue.add(stale_ids);
        }

        let outcome = match missing.len() {
            0 => {
                cached.sort_by_key(|(idx, _)| *idx);
                Ok(cached.into_iter().map(|(_, act)| act).collect())
            }
            1 => {
                let id = missing.into_iter().next().expect("len checked above");
                let record = self.enricher.enrich(&id, false).await?;
                self.spawn_best_effort_put(record.clone());

                cached.push((ids.iter().position(|i| i == &id).unwrap_or(usize::MAX), record));
                cached.sort_by_key(|(idx, _)| *idx);
                Ok(cached.into_iter().map(|(_, act)| act).collect())
            }
            missing_count => {
                self.queue.add(missing);
                Err(Error::PartialCacheMiss { missing_count, cached_count: cached.len() })
            }
        };

        if outcome.is_ok() {
            self.spawn_touch_last_requested(ids.to_vec());
        }
        outcome
    }

    async fn ensure_healthy(&self) -> Result<()> {
        if self.healthy.load(Ordering::SeqCst) {
            return Ok(());
        }
        let probe = tokio::time::timeout(self.store_deadline, self.store.probe()).await;
        let ok = matches!(probe, Ok(Ok(())));
        self.healthy.store(ok, Ordering::SeqCst);
        TraceEvent::HealthFlagFlipped { healthy: ok, reason: "probe".to_owned() }.emit();
        if ok {
            Ok(())
        } else {
            Err(Error::StoreUnavailable("health probe failed".to_owned()))
        }
    }

    fn set_unhealthy(&self, reason: &str) {
        self.healthy.store(false, Ordering::SeqCst);
        TraceEvent::HealthFlagFlipped { healthy: false, reason: reason.to_owned() }.emit();
    }

    fn is_stale(&self, act: &Act) -> bool {
        match parse_berlin(&act.updated_at) {
            Some(ts) => self.clock.now() - ts > self.staleness,
            None => true,
        }
    }

    fn spawn_best_effort_put(&self, record: Act) {
        let store = self.store.clone();
        let id = record.id.clone();
        tokio::spawn(async move {
            if let Err(e) = store.put(record).await {
                tracing::warn!(id, error = %e, "best-effort cache write of freshly-enriched record failed");
            }
        });
    }

    fn spawn_touch_last_requested(&self, ids: Vec<String>) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.touch_last_requested(&ids).await {
                tracing::warn!(error = %e, "touch_last_requested failed");
            }
        });
    }

    #[doc(hidden)]
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    #[doc(hidden)]
    pub fn mark_unhealthy_for_test(&self) {
        self.set_unhealthy("test injection");
    }
}
