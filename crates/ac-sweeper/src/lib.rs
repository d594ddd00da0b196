//! C7 Cache Sweeper (spec §4.7) — the long-running freshness/eviction cycle.
//!
//! Structured as a dedicated long-lived task driven by an outer loop that
//! never stops on error — it logs and restarts (spec: "On any raised
//! error, sleep for retryDelayMs and restart the outer loop (never
//! exits)").

use std::sync::Arc;
use std::time::{Duration, Instant};

use ac_domain::clock::Clock;
use ac_domain::error::{ErrorSource, Result};
use ac_domain::model::UpdateErrorRecord;
use ac_domain::trace::TraceEvent;
use ac_enrich::Enricher;
use ac_store::CacheStore;

pub struct CacheSweeper {
    store: Arc<dyn CacheStore>,
    enricher: Arc<Enricher>,
    clock: Arc<dyn Clock>,
    eviction_threshold: u32,
}

impl CacheSweeper {
    pub fn new(store: Arc<dyn CacheStore>, enricher: Arc<Enricher>, clock: Arc<dyn Clock>, eviction_threshold: u32) -> Self {
        Self { store, enricher, clock, eviction_threshold }
    }

    /// Outer loop (spec §4.7): runs `RunCycle` forever, sleeping
    /// `retry_delay` and restarting after any raised error. Intended to be
    /// spawned once at process boot and never awaited to completion.
    pub async fn run_forever(&self, cycle_interval: Duration, retry_delay: Duration) -> ! {
        loop {
            if let Err(e) = self.run_cycle(cycle_interval).await {
                tracing::error!(error = %e, "sweep cycle failed, retrying");
                tokio::time::sleep(retry_delay).await;
            }
        }
    }

    /// `RunCycle(T, R)` — `T` is `cycle_interval`, the full-cycle time
    /// budget whose sibling `R` (retry delay) is only used by
    /// [`run_forever`]'s own retry branch.
    pub async fn run_cycle(&self, cycle_interval: Duration) -> Result<()> {
        let ids = self.store.list_all_ids().await?;
        if ids.is_empty() {
            tokio::time::sleep(cycle_interval).await;
            return Ok(());
        }

        TraceEvent::SweepCycleStarted { total_ids: ids.len(), slice_ms: slice_ms(cycle_interval, ids.len()) }.emit();

        let slice = cycle_interval / ids.len() as u32;
        for id in &ids {
            let slice_start = Instant::now();
            self.refresh_one(id).await;
            let elapsed = slice_start.elapsed();
            if elapsed < slice {
                tokio::time::sleep(slice - elapsed).await;
            }
        }

        let evicted = self.store.evict_inactive(self.eviction_threshold).await?;
        TraceEvent::SweepCycleFinished { evicted }.emit();
        tracing::info!(evicted, "sweep cycle finished");
        Ok(())
    }

    /// `Enrich(id, silent=true)` then `Put`; any error is logged and the
    /// cycle continues with the next id (spec §4.7 step 3).
    async fn refresh_one(&self, id: &str) {
        match self.enricher.enrich(id, true).await {
            Ok(record) => {
                if let Err(e) = self.store.put(record).await {
                    self.journal(id, &e.to_string()).await;
                }
            }
            Err(e) => self.journal(id, &e.to_string()).await,
        }
    }

    async fn journal(&self, id: &str, message: &str) {
        let now = self.clock.now();
        let record = UpdateErrorRecord {
            timestamp: now,
            id: id.to_owned(),
            error_message: message.to_owned(),
            error_source: ErrorSource::classify(message),
            created_at: now,
        };
        if let Err(e) = self.store.log_error(record).await {
            tracing::warn!(id, error = %e, "failed to journal sweep cycle error");
        }
    }
}

fn slice_ms(cycle_interval: Duration, count: usize) -> u64 {
    (cycle_interval.as_millis() / count as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_domain::clock::FixedClock;
    use ac_domain::error::Result as AcResult;
    use ac_domain::model::{Act, ActMetadata};
    use ac_store::IdWithUpdatedAt;
    use ac_upstream::raw::{LifeSpan, RawAct, RawEvent};
    use ac_upstream::{BandsintownClient, MusicBrainzClient};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex as AsyncMutex;

    struct CountingMb {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MusicBrainzClient for CountingMb {
        async fn fetch_act(&self, id: &str) -> AcResult<RawAct> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawAct {
                id: id.to_owned(),
                name: format!("Act {id}"),
                country: None,
                region: None,
                disambiguation: None,
                status: Some("active".into()),
                life_span: LifeSpan::default(),
                relations: vec![],
            })
        }
    }

    struct NoEvents;

    #[async_trait]
    impl BandsintownClient for NoEvents {
        async fn fetch_events(&self, _url: &str) -> AcResult<Vec<RawEvent>> {
            Ok(vec![])
        }
    }

    struct TestStore {
        acts: AsyncMutex<HashMap<String, Act>>,
        meta: AsyncMutex<HashMap<String, ActMetadata>>,
    }

    impl TestStore {
        fn new() -> Self {
            Self { acts: AsyncMutex::new(HashMap::new()), meta: AsyncMutex::new(HashMap::new()) }
        }

        async fn seed(&self, id: &str, updates_since_last_request: u32) {
            self.acts.lock().await.insert(
                id.to_owned(),
                Act {
                    id: id.to_owned(),
                    name: id.to_owned(),
                    country: None,
                    region: None,
                    disambiguation: None,
                    ended: false,
                    status: "active".to_owned(),
                    relations: Default::default(),
                    events: Vec::new(),
                    updated_at: ac_domain::clock::format_berlin(Utc::now()),
                },
            );
            self.meta.lock().await.insert(
                id.to_owned(),
                ActMetadata { id: id.to_owned(), last_requested_at: Utc::now(), updates_since_last_request },
            );
        }
    }

    #[async_trait]
    impl CacheStore for TestStore {
        async fn get(&self, id: &str) -> AcResult<Option<Act>> {
            Ok(self.acts.lock().await.get(id).cloned())
        }
        async fn put(&self, record: Act) -> AcResult<()> {
            self.acts.lock().await.insert(record.id.clone(), record);
            Ok(())
        }
        async fn probe(&self) -> AcResult<()> {
            Ok(())
        }
        async fn list_all_ids(&self) -> AcResult<Vec<String>> {
            let mut ids: Vec<String> = self.acts.lock().await.keys().cloned().collect();
            ids.sort();
            Ok(ids)
        }
        async fn list_all_with_meta(&self) -> AcResult<Vec<IdWithUpdatedAt>> {
            Ok(vec![])
        }
        async fn list_without_bandsintown(&self) -> AcResult<Vec<String>> {
            Ok(vec![])
        }
        async fn touch_last_requested(&self, _ids: &[String]) -> AcResult<()> {
            Ok(())
        }
        async fn evict_inactive(&self, threshold: u32) -> AcResult<usize> {
            let stale: Vec<String> = {
                let meta = self.meta.lock().await;
                meta.values().filter(|m| m.updates_since_last_request >= threshold).map(|m| m.id.clone()).collect()
            };
            let mut acts = self.acts.lock().await;
            let mut meta = self.meta.lock().await;
            for id in &stale {
                acts.remove(id);
                meta.remove(id);
            }
            Ok(stale.len())
        }
        async fn clear_all(&self) -> AcResult<()> {
            self.acts.lock().await.clear();
            Ok(())
        }
        async fn log_error(&self, _err: UpdateErrorRecord) -> AcResult<()> {
            Ok(())
        }
        async fn recent_errors(&self) -> AcResult<Vec<UpdateErrorRecord>> {
            Ok(vec![])
        }
        async fn ensure_error_index(&self) -> AcResult<()> {
            Ok(())
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 7, 27, 0, 0, 0).unwrap()))
    }

    #[tokio::test]
    async fn empty_store_sleeps_and_returns_without_error() {
        let store = Arc::new(TestStore::new());
        let mb = Arc::new(CountingMb { calls: AtomicUsize::new(0) });
        let enricher = Arc::new(Enricher::new(mb, Arc::new(NoEvents), clock()));
        let sweeper = CacheSweeper::new(store, enricher, clock(), 14);

        sweeper.run_cycle(Duration::from_millis(5)).await.unwrap();
    }

    #[tokio::test]
    async fn refreshes_every_id_and_evicts_at_threshold() {
        let store = Arc::new(TestStore::new());
        store.seed("x", 14).await;
        store.seed("y", 0).await;

        let mb = Arc::new(CountingMb { calls: AtomicUsize::new(0) });
        let enricher = Arc::new(Enricher::new(mb.clone(), Arc::new(NoEvents), clock()));
        let sweeper = CacheSweeper::new(store.clone(), enricher, clock(), 14);

        sweeper.run_cycle(Duration::from_millis(20)).await.unwrap();

        assert_eq!(mb.calls.load(Ordering::SeqCst), 2);
        assert!(store.get("x").await.unwrap().is_none());
        assert!(store.get("y").await.unwrap().is_some());
    }
}
