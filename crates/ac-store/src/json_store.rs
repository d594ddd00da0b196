use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use ac_domain::error::{Error, Result};
use ac_domain::model::{Act, ActMetadata, UpdateErrorRecord, UPDATE_ERROR_TTL_DAYS};
use ac_domain::trace::TraceEvent;

use crate::{CacheStore, IdWithUpdatedAt};

const PROBE_SENTINEL_ID: &str = "__act_cache_probe__";

/// A JSON-file-backed [`CacheStore`]. Each store ("acts", "actMetadata",
/// "dataUpdateErrors" per spec §6) lives in its own file inside `dir`,
/// guarded by an in-process `RwLock<HashMap<..>>`.
///
/// `connected` models the "backend handle" spec §4.1 says must reset after
/// a connection-class failure: any flush failure flips it false, and the
/// next call re-creates the directory before touching the maps again —
/// there is no permanent broken state.
pub struct JsonCacheStore {
    acts_path: PathBuf,
    meta_path: PathBuf,
    errors_path: PathBuf,
    acts: RwLock<HashMap<String, Act>>,
    meta: RwLock<HashMap<String, ActMetadata>>,
    errors: RwLock<Vec<UpdateErrorRecord>>,
    connected: AtomicBool,
}

impl JsonCacheStore {
    /// Load or create the store under `dir`.
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let acts_path = dir.join("acts.json");
        let meta_path = dir.join("act_metadata.json");
        let errors_path = dir.join("update_errors.json");

        let acts = load_map(&acts_path)?;
        let meta = load_map(&meta_path)?;
        let errors: Vec<UpdateErrorRecord> = load_vec(&errors_path)?;

        tracing::info!(
            acts = acts.len(),
            path = %acts_path.display(),
            "cache store loaded"
        );

        Ok(Self {
            acts_path,
            meta_path,
            errors_path,
            acts: RwLock::new(acts),
            meta: RwLock::new(meta),
            errors: RwLock::new(errors),
            connected: AtomicBool::new(true),
        })
    }

    /// Re-establish the "connection" (recreate the directory) if the last
    /// operation marked us disconnected. A probe or connection failure must
    /// not leave the store permanently broken (spec §4.1).
    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        let dir = self.acts_path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| {
            Error::StoreUnavailable(format!("reconnect failed: {e}"))
        })?;
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn flush_acts(&self) -> Result<()> {
        let acts = self.acts.read();
        write_json(&self.acts_path, &*acts).map_err(|e| {
            self.connected.store(false, Ordering::SeqCst);
            Error::StoreUnavailable(format!("flushing acts: {e}"))
        })
    }

    fn flush_meta(&self) -> Result<()> {
        let meta = self.meta.read();
        write_json(&self.meta_path, &*meta).map_err(|e| {
            self.connected.store(false, Ordering::SeqCst);
            Error::StoreUnavailable(format!("flushing act metadata: {e}"))
        })
    }

    fn flush_errors(&self) -> Result<()> {
        let errors = self.errors.read();
        write_json(&self.errors_path, &*errors).map_err(|e| {
            self.connected.store(false, Ordering::SeqCst);
            Error::StoreUnavailable(format!("flushing update errors: {e}"))
        })
    }

    /// Best-effort counter bump — failure here must never fail the
    /// caller's `put` (spec §4.1).
    fn bump_updates_since_last_request(&self, id: &str) {
        {
            let mut meta = self.meta.write();
            let entry = meta.entry(id.to_owned()).or_insert_with(|| ActMetadata {
                id: id.to_owned(),
                last_requested_at: Utc::now(),
                updates_since_last_request: 0,
            });
            entry.updates_since_last_request += 1;
        }
        if let Err(e) = self.flush_meta() {
            tracing::warn!(id, error = %e, "failed to persist updates-since-last-request counter");
        }
    }
}

#[async_trait]
impl CacheStore for JsonCacheStore {
    async fn get(&self, id: &str) -> Result<Option<Act>> {
        self.ensure_connected()?;
        let found = self.acts.read().get(id).cloned();
        if found.is_some() {
            TraceEvent::CacheHit { id: id.to_owned() }.emit();
        } else {
            TraceEvent::CacheMiss { id: id.to_owned() }.emit();
        }
        Ok(found)
    }

    async fn put(&self, record: Act) -> Result<()> {
        self.ensure_connected()?;
        let id = record.id.clone();
        {
            let mut acts = self.acts.write();
            acts.insert(id.clone(), record);
        }
        // Persisting the public record is fatal to this call on failure.
        self.flush_acts()?;
        // The counter bump is best-effort (spec §4.1) — never surfaced.
        self.bump_updates_since_last_request(&id);
        Ok(())
    }

    async fn probe(&self) -> Result<()> {
        self.ensure_connected()?;
        let sentinel = Act {
            id: PROBE_SENTINEL_ID.to_owned(),
            name: "probe".to_owned(),
            country: None,
            region: None,
            disambiguation: None,
            ended: false,
            status: "probe".to_owned(),
            relations: Default::default(),
            events: Vec::new(),
            updated_at: ac_domain::clock::format_berlin(Utc::now()),
        };
        {
            let mut acts = self.acts.write();
            acts.insert(PROBE_SENTINEL_ID.to_owned(), sentinel);
        }
        self.flush_acts()?;
        {
            let mut acts = self.acts.write();
            acts.remove(PROBE_SENTINEL_ID);
        }
        let result = self.flush_acts();
        TraceEvent::ProbeAttempt { ok: result.is_ok() }.emit();
        result
    }

    async fn list_all_ids(&self) -> Result<Vec<String>> {
        self.ensure_connected()?;
        let mut ids: Vec<String> = self.acts.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn list_all_with_meta(&self) -> Result<Vec<IdWithUpdatedAt>> {
        self.ensure_connected()?;
        let acts = self.acts.read();
        let mut out: Vec<IdWithUpdatedAt> = acts
            .values()
            .map(|a| IdWithUpdatedAt { id: a.id.clone(), updated_at: Some(a.updated_at.clone()) })
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn list_without_bandsintown(&self) -> Result<Vec<String>> {
        self.ensure_connected()?;
        let acts = self.acts.read();
        let mut ids: Vec<String> = acts
            .values()
            .filter(|a| a.relations.get("bandsintown").map(|v| v.is_empty()).unwrap_or(true))
            .map(|a| a.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn touch_last_requested(&self, ids: &[String]) -> Result<()> {
        self.ensure_connected()?;
        let now = Utc::now();
        {
            let mut meta = self.meta.write();
            for id in ids {
                let entry = meta.entry(id.clone()).or_insert_with(|| ActMetadata {
                    id: id.clone(),
                    last_requested_at: now,
                    updates_since_last_request: 0,
                });
                entry.last_requested_at = now;
                entry.updates_since_last_request = 0;
            }
        }
        self.flush_meta()
    }

    async fn evict_inactive(&self, threshold: u32) -> Result<usize> {
        self.ensure_connected()?;
        let stale_ids: Vec<String> = {
            let meta = self.meta.read();
            meta.values()
                .filter(|m| m.updates_since_last_request >= threshold)
                .map(|m| m.id.clone())
                .collect()
        };
        if stale_ids.is_empty() {
            return Ok(0);
        }
        {
            let mut acts = self.acts.write();
            let mut meta = self.meta.write();
            for id in &stale_ids {
                acts.remove(id);
                meta.remove(id);
            }
        }
        self.flush_acts()?;
        self.flush_meta()?;
        Ok(stale_ids.len())
    }

    async fn clear_all(&self) -> Result<()> {
        self.ensure_connected()?;
        {
            let mut acts = self.acts.write();
            acts.clear();
        }
        self.flush_acts()
    }

    async fn log_error(&self, err: UpdateErrorRecord) -> Result<()> {
        self.ensure_connected()?;
        TraceEvent::UpdateErrorLogged { id: err.id.clone(), source: err.error_source }.emit();
        {
            let mut errors = self.errors.write();
            errors.push(err);
            prune_expired(&mut errors);
        }
        self.flush_errors()
    }

    async fn recent_errors(&self) -> Result<Vec<UpdateErrorRecord>> {
        self.ensure_connected()?;
        let mut errors = self.errors.write();
        prune_expired(&mut errors);
        Ok(errors.clone())
    }

    async fn ensure_error_index(&self) -> Result<()> {
        // No secondary index exists for a file-backed store; a real
        // database-backed implementation would create the TTL index here.
        Ok(())
    }
}

fn prune_expired(errors: &mut Vec<UpdateErrorRecord>) {
    let cutoff = Utc::now() - chrono::Duration::days(UPDATE_ERROR_TTL_DAYS);
    errors.retain(|e| e.created_at >= cutoff);
}

fn load_map<T: serde::de::DeserializeOwned>(path: &Path) -> Result<HashMap<String, T>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw).unwrap_or_default())
}

fn load_vec<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw).unwrap_or_default())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_domain::error::ErrorSource;
    use std::collections::BTreeMap;

    fn sample_act(id: &str) -> Act {
        Act {
            id: id.to_owned(),
            name: "Test Act".to_owned(),
            country: None,
            region: None,
            disambiguation: None,
            ended: false,
            status: "active".to_owned(),
            relations: BTreeMap::new(),
            events: Vec::new(),
            updated_at: ac_domain::clock::format_berlin(Utc::now()),
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCacheStore::new(dir.path()).unwrap();
        store.put(sample_act("a1")).await.unwrap();
        let got = store.get("a1").await.unwrap().unwrap();
        assert_eq!(got.id, "a1");
    }

    #[tokio::test]
    async fn put_increments_updates_since_last_request() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCacheStore::new(dir.path()).unwrap();
        store.put(sample_act("a1")).await.unwrap();
        store.put(sample_act("a1")).await.unwrap();
        let meta = store.meta.read();
        assert_eq!(meta.get("a1").unwrap().updates_since_last_request, 2);
    }

    #[tokio::test]
    async fn touch_last_requested_resets_counter() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCacheStore::new(dir.path()).unwrap();
        store.put(sample_act("a1")).await.unwrap();
        store.put(sample_act("a1")).await.unwrap();
        store.touch_last_requested(&["a1".to_owned()]).await.unwrap();
        let meta = store.meta.read();
        assert_eq!(meta.get("a1").unwrap().updates_since_last_request, 0);
    }

    #[tokio::test]
    async fn evict_inactive_removes_acts_at_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCacheStore::new(dir.path()).unwrap();
        store.put(sample_act("x")).await.unwrap();
        store.put(sample_act("y")).await.unwrap();
        for _ in 0..13 {
            store.put(sample_act("x")).await.unwrap();
        }
        // x has been put 14 times, y once.
        let evicted = store.evict_inactive(14).await.unwrap();
        assert_eq!(evicted, 1);
        assert!(store.get("x").await.unwrap().is_none());
        assert!(store.get("y").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn probe_round_trips_and_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCacheStore::new(dir.path()).unwrap();
        store.probe().await.unwrap();
        assert!(store.get(PROBE_SENTINEL_ID).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recent_errors_prunes_entries_older_than_seven_days() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCacheStore::new(dir.path()).unwrap();
        store
            .log_error(UpdateErrorRecord {
                timestamp: Utc::now() - chrono::Duration::days(8),
                id: "old".to_owned(),
                error_message: "boom".to_owned(),
                error_source: ErrorSource::Musicbrainz,
                created_at: Utc::now() - chrono::Duration::days(8),
            })
            .await
            .unwrap();
        store
            .log_error(UpdateErrorRecord {
                timestamp: Utc::now(),
                id: "fresh".to_owned(),
                error_message: "boom".to_owned(),
                error_source: ErrorSource::Bandsintown,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let recent = store.recent_errors().await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "fresh");
    }

    #[tokio::test]
    async fn list_without_bandsintown_excludes_acts_with_the_relation() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCacheStore::new(dir.path()).unwrap();
        let mut with_bit = sample_act("has-bit");
        with_bit.relations.insert("bandsintown".to_owned(), "https://bandsintown.com/a/1".to_owned());
        store.put(with_bit).await.unwrap();
        store.put(sample_act("no-bit")).await.unwrap();

        let missing = store.list_without_bandsintown().await.unwrap();
        assert_eq!(missing, vec!["no-bit".to_owned()]);
    }
}
