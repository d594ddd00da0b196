//! C1 Cache Store (spec §4.1).
//!
//! Presents persistence to the rest of the core as a small, backend-agnostic
//! interface — spec §4.1 explicitly calls out that "the implementation is
//! MongoDB in the source, but the contract is backend-agnostic". This
//! default implementation here is a JSON file guarded by an in-memory map,
//! rather than a fabricated database driver dependency. Swapping in a real
//! database later only requires a new `CacheStore` impl.

pub mod json_store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ac_domain::error::Result;
use ac_domain::model::{Act, UpdateErrorRecord};

pub use json_store::JsonCacheStore;

/// Element of [`CacheStore::list_all_with_meta`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdWithUpdatedAt {
    pub id: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<String>,
}

/// Durable key → value storage for act records and metadata, plus a health
/// probe primitive (spec §4.1).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the canonical act record if present.
    async fn get(&self, id: &str) -> Result<Option<Act>>;

    /// Upserts by `record.id`. MUST also, atomically or in close
    /// succession, increment that act's `updatesSinceLastRequest` counter
    /// (spec §3 I3). Failure to persist the record is fatal to this call;
    /// failure to bump the counter is best-effort and never surfaced.
    async fn put(&self, record: Act) -> Result<()>;

    /// Write-then-delete round trip against a reserved sentinel id, used by
    /// the service's health gate (spec §4.5).
    async fn probe(&self) -> Result<()>;

    /// All cached act ids, sorted.
    async fn list_all_ids(&self) -> Result<Vec<String>>;

    /// All cached ids with their raw `updatedAt` string, sorted by id.
    async fn list_all_with_meta(&self) -> Result<Vec<IdWithUpdatedAt>>;

    /// Acts whose `relations` has no `bandsintown` key (or an empty one).
    async fn list_without_bandsintown(&self) -> Result<Vec<String>>;

    /// For each id: set `lastRequestedAt := now()` and
    /// `updatesSinceLastRequest := 0` (upsert).
    async fn touch_last_requested(&self, ids: &[String]) -> Result<()>;

    /// Atomically delete every act (and its metadata) whose
    /// `updatesSinceLastRequest` has reached the eviction threshold.
    /// Returns the number of act records deleted (spec §3 lifecycle).
    async fn evict_inactive(&self, threshold: u32) -> Result<usize>;

    /// Remove every act record (admin callback, spec §6).
    async fn clear_all(&self) -> Result<()>;

    /// Journal an update failure (queue/sweeper propagation policy, §7).
    async fn log_error(&self, err: UpdateErrorRecord) -> Result<()>;

    /// Non-expired journaled errors (7-day TTL, spec §3).
    async fn recent_errors(&self) -> Result<Vec<UpdateErrorRecord>>;

    /// Ensure the error journal's TTL index exists. A no-op for a
    /// file-backed store (there is no secondary index to create) but kept
    /// in the trait so a database-backed implementation has somewhere to
    /// hook `createIndex`.
    async fn ensure_error_index(&self) -> Result<()>;
}
