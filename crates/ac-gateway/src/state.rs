//! Shared application state passed to all API handlers: one `Arc` per
//! long-lived collaborator, `Clone` is cheap.

use std::sync::Arc;

use ac_domain::config::Config;
use ac_service::ActService;
use ac_store::CacheStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn CacheStore>,
    pub service: Arc<ActService>,
    /// SHA-256 hash of the admin bearer token, computed once at startup so
    /// the raw secret isn't held around for the life of the process.
    /// `None` = admin endpoints are unreachable.
    pub admin_token_hash: Option<Vec<u8>>,
}
