//! The thin HTTP surface (spec §1, §6) — routing, response pretty-printing,
//! and the admin auth guard live here, deliberately outside the core
//! crates: one `Router` builder, handlers as free functions, `AppState` as
//! the single `State` extractor.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use sha2::Digest;

use ac_domain::error::Error;
use ac_domain::model::Act;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/acts/:ids", get(get_acts))
        .route("/admin/clear", post(admin_clear_all))
        .route("/admin/errors", get(admin_recent_errors))
        .route("/admin/evict", post(admin_evict_inactive))
        .with_state(state)
}

/// Wraps [`ac_domain::error::Error`] (plus the gateway's own admin-auth
/// rejection) so this crate can implement [`IntoResponse`] for it
/// (orphan-rule workaround, not a semantic type).
enum ApiError {
    Core(Error),
    Unauthorized,
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self::Core(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cached_count: Option<usize>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::Unauthorized => {
                let body = ErrorBody {
                    message: "admin authorization failed".to_owned(),
                    code: "SVC_003",
                    missing_count: None,
                    cached_count: None,
                };
                return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({ "error": body }))).into_response();
            }
            ApiError::Core(err) => err,
        };

        let (status, missing_count, cached_count) = match &err {
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, None, None),
            Error::PartialCacheMiss { missing_count, cached_count } => {
                (StatusCode::ACCEPTED, Some(*missing_count), Some(*cached_count))
            }
            Error::UpstreamFetch { .. } => (StatusCode::BAD_GATEWAY, None, None),
            Error::Misconfiguration(_) | Error::StoreUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, None, None)
            }
            Error::EventData(_) | Error::Io(_) | Error::Json(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, None, None)
            }
        };

        let body = ErrorBody { message: err.to_string(), code: err.code(), missing_count, cached_count };
        (status, Json(serde_json::json!({ "error": body }))).into_response()
    }
}

#[derive(Serialize)]
struct ActsResponse {
    acts: Vec<Act>,
    meta: ActsMeta,
}

#[derive(Serialize)]
struct ActsMeta {
    count: usize,
}

/// `GET /acts/:ids` — `:ids` is one or more comma-separated upstream ids
/// (spec §6). Maps directly onto `ActService::fetch_many`.
async fn get_acts(State(state): State<AppState>, Path(ids): Path<String>) -> Result<Json<ActsResponse>, ApiError> {
    let ids: Vec<String> = ids.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect();
    if ids.is_empty() {
        return Err(Error::InvalidRequest("id list must not be empty".to_owned()).into());
    }

    let acts = state.service.fetch_many(&ids).await?;
    let meta = ActsMeta { count: acts.len() };
    Ok(Json(ActsResponse { acts, meta }))
}

/// Bearer-token guard for the admin callbacks (spec §1: TOTP validation
/// itself is an external auth-layer concern, out of the core's scope). This
/// is a presence/hash-equality stub, not a TOTP implementation — see
/// `ac_domain::config::AdminConfig::totp_secret` and
/// `AppState::admin_token_hash`.
fn admin_authorized(state: &AppState, headers: &axum::http::HeaderMap) -> bool {
    let Some(expected) = state.admin_token_hash.as_deref() else {
        return false;
    };
    let Some(auth) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let Some(token) = auth.strip_prefix("Bearer ") else {
        return false;
    };
    sha2::Sha256::digest(token.as_bytes()).as_slice() == expected
}

async fn admin_clear_all(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<StatusCode, ApiError> {
    if !admin_authorized(&state, &headers) {
        return Err(ApiError::Unauthorized);
    }
    state.store.clear_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_recent_errors(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<Json<Vec<ac_domain::model::UpdateErrorRecord>>, ApiError> {
    if !admin_authorized(&state, &headers) {
        return Err(ApiError::Unauthorized);
    }
    Ok(Json(state.store.recent_errors().await?))
}

#[derive(Serialize)]
struct EvictResponse {
    evicted: usize,
}

async fn admin_evict_inactive(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<Json<EvictResponse>, ApiError> {
    if !admin_authorized(&state, &headers) {
        return Err(ApiError::Unauthorized);
    }
    let evicted = state.store.evict_inactive(ac_domain::model::EVICTION_THRESHOLD).await?;
    Ok(Json(EvictResponse { evicted }))
}
