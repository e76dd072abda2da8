//! Store API Handlers
//!
//! HTTP endpoints that expose a node's local store to the network. These
//! handlers never route: routing to the responsible node happens in the
//! facade (`server.rs`), and peers address the owner's `/store` directly,
//! with single keys during normal operation and whole-map dumps during
//! join replication and departure hand-off.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::storage::memory::Store;

use super::protocol::{StoreDump, StoreQuery};

/// GET `/store?key=<hex>` returns the raw value bytes (empty if absent);
/// GET `/store` returns the whole map as a bulk dump.
pub async fn handle_store_get<S: Store>(
    Extension(store): Extension<Arc<S>>,
    Query(query): Query<StoreQuery>,
) -> Response {
    match query.key.as_deref() {
        Some(raw) => {
            let Ok(key) = u64::from_str_radix(raw, 16) else {
                return StatusCode::BAD_REQUEST.into_response();
            };
            match store.get(key) {
                Ok(value) => (StatusCode::OK, value).into_response(),
                Err(e) => {
                    tracing::error!("store read for {:016x} failed: {}", key, e);
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }
        None => match store.all() {
            Ok(entries) => (StatusCode::OK, Json(StoreDump::encode(&entries))).into_response(),
            Err(e) => {
                tracing::error!("store dump failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
    }
}

/// POST `/store?key=<hex>` stores the request body under the key;
/// POST `/store` bulk-inserts a JSON dump.
pub async fn handle_store_post<S: Store>(
    Extension(store): Extension<Arc<S>>,
    Query(query): Query<StoreQuery>,
    body: Bytes,
) -> Response {
    match query.key.as_deref() {
        Some(raw) => {
            let Ok(key) = u64::from_str_radix(raw, 16) else {
                return StatusCode::BAD_REQUEST.into_response();
            };
            match store.set(key, body.to_vec()) {
                Ok(()) => StatusCode::OK.into_response(),
                Err(e) => {
                    tracing::error!("store write for {:016x} failed: {}", key, e);
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }
        None => {
            let dump: StoreDump = match serde_json::from_slice(&body) {
                Ok(dump) => dump,
                Err(e) => {
                    tracing::warn!("rejecting malformed bulk insert: {}", e);
                    return StatusCode::BAD_REQUEST.into_response();
                }
            };
            let entries = match dump.decode() {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("rejecting undecodable bulk insert: {}", e);
                    return StatusCode::BAD_REQUEST.into_response();
                }
            };
            for (key, value) in entries {
                if let Err(e) = store.set(key, value) {
                    tracing::error!("bulk insert of {:016x} failed: {}", key, e);
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            }
            StatusCode::OK.into_response()
        }
    }
}
