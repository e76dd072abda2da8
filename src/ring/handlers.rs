//! Ring API Handler
//!
//! The HTTP face of the peer protocol: a single `/node` endpoint dispatched
//! on the `op` query parameter. Bodies are peer serializations, one per
//! line. Malformed input is rejected with 400 before any state is touched.

use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::node::Node;
use super::protocol::{NodeQuery, OP_FIND_SUCCESSOR, OP_NOTIFY, OP_PREDECESSOR, OP_SUCCESSORS};
use super::types::Peer;

pub async fn handle_node(
    Extension(node): Extension<Arc<Node>>,
    Query(query): Query<NodeQuery>,
) -> Response {
    match query.op.as_deref() {
        Some(OP_SUCCESSORS) => {
            let lines: Vec<String> = node
                .successor_list()
                .await
                .iter()
                .map(|p| p.serialize())
                .collect();
            (StatusCode::OK, lines.join("\n")).into_response()
        }
        Some(OP_PREDECESSOR) => {
            let body = node
                .predecessor()
                .await
                .map(|p| p.serialize())
                .unwrap_or_default();
            (StatusCode::OK, body).into_response()
        }
        Some(OP_FIND_SUCCESSOR) => {
            let id = match parse_id(query.id.as_deref()) {
                Some(id) => id,
                None => return StatusCode::BAD_REQUEST.into_response(),
            };
            match node.find_successor(id).await {
                Ok(peer) => (StatusCode::OK, peer.serialize()).into_response(),
                Err(e) => {
                    tracing::warn!("FindSuccessor for {:016x} failed: {}", id, e);
                    StatusCode::BAD_REQUEST.into_response()
                }
            }
        }
        Some(OP_NOTIFY) => {
            let (Some(id), Some(host)) = (parse_id(query.id.as_deref()), query.host) else {
                return StatusCode::BAD_REQUEST.into_response();
            };
            node.handle_notify(Peer { id, host }).await;
            StatusCode::OK.into_response()
        }
        // no op, or one we do not know: identify ourselves
        _ => (StatusCode::OK, node.serialize()).into_response(),
    }
}

fn parse_id(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| u64::from_str_radix(s, 16).ok())
}
