//! Ring Network Protocol
//!
//! Defines the single `/node` endpoint and the operation names it dispatches
//! on. All ring traffic is GET requests with an `op` query parameter; peers
//! are moved around as their text serializations (see
//! [`Peer::serialize`](super::types::Peer::serialize)).

use serde::Deserialize;

/// The one endpoint every node exposes for ring operations.
pub const ENDPOINT_NODE: &str = "/node";

/// Return the recipient's successor list, one serialization per line.
pub const OP_SUCCESSORS: &str = "Successors";
/// Return the recipient's predecessor, or an empty body if unknown.
pub const OP_PREDECESSOR: &str = "Predecessor";
/// Resolve the node responsible for the id in the `id` parameter.
pub const OP_FIND_SUCCESSOR: &str = "FindSuccessor";
/// Tell the recipient the sender may be its predecessor (`id` + `host`).
pub const OP_NOTIFY: &str = "Notify";

/// Query parameters accepted by `/node`. A request with no `op` asks the
/// node to identify itself.
#[derive(Debug, Deserialize)]
pub struct NodeQuery {
    pub op: Option<String>,
    pub id: Option<String>,
    pub host: Option<String>,
}
