//! DHT Facade Module
//!
//! The external surface of the system: routed `get`/`put` over the whole
//! key space, plus the bulk key movements that keep the mapping intact as
//! membership changes.
//!
//! ## Key movement
//! - **Join**: a new node first copies its successor's entire store, making
//!   itself a replica of the range it is about to take over. When the
//!   successor later learns its new predecessor, its own `constrain` sheds
//!   the keys that moved.
//! - **Predecessor change**: the facade registers a hook on the node that
//!   narrows the local store to exactly the keys still owned.
//! - **Clean departure**: the full store is posted to the predecessor
//!   before the process exits, so no key is lost to a graceful leave.

pub mod handlers;
pub mod protocol;
pub mod server;

#[cfg(test)]
mod tests;
