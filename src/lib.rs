//! Chord Distributed Hash Table Library
//!
//! This library crate defines the core modules that make up the DHT node.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of three loosely coupled subsystems:
//!
//! - **`ring`**: The overlay membership and routing layer. Each node keeps a
//!   finger table, a successor list and a predecessor pointer on the 64-bit
//!   identifier circle, and repairs them with periodic stabilization,
//!   fix-fingers and predecessor liveness checks.
//! - **`storage`**: The local state layer. An in-memory key-value container
//!   keyed by ring identifiers, with a range-restriction primitive used when
//!   key ownership moves between nodes.
//! - **`dht`**: The external facade. Routes `get`/`put` requests to the node
//!   responsible for a key and handles bulk key transfer on join and on
//!   clean departure.

pub mod dht;
pub mod ring;
pub mod storage;
