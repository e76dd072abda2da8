use std::collections::HashMap;

use anyhow::Result;
use dashmap::DashMap;

use crate::ring::types::between;

/// The storage back-end contract. `set`, `get`, `all` and `constrain` are
/// each atomic relative to one another; no ordering is promised beyond
/// that. Absent keys read as empty values, the two are indistinguishable at
/// this layer.
pub trait Store: Send + Sync + 'static {
    fn set(&self, key: u64, value: Vec<u8>) -> Result<()>;
    fn get(&self, key: u64) -> Result<Vec<u8>>;
    /// Snapshot of the whole map, used for bulk transfer.
    fn all(&self) -> Result<HashMap<u64, Vec<u8>>>;
    /// Retain only the keys on the arc `(a, b]`; delete everything else.
    /// Called with `a` = the new predecessor's id and `b` = our own.
    fn constrain(&self, a: u64, b: u64) -> Result<()>;
}

/// In-memory store. Keys vanish on process exit; durability across a clean
/// shutdown comes from the departure hand-off, not from this layer.
pub struct MemoryStore {
    entries: DashMap<u64, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: u64) -> bool {
        self.entries.contains_key(&key)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn set(&self, key: u64, value: Vec<u8>) -> Result<()> {
        self.entries.insert(key, value);
        Ok(())
    }

    fn get(&self, key: u64) -> Result<Vec<u8>> {
        Ok(self
            .entries
            .get(&key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    fn all(&self) -> Result<HashMap<u64, Vec<u8>>> {
        Ok(self
            .entries
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect())
    }

    fn constrain(&self, a: u64, b: u64) -> Result<()> {
        self.entries.retain(|&key, _| {
            let keep = between(a, key, b);
            if !keep {
                tracing::debug!("constrain dropping key {:016x}", key);
            }
            keep
        });
        Ok(())
    }
}
