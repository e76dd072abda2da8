//! DHT Network Protocol
//!
//! The `/store` endpoint contract. Single-key operations move raw value
//! bytes with the key as a hex query parameter; keyless operations move the
//! whole store as one JSON object for bulk transfer (join replication and
//! departure hand-off).

use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Endpoint for key-value access on a specific node's local store.
pub const ENDPOINT_STORE: &str = "/store";

/// Query parameters accepted by `/store`. Without `key`, GET dumps and POST
/// bulk-inserts the whole map.
#[derive(Debug, Deserialize)]
pub struct StoreQuery {
    pub key: Option<String>,
}

/// Bulk transfer payload: 16-hex-digit keys mapped to base64 values.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreDump(pub HashMap<String, String>);

impl StoreDump {
    pub fn encode(entries: &HashMap<u64, Vec<u8>>) -> Self {
        Self(
            entries
                .iter()
                .map(|(key, value)| (format!("{:016x}", key), base64::encode(value)))
                .collect(),
        )
    }

    pub fn decode(self) -> Result<HashMap<u64, Vec<u8>>> {
        let mut entries = HashMap::with_capacity(self.0.len());
        for (key, value) in self.0 {
            let key = u64::from_str_radix(&key, 16)?;
            let value = base64::decode(value.as_bytes())?;
            entries.insert(key, value);
        }
        Ok(entries)
    }
}
