use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::{error, info, warn};

use crate::ring::node::Node;
use crate::ring::types::Peer;
use crate::storage::memory::Store;

use super::protocol::{StoreDump, ENDPOINT_STORE};

const STORE_CALL_TIMEOUT: Duration = Duration::from_millis(500);
const STORE_CALL_ATTEMPTS: usize = 3;

/// Binds a ring node to a store and exposes the routed key-value API.
pub struct Dht<S: Store> {
    node: Arc<Node>,
    store: Arc<S>,
    http: reqwest::Client,
}

impl<S: Store> Dht<S> {
    /// Wire the store to the node's ownership changes and, when the node
    /// has joined a ring, seed the store from the successor. A failure to
    /// replicate is a failed join: no facade is returned.
    pub async fn new(node: Arc<Node>, store: Arc<S>) -> Result<Arc<Self>> {
        let hook_store = store.clone();
        let node_id = node.id();
        node.on_predecessor_change(Arc::new(move |predecessor: Peer| {
            // keys up to the new predecessor's id belong to it now
            if let Err(e) = hook_store.constrain(predecessor.id, node_id) {
                error!("constrain after predecessor change failed: {}", e);
            }
        }))
        .await;

        let dht = Arc::new(Self {
            node,
            store,
            http: reqwest::Client::new(),
        });
        dht.replicate_from_successor().await?;
        Ok(dht)
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Read the value for `key` from whichever node owns it.
    pub async fn get(&self, key: u64) -> Result<Vec<u8>> {
        let owner = self.node.find_successor(key).await?;
        if owner.id == self.node.id() {
            return self.store.get(key);
        }
        let url = format!("http://{}{}?key={:016x}", owner.host, ENDPOINT_STORE, key);
        let response = self
            .request_with_retry(
                || self.http.get(url.clone()),
                STORE_CALL_TIMEOUT,
                STORE_CALL_ATTEMPTS,
            )
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "read of {:016x} on {} failed: {}",
                key,
                owner.host,
                response.status()
            ));
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Install `value` under `key` on whichever node owns it.
    pub async fn put(&self, key: u64, value: Vec<u8>) -> Result<()> {
        let owner = self.node.find_successor(key).await?;
        if owner.id == self.node.id() {
            return self.store.set(key, value);
        }
        let url = format!("http://{}{}?key={:016x}", owner.host, ENDPOINT_STORE, key);
        let response = self
            .request_with_retry(
                || self.http.post(url.clone()).body(value.clone()),
                STORE_CALL_TIMEOUT,
                STORE_CALL_ATTEMPTS,
            )
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "write of {:016x} on {} failed: {}",
                key,
                owner.host,
                response.status()
            ));
        }
        Ok(())
    }

    /// Departure hook: hand the entire store to the predecessor so a
    /// graceful leave loses no keys. Call after the maintenance loop has
    /// stopped and before the listener closes.
    pub async fn depart(&self) -> Result<()> {
        let Some(predecessor) = self.node.predecessor().await else {
            warn!("departing with no known predecessor, keys stay behind");
            return Ok(());
        };
        if predecessor.id == self.node.id() {
            info!("sole ring member departing, nothing to hand off");
            return Ok(());
        }
        let entries = self.store.all()?;
        if entries.is_empty() {
            return Ok(());
        }
        let payload = StoreDump::encode(&entries);
        let url = format!("http://{}{}", predecessor.host, ENDPOINT_STORE);
        let response = self
            .request_with_retry(
                || self.http.post(url.clone()).json(&payload),
                STORE_CALL_TIMEOUT,
                STORE_CALL_ATTEMPTS,
            )
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "hand-off to {} failed: {}",
                predecessor.host,
                response.status()
            ));
        }
        info!(
            "handed {} keys to predecessor {}",
            entries.len(),
            predecessor.serialize()
        );
        Ok(())
    }

    /// Copy the successor's entire store, making this node a replica of the
    /// range it will own once stabilization completes. The successor sheds
    /// the moved keys itself when its predecessor pointer catches up.
    async fn replicate_from_successor(&self) -> Result<()> {
        let successor = self.node.first_successor().await;
        if successor.id == self.node.id() {
            return Ok(());
        }
        let url = format!("http://{}{}", successor.host, ENDPOINT_STORE);
        let response = self
            .request_with_retry(
                || self.http.get(url.clone()),
                STORE_CALL_TIMEOUT,
                STORE_CALL_ATTEMPTS,
            )
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "bulk fetch from {} failed: {}",
                successor.host,
                response.status()
            ));
        }
        let dump: StoreDump = response.json().await?;
        let entries = dump.decode()?;
        let count = entries.len();
        for (key, value) in entries {
            self.store.set(key, value)?;
        }
        info!(
            "replicated {} keys from successor {}",
            count,
            successor.serialize()
        );
        Ok(())
    }

    /// One retry loop for every store transfer call. `build` constructs a
    /// fresh request per attempt; backoff doubles from 150 ms with jitter,
    /// capped at 1.2 s.
    async fn request_with_retry<F>(
        &self,
        build: F,
        timeout: Duration,
        attempts: usize,
    ) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = build().timeout(timeout).send().await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow!("Retry attempts exhausted"))
    }
}
