use std::time::Duration;

use anyhow::{anyhow, Result};

use super::protocol::{ENDPOINT_NODE, OP_FIND_SUCCESSOR, OP_NOTIFY, OP_PREDECESSOR, OP_SUCCESSORS};
use super::types::Peer;

/// Every ring call gets one attempt with this deadline; a timeout is read
/// as peer death.
const RING_CALL_TIMEOUT: Duration = Duration::from_secs(1);

/// HTTP client side of the peer protocol. One request per operation against
/// the target's `/node` endpoint.
pub struct PeerClient {
    http: reqwest::Client,
}

impl PeerClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    async fn op(&self, host: &str, query: &str) -> Result<String> {
        let url = if query.is_empty() {
            format!("http://{}{}", host, ENDPOINT_NODE)
        } else {
            format!("http://{}{}?{}", host, ENDPOINT_NODE, query)
        };
        let response = self
            .http
            .get(url)
            .timeout(RING_CALL_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("peer {} answered {}", host, response.status()));
        }
        Ok(response.text().await?)
    }

    /// Ask a bare address who it is. Used to bootstrap from a `host:port`
    /// and to probe liveness.
    pub async fn identify(&self, host: &str) -> Result<Peer> {
        let body = self.op(host, "").await?;
        Peer::deserialize(&body)?.ok_or_else(|| anyhow!("peer {} sent an empty identity", host))
    }

    pub async fn successors(&self, peer: &Peer) -> Result<Vec<Peer>> {
        let body = self.op(&peer.host, &format!("op={}", OP_SUCCESSORS)).await?;
        let mut peers = Vec::new();
        for line in body.lines() {
            match Peer::deserialize(line)? {
                Some(p) => peers.push(p),
                None => return Err(anyhow!("short successor entry from {}", peer.host)),
            }
        }
        if peers.is_empty() {
            return Err(anyhow!("empty successor list from {}", peer.host));
        }
        Ok(peers)
    }

    pub async fn predecessor(&self, peer: &Peer) -> Result<Option<Peer>> {
        let body = self.op(&peer.host, &format!("op={}", OP_PREDECESSOR)).await?;
        Peer::deserialize(&body)
    }

    pub async fn find_successor(&self, peer: &Peer, id: u64) -> Result<Peer> {
        let body = self
            .op(&peer.host, &format!("op={}&id={:016x}", OP_FIND_SUCCESSOR, id))
            .await?;
        Peer::deserialize(&body)?
            .ok_or_else(|| anyhow!("peer {} sent an empty FindSuccessor answer", peer.host))
    }

    pub async fn notify(&self, peer: &Peer, about: &Peer) -> Result<()> {
        self.op(
            &peer.host,
            &format!("op={}&id={:016x}&host={}", OP_NOTIFY, about.id, about.host),
        )
        .await?;
        Ok(())
    }
}

impl Default for PeerClient {
    fn default() -> Self {
        Self::new()
    }
}
