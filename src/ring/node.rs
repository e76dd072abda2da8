use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::client::PeerClient;
use super::types::{between, Peer, M, R};

/// Callback invoked (outside the ring lock) whenever the predecessor pointer
/// changes to a different peer. The DHT facade uses this to shed keys that
/// the new predecessor now owns.
pub type PredecessorHook = Arc<dyn Fn(Peer) + Send + Sync>;

/// The mutable ring pointers. Mutations are serialized behind one lock;
/// remote calls are never made while it is held.
struct RingState {
    finger: Vec<Peer>,
    successors: Vec<Peer>,
    predecessor: Option<Peer>,
}

/// A node's view of the ring: its own position plus the routing state needed
/// to find any key's owner in O(log N) hops.
///
/// Peers are stored as plain `(id, host)` values. Operations that take a
/// peer compare its id against the local id and either run inline or go
/// through the [`PeerClient`], so the routing code never cares whether a
/// hop is local or remote.
pub struct Node {
    id: u64,
    host: String,
    state: RwLock<RingState>,
    client: PeerClient,
    next_finger: AtomicUsize,
    on_predecessor: RwLock<Option<PredecessorHook>>,
}

impl Node {
    /// A fresh node is a complete one-element ring: every finger and every
    /// successor slot points at itself, and it is its own predecessor.
    pub fn new(id: u64, host: String) -> Arc<Self> {
        let me = Peer {
            id,
            host: host.clone(),
        };
        Arc::new(Self {
            id,
            host,
            state: RwLock::new(RingState {
                finger: vec![me.clone(); M],
                successors: vec![me.clone(); R],
                predecessor: Some(me),
            }),
            client: PeerClient::new(),
            next_finger: AtomicUsize::new(0),
            on_predecessor: RwLock::new(None),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn self_peer(&self) -> Peer {
        Peer {
            id: self.id,
            host: self.host.clone(),
        }
    }

    pub fn serialize(&self) -> String {
        self.self_peer().serialize()
    }

    pub async fn successor_list(&self) -> Vec<Peer> {
        self.state.read().await.successors.clone()
    }

    pub async fn first_successor(&self) -> Peer {
        self.state.read().await.successors[0].clone()
    }

    pub async fn predecessor(&self) -> Option<Peer> {
        self.state.read().await.predecessor.clone()
    }

    pub async fn on_predecessor_change(&self, hook: PredecessorHook) {
        *self.on_predecessor.write().await = Some(hook);
    }

    /// Enter an existing ring through any live member. On success the
    /// successor list is primed from the bootstrap's answer and the
    /// predecessor is cleared for stabilization to fill in; on failure no
    /// state is committed.
    pub async fn join(&self, bootstrap: &Peer) -> Result<()> {
        let successor = self.client.find_successor(bootstrap, self.id).await?;
        let tail = self.successors_of(&successor).await?;

        let mut state = self.state.write().await;
        install_successors(&mut state, &successor, &tail);
        state.predecessor = None;
        info!("joined the ring behind {}", successor.serialize());
        Ok(())
    }

    /// Resolve the node responsible for `key`: the first live node whose id
    /// is greater than or equal to it, clockwise.
    pub async fn find_successor(&self, key: u64) -> Result<Peer> {
        let (successor, hop) = {
            let state = self.state.read().await;
            let successor = state.successors[0].clone();
            if between(self.id, key, successor.id) {
                return Ok(successor);
            }
            (successor, closest_preceding(&state, self.id, key))
        };
        match hop {
            // forward the query around the circle
            Some(next) => self.client.find_successor(&next, key).await,
            // no finger precedes the key, so our successor is the best answer
            None => Ok(successor),
        }
    }

    /// The finger closest to `key` without passing it, or self when the
    /// table holds no such entry.
    pub async fn closest_preceding_node(&self, key: u64) -> Peer {
        let state = self.state.read().await;
        closest_preceding(&state, self.id, key).unwrap_or_else(|| self.self_peer())
    }

    /// One stabilization round. Reconciles the successor head against its
    /// predecessor pointer, refreshes the rest of the list from the head,
    /// and notifies the head about us. Any failure to reach the head costs
    /// it its place in the list.
    pub async fn stabilize(&self) {
        if let Err(e) = self.try_stabilize().await {
            debug!("stabilize failed: {}", e);
            self.shift_successors().await;
        }
    }

    async fn try_stabilize(&self) -> Result<()> {
        let successor = self.first_successor().await;
        let candidate = self.predecessor_of(&successor).await?;

        let mut head = successor.clone();
        if let Some(x) = candidate {
            if between(self.id, x.id, successor.id) {
                head = x;
            }
        }

        if head.id != successor.id {
            // A closer successor is rumored. It must answer before it may
            // displace the verified head.
            match self.successors_of(&head).await {
                Ok(rest) => {
                    let mut state = self.state.write().await;
                    install_successors(&mut state, &head, &rest);
                    drop(state);
                    return self.notify_peer(&head).await;
                }
                Err(e) => {
                    debug!("rumored successor {} unreachable: {}", head.serialize(), e);
                }
            }
        }

        let rest = self.successors_of(&successor).await?;
        let mut state = self.state.write().await;
        install_successors(&mut state, &successor, &rest);
        drop(state);
        self.notify_peer(&successor).await
    }

    /// Drop the unreachable head, promote the rest, duplicate the last
    /// entry. The sole recovery path for successor death.
    async fn shift_successors(&self) {
        let mut state = self.state.write().await;
        let dropped = state.successors.remove(0);
        let last = state
            .successors
            .last()
            .cloned()
            .unwrap_or_else(|| self.self_peer());
        state.successors.push(last);
        state.finger[0] = state.successors[0].clone();
        warn!(
            "successor {} unreachable, promoted {}",
            dropped.serialize(),
            state.successors[0].serialize()
        );
    }

    /// Receipt side of `Notify`: `candidate` believes it may be our
    /// predecessor. Adopt it when we have none, when it sits on the arc
    /// between the current predecessor and us, or when the current
    /// predecessor no longer answers a probe.
    pub async fn handle_notify(&self, candidate: Peer) {
        let current = self.predecessor().await;

        // Probe a live remote predecessor before letting the candidate
        // displace it. The probe runs without the lock held.
        let current_reachable = match &current {
            Some(p) if p.id != self.id => self.client.identify(&p.host).await.is_ok(),
            _ => true,
        };

        let mut adopted = None;
        {
            let mut state = self.state.write().await;
            let adopt = match &state.predecessor {
                None => true,
                Some(p) if between(p.id, candidate.id, self.id) => true,
                // only the peer we actually probed may be evicted for silence
                Some(p) => {
                    !current_reachable && current.as_ref().is_some_and(|c| c.id == p.id)
                }
            };
            if adopt {
                let changed = state.predecessor.as_ref().map(|p| p.id) != Some(candidate.id);
                state.predecessor = Some(candidate.clone());
                if changed {
                    adopted = Some(candidate);
                }
            }
        }

        if let Some(peer) = adopted {
            info!("adopted predecessor {}", peer.serialize());
            self.fire_predecessor_hook(peer).await;
        }
    }

    async fn fire_predecessor_hook(&self, peer: Peer) {
        let hook = self.on_predecessor.read().await.clone();
        if let Some(hook) = hook {
            hook(peer);
        }
    }

    /// One fix-fingers step: refresh the entry the rotating cursor points
    /// at, then advance. Errors leave a conservative neighbour copy behind
    /// and are retried on a later pass.
    pub async fn fix_next_finger(&self) {
        let i = self.next_finger.fetch_add(1, Ordering::Relaxed) % M;
        let target = self.id.wrapping_add(1u64 << i);
        match self.find_successor(target).await {
            Ok(peer) => {
                let mut state = self.state.write().await;
                state.finger[i] = peer;
            }
            Err(e) => {
                debug!("fix-fingers {} failed: {}", i, e);
                let mut state = self.state.write().await;
                let fallback = state.finger[(i + M - 1) % M].clone();
                state.finger[i] = fallback;
            }
        }
    }

    /// Probe the predecessor; clear the pointer if it no longer answers so
    /// the next `Notify` can refill it.
    pub async fn check_predecessor(&self) {
        let Some(current) = self.predecessor().await else {
            return;
        };
        if current.id == self.id {
            return;
        }
        if self.client.identify(&current.host).await.is_ok() {
            return;
        }
        let mut state = self.state.write().await;
        if state.predecessor.as_ref().is_some_and(|p| p.id == current.id) {
            warn!("predecessor {} unreachable, clearing", current.serialize());
            state.predecessor = None;
        }
    }

    // Dispatch boundary: run the peer operation inline when the peer is us,
    // over the wire otherwise.

    async fn successors_of(&self, peer: &Peer) -> Result<Vec<Peer>> {
        if peer.id == self.id {
            Ok(self.successor_list().await)
        } else {
            self.client.successors(peer).await
        }
    }

    async fn predecessor_of(&self, peer: &Peer) -> Result<Option<Peer>> {
        if peer.id == self.id {
            Ok(self.predecessor().await)
        } else {
            self.client.predecessor(peer).await
        }
    }

    async fn notify_peer(&self, peer: &Peer) -> Result<()> {
        let me = self.self_peer();
        if peer.id == self.id {
            self.handle_notify(me).await;
            Ok(())
        } else {
            self.client.notify(peer, &me).await
        }
    }

    #[cfg(test)]
    pub(crate) async fn set_finger(&self, i: usize, peer: Peer) {
        self.state.write().await.finger[i] = peer;
    }
}

fn closest_preceding(state: &RingState, self_id: u64, key: u64) -> Option<Peer> {
    for finger in state.finger.iter().rev() {
        if finger.id != self_id && between(self_id, finger.id, key) {
            return Some(finger.clone());
        }
    }
    None
}

/// Replace the successor list with `head` followed by the first R-1 entries
/// of `head`'s own list, padding with the last known entry when the answer
/// is short. `finger[0]` mirrors the head by convention.
fn install_successors(state: &mut RingState, head: &Peer, rest: &[Peer]) {
    state.successors[0] = head.clone();
    state.finger[0] = head.clone();
    let fallback = rest.last().unwrap_or(head);
    for i in 1..R {
        state.successors[i] = rest.get(i - 1).unwrap_or(fallback).clone();
    }
}
