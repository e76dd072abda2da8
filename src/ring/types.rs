use anyhow::{anyhow, Result};

/// Number of bits in a ring identifier. Keys and node ids live on the circle
/// of integers modulo 2^M.
pub const M: usize = 64;

/// Length of the successor list.
#[cfg(not(test))]
pub const R: usize = 32;
/// Shorter list in test builds so list contents stay assertable.
#[cfg(test)]
pub const R: usize = 4;

/// The half-open clockwise arc test: does `b` lie strictly after `a` and up
/// to and including `c` on the ring?
///
/// When `a == c` the arc covers the entire ring, so a single node is the
/// successor of every key, including its own identifier.
pub fn between(a: u64, b: u64, c: u64) -> bool {
    if a < c {
        a < b && b <= c
    } else {
        a < b || b <= c
    }
}

/// A reference to a node on the ring: its identifier and the address where
/// its HTTP endpoint listens. Peers are plain values; whether a peer happens
/// to refer to the local process is decided by id comparison at the call
/// site, not encoded in the type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub id: u64,
    pub host: String,
}

impl Peer {
    /// Wire form: 16 lowercase hex digits, a colon, then the host string.
    pub fn serialize(&self) -> String {
        format!("{:016x}:{}", self.id, self.host)
    }

    /// Inverse of [`serialize`](Peer::serialize). Inputs shorter than the 16
    /// hex digits decode as "no peer"; anything longer must parse.
    pub fn deserialize(s: &str) -> Result<Option<Peer>> {
        if s.len() < 16 {
            return Ok(None);
        }
        let (id_part, host) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("peer serialization {:?} has no host separator", s))?;
        let id = u64::from_str_radix(id_part, 16)
            .map_err(|e| anyhow!("bad peer id in {:?}: {}", s, e))?;
        Ok(Some(Peer {
            id,
            host: host.to_string(),
        }))
    }
}
