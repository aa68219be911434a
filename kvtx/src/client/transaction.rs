//! The client-side transaction state machine, uniform across both
//! concurrency-control regimes (spec.md §4.3, §8's testable properties
//! P4-P8).

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

use crate::client::connection::{connect_coordinator, NodePool};
use crate::error::CResult;
use crate::protocol::{Reply, Request, TxId};
use crate::sharding;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Occ,
    TwoPl,
}

/// A single transaction attempt. `begin` resets all of this back to its
/// starting state, so one `Transaction` value can be reused across
/// attempts (spec.md §3's `IDLE -> ACTIVE -> {COMMITTED, ABORTED} -> IDLE`
/// lifecycle).
pub struct Transaction {
    coordinator_addr: SocketAddr,
    nodes: NodePool,
    mode: Mode,
    tx_id: Option<TxId>,
    read_set: HashSet<String>,
    write_set: HashMap<String, String>,
    local_cache: HashMap<String, Option<String>>,
    held_locks: HashSet<String>,
}

impl Transaction {
    pub fn new(coordinator_addr: SocketAddr, node_addrs: Vec<SocketAddr>) -> Self {
        Transaction {
            coordinator_addr,
            nodes: NodePool::new(node_addrs),
            mode: Mode::Occ,
            tx_id: None,
            read_set: HashSet::new(),
            write_set: HashMap::new(),
            local_cache: HashMap::new(),
            held_locks: HashSet::new(),
        }
    }

    /// Starts a new attempt under `mode`, discarding any state left over
    /// from a previous attempt.
    pub async fn begin(&mut self, mode: Mode) -> CResult<()> {
        self.mode = mode;
        self.read_set.clear();
        self.write_set.clear();
        self.local_cache.clear();
        self.held_locks.clear();

        self.tx_id = Some(match mode {
            Mode::Occ => {
                let mut conn = connect_coordinator(self.coordinator_addr).await?;
                conn.write_message(&Request::StartTx).await?;
                match conn.read_message::<Reply>().await? {
                    Some(Reply::Ok { tx_id: Some(tx_id), .. }) => tx_id,
                    other => return Err(protocol_error("START_TX", other)),
                }
            }
            Mode::TwoPl => TxId::random(),
        });
        Ok(())
    }

    fn tx_id(&self) -> TxId {
        self.tx_id.expect("begin() must be called before any other Transaction method")
    }

    /// Reads `key`, honoring read-your-writes and the local cache before
    /// touching the network. Under 2PL, first acquires the key's lock;
    /// `None` is returned uniformly whether the lock was denied or the key
    /// is simply absent (spec.md's Open Questions: both are treated as an
    /// abort signal by the caller).
    pub async fn read(&mut self, key: &str) -> CResult<Option<String>> {
        if let Some(value) = self.write_set.get(key) {
            return Ok(Some(value.clone()));
        }
        if let Some(cached) = self.local_cache.get(key) {
            return Ok(cached.clone());
        }

        if self.mode == Mode::TwoPl && !self.held_locks.contains(key) {
            if !self.try_lock(key).await? {
                return Ok(None);
            }
        }

        let idx = sharding::node_index(key, self.nodes.node_count());
        let conn = self.nodes.get(idx).await?;
        conn.write_message(&Request::Get { key: key.to_string() }).await?;
        let value = match conn.read_message::<Reply>().await {
            Ok(Some(Reply::Ok { value: Some(value), .. })) => value,
            Ok(other) => return Err(protocol_error("GET", other)),
            Err(e) => {
                self.nodes.invalidate(idx);
                return Err(e);
            }
        };

        self.local_cache.insert(key.to_string(), value.clone());
        self.read_set.insert(key.to_string());
        Ok(value)
    }

    /// Buffers a write. Under 2PL, first acquires the key's lock, failing
    /// (`false`) if it is held by another transaction. The key is also
    /// added to `read_set` (matches `original_source/src/client.py`'s
    /// `write`, preserved deliberately per DESIGN.md's Open Questions).
    pub async fn write(&mut self, key: &str, value: String) -> CResult<bool> {
        if self.mode == Mode::TwoPl && !self.held_locks.contains(key) && !self.try_lock(key).await? {
            return Ok(false);
        }
        self.write_set.insert(key.to_string(), value);
        self.read_set.insert(key.to_string());
        Ok(true)
    }

    async fn try_lock(&mut self, key: &str) -> CResult<bool> {
        let idx = sharding::node_index(key, self.nodes.node_count());
        let tx_id = self.tx_id();
        let conn = self.nodes.get(idx).await?;
        conn.write_message(&Request::Lock { key: key.to_string(), tx_id }).await?;
        match conn.read_message::<Reply>().await {
            Ok(Some(Reply::Ok { .. })) => {
                self.held_locks.insert(key.to_string());
                Ok(true)
            }
            Ok(Some(Reply::Locked { .. })) => Ok(false),
            Ok(other) => Err(protocol_error("LOCK", other)),
            Err(e) => {
                self.nodes.invalidate(idx);
                Err(e)
            }
        }
    }

    /// Commits the transaction. Returns whether the commit succeeded.
    ///
    /// Under OCC, an empty `write_set` commits immediately without
    /// contacting the coordinator (spec.md §4.2's read-only shortcut,
    /// applied here on the client side). Under 2PL there is no such
    /// shortcut: even a read-only transaction must still release any
    /// locks it acquired, so `commit_two_pl` always runs
    /// (`original_source/src/client.py`'s `commit`'s `finally: unlock_all()`
    /// is unconditional, independent of the read-only check that only
    /// guards the OCC path).
    pub async fn commit(&mut self) -> CResult<bool> {
        match self.mode {
            Mode::Occ if self.write_set.is_empty() => Ok(true),
            Mode::Occ => self.commit_occ().await,
            Mode::TwoPl => self.commit_two_pl().await,
        }
    }

    async fn commit_occ(&mut self) -> CResult<bool> {
        let mut conn = connect_coordinator(self.coordinator_addr).await?;
        conn.write_message(&Request::CommitOcc {
            tx_id: self.tx_id(),
            read_set: self.read_set.iter().cloned().collect(),
            write_set: self.write_set.clone(),
        })
        .await?;
        Ok(matches!(conn.read_message::<Reply>().await?, Some(reply) if reply.is_committed()))
    }

    /// Applies every buffered write, then unconditionally releases every
    /// held lock regardless of whether any write failed (spec.md §4.3:
    /// "lock release on commit/abort is guaranteed, even on error").
    async fn commit_two_pl(&mut self) -> CResult<bool> {
        let tx_id = self.tx_id();
        let mut all_ok = true;
        let writes: Vec<(String, String)> = self.write_set.drain().collect();
        for (key, value) in writes {
            let idx = sharding::node_index(&key, self.nodes.node_count());
            let ok = match self.nodes.get(idx).await {
                Ok(conn) => {
                    let sent = conn
                        .write_message(&Request::Put { key: key.clone(), value, tx_id: Some(tx_id) })
                        .await;
                    match sent {
                        Ok(()) => matches!(conn.read_message::<Reply>().await, Ok(Some(Reply::Ok { .. }))),
                        Err(_) => false,
                    }
                }
                Err(_) => false,
            };
            if !ok {
                self.nodes.invalidate(idx);
                all_ok = false;
            }
        }

        self.release_all_locks().await;
        Ok(all_ok)
    }

    /// Discards this attempt's buffered state. Under 2PL, releases every
    /// held lock.
    pub async fn abort(&mut self) {
        self.read_set.clear();
        self.write_set.clear();
        self.local_cache.clear();
        if self.mode == Mode::TwoPl {
            self.release_all_locks().await;
        }
    }

    async fn release_all_locks(&mut self) {
        let tx_id = self.tx_id();
        let keys: Vec<String> = self.held_locks.drain().collect();
        for key in keys {
            let idx = sharding::node_index(&key, self.nodes.node_count());
            if let Ok(conn) = self.nodes.get(idx).await {
                let _ = conn.write_message(&Request::Unlock { key, tx_id }).await;
                let _ = conn.read_message::<Reply>().await;
            }
        }
    }

    /// Drops every cached node connection.
    pub fn close(&mut self) {
        self.nodes.close_all();
    }
}

fn protocol_error(op: &str, reply: Option<Reply>) -> crate::error::Error {
    crate::error::Error::Protocol(format!("unexpected reply to {op}: {reply:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transaction_has_no_tx_id_until_begin() {
        let tx = Transaction::new("127.0.0.1:1".parse().unwrap(), vec!["127.0.0.1:2".parse().unwrap()]);
        assert!(tx.tx_id.is_none());
    }
}
