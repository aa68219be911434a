//! Connection management for the client side: a persistent, lazily-opened
//! stream per data node (reused across transactions, spec.md §4.3), and a
//! fresh-per-call connection to the coordinator.

use std::net::SocketAddr;

use tokio::net::TcpStream;

use crate::error::CResult;
use crate::protocol::MessageStream;

/// One cached stream per node, indexed by `kvtx::sharding::node_index`.
pub struct NodePool {
    addrs: Vec<SocketAddr>,
    conns: Vec<Option<MessageStream<TcpStream>>>,
}

impl NodePool {
    pub fn new(addrs: Vec<SocketAddr>) -> Self {
        let len = addrs.len();
        NodePool { addrs, conns: (0..len).map(|_| None).collect() }
    }

    pub fn node_count(&self) -> usize {
        self.addrs.len()
    }

    /// Returns a connected stream to node `idx`, opening one if none is
    /// cached or the cached one was invalidated by a prior failure.
    pub async fn get(&mut self, idx: usize) -> CResult<&mut MessageStream<TcpStream>> {
        if self.conns[idx].is_none() {
            let stream = TcpStream::connect(self.addrs[idx]).await?;
            self.conns[idx] = Some(MessageStream::new(stream));
        }
        Ok(self.conns[idx].as_mut().expect("just ensured Some"))
    }

    /// Drops the cached connection to node `idx`, forcing a reconnect on
    /// the next `get` (spec.md §9's lazy-reconnect policy).
    pub fn invalidate(&mut self, idx: usize) {
        self.conns[idx] = None;
    }

    /// Drops every cached connection.
    pub fn close_all(&mut self) {
        for conn in &mut self.conns {
            *conn = None;
        }
    }
}

/// Opens a fresh connection to the coordinator. Never pooled: spec.md §4.3
/// requires `START_TX`/`COMMIT_OCC` to always reach the coordinator's
/// current state, so this call happens once per coordinator request rather
/// than being cached like a node connection.
pub async fn connect_coordinator(addr: SocketAddr) -> CResult<MessageStream<TcpStream>> {
    let stream = TcpStream::connect(addr).await?;
    Ok(MessageStream::new(stream))
}
