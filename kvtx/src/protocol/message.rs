//! Request/reply vocabulary for the wire protocol (spec.md §6).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Opaque transaction/lock-owner identifier.
///
/// Under OCC this is the start timestamp (or, in a `COMMITTED` reply, the
/// commit timestamp) -- a small non-negative integer minted by the
/// coordinator. Under 2PL it is a randomly chosen 128-bit token. Both fit
/// in a `u128`, and the node never interprets the value beyond equality,
/// so one wire representation serves both regimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub u128);

impl TxId {
    pub fn random() -> Self {
        TxId(rand::random::<u128>())
    }

    pub fn from_ts(ts: u64) -> Self {
        TxId(ts as u128)
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A request, as sent client/coordinator -> node or client -> coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    Get {
        key: String,
    },
    Put {
        key: String,
        value: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        tx_id: Option<TxId>,
    },
    Delete {
        key: String,
    },
    Lock {
        key: String,
        tx_id: TxId,
    },
    Unlock {
        key: String,
        tx_id: TxId,
    },
    StartTx,
    CommitOcc {
        tx_id: TxId,
        read_set: Vec<String>,
        write_set: HashMap<String, String>,
    },
}

/// A reply, as sent node -> client/coordinator or coordinator -> client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reply {
    Ok {
        /// Outer `None` = field omitted (PUT/DELETE/LOCK/UNLOCK's bare OK).
        /// `Some(None)` = field present as JSON `null` (GET on an absent key).
        /// `Some(Some(v))` = field present with a value (GET on a present key).
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Option<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tx_id: Option<TxId>,
    },
    Locked {
        owner: TxId,
    },
    Committed {
        tx_id: TxId,
    },
    Aborted,
    Error {
        msg: String,
    },
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Ok { value: None, tx_id: None }
    }

    /// A GET reply: `value` is always present on the wire (`null` for an
    /// absent key), never omitted.
    pub fn ok_value(value: Option<String>) -> Self {
        Reply::Ok { value: Some(value), tx_id: None }
    }

    pub fn ok_tx_id(tx_id: TxId) -> Self {
        Reply::Ok { value: None, tx_id: Some(tx_id) }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Reply::Error { msg: msg.into() }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Reply::Committed { .. })
    }
}
