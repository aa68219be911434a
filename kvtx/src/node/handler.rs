//! Pure dispatch from a [`Request`] to a [`Reply`] against [`NodeState`],
//! kept separate from the async server loop so it is directly unit
//! testable without a socket (spec.md §4.1's six operations).

use crate::node::lock_table::LockOutcome;
use crate::node::state::NodeState;
use crate::protocol::{Reply, Request};

pub fn dispatch(state: &NodeState, request: Request) -> Reply {
    state.with_locked(|store, locks| match request {
        Request::Get { key } => Reply::ok_value(store.get(&key)),

        Request::Put { key, value, .. } => {
            // The node does not check whether the caller holds a lock on
            // `key` -- enforcement of lock discipline is the client's/
            // coordinator's responsibility (spec.md §4.1).
            store.put(key, value);
            Reply::ok()
        }

        Request::Delete { key } => {
            store.delete(&key);
            Reply::ok()
        }

        Request::Lock { key, tx_id } => match locks.lock(&key, tx_id) {
            LockOutcome::Granted => Reply::ok(),
            LockOutcome::Denied(owner) => Reply::Locked { owner },
        },

        Request::Unlock { key, tx_id } => {
            locks.unlock(&key, tx_id);
            Reply::ok()
        }

        Request::StartTx | Request::CommitOcc { .. } => {
            Reply::error("data nodes do not accept coordinator-only commands")
        }
    })
}
