//! Dispatch from a client-facing [`Request`] to a [`Reply`] against
//! [`Coordinator`] state (spec.md §4.2's two coordinator-only commands).

use crate::coordinator::state::Coordinator;
use crate::protocol::{Reply, Request};

pub async fn dispatch(coordinator: &Coordinator, request: Request) -> Reply {
    match request {
        Request::StartTx => Reply::ok_tx_id(coordinator.start_tx().await),

        Request::CommitOcc { tx_id, read_set, write_set } => {
            coordinator
                .commit_occ(tx_id.0 as u64, read_set.into_iter().collect(), write_set)
                .await
        }

        Request::Get { .. }
        | Request::Put { .. }
        | Request::Delete { .. }
        | Request::Lock { .. }
        | Request::Unlock { .. } => {
            Reply::error("the coordinator only accepts START_TX and COMMIT_OCC; send key operations directly to a data node")
        }
    }
}
