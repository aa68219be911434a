//! A single mutex guards both the store and the lock table (spec.md §5),
//! matching the teacher's `Arc<Mutex<E>>`-wrapped-engine idiom
//! (`mvcc::MVCC<E>`) generalized from "wraps one storage engine" to
//! "wraps storage plus a lock table, since this node has no MVCC versions
//! to separate writers from readers."

use std::sync::Mutex;

use crate::node::lock_table::LockTable;
use crate::node::store::Store;

pub struct NodeState {
    inner: Mutex<Inner>,
}

struct Inner {
    store: Store,
    locks: LockTable,
}

impl Default for NodeState {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeState {
    pub fn new() -> Self {
        NodeState { inner: Mutex::new(Inner { store: Store::new(), locks: LockTable::new() }) }
    }

    /// Runs `f` with exclusive access to both the store and the lock
    /// table. The lock is held only for the duration of `f` -- never
    /// across an `.await` -- so other connections' socket I/O is never
    /// blocked by it.
    pub fn with_locked<R>(&self, f: impl FnOnce(&mut Store, &mut LockTable) -> R) -> R {
        let mut guard = self.inner.lock().expect("node mutex poisoned");
        f(&mut guard.store, &mut guard.locks)
    }
}
