//! Exclusive, non-queueing lock table for no-wait 2PL (spec.md §4.1, §5).
//!
//! Absence of an entry means unlocked. There is no blocking and no queue:
//! a `lock` call either grants immediately or reports the current owner.

use std::collections::HashMap;

use crate::protocol::TxId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    Granted,
    /// Already held by a different transaction.
    Denied(TxId),
}

#[derive(Debug, Default)]
pub struct LockTable {
    owners: HashMap<String, TxId>,
}

impl LockTable {
    pub fn new() -> Self {
        LockTable { owners: HashMap::new() }
    }

    /// Grants the lock on `key` to `tx_id` if it is unlocked or already
    /// owned by `tx_id` (re-locking by the same owner is idempotent,
    /// spec.md's P7). Otherwise reports the current owner.
    pub fn lock(&mut self, key: &str, tx_id: TxId) -> LockOutcome {
        match self.owners.get(key) {
            None => {
                self.owners.insert(key.to_string(), tx_id);
                LockOutcome::Granted
            }
            Some(&owner) if owner == tx_id => LockOutcome::Granted,
            Some(&owner) => LockOutcome::Denied(owner),
        }
    }

    /// Releases `key` only if `tx_id` is the current owner. Otherwise a
    /// no-op -- the caller may have already aborted elsewhere, and the
    /// node has no way (and no need) to tell the difference.
    pub fn unlock(&mut self, key: &str, tx_id: TxId) {
        if self.owners.get(key) == Some(&tx_id) {
            self.owners.remove(key);
        }
    }

    #[cfg(test)]
    pub fn owner(&self, key: &str) -> Option<TxId> {
        self.owners.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_on_unheld_key_grants() {
        let mut locks = LockTable::new();
        assert_eq!(locks.lock("k", TxId(1)), LockOutcome::Granted);
        assert_eq!(locks.owner("k"), Some(TxId(1)));
    }

    #[test]
    fn relock_by_same_owner_is_idempotent() {
        let mut locks = LockTable::new();
        locks.lock("k", TxId(1));
        assert_eq!(locks.lock("k", TxId(1)), LockOutcome::Granted);
    }

    #[test]
    fn lock_by_other_owner_is_denied() {
        let mut locks = LockTable::new();
        locks.lock("k", TxId(1));
        assert_eq!(locks.lock("k", TxId(2)), LockOutcome::Denied(TxId(1)));
        // denial does not change ownership.
        assert_eq!(locks.owner("k"), Some(TxId(1)));
    }

    #[test]
    fn unlock_by_owner_releases() {
        let mut locks = LockTable::new();
        locks.lock("k", TxId(1));
        locks.unlock("k", TxId(1));
        assert_eq!(locks.owner("k"), None);
        // now a different transaction can take it.
        assert_eq!(locks.lock("k", TxId(2)), LockOutcome::Granted);
    }

    #[test]
    fn unlock_by_non_owner_is_a_no_op() {
        let mut locks = LockTable::new();
        locks.lock("k", TxId(1));
        locks.unlock("k", TxId(2));
        assert_eq!(locks.owner("k"), Some(TxId(1)));
    }

    #[test]
    fn unlock_of_never_locked_key_is_a_no_op() {
        let mut locks = LockTable::new();
        locks.unlock("never-locked", TxId(1));
        assert_eq!(locks.owner("never-locked"), None);
    }
}
