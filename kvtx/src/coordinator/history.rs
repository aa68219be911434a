//! Committed-transaction history used for OCC backward validation
//! (spec.md §3, §4.2).

use std::collections::HashSet;

/// One committed OCC transaction's footprint: the commit timestamp it was
/// assigned, and the keys it wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub commit_ts: u64,
    pub write_keys: HashSet<String>,
}

/// Backward-validation check (spec.md §4.2 step 1): does any record that
/// committed strictly after `start_ts` write a key this transaction read?
///
/// Returns `true` if `history` contains such a conflicting record (the
/// transaction must abort).
pub fn conflicts(history: &[HistoryRecord], start_ts: u64, read_set: &HashSet<String>) -> bool {
    history
        .iter()
        .filter(|record| record.commit_ts > start_ts)
        .any(|record| !record.write_keys.is_disjoint(read_set))
}
