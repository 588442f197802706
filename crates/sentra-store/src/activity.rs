//! The hash-chained activity log.
//!
//! Activity entries are tamper-evident: each stored entry commits to its
//! position, its body, and the hash of the entry before it via SHA-256.
//! Rewriting or removing any entry breaks verification for everything
//! after it.
//!
//! Hash input layout (bytes, in order):
//!   1. sequence as 8-byte little-endian
//!   2. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   3. canonical JSON of the entry body (serde_json, no pretty-printing)

use std::sync::Mutex;

use sha2::{Digest, Sha256};
use tracing::debug;

use sentra_contracts::{
    activity::ActivityEntry,
    error::{SentraError, SentraResult},
    event::EmployeeId,
};
use sentra_core::traits::ActivitySink;

/// Sentinel `prev_hash` for the first entry in a chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One chained activity record.
#[derive(Debug, Clone)]
pub struct ChainedEntry {
    /// Position in the chain, starting at 0.
    pub sequence: u64,
    pub entry: ActivityEntry,
    /// `this_hash` of the previous record, or `GENESIS_HASH` for record 0.
    pub prev_hash: String,
    pub this_hash: String,
}

/// Compute the SHA-256 hash for a single activity record.
///
/// Returns a lowercase 64-character hex string. Fails only if the entry
/// body cannot be serialized, which the well-formed `ActivityEntry` type
/// rules out in practice.
pub fn hash_entry(sequence: u64, entry: &ActivityEntry, prev_hash: &str) -> SentraResult<String> {
    let body = serde_json::to_vec(entry).map_err(|e| SentraError::StoreWrite {
        reason: format!("activity entry not serializable: {}", e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&body);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify the integrity of a chain slice.
///
/// Valid means every record's `prev_hash` matches the preceding record's
/// `this_hash` (or `GENESIS_HASH` at position 0) and every `this_hash`
/// matches the value recomputed from the record's own fields. An empty
/// chain is valid.
pub fn verify_chain(records: &[ChainedEntry]) -> bool {
    let mut expected_prev = GENESIS_HASH.to_string();

    for record in records {
        if record.prev_hash != expected_prev {
            return false;
        }
        match hash_entry(record.sequence, &record.entry, &record.prev_hash) {
            Ok(recomputed) if recomputed == record.this_hash => {}
            _ => return false,
        }
        expected_prev = record.this_hash.clone();
    }

    true
}

struct ChainState {
    records: Vec<ChainedEntry>,
    sequence: u64,
    last_hash: String,
}

/// An in-memory, append-only activity log backed by a SHA-256 hash chain.
///
/// # Thread safety
///
/// `record` takes the internal `Mutex` for the hash-and-append as one
/// step, so concurrent writers cannot interleave inside a link.
pub struct ChainedActivityLog {
    state: Mutex<ChainState>,
}

impl ChainedActivityLog {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState {
                records: Vec::new(),
                sequence: 0,
                last_hash: GENESIS_HASH.to_string(),
            }),
        }
    }

    pub fn all(&self) -> Vec<ChainedEntry> {
        self.state
            .lock()
            .expect("activity log lock poisoned")
            .records
            .clone()
    }

    /// Entries concerning one subject, in append order.
    pub fn for_subject(&self, employee_id: &EmployeeId) -> Vec<ChainedEntry> {
        self.state
            .lock()
            .expect("activity log lock poisoned")
            .records
            .iter()
            .filter(|r| r.entry.employee_id == *employee_id)
            .cloned()
            .collect()
    }

    /// Verify the whole in-memory chain.
    pub fn verify_integrity(&self) -> bool {
        let state = self.state.lock().expect("activity log lock poisoned");
        verify_chain(&state.records)
    }
}

impl Default for ChainedActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivitySink for ChainedActivityLog {
    fn record(&self, entry: ActivityEntry) -> SentraResult<()> {
        let mut state = self.state.lock().map_err(|e| SentraError::StoreWrite {
            reason: format!("activity log lock poisoned: {}", e),
        })?;

        let prev_hash = state.last_hash.clone();
        let sequence = state.sequence;
        let this_hash = hash_entry(sequence, &entry, &prev_hash)?;

        debug!(
            sequence,
            employee = %entry.employee_id,
            category = %entry.category,
            "activity recorded"
        );

        state.records.push(ChainedEntry {
            sequence,
            entry,
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.sequence += 1;
        state.last_hash = this_hash;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn entry(category: &str) -> ActivityEntry {
        ActivityEntry {
            employee_id: EmployeeId::new("emp-1"),
            category: category.to_string(),
            message: "m".to_string(),
            details: json!({}),
            risk_score: Some(42.0),
            risk_factors: vec![],
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_chain_links_from_genesis() {
        let log = ChainedActivityLog::new();
        log.record(entry("a")).unwrap();
        log.record(entry("b")).unwrap();
        log.record(entry("c")).unwrap();

        let records = log.all();
        assert_eq!(records[0].prev_hash, GENESIS_HASH);
        assert_eq!(records[1].prev_hash, records[0].this_hash);
        assert_eq!(records[2].prev_hash, records[1].this_hash);
        assert!(log.verify_integrity());
    }

    #[test]
    fn test_tampered_body_fails_verification() {
        let log = ChainedActivityLog::new();
        log.record(entry("a")).unwrap();
        log.record(entry("b")).unwrap();

        let mut records = log.all();
        records[0].entry.message = "rewritten".to_string();
        assert!(!verify_chain(&records));
    }

    #[test]
    fn test_removed_record_fails_verification() {
        let log = ChainedActivityLog::new();
        log.record(entry("a")).unwrap();
        log.record(entry("b")).unwrap();
        log.record(entry("c")).unwrap();

        let mut records = log.all();
        records.remove(1);
        assert!(!verify_chain(&records));
    }

    #[test]
    fn test_empty_chain_is_valid() {
        assert!(verify_chain(&[]));
    }

    #[test]
    fn test_for_subject_filters() {
        let log = ChainedActivityLog::new();
        log.record(entry("a")).unwrap();
        let mut other = entry("b");
        other.employee_id = EmployeeId::new("emp-2");
        log.record(other).unwrap();

        assert_eq!(log.for_subject(&EmployeeId::new("emp-1")).len(), 1);
    }
}
