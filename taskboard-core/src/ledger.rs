/// Optimistic ledger: local mutations applied but not yet confirmed.
///
/// An entry exists from `start_operation` until `finish_operation`. There is
/// no implicit deadline; `expire_stale` is the caller-driven cleanup for
/// operations whose acknowledgement never arrives.
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mutation::Undo;

/// Opaque id correlating a local mutation with its acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub String);

impl OperationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for OperationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

static OP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new operation id (16 hex chars).
/// Atomic counter for intra-process uniqueness plus a nanosecond timestamp,
/// hashed with SHA-256.
pub fn generate_operation_id() -> OperationId {
    use sha2::{Digest, Sha256};
    let seq = OP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut hasher = Sha256::new();
    hasher.update(seq.to_le_bytes());
    hasher.update(ts.to_le_bytes());
    let hash = hasher.finalize();
    OperationId(hex::encode(&hash[..8]))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingOperation {
    pub id: OperationId,
    /// Epoch milliseconds.
    pub started_at: i64,
    pub undo: Option<Undo>,
}

#[derive(Debug, Clone, Default)]
pub struct OptimisticLedger {
    pending: HashMap<OperationId, PendingOperation>,
}

impl OptimisticLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `op_id` as in flight. Returns false if it already was; the
    /// existing entry keeps its start time and undo.
    pub fn start_operation(&mut self, op_id: OperationId, now: i64) -> bool {
        if self.pending.contains_key(&op_id) {
            return false;
        }
        self.pending.insert(
            op_id.clone(),
            PendingOperation {
                id: op_id,
                started_at: now,
                undo: None,
            },
        );
        true
    }

    /// Idempotent. Returns the entry if it was pending.
    pub fn finish_operation(&mut self, op_id: &OperationId) -> Option<PendingOperation> {
        self.pending.remove(op_id)
    }

    /// Attach the inverse of the operation's mutation. Returns false if the
    /// operation is not pending.
    pub fn record_undo(&mut self, op_id: &OperationId, undo: Undo) -> bool {
        match self.pending.get_mut(op_id) {
            Some(entry) => {
                entry.undo = Some(undo);
                true
            }
            None => false,
        }
    }

    /// Drop every recorded undo. Ids stay pending.
    pub fn forget_undo(&mut self) {
        for entry in self.pending.values_mut() {
            entry.undo = None;
        }
    }

    pub fn is_pending(&self, op_id: &OperationId) -> bool {
        self.pending.contains_key(op_id)
    }

    /// Owned, sorted copy of the pending ids.
    pub fn pending_ids(&self) -> Vec<OperationId> {
        let mut ids: Vec<OperationId> = self.pending.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove operations pending for at least `ttl`. Returns them oldest first.
    pub fn expire_stale(&mut self, now: i64, ttl: Duration) -> Vec<PendingOperation> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let stale: Vec<OperationId> = self
            .pending
            .values()
            .filter(|e| now.saturating_sub(e.started_at) >= ttl_ms)
            .map(|e| e.id.clone())
            .collect();
        let mut expired: Vec<PendingOperation> = stale
            .iter()
            .filter_map(|id| self.pending.remove(id))
            .collect();
        expired.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        expired
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
