//! Per-record single-flight claims.
//!
//! Processing, deletion, administrative updates and the retention sweep all
//! take a claim on a record before touching it, so at most one of them acts
//! on a given record at a time. Work on different records never contends.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use tally_core::types::id::FileId;

#[derive(Debug, Default)]
struct Claims {
    held: DashMap<FileId, u64>,
    next_token: AtomicU64,
}

/// Registry of records held by an in-flight operation.
#[derive(Debug, Clone, Default)]
pub struct ClaimRegistry {
    claims: Arc<Claims>,
}

impl ClaimRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id`, or return `None` if another operation holds it.
    pub fn try_claim(&self, id: FileId) -> Option<ClaimGuard> {
        let token = self.claims.next_token.fetch_add(1, Ordering::Relaxed);
        match self.claims.held.entry(id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(token);
                Some(ClaimGuard {
                    claims: Arc::clone(&self.claims),
                    id,
                    token,
                })
            }
        }
    }

    /// Whether `id` is currently claimed.
    pub fn is_claimed(&self, id: FileId) -> bool {
        self.claims.held.contains_key(&id)
    }

    /// Number of claims held.
    pub fn len(&self) -> usize {
        self.claims.held.len()
    }

    /// Whether no claim is held.
    pub fn is_empty(&self) -> bool {
        self.claims.held.is_empty()
    }
}

/// A held claim. Dropping it releases the record.
#[derive(Debug)]
pub struct ClaimGuard {
    claims: Arc<Claims>,
    id: FileId,
    token: u64,
}

impl ClaimGuard {
    /// The claimed record.
    pub fn id(&self) -> FileId {
        self.id
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        self.claims
            .held
            .remove_if(&self.id, |_, token| *token == self.token);
    }
}
