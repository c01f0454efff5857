//! In-memory nonce storage, used by tests and when running without an external cache.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::eth::primitives::Address;
use crate::eth::primitives::Hash;
use crate::eth::primitives::Nonce;
use crate::eth::primitives::StorageError;
use crate::eth::storage::NonceStorage;
use crate::eth::storage::SubmissionMark;

#[derive(Debug)]
pub struct InMemoryNonceStorage {
    nonces: Mutex<HashMap<Address, Nonce>>,
    submissions: Mutex<HashMap<Hash, Instant>>,
    submission_ttl: Duration,
}

impl InMemoryNonceStorage {
    pub fn new(submission_ttl: Duration) -> Self {
        Self {
            nonces: Mutex::default(),
            submissions: Mutex::default(),
            submission_ttl,
        }
    }
}

#[async_trait]
impl NonceStorage for InMemoryNonceStorage {
    async fn read(&self, address: &Address) -> Result<Option<Nonce>, StorageError> {
        Ok(self.nonces.lock().get(address).copied())
    }

    async fn observe(&self, address: &Address, upstream: Nonce) -> Result<Nonce, StorageError> {
        let mut nonces = self.nonces.lock();
        let stored = nonces.entry(*address).or_insert(upstream);
        if upstream > *stored {
            *stored = upstream;
        }
        Ok(*stored)
    }

    async fn bump(&self, address: &Address) -> Result<Nonce, StorageError> {
        let mut nonces = self.nonces.lock();
        let Some(stored) = nonces.get_mut(address) else {
            return Err(StorageError::RecordMissing { address: *address });
        };
        let Some(next) = stored.next_nonce() else {
            return Err(StorageError::Overflow { address: *address });
        };
        *stored = next;
        Ok(next)
    }

    async fn check_and_mark(&self, tx_hash: &Hash) -> Result<SubmissionMark, StorageError> {
        let mut submissions = self.submissions.lock();
        if Self::is_marked(&mut submissions, tx_hash) {
            return Ok(SubmissionMark::Duplicate);
        }
        self.mark(&mut submissions, tx_hash);
        Ok(SubmissionMark::First)
    }

    async fn record_submission(&self, address: &Address, tx_hash: &Hash) -> Result<(SubmissionMark, Nonce), StorageError> {
        // lock order: nonces, then submissions
        let mut nonces = self.nonces.lock();
        let mut submissions = self.submissions.lock();

        let Some(stored) = nonces.get_mut(address) else {
            return Err(StorageError::RecordMissing { address: *address });
        };
        if Self::is_marked(&mut submissions, tx_hash) {
            return Ok((SubmissionMark::Duplicate, *stored));
        }
        let Some(next) = stored.next_nonce() else {
            return Err(StorageError::Overflow { address: *address });
        };

        self.mark(&mut submissions, tx_hash);
        *stored = next;
        Ok((SubmissionMark::First, next))
    }
}

impl InMemoryNonceStorage {
    /// Checks a marker after evicting the expired ones.
    fn is_marked(submissions: &mut HashMap<Hash, Instant>, tx_hash: &Hash) -> bool {
        let now = Instant::now();
        submissions.retain(|_, expires_at| *expires_at > now);
        submissions.contains_key(tx_hash)
    }

    fn mark(&self, submissions: &mut HashMap<Hash, Instant>, tx_hash: &Hash) {
        submissions.insert(*tx_hash, Instant::now() + self.submission_ttl);
    }
}
