use async_trait::async_trait;

use crate::eth::primitives::Address;
use crate::eth::primitives::Hash;
use crate::eth::primitives::Nonce;
use crate::eth::primitives::StorageError;

/// Outcome of marking a transaction submission as seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SubmissionMark {
    /// The submission was never seen before (or its marker expired) and is now marked.
    #[strum(to_string = "first")]
    First,

    /// The submission was already marked. The existing marker expiration is not refreshed.
    #[strum(to_string = "duplicate")]
    Duplicate,
}

impl SubmissionMark {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate)
    }
}

/// Shadow nonce and submission dedup state, shared by all gateway requests.
///
/// Every operation must be atomic in the underlying store, because concurrent requests for the same account are
/// expected.
#[async_trait]
pub trait NonceStorage: Send + Sync {
    /// Retrieves the shadow nonce of an account. Returns None when never observed.
    async fn read(&self, address: &Address) -> Result<Option<Nonce>, StorageError>;

    /// Ratchets the shadow nonce up to the nonce reported by the upstream node and returns the effective nonce.
    ///
    /// The effective nonce is the greatest of the stored and the upstream nonce. An absent record is created with the
    /// upstream nonce.
    async fn observe(&self, address: &Address, upstream: Nonce) -> Result<Nonce, StorageError>;

    /// Increments the shadow nonce by one and returns the new value.
    ///
    /// Fails with [`StorageError::RecordMissing`] when the account was never observed, so callers must run
    /// [`NonceStorage::observe`] first in the same request.
    async fn bump(&self, address: &Address) -> Result<Nonce, StorageError>;

    /// Marks a transaction submission as seen if it was not seen yet.
    async fn check_and_mark(&self, tx_hash: &Hash) -> Result<SubmissionMark, StorageError>;

    /// Marks a transaction submission as seen and, only if it was not seen yet, increments the shadow nonce of its
    /// signer. Both writes happen in one atomic operation, so a submission is never marked without being counted.
    ///
    /// Returns the mark and the shadow nonce after the operation. Fails with [`StorageError::RecordMissing`] without
    /// marking anything when the signer was never observed.
    async fn record_submission(&self, address: &Address, tx_hash: &Hash) -> Result<(SubmissionMark, Nonce), StorageError>;
}
