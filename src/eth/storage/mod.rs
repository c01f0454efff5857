//! Shadow nonce storage.

mod inmemory;
mod nonce_storage;
mod redis;

pub use inmemory::InMemoryNonceStorage;
pub use nonce_storage::NonceStorage;
pub use nonce_storage::SubmissionMark;
pub use redis::RedisNonceStorage;
