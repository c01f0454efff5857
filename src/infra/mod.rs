//! Shared infrastructure.

pub mod blockchain_client;
pub mod metrics;
pub mod redis;
pub mod tracing;

pub use blockchain_client::BlockchainClient;
