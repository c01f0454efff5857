//! Ethereum layers.

pub mod primitives;
pub mod rpc;
pub mod storage;
