//! Nonce-consistent JSON-RPC gateway for Ethereum nodes.
//!
//! Forwards JSON-RPC traffic to an upstream node and keeps a shadow transaction count per account, so
//! `eth_getTransactionCount` never goes backwards after accepted `eth_sendRawTransaction` submissions.

pub mod alias;
pub mod config;
pub mod eth;
pub mod ext;
pub mod globals;
pub mod infra;

pub use globals::GlobalServices;
pub use globals::GlobalState;
