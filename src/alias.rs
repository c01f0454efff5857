//! Type aliases for external crates types that conflict with our own types or are too verbose.

// -----------------------------------------------------------------------------
// Serde
// -----------------------------------------------------------------------------
pub type JsonValue = serde_json::Value;

// -----------------------------------------------------------------------------
// Alloy
// -----------------------------------------------------------------------------
pub type AlloyAddress = alloy_primitives::Address;
pub type AlloyTxEnvelope = alloy_consensus::TxEnvelope;
