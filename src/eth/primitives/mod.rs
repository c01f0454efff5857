//! Ethereum and gateway domain primitives.

mod address;
mod block_selection;
mod chain_id;
mod gateway_error;
mod hash;
mod nonce;
mod transaction_input;

pub use address::Address;
pub use block_selection::BlockSelection;
pub use chain_id::ChainId;
pub use gateway_error::ErrorCode;
pub use gateway_error::GatewayError;
pub use gateway_error::RpcError;
pub use gateway_error::StorageError;
pub use gateway_error::TransactionDecodeError;
pub use gateway_error::UpstreamError;
pub use gateway_error::codes;
pub use hash::Hash;
pub use nonce::Nonce;
pub use transaction_input::TransactionInput;
