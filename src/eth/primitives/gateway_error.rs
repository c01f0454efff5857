use crate::eth::primitives::Address;

/// JSON-RPC error codes reported by the gateway.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const UPSTREAM_ERROR: i32 = -32000;
    pub const TIMEOUT_ERROR: i32 = -32001;
}

pub trait ErrorCode {
    fn error_code(&self) -> i32;
}

#[derive(Debug, thiserror::Error, strum::IntoStaticStr)]
pub enum RpcError {
    #[error("Failed to parse JSON-RPC payload: {decode_error}.")]
    PayloadInvalid { decode_error: String },

    #[error("JSON-RPC payload must be a call object or an array of call objects.")]
    PayloadShapeInvalid,

    #[error("JSON-RPC batch must contain at least one call.")]
    BatchEmpty,

    #[error("Invalid JSON-RPC call: {decode_error}.")]
    CallInvalid { decode_error: String },

    #[error("JSON-RPC params must be an array.")]
    ParamsShapeInvalid,

    #[error("Expected {rust_type} parameter, but received nothing.")]
    ParameterMissing { rust_type: &'static str },

    #[error("Failed to decode {rust_type} parameter: {decode_error}.")]
    ParameterInvalid { rust_type: &'static str, decode_error: String },
}

impl ErrorCode for RpcError {
    fn error_code(&self) -> i32 {
        match self {
            Self::PayloadInvalid { .. } => codes::PARSE_ERROR,
            Self::PayloadShapeInvalid | Self::BatchEmpty | Self::CallInvalid { .. } => codes::INVALID_REQUEST,
            Self::ParamsShapeInvalid | Self::ParameterMissing { .. } | Self::ParameterInvalid { .. } => codes::INVALID_PARAMS,
        }
    }
}

/// Failures decoding a signed raw transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, strum::IntoStaticStr)]
pub enum TransactionDecodeError {
    #[error("Failed to decode raw transaction: {reason}.")]
    Decode { reason: String },

    #[error("Transaction signer cannot be recovered: {reason}.")]
    Signature { reason: String },
}

impl ErrorCode for TransactionDecodeError {
    fn error_code(&self) -> i32 {
        codes::INVALID_PARAMS
    }
}

/// Failures talking to the upstream node.
#[derive(Debug, thiserror::Error, strum::IntoStaticStr)]
pub enum UpstreamError {
    #[error("Failed to reach upstream node: {reason}.")]
    Transport { reason: String },

    #[error("Upstream node answered with HTTP status {status}.")]
    Status { status: u16 },

    #[error("Failed to decode upstream response: {decode_error}.")]
    ResponseInvalid { decode_error: String },

    #[error("Upstream node rejected {method} with code {code}: {message}.")]
    Rejected { method: String, code: i64, message: String },
}

impl ErrorCode for UpstreamError {
    fn error_code(&self) -> i32 {
        codes::UPSTREAM_ERROR
    }
}

/// Failures of the shadow nonce and submission dedup storage.
#[derive(Debug, thiserror::Error, strum::IntoStaticStr)]
pub enum StorageError {
    #[error("Nonce storage is unavailable: {reason}.")]
    Unavailable { reason: String },

    #[error("Shadow nonce record for {address} does not exist.")]
    RecordMissing { address: Address },

    #[error("Shadow nonce record {key} holds an invalid value: {value}.")]
    ValueInvalid { key: String, value: String },

    #[error("Shadow nonce for {address} cannot be incremented past the maximum value.")]
    Overflow { address: Address },
}

impl ErrorCode for StorageError {
    fn error_code(&self) -> i32 {
        codes::INTERNAL_ERROR
    }
}

#[derive(Debug, thiserror::Error, strum::IntoStaticStr)]
pub enum GatewayError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Transaction(#[from] TransactionDecodeError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Request did not complete within {timeout}.")]
    Timeout { timeout: String },
}

impl GatewayError {
    /// Checks if the error was caused by the client input rather than by the gateway or its dependencies.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Rpc(_) | Self::Transaction(_))
    }
}

impl ErrorCode for GatewayError {
    fn error_code(&self) -> i32 {
        match self {
            Self::Rpc(err) => err.error_code(),
            Self::Transaction(err) => err.error_code(),
            Self::Upstream(err) => err.error_code(),
            Self::Storage(err) => err.error_code(),
            Self::Timeout { .. } => codes::TIMEOUT_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_invalid_params_or_request() {
        let err = GatewayError::from(TransactionDecodeError::Signature { reason: "bad".into() });
        assert!(err.is_client_error());
        assert_eq!(err.error_code(), codes::INVALID_PARAMS);

        let err = GatewayError::from(RpcError::BatchEmpty);
        assert!(err.is_client_error());
        assert_eq!(err.error_code(), codes::INVALID_REQUEST);
    }

    #[test]
    fn dependency_errors_are_server_errors() {
        let err = GatewayError::from(StorageError::Unavailable { reason: "down".into() });
        assert!(!err.is_client_error());
        assert_eq!(err.error_code(), codes::INTERNAL_ERROR);

        let err = GatewayError::from(UpstreamError::Status { status: 502 });
        assert!(!err.is_client_error());
        assert_eq!(err.error_code(), codes::UPSTREAM_ERROR);
    }
}
