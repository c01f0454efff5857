use async_trait::async_trait;
use serde_json::json;

use crate::alias::JsonValue;
use crate::eth::primitives::Address;
use crate::eth::primitives::BlockSelection;
use crate::eth::primitives::Nonce;
use crate::eth::primitives::UpstreamError;
use crate::eth::rpc::RpcCall;
use crate::eth::rpc::RpcResponse;

/// Id used for calls issued by the gateway itself.
const GATEWAY_CALL_ID: u64 = 1;

/// Upstream JSON-RPC node the gateway forwards calls to.
#[async_trait]
pub trait RpcUpstream: Send + Sync {
    /// Forwards a call and returns the upstream response envelope, which may be a JSON-RPC error.
    ///
    /// Fails only on transport failures, non-success HTTP status or undecodable bodies.
    async fn forward(&self, call: &RpcCall) -> Result<RpcResponse, UpstreamError>;

    /// Fetches the transaction count of an account at the given block.
    async fn fetch_transaction_count(&self, address: &Address, block: &BlockSelection) -> Result<Nonce, UpstreamError> {
        tracing::debug!(%address, %block, "fetching transaction count");

        let call = RpcCall::new(GATEWAY_CALL_ID, "eth_getTransactionCount", json!([address, block]));
        let result = self.request(&call).await?;
        serde_json::from_value::<Nonce>(result).map_err(|e| UpstreamError::ResponseInvalid { decode_error: e.to_string() })
    }

    /// Fetches the network id. Used to check the upstream is reachable.
    async fn fetch_net_version(&self) -> Result<String, UpstreamError> {
        let call = RpcCall::new(GATEWAY_CALL_ID, "net_version", json!([]));
        let result = self.request(&call).await?;
        match result {
            JsonValue::String(version) => Ok(version),
            other => Ok(other.to_string()),
        }
    }

    /// Forwards a call issued by the gateway itself, treating JSON-RPC errors as failures.
    async fn request(&self, call: &RpcCall) -> Result<JsonValue, UpstreamError> {
        let response = self.forward(call).await?;
        if let Some(error) = response.error {
            return Err(UpstreamError::Rejected {
                method: call.method.clone(),
                code: error.get("code").and_then(JsonValue::as_i64).unwrap_or_default(),
                message: error.get("message").and_then(JsonValue::as_str).unwrap_or_default().to_owned(),
            });
        }
        match response.result {
            Some(result) => Ok(result),
            None => Err(UpstreamError::ResponseInvalid {
                decode_error: "response has neither result nor error".to_owned(),
            }),
        }
    }
}
