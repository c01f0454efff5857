#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use geth_lb::alias::JsonValue;
use geth_lb::eth::primitives::Hash;
use geth_lb::eth::primitives::UpstreamError;
use geth_lb::eth::rpc::RpcCall;
use geth_lb::eth::rpc::RpcContext;
use geth_lb::eth::rpc::RpcResponse;
use geth_lb::eth::rpc::RpcUpstream;
use geth_lb::eth::rpc::handle_rpc_body;
use geth_lb::eth::storage::NonceStorage;
use http::StatusCode;
use parking_lot::Mutex;
use serde_json::json;

/// EIP-155 transaction signed by [`TX_SIGNER`] with nonce 9 on chain 1.
pub const TX_RAW: &str = "0xf86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83";
pub const TX_SIGNER: &str = "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f";

/// Another account, unrelated to [`TX_RAW`].
pub const ACCOUNT: &str = "0x3535353535353535353535353535353535353535";

/// [`TX_RAW`] with the `r` component of the signature replaced by `0xff..ff`.
pub fn tx_raw_with_corrupted_signature() -> String {
    TX_RAW.replace("28ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276", &"ff".repeat(32))
}

pub const DEDUP_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 30);

// -----------------------------------------------------------------------------
// Fake upstream
// -----------------------------------------------------------------------------

/// Upstream node answering from in-memory transaction counts.
#[derive(Default)]
pub struct FakeUpstream {
    latest_counts: Mutex<HashMap<String, u64>>,
    pending_counts: Mutex<HashMap<String, u64>>,
    submission_error: Mutex<Option<JsonValue>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<RpcCall>>,
}

impl FakeUpstream {
    pub fn set_latest_count(&self, address: &str, count: u64) {
        self.latest_counts.lock().insert(address.to_lowercase(), count);
    }

    pub fn set_pending_count(&self, address: &str, count: u64) {
        self.pending_counts.lock().insert(address.to_lowercase(), count);
    }

    /// Makes every submission answer with a JSON-RPC error.
    pub fn reject_submissions(&self, error: JsonValue) {
        *self.submission_error.lock() = Some(error);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Methods of all calls received, in order.
    pub fn forwarded_methods(&self) -> Vec<String> {
        self.calls.lock().iter().map(|call| call.method.clone()).collect()
    }
}

#[async_trait]
impl RpcUpstream for FakeUpstream {
    async fn forward(&self, call: &RpcCall) -> Result<RpcResponse, UpstreamError> {
        self.calls.lock().push(call.clone());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = match call.method.as_str() {
            "eth_getTransactionCount" => {
                let address = call.params[0].as_str().unwrap_or_default().to_lowercase();
                let counts = match call.params.get(1).and_then(JsonValue::as_str) {
                    Some("pending") => &self.pending_counts,
                    _ => &self.latest_counts,
                };
                let count = counts.lock().get(&address).copied().unwrap_or_default();
                json!(format!("{:#x}", count))
            }
            "eth_sendRawTransaction" => {
                if let Some(error) = self.submission_error.lock().clone() {
                    return Ok(RpcResponse {
                        jsonrpc: "2.0".to_owned(),
                        id: call.id.clone(),
                        result: None,
                        error: Some(error),
                    });
                }
                let raw = const_hex::decode(call.params[0].as_str().unwrap_or_default()).unwrap_or_default();
                json!(Hash::keccak(raw).to_string())
            }
            method => json!(method),
        };
        Ok(RpcResponse::success(call.id.clone(), result))
    }
}

// -----------------------------------------------------------------------------
// Gateway
// -----------------------------------------------------------------------------

pub fn gateway<S>(upstream: &Arc<FakeUpstream>, storage: Arc<S>) -> RpcContext
where
    S: NonceStorage + 'static,
{
    RpcContext::new(Arc::<FakeUpstream>::clone(upstream), storage, Duration::from_secs(10), 10 * 1024 * 1024)
}

/// Sends a JSON-RPC payload through the gateway, returning the HTTP status and the reply.
pub async fn send(ctx: &RpcContext, payload: JsonValue) -> (StatusCode, JsonValue) {
    handle_rpc_body(ctx, payload.to_string().as_bytes()).await
}

pub fn get_transaction_count(id: u64, address: &str, block: &str) -> JsonValue {
    json!({"jsonrpc": "2.0", "id": id, "method": "eth_getTransactionCount", "params": [address, block]})
}

pub fn send_raw_transaction(id: u64, raw: &str) -> JsonValue {
    json!({"jsonrpc": "2.0", "id": id, "method": "eth_sendRawTransaction", "params": [raw]})
}
