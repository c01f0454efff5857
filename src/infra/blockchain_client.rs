use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use crate::eth::primitives::UpstreamError;
use crate::eth::rpc::RpcCall;
use crate::eth::rpc::RpcResponse;
use crate::eth::rpc::RpcUpstream;
use crate::ext::DisplayExt;
use crate::ext::not;
use crate::if_else;
#[cfg(feature = "metrics")]
use crate::infra::metrics;

/// HTTP client of the single upstream JSON-RPC node.
#[derive(Debug)]
pub struct BlockchainClient {
    http: reqwest::Client,
    pub http_url: String,
    timeout: Duration,
}

impl BlockchainClient {
    /// Creates a new RPC client connected to HTTP.
    ///
    /// Does not contact the upstream node, so the gateway can start before it.
    pub fn new_http(http_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        tracing::info!(%http_url, timeout = %timeout.to_string_ext(), "creating blockchain http client");

        let http = match reqwest::Client::builder().timeout(timeout).build() {
            Ok(http) => http,
            Err(e) => {
                tracing::error!(reason = ?e, %http_url, "failed to create blockchain http client");
                return Err(e).context("failed to create blockchain http client");
            }
        };

        Ok(Self {
            http,
            http_url: http_url.to_owned(),
            timeout,
        })
    }

    async fn post(&self, call: &RpcCall) -> Result<RpcResponse, UpstreamError> {
        let response = match self.http.post(&self.http_url).json(call).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(reason = ?e, method = %call.method, "failed to send call to upstream");
                let reason = if_else!(e.is_timeout(), format!("timed out after {}", self.timeout.to_string_ext()), e.to_string());
                return Err(UpstreamError::Transport { reason });
            }
        };

        let status = response.status();
        if not(status.is_success()) {
            tracing::warn!(%status, method = %call.method, "upstream answered with failure status");
            return Err(UpstreamError::Status { status: status.as_u16() });
        }

        let body = response.bytes().await.map_err(|e| UpstreamError::Transport { reason: e.to_string() })?;
        match serde_json::from_slice::<RpcResponse>(&body) {
            Ok(response) if response.is_empty() => Err(UpstreamError::ResponseInvalid {
                decode_error: "response has neither result nor error".to_owned(),
            }),
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::warn!(reason = ?e, method = %call.method, body = %String::from_utf8_lossy(&body), "failed to decode upstream response");
                Err(UpstreamError::ResponseInvalid { decode_error: e.to_string() })
            }
        }
    }
}

#[async_trait]
impl RpcUpstream for BlockchainClient {
    async fn forward(&self, call: &RpcCall) -> Result<RpcResponse, UpstreamError> {
        tracing::debug!(method = %call.method, id = %call.id, "forwarding call to upstream");

        #[cfg(feature = "metrics")]
        let start = metrics::now();

        let result = self.post(call).await;

        #[cfg(feature = "metrics")]
        metrics::inc_upstream_requests(start.elapsed(), call.method.as_str(), result.is_ok());

        result
    }
}
