//! Interception of the JSON-RPC methods whose answers are corrected with the shadow nonce.

use std::sync::Arc;

use tracing::Instrument;
use tracing::Span;
use tracing::field;

use crate::alias::JsonValue;
use crate::eth::primitives::Address;
use crate::eth::primitives::BlockSelection;
use crate::eth::primitives::GatewayError;
use crate::eth::primitives::Nonce;
use crate::eth::primitives::TransactionInput;
use crate::eth::primitives::UpstreamError;
use crate::eth::rpc::RpcCall;
use crate::eth::rpc::RpcResponse;
use crate::eth::rpc::RpcUpstream;
use crate::eth::rpc::next_rpc_param;
use crate::eth::rpc::next_rpc_param_or_default;
use crate::eth::rpc::rpc_params;
use crate::eth::storage::NonceStorage;
use crate::eth::storage::SubmissionMark;
use crate::ext::not;
use crate::infra::tracing::SpanExt;
#[cfg(feature = "metrics")]
use crate::infra::metrics;

pub const METHOD_GET_TRANSACTION_COUNT: &str = "eth_getTransactionCount";
pub const METHOD_SEND_RAW_TRANSACTION: &str = "eth_sendRawTransaction";

/// Forwards calls upstream and corrects the answers of intercepted methods.
///
/// Stateless per call: all shared state lives in the nonce storage.
#[derive(derive_new::new)]
pub struct RpcInterceptor {
    upstream: Arc<dyn RpcUpstream>,
    storage: Arc<dyn NonceStorage>,
}

impl RpcInterceptor {
    /// Handles one call. Failures become a JSON-RPC error correlated to the call id.
    pub async fn handle_call(&self, call: RpcCall) -> RpcResponse {
        let span = tracing::info_span!(
            "rpc::call",
            rpc_id = %call.id,
            rpc_method = %call.method,
            tx_hash = field::Empty,
            tx_signer = field::Empty
        );

        async move {
            #[cfg(feature = "metrics")]
            let start = metrics::now();

            let response = match self.execute(&call).await {
                Ok(mut response) => {
                    response.id = call.id.clone();
                    response
                }
                Err(e) => {
                    if e.is_client_error() {
                        tracing::warn!(reason = ?e, "rejected call");
                    } else {
                        tracing::error!(reason = ?e, "failed to handle call");
                    }
                    RpcResponse::failure(call.id.clone(), &e)
                }
            };

            #[cfg(feature = "metrics")]
            metrics::inc_rpc_calls_finished(start.elapsed(), call.method.as_str(), not(response.is_error()));

            response
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, call: &RpcCall) -> Result<RpcResponse, GatewayError> {
        match call.method.as_str() {
            METHOD_GET_TRANSACTION_COUNT => self.eth_get_transaction_count(call).await,
            METHOD_SEND_RAW_TRANSACTION => self.eth_send_raw_transaction(call).await,
            _ => Ok(self.upstream.forward(call).await?),
        }
    }

    // -------------------------------------------------------------------------
    // Intercepted methods
    // -------------------------------------------------------------------------

    /// Answers the transaction count of the `latest` block with the shadow nonce when it is ahead of the upstream.
    async fn eth_get_transaction_count(&self, call: &RpcCall) -> Result<RpcResponse, GatewayError> {
        // parse params
        let (params, address) = next_rpc_param::<Address>(rpc_params(&call.params)?)?;
        let (_, block) = next_rpc_param_or_default::<BlockSelection>(params)?;

        // forward and pass through everything that is not a successful latest answer
        let mut response = self.upstream.forward(call).await?;
        if not(block.is_latest()) || response.is_error() {
            return Ok(response);
        }
        let Some(result) = response.result.take() else {
            return Err(empty_result().into());
        };

        // shadow
        let (upstream, format) = QuantityFormat::decode(&result)?;
        let effective = self.storage.observe(&address, upstream).await?;
        if effective > upstream {
            tracing::info!(%address, %upstream, %effective, "shadowing transaction count");
        }

        #[cfg(feature = "metrics")]
        metrics::inc_nonce_shadowed(if effective > upstream { "shadow" } else { "upstream" });

        response.result = Some(format.encode(effective));
        Ok(response)
    }

    /// Forwards a signed transaction and advances the shadow nonce of its signer once per distinct transaction.
    async fn eth_send_raw_transaction(&self, call: &RpcCall) -> Result<RpcResponse, GatewayError> {
        // parse params
        let (_, raw) = next_rpc_param::<String>(rpc_params(&call.params)?)?;
        let tx = TransactionInput::decode_hex(&raw)?;
        Span::current().rec_str("tx_hash", &tx.hash);
        Span::current().rec_str("tx_signer", &tx.signer);

        // forward even duplicates, only the local increment is suppressed
        let response = self.upstream.forward(call).await?;
        if response.is_error() {
            return Ok(response);
        }

        // detached from the request so an expiring deadline cannot stop it between the upstream and the storage
        let counting = tokio::spawn(count_submission(Arc::clone(&self.upstream), Arc::clone(&self.storage), tx.clone()).in_current_span());
        match counting.await {
            Ok(Ok(mark)) => {
                #[cfg(feature = "metrics")]
                metrics::inc_nonce_submissions(mark.to_string());
            }
            Ok(Err(e)) => {
                tracing::error!(reason = ?e, hash = %tx.hash, signer = %tx.signer, "accepted transaction was not counted");
                #[cfg(feature = "metrics")]
                metrics::inc_nonce_submissions("failed");
            }
            Err(e) => {
                tracing::error!(reason = ?e, hash = %tx.hash, signer = %tx.signer, "transaction counting task failed");
                #[cfg(feature = "metrics")]
                metrics::inc_nonce_submissions("failed");
            }
        }

        // the upstream accepted the transaction, so its answer is returned even when counting failed
        Ok(response)
    }
}

/// Advances the shadow nonce of a transaction accepted by the upstream node, once per distinct transaction.
async fn count_submission(upstream: Arc<dyn RpcUpstream>, storage: Arc<dyn NonceStorage>, tx: TransactionInput) -> Result<SubmissionMark, GatewayError> {
    // ratchet to upstream view before counting the submission
    let upstream_nonce = upstream.fetch_transaction_count(&tx.signer, &BlockSelection::Latest).await?;
    storage.observe(&tx.signer, upstream_nonce).await?;

    let (mark, shadow) = storage.record_submission(&tx.signer, &tx.hash).await?;
    match mark {
        SubmissionMark::First => tracing::info!(hash = %tx.hash, signer = %tx.signer, nonce = %tx.nonce, %shadow, "advanced shadow nonce"),
        SubmissionMark::Duplicate => tracing::info!(hash = %tx.hash, signer = %tx.signer, %shadow, "duplicate submission, keeping shadow nonce"),
    }
    Ok(mark)
}

fn empty_result() -> UpstreamError {
    UpstreamError::ResponseInvalid {
        decode_error: "response has neither result nor error".to_owned(),
    }
}

// -----------------------------------------------------------------------------
// Quantity format
// -----------------------------------------------------------------------------

/// Wire format of a numeric result, so a rewritten count keeps the format the upstream used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuantityFormat {
    Hex,
    Number,
}

impl QuantityFormat {
    fn decode(value: &JsonValue) -> Result<(Nonce, Self), UpstreamError> {
        let decoded = match value {
            JsonValue::String(s) => Nonce::from_hex_quantity(s).map(|nonce| (nonce, Self::Hex)).ok(),
            JsonValue::Number(n) => n.as_u64().map(|n| (Nonce::new(n), Self::Number)),
            _ => None,
        };
        decoded.ok_or_else(|| UpstreamError::ResponseInvalid {
            decode_error: format!("transaction count is not a quantity: {}", value),
        })
    }

    fn encode(self, nonce: Nonce) -> JsonValue {
        match self {
            Self::Hex => JsonValue::String(nonce.to_hex_quantity()),
            Self::Number => JsonValue::from(nonce.as_u64()),
        }
    }
}
