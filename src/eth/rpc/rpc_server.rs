//! HTTP server accepting JSON-RPC payloads.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http::HeaderValue;
use http::Method;
use http::Request;
use http::Response;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use http_body_util::BodyExt;
use http_body_util::Full;
use http_body_util::LengthLimitError;
use http_body_util::Limited;
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use tracing::Span;
use tracing::field;

use crate::alias::JsonValue;
use crate::eth::primitives::GatewayError;
use crate::eth::rpc::RpcContext;
use crate::eth::rpc::RpcPayload;
use crate::eth::rpc::RpcReply;
use crate::eth::rpc::RpcResponse;
use crate::ext::DisplayExt;
use crate::ext::not;
use crate::ext::to_json_string;
use crate::ext::to_json_value;
use crate::infra::tracing::SpanExt;
use crate::infra::tracing::new_cid;
use crate::infra::tracing::warn_task_cancellation;
#[cfg(feature = "metrics")]
use crate::infra::metrics;

const HEALTH_PATH: &str = "/health";

// -----------------------------------------------------------------------------
// Server
// -----------------------------------------------------------------------------

/// Serves JSON-RPC over HTTP until the cancellation token is cancelled.
///
/// After cancellation, stops accepting connections and waits for in-flight connections to finish.
pub async fn serve_rpc(ctx: Arc<RpcContext>, listener: TcpListener, cancellation: CancellationToken) -> anyhow::Result<()> {
    const TASK_NAME: &str = "rpc::server";
    tracing::info!(address = ?listener.local_addr().ok(), ?ctx, "starting rpc server");

    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            () = cancellation.cancelled() => {
                warn_task_cancellation(TASK_NAME);
                break;
            }
            Some(_) = connections.join_next(), if not(connections.is_empty()) => {}
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(%peer, "accepted connection");
                    connections.spawn(serve_connection(Arc::clone(&ctx), stream, cancellation.clone()));
                }
                Err(e) => {
                    tracing::error!(reason = ?e, "failed to accept connection");
                }
            }
        }
    }

    tracing::info!(connections = %connections.len(), "waiting in-flight connections to finish");
    while connections.join_next().await.is_some() {}
    tracing::info!("rpc server stopped");

    Ok(())
}

async fn serve_connection(ctx: Arc<RpcContext>, stream: TcpStream, cancellation: CancellationToken) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |request| handle_http_request(Arc::clone(&ctx), request));

    let conn = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        () = cancellation.cancelled() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };
    if let Err(e) = result {
        tracing::warn!(reason = ?e, "failed to serve connection");
    }
}

// -----------------------------------------------------------------------------
// Handlers
// -----------------------------------------------------------------------------

/// Routes an HTTP request. Never fails, failures are mapped to HTTP responses.
pub async fn handle_http_request<B>(ctx: Arc<RpcContext>, request: Request<B>) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let span = tracing::info_span!("rpc::request", cid = %new_cid(), batch = field::Empty);

    async move {
        match (request.method(), request.uri().path()) {
            (&Method::GET, HEALTH_PATH) => Ok(text_response(StatusCode::OK, "ok")),
            (&Method::POST, _) => {
                let body = match Limited::new(request.into_body(), ctx.max_body_size).collect().await {
                    Ok(body) => body.to_bytes(),
                    Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                        tracing::warn!(max_body_size = %ctx.max_body_size, "rejected request body over the size limit");
                        return Ok(text_response(StatusCode::PAYLOAD_TOO_LARGE, "request body is too large"));
                    }
                    Err(e) => {
                        tracing::warn!(reason = ?e, "failed to read request body");
                        return Ok(text_response(StatusCode::BAD_REQUEST, "failed to read request body"));
                    }
                };
                let (status, reply) = handle_rpc_body(&ctx, &body).await;
                Ok(json_response(status, &reply))
            }
            _ => Ok(text_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")),
        }
    }
    .instrument(span)
    .await
}

/// Handles a JSON-RPC body within the request deadline. Returns the HTTP status and the JSON reply.
pub async fn handle_rpc_body(ctx: &RpcContext, body: &[u8]) -> (StatusCode, JsonValue) {
    #[cfg(feature = "metrics")]
    let start = metrics::now();

    let (status, reply) = match RpcPayload::parse(body) {
        Ok(payload) => handle_rpc_payload_with_deadline(ctx, payload).await,
        Err(e) => {
            tracing::warn!(reason = ?e, "rejected malformed payload");
            let e = GatewayError::from(e);
            (StatusCode::BAD_REQUEST, to_json_value(RpcResponse::failure(JsonValue::Null, &e)))
        }
    };

    #[cfg(feature = "metrics")]
    metrics::inc_rpc_requests_finished(start.elapsed(), status.as_u16());

    (status, reply)
}

async fn handle_rpc_payload_with_deadline(ctx: &RpcContext, payload: RpcPayload) -> (StatusCode, JsonValue) {
    Span::current().rec_str("batch", &payload.is_batch());

    #[cfg(feature = "metrics")]
    metrics::inc_rpc_requests_started(payload.is_batch());

    let deadline_id = match &payload {
        RpcPayload::Single(call) => call.id.clone(),
        RpcPayload::Batch(_) => JsonValue::Null,
    };

    // dropping the payload future on deadline cancels pending upstream and storage calls
    match tokio::time::timeout(ctx.request_timeout, handle_rpc_payload(ctx, payload)).await {
        Ok(reply) => (StatusCode::OK, to_json_value(reply)),
        Err(_) => {
            let e = GatewayError::Timeout {
                timeout: ctx.request_timeout.to_string_ext(),
            };
            tracing::error!(reason = ?e, "request deadline exceeded");
            (StatusCode::GATEWAY_TIMEOUT, to_json_value(RpcResponse::failure(deadline_id, &e)))
        }
    }
}

/// Handles calls one after the other, so batch responses keep the order of the calls.
pub async fn handle_rpc_payload(ctx: &RpcContext, payload: RpcPayload) -> RpcReply {
    match payload {
        RpcPayload::Single(call) => RpcReply::Single(ctx.interceptor.handle_call(call).await),
        RpcPayload::Batch(calls) => {
            let mut responses = Vec::with_capacity(calls.len());
            for call in calls {
                responses.push(ctx.interceptor.handle_call(call).await);
            }
            RpcReply::Batch(responses)
        }
    }
}

// -----------------------------------------------------------------------------
// Responses
// -----------------------------------------------------------------------------

fn json_response(status: StatusCode, body: &JsonValue) -> Response<Full<Bytes>> {
    build_response(status, "application/json", Bytes::from(to_json_string(body)))
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    build_response(status, "text/plain", Bytes::from_static(body.as_bytes()))
}

fn build_response(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
