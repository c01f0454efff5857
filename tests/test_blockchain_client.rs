mod common;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use common::DEDUP_TTL;
use common::TX_RAW;
use common::TX_SIGNER;
use geth_lb::alias::JsonValue;
use geth_lb::eth::primitives::Address;
use geth_lb::eth::primitives::BlockSelection;
use geth_lb::eth::primitives::Nonce;
use geth_lb::eth::primitives::UpstreamError;
use geth_lb::eth::rpc::RpcCall;
use geth_lb::eth::rpc::RpcContext;
use geth_lb::eth::rpc::RpcUpstream;
use geth_lb::eth::rpc::serve_rpc;
use geth_lb::eth::storage::InMemoryNonceStorage;
use geth_lb::eth::storage::NonceStorage;
use geth_lb::infra::BlockchainClient;
use http::Request;
use http::Response;
use http::StatusCode;
use http_body_util::BodyExt;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

type Handler = fn(JsonValue) -> (StatusCode, String);

/// Spawns a local HTTP server answering every request with the handler output.
async fn spawn_upstream(handler: Handler) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let service = service_fn(move |request: Request<Incoming>| async move {
                    let body = request.into_body().collect().await.unwrap().to_bytes();
                    let call: JsonValue = serde_json::from_slice(&body).unwrap_or_default();
                    let (status, body) = handler(call);
                    let mut response = Response::new(Full::new(Bytes::from(body)));
                    *response.status_mut() = status;
                    Ok::<_, Infallible>(response)
                });
                let _ = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await;
            });
        }
    });

    address
}

/// Upstream node with a fixed transaction count of 9 for every account.
fn node(call: JsonValue) -> (StatusCode, String) {
    let result = match call["method"].as_str() {
        Some("eth_getTransactionCount") => json!("0x9"),
        Some("eth_sendRawTransaction") => json!("0x1111111111111111111111111111111111111111111111111111111111111111"),
        Some("net_version") => json!("1"),
        _ => return (StatusCode::OK, json!({"jsonrpc": "2.0", "id": call["id"], "error": {"code": -32601, "message": "method not found"}}).to_string()),
    };
    (StatusCode::OK, json!({"jsonrpc": "2.0", "id": call["id"], "result": result}).to_string())
}

fn client(address: SocketAddr) -> BlockchainClient {
    BlockchainClient::new_http(&format!("http://{}", address), Duration::from_secs(2)).unwrap()
}

// -----------------------------------------------------------------------------
// Client
// -----------------------------------------------------------------------------

#[tokio::test]
async fn forward_returns_upstream_envelope() {
    let client = client(spawn_upstream(node).await);

    let response = client.forward(&RpcCall::new(7, "net_version", json!([]))).await.unwrap();
    assert_eq!(response.id, json!(7));
    assert_eq!(response.result, Some(json!("1")));

    let response = client.forward(&RpcCall::new(8, "eth_unknown", json!([]))).await.unwrap();
    assert!(response.is_error());
    assert_eq!(response.error.unwrap()["code"], -32601);
}

#[tokio::test]
async fn fetch_transaction_count_decodes_quantity() {
    let client = client(spawn_upstream(node).await);
    let signer: Address = TX_SIGNER.parse().unwrap();

    let count = client.fetch_transaction_count(&signer, &BlockSelection::Latest).await.unwrap();
    assert_eq!(count, Nonce::new(9));
    assert_eq!(client.fetch_net_version().await.unwrap(), "1");
}

#[tokio::test]
async fn failure_status_is_upstream_error() {
    let client = client(spawn_upstream(|_| (StatusCode::BAD_GATEWAY, String::new())).await);

    let result = client.forward(&RpcCall::new(1, "net_version", json!([]))).await;
    assert!(matches!(result, Err(UpstreamError::Status { status: 502 })));
}

#[tokio::test]
async fn undecodable_body_is_upstream_error() {
    let client = client(spawn_upstream(|_| (StatusCode::OK, "<html>".to_owned())).await);
    let result = client.forward(&RpcCall::new(1, "net_version", json!([]))).await;
    assert!(matches!(result, Err(UpstreamError::ResponseInvalid { .. })));

    let client = self::client(spawn_upstream(|_| (StatusCode::OK, r#"{"jsonrpc":"2.0","id":1}"#.to_owned())).await);
    let result = client.forward(&RpcCall::new(1, "net_version", json!([]))).await;
    assert!(matches!(result, Err(UpstreamError::ResponseInvalid { .. })));
}

#[tokio::test]
async fn unreachable_upstream_is_transport_error() {
    // bind and drop to get a port nobody listens on
    let address = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
    let client = client(address);

    let result = client.forward(&RpcCall::new(1, "net_version", json!([]))).await;
    assert!(matches!(result, Err(UpstreamError::Transport { .. })));
}

#[tokio::test]
async fn rejected_gateway_call_is_upstream_error() {
    let client = client(spawn_upstream(node).await);

    let result = client.request(&RpcCall::new(1, "eth_unknown", json!([]))).await;
    assert!(matches!(result, Err(UpstreamError::Rejected { code: -32601, .. })));
}

// -----------------------------------------------------------------------------
// Gateway over HTTP
// -----------------------------------------------------------------------------

#[tokio::test]
async fn gateway_serves_http_until_cancelled() {
    let upstream = Arc::new(client(spawn_upstream(node).await));
    let storage: Arc<dyn NonceStorage> = Arc::new(InMemoryNonceStorage::new(DEDUP_TTL));
    let ctx = Arc::new(RpcContext::new(upstream, Arc::clone(&storage), Duration::from_secs(5), 1024 * 1024));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let gateway_url = format!("http://{}", listener.local_addr().unwrap());
    let cancellation = CancellationToken::new();
    let server = tokio::spawn(serve_rpc(ctx, listener, cancellation.clone()));

    let http = reqwest::Client::new();

    // health
    let response = http.get(format!("{gateway_url}/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");

    // submission followed by a count query
    let payload = json!([
        {"jsonrpc": "2.0", "id": 1, "method": "eth_sendRawTransaction", "params": [TX_RAW]},
        {"jsonrpc": "2.0", "id": 2, "method": "eth_getTransactionCount", "params": [TX_SIGNER, "latest"]}
    ]);
    let response = http.post(&gateway_url).json(&payload).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reply: JsonValue = response.json().await.unwrap();
    assert_eq!(reply[0]["id"], 1);
    assert_eq!(reply[1], json!({"jsonrpc": "2.0", "id": 2, "result": "0xa"}));
    assert_eq!(storage.read(&TX_SIGNER.parse().unwrap()).await.unwrap(), Some(Nonce::new(10)));

    // malformed body
    let response = http.post(&gateway_url).body("{").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    cancellation.cancel();
    server.await.unwrap().unwrap();
}
