use std::sync::Arc;

use geth_lb::GlobalServices;
use geth_lb::GlobalState;
use geth_lb::config::GatewayConfig;
use geth_lb::eth::rpc::RpcContext;
use geth_lb::eth::rpc::RpcUpstream;
use geth_lb::eth::rpc::serve_rpc;
use geth_lb::eth::storage::RedisNonceStorage;
use geth_lb::infra::BlockchainClient;
use geth_lb::infra::redis::connect_redis;
use geth_lb::log_and_err;
use tokio::net::TcpListener;

fn main() -> anyhow::Result<()> {
    let global_services = GlobalServices::<GatewayConfig>::init()?;
    global_services.runtime.block_on(run(global_services.config))
}

async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    // init services
    let redis = connect_redis(&config.redis_address, config.redis_database).await?;
    let storage = Arc::new(RedisNonceStorage::new(redis, config.dedup_ttl));
    let upstream = Arc::new(BlockchainClient::new_http(&config.backend_url, config.backend_timeout)?);

    // upstream may start after the gateway, so an unhealthy upstream is not fatal
    match upstream.fetch_net_version().await {
        Ok(version) => tracing::info!(url = %upstream.http_url, %version, "upstream node is reachable"),
        Err(e) => tracing::warn!(reason = ?e, url = %upstream.http_url, "upstream node is not reachable yet"),
    }

    // serve
    let ctx = Arc::new(RpcContext::new(upstream, storage, config.request_timeout, config.max_body_size));
    let address = config.listen_address();
    let listener = match TcpListener::bind(address).await {
        Ok(listener) => listener,
        Err(e) => return log_and_err!(reason = e, "failed to bind rpc server address"),
    };
    serve_rpc(ctx, listener, GlobalState::shutdown_token()).await
}
