//! Application configuration.

use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use clap::Parser;
use display_json::DebugAsJson;
use tokio::runtime::Builder;
use tokio::runtime::Runtime;

use crate::ext::parse_duration;
use crate::infra::metrics::MetricsConfig;
use crate::infra::tracing::TracingConfig;

/// Loads the `.env` file of the working directory, if present.
///
/// Uses println! because it is executed before tracing is initialized.
pub fn load_dotenv_file() {
    match dotenvy::dotenv() {
        Ok(path) => println!("reading env file | filename={}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => println!("env file error: {e}"),
    }
}

// -----------------------------------------------------------------------------
// Config: Common
// -----------------------------------------------------------------------------

/// Configuration of a binary that embeds the [`CommonConfig`].
pub trait WithCommonConfig {
    fn common(&self) -> &CommonConfig;
}

/// Configuration that can be used by any binary.
#[derive(DebugAsJson, Clone, Parser, serde::Serialize)]
pub struct CommonConfig {
    /// Number of threads to execute global async tasks.
    #[arg(long = "async-threads", env = "ASYNC_THREADS", default_value = "10")]
    pub num_async_threads: usize,

    /// Number of threads to execute global blocking tasks.
    #[arg(long = "blocking-threads", env = "BLOCKING_THREADS", default_value = "10")]
    pub num_blocking_threads: usize,

    #[clap(flatten)]
    pub tracing: TracingConfig,

    #[clap(flatten)]
    pub metrics: MetricsConfig,

    /// Prevents clap from breaking when passing `nocapture` options in tests.
    #[arg(long = "nocapture")]
    pub nocapture: bool,
}

impl CommonConfig {
    /// Builds the multi-thread Tokio runtime that runs the whole application.
    ///
    /// Uses println! because it is executed before tracing is initialized.
    pub fn init_tokio_runtime(&self) -> anyhow::Result<Runtime> {
        println!(
            "creating tokio runtime | async_threads={} blocking_threads={}",
            self.num_async_threads, self.num_blocking_threads
        );

        // async workers are started eagerly, so the first ids are always theirs
        let num_async_threads = self.num_async_threads;
        let thread_name = move || {
            static THREAD_ID: AtomicUsize = AtomicUsize::new(1);
            let id = THREAD_ID.fetch_add(1, Ordering::Relaxed);
            if id <= num_async_threads {
                format!("tokio-async-{}", id)
            } else {
                format!("tokio-blocking-{}", id - num_async_threads)
            }
        };

        let runtime = Builder::new_multi_thread()
            .enable_all()
            .worker_threads(self.num_async_threads)
            .max_blocking_threads(self.num_blocking_threads)
            .thread_name_fn(thread_name)
            .build();

        runtime.map_err(|e| {
            println!("failed to create tokio runtime | reason={:?}", e);
            e.into()
        })
    }
}

// -----------------------------------------------------------------------------
// Config: Gateway
// -----------------------------------------------------------------------------

/// Configuration for the nonce gateway service.
#[derive(DebugAsJson, Clone, Parser, derive_more::Deref, serde::Serialize)]
#[command(author, version, about, long_about = None)]
pub struct GatewayConfig {
    /// Upstream JSON-RPC node HTTP endpoint.
    #[arg(long = "backend-url", env = "BACKEND_URL")]
    pub backend_url: String,

    /// Redis address as `host:port` or `redis://` URL.
    #[arg(long = "redis-address", env = "REDIS_ADDRESS")]
    pub redis_address: String,

    /// Redis logical database.
    #[arg(long = "redis-database", env = "REDIS_DATABASE", default_value = "0")]
    pub redis_database: u16,

    /// Gateway TCP port, bound on all interfaces.
    #[arg(long = "listen-port", env = "LISTEN_PORT", default_value = "8545")]
    pub listen_port: u16,

    /// Deadline to answer one inbound request, including upstream and storage calls.
    #[arg(long = "request-timeout", env = "REQUEST_TIMEOUT", value_parser=parse_duration, default_value = "10s")]
    pub request_timeout: Duration,

    /// Deadline of one call to the upstream node.
    #[arg(long = "backend-timeout", env = "BACKEND_TIMEOUT", value_parser=parse_duration, default_value = "5s")]
    pub backend_timeout: Duration,

    /// How long a submitted transaction is remembered to avoid advancing the shadow nonce twice.
    #[arg(long = "dedup-ttl", env = "DEDUP_TTL", value_parser=parse_duration, default_value = "30days")]
    pub dedup_ttl: Duration,

    /// Maximum size of an inbound request body in bytes.
    #[arg(long = "max-body-size", env = "MAX_BODY_SIZE", default_value = "10485760")]
    pub max_body_size: usize,

    #[deref]
    #[clap(flatten)]
    pub common: CommonConfig,
}

impl GatewayConfig {
    pub fn listen_address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.listen_port))
    }
}

impl WithCommonConfig for GatewayConfig {
    fn common(&self) -> &CommonConfig {
        &self.common
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tracing::TracingLogFormat;

    #[test]
    fn gateway_config_defaults() {
        let config = GatewayConfig::try_parse_from(["geth-lb", "--backend-url", "http://node:8545", "--redis-address", "cache:6379"]).unwrap();
        assert_eq!(config.backend_url, "http://node:8545");
        assert_eq!(config.redis_database, 0);
        assert_eq!(config.listen_address(), "0.0.0.0:8545".parse().unwrap());
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.backend_timeout, Duration::from_secs(5));
        assert_eq!(config.dedup_ttl, Duration::from_secs(60 * 60 * 24 * 30));
        assert_eq!(config.max_body_size, 10 * 1024 * 1024);
        assert_eq!(config.tracing.tracing_log_format, TracingLogFormat::Normal);
        assert_eq!(config.metrics.metrics_exporter_address, "0.0.0.0:9000".parse().unwrap());
    }

    #[test]
    fn gateway_config_requires_backend_and_redis() {
        assert!(GatewayConfig::try_parse_from(["geth-lb", "--redis-address", "cache:6379"]).is_err());
        assert!(GatewayConfig::try_parse_from(["geth-lb", "--backend-url", "http://node:8545"]).is_err());
    }

    #[test]
    fn gateway_config_parses_durations() {
        let config = GatewayConfig::try_parse_from([
            "geth-lb",
            "--backend-url",
            "http://node:8545",
            "--redis-address",
            "cache:6379",
            "--dedup-ttl",
            "1h",
            "--request-timeout",
            "500ms",
        ])
        .unwrap();
        assert_eq!(config.dedup_ttl, Duration::from_secs(3600));
        assert_eq!(config.request_timeout, Duration::from_millis(500));
    }
}
