use std::net::SocketAddr;

use clap::Parser;
use display_json::DebugAsJson;

use crate::infra::metrics::Metric;
use crate::infra::metrics::metrics_for_json_rpc;
use crate::infra::metrics::metrics_for_nonce;
use crate::infra::metrics::metrics_for_upstream;

#[derive(DebugAsJson, Clone, Parser, serde::Serialize)]
pub struct MetricsConfig {
    /// Address of the Prometheus scrape endpoint.
    #[arg(long = "metrics-exporter-address", env = "METRICS_EXPORTER_ADDRESS", default_value = "0.0.0.0:9000")]
    pub metrics_exporter_address: SocketAddr,
}

impl MetricsConfig {
    /// Installs the global metrics recorder and describes every declared metric.
    ///
    /// Must be called inside a Tokio runtime context because the exporter serves HTTP.
    pub fn init(&self) -> anyhow::Result<()> {
        install_recorder(self.metrics_exporter_address)?;

        let declared: Vec<Metric> = [metrics_for_json_rpc(), metrics_for_upstream(), metrics_for_nonce()].into_iter().flatten().collect();
        for metric in &declared {
            metric.describe();
        }
        tracing::info!(metrics = %declared.len(), "described metrics");

        Ok(())
    }
}

#[cfg(feature = "metrics")]
fn install_recorder(address: SocketAddr) -> anyhow::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    tracing::info!(%address, "installing prometheus metrics exporter");
    let installed = PrometheusBuilder::new()
        .add_global_label("service", env!("CARGO_PKG_NAME"))
        .add_global_label("version", env!("CARGO_PKG_VERSION"))
        .with_http_listener(address)
        .install();

    match installed {
        Ok(()) => Ok(()),
        Err(e) => crate::log_and_err!(reason = e, "failed to install prometheus metrics exporter"),
    }
}

#[cfg(not(feature = "metrics"))]
fn install_recorder(_: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("metrics feature disabled, metrics are discarded");
    Ok(())
}
