use std::io::IsTerminal;
use std::io::stdout;
use std::str::FromStr;

use anyhow::anyhow;
use clap::Parser;
use display_json::DebugAsJson;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::infra::tracing::TracingContextLayer;
use crate::infra::tracing::TracingJsonFormatter;
use crate::infra::tracing::TracingMinimalTimer;

/// Log filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "info";

// -----------------------------------------------------------------------------
// Config
// -----------------------------------------------------------------------------

#[derive(DebugAsJson, Clone, Parser, serde::Serialize)]
pub struct TracingConfig {
    /// How tracing events will be formatted when displayed in stdout.
    #[arg(long = "tracing-log-format", env = "TRACING_LOG_FORMAT", default_value = "normal")]
    pub tracing_log_format: TracingLogFormat,
}

impl TracingConfig {
    /// Installs the global tracing subscriber.
    ///
    /// Uses println! because tracing is not available until the subscriber is installed.
    pub fn init(&self) -> anyhow::Result<()> {
        println!("installing tracing subscriber | format={}", self.tracing_log_format);
        if let Err(e) = self.create_subscriber().try_init() {
            println!("failed to install tracing subscriber | reason={:?}", e);
            return Err(e.into());
        }
        Ok(())
    }

    /// Builds the subscriber: the span context recorder plus the stdout layer in the configured format.
    pub fn create_subscriber(&self) -> impl SubscriberInitExt {
        let ansi = stdout().is_terminal();
        let layer = fmt::Layer::default();
        let stdout_layer = match self.tracing_log_format {
            TracingLogFormat::Minimal => layer
                .with_ansi(ansi)
                .with_target(false)
                .with_timer(TracingMinimalTimer)
                .with_filter(env_filter())
                .boxed(),
            TracingLogFormat::Normal => layer.with_ansi(ansi).with_filter(env_filter()).boxed(),
            TracingLogFormat::Verbose => layer
                .with_ansi(ansi)
                .with_thread_names(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(env_filter())
                .boxed(),
            TracingLogFormat::Json => layer.event_format(TracingJsonFormatter).with_filter(env_filter()).boxed(),
        };

        tracing_subscriber::registry()
            .with(TracingContextLayer.with_filter(env_filter()))
            .with(stdout_layer)
    }
}

/// Reads `RUST_LOG`, falling back to the default filter when it is absent or invalid.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

// -----------------------------------------------------------------------------
// LogFormat
// -----------------------------------------------------------------------------

/// Tracing event log format.
#[derive(DebugAsJson, strum::Display, Clone, Copy, Eq, PartialEq, serde::Serialize)]
pub enum TracingLogFormat {
    /// Minimal format: Time (no date), level, and message.
    #[serde(rename = "minimal")]
    #[strum(to_string = "minimal")]
    Minimal,

    /// Normal format: Default `tracing` crate configuration.
    #[serde(rename = "normal")]
    #[strum(to_string = "normal")]
    Normal,

    /// Verbose format: Full datetime, level, thread, target, and message.
    #[serde(rename = "verbose")]
    #[strum(to_string = "verbose")]
    Verbose,

    /// JSON format: Verbose information formatted as JSON.
    #[serde(rename = "json")]
    #[strum(to_string = "json")]
    Json,
}

impl FromStr for TracingLogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self, Self::Err> {
        match s.to_lowercase().trim() {
            "json" => Ok(Self::Json),
            "minimal" => Ok(Self::Minimal),
            "normal" => Ok(Self::Normal),
            "verbose" | "full" => Ok(Self::Verbose),
            s => Err(anyhow!("unknown log format: {}", s)),
        }
    }
}
