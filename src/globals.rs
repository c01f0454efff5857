use std::fmt::Debug;
use std::sync::LazyLock;

use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::config;
use crate::config::WithCommonConfig;
use crate::ext::spawn_signal_handler;

// -----------------------------------------------------------------------------
// Global services
// -----------------------------------------------------------------------------

pub struct GlobalServices<T>
where
    T: clap::Parser + WithCommonConfig + Debug,
{
    pub config: T,
    pub runtime: Runtime,
}

impl<T> GlobalServices<T>
where
    T: clap::Parser + WithCommonConfig + Debug,
{
    /// Executes global services initialization.
    pub fn init() -> anyhow::Result<Self> {
        // env-var support
        config::load_dotenv_file();

        // parse configuration
        let config = T::parse();
        let common = config.common();

        // init tokio
        let tokio = common.init_tokio_runtime()?;

        // init tracing
        tokio.block_on(async { common.tracing.init() })?;
        tracing::info!(?config, "parsed configuration");

        // init observability services
        tokio.block_on(async { common.metrics.init() })?;

        // init signal handler
        tokio.block_on(async { spawn_signal_handler() })?;

        Ok(Self { config, runtime: tokio })
    }
}

// -----------------------------------------------------------------------------
// Global state
// -----------------------------------------------------------------------------

static SHUTDOWN_SIGNAL: LazyLock<CancellationToken> = LazyLock::new(CancellationToken::new);

/// Process-wide state. Only the shutdown signal is global; services receive their dependencies explicitly.
pub struct GlobalState;

impl GlobalState {
    /// Shutdown the application.
    ///
    /// Returns the formatted reason for shutdown.
    pub fn shutdown_from(caller: &str, reason: &str) -> String {
        tracing::warn!(%caller, %reason, "application is shutting down");
        SHUTDOWN_SIGNAL.cancel();
        format!("{caller} {reason}")
    }

    /// Returns a token cancelled when the application starts the shutdown.
    pub fn shutdown_token() -> CancellationToken {
        SHUTDOWN_SIGNAL.clone()
    }
}
