mod tracing_config;
mod tracing_services;

pub use tracing_config::TracingConfig;
pub use tracing_config::TracingLogFormat;
pub use tracing_services::SpanExt;
pub use tracing_services::TracingContextLayer;
pub use tracing_services::TracingJsonFormatter;
pub use tracing_services::TracingMinimalTimer;
pub use tracing_services::info_task_spawn;
pub use tracing_services::new_cid;
pub use tracing_services::warn_task_cancellation;
