//! Standard library extensions.

use std::time::Duration;

use anyhow::anyhow;
use serde::Serialize;
use tokio::signal::unix::SignalKind;
use tokio::signal::unix::signal;

use crate::GlobalState;
use crate::alias::JsonValue;
use crate::infra::tracing::info_task_spawn;
use crate::log_and_err;

// -----------------------------------------------------------------------------
// Macros
// -----------------------------------------------------------------------------

/// Generates [`From`] implementation for a [newtype](https://doc.rust-lang.org/rust-by-example/generics/new_types.html) that delegates to the inner type [`From`].
#[macro_export]
macro_rules! gen_newtype_from {
    (self = $type:ty, other = $($source:ty),+) => {
        $(
            impl From<$source> for $type {
                fn from(value: $source) -> Self {
                    Self(value.into())
                }
            }
        )+
    };
}

/// Ternary operator from [ternop](https://docs.rs/ternop/1.0.1/ternop/), but renamed.
#[macro_export]
macro_rules! if_else {
    ($condition: expr, $_true: expr, $_false: expr) => {
        if $condition { $_true } else { $_false }
    };
}

// -----------------------------------------------------------------------------
// Display
// -----------------------------------------------------------------------------

/// Display alternative for types that do not implement it or need a custom representation.
pub trait DisplayExt {
    fn to_string_ext(&self) -> String;
}

impl DisplayExt for Duration {
    fn to_string_ext(&self) -> String {
        humantime::Duration::from(*self).to_string()
    }
}

// -----------------------------------------------------------------------------
// Serialization
// -----------------------------------------------------------------------------

/// Serializes any serializable value to a [`String`] without having to check for errors.
pub fn to_json_string<V: Serialize>(value: &V) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("serialization error: {e}"))
}

/// Serializes any serializable value to a [`JsonValue`] without having to check for errors.
pub fn to_json_value<V: Serialize>(value: V) -> JsonValue {
    serde_json::to_value(value).unwrap_or(JsonValue::Null)
}

// -----------------------------------------------------------------------------
// Tokio
// -----------------------------------------------------------------------------

/// Spawns an async Tokio task and logs its name.
#[track_caller]
pub fn spawn_named<T>(name: &str, task: impl std::future::Future<Output = T> + Send + 'static) -> tokio::task::JoinHandle<T>
where
    T: Send + 'static,
{
    info_task_spawn(name);
    tokio::spawn(task)
}

/// Spawns a handler that listens to system signals and starts the application shutdown.
///
/// Must be called inside a Tokio runtime context.
pub fn spawn_signal_handler() -> anyhow::Result<()> {
    const TASK_NAME: &str = "signal-handler";

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(signal) => signal,
        Err(e) => return log_and_err!(reason = e, "failed to init SIGTERM watcher"),
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(signal) => signal,
        Err(e) => return log_and_err!(reason = e, "failed to init SIGINT watcher"),
    };

    spawn_named(TASK_NAME, async move {
        tokio::select! {
            _ = sigterm.recv() => GlobalState::shutdown_from(TASK_NAME, "received SIGTERM"),
            _ = sigint.recv() => GlobalState::shutdown_from(TASK_NAME, "received SIGINT"),
        };
    });

    Ok(())
}

// -----------------------------------------------------------------------------
// Parsers
// -----------------------------------------------------------------------------

/// Parses a human readable duration like `10s` or `30days`.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    match humantime::parse_duration(s) {
        Ok(duration) => Ok(duration),
        Err(e) => Err(anyhow!("failed to parse duration `{}`: {}", s, e)),
    }
}

/// Returns the basename of a Rust type, without module path and generics.
pub fn type_basename<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}

// -----------------------------------------------------------------------------
// Standalone functions
// -----------------------------------------------------------------------------

/// `not(something)` instead of `!something`.
#[inline(always)]
pub fn not(value: bool) -> bool {
    !value
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn parse_duration_accepts_humantime_units() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("30days").unwrap(), Duration::from_secs(60 * 60 * 24 * 30));
        assert!(parse_duration("ten seconds").is_err());
    }

    #[test]
    fn type_basename_strips_module_path() {
        assert_eq!(type_basename::<String>(), "String");
        assert_eq!(type_basename::<Vec<u8>>(), "Vec");
    }
}
