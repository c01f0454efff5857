//! Tracing services.

use chrono::DateTime;
use chrono::Local;
use chrono::Utc;
use serde_json::Map;
use tracing::Span;
use tracing::Subscriber;
use tracing::span;
use tracing_serde::fields::AsMap;
use tracing_subscriber::Layer;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::format::DefaultFields;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use crate::alias::JsonValue;
use crate::ext::to_json_string;
use crate::ext::to_json_value;

type JsonMap = Map<String, JsonValue>;

// -----------------------------------------------------------------------------
// Tracing service: Span field recorder
// -----------------------------------------------------------------------------

/// Stores the fields of every span as JSON in the span extensions.
///
/// The JSON formatter reads them back to attach the request context (`cid`, `rpc_method`, `tx_hash`) to every event
/// emitted while handling a request.
pub struct TracingContextLayer;

impl<S> Layer<S> for TracingContextLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            let fields = RecordedFields::from_json(to_json_value(attrs.field_map()));
            span.extensions_mut().insert(fields);
        }
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<RecordedFields>() {
            fields.merge(to_json_value(values.field_map()));
        }
    }
}

/// Span fields that have a value. Fields declared with `field::Empty` appear once recorded.
#[derive(Default)]
struct RecordedFields(JsonMap);

impl RecordedFields {
    fn from_json(value: JsonValue) -> Self {
        let mut fields = Self::default();
        fields.merge(value);
        fields
    }

    fn merge(&mut self, value: JsonValue) {
        let JsonValue::Object(values) = value else { return };
        for (key, value) in values {
            // declared but not recorded yet
            if value.is_null() {
                continue;
            }
            self.0.insert(key, value);
        }
    }
}

// -----------------------------------------------------------------------------
// Tracing service: Json Formatter
// -----------------------------------------------------------------------------

/// Formats each event as one JSON object per line.
///
/// Fields of the enclosing spans are flattened into `context`; when the same field is declared by nested spans, the
/// innermost value wins.
pub struct TracingJsonFormatter;

impl<S> FormatEvent<S, DefaultFields> for TracingJsonFormatter
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn format_event(&self, ctx: &fmt::FmtContext<'_, S, DefaultFields>, mut writer: fmt::format::Writer<'_>, event: &tracing::Event<'_>) -> std::fmt::Result {
        let metadata = event.metadata();

        let context = ctx.lookup_current().map(|current| {
            let mut fields = JsonMap::new();
            for span in current.scope() {
                let extensions = span.extensions();
                let Some(recorded) = extensions.get::<RecordedFields>() else { continue };
                for (key, value) in &recorded.0 {
                    fields.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
            JsonLogContext { span: current.name(), fields }
        });

        let line = JsonLogLine {
            timestamp: Utc::now(),
            level: metadata.level().as_str(),
            target: metadata.target(),
            fields: to_json_value(event.field_map()),
            context,
        };
        writeln!(writer, "{}", to_json_string(&line))
    }
}

#[derive(serde::Serialize)]
struct JsonLogLine<'a> {
    timestamp: DateTime<Utc>,
    level: &'static str,
    target: &'a str,
    fields: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<JsonLogContext<'a>>,
}

#[derive(serde::Serialize)]
struct JsonLogContext<'a> {
    span: &'a str,
    #[serde(flatten)]
    fields: JsonMap,
}

// -----------------------------------------------------------------------------
// Tracing service: Minimal Timer
// -----------------------------------------------------------------------------

/// Local wall clock time with millisecond precision, without the date.
pub struct TracingMinimalTimer;

impl FormatTime for TracingMinimalTimer {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%H:%M:%S%.3f"))
    }
}

// -----------------------------------------------------------------------------
// Tracing extensions
// -----------------------------------------------------------------------------

/// Extensions for `tracing::Span`.
pub trait SpanExt {
    /// Records a field declared as `field::Empty` using the value `ToString` implementation.
    fn rec_str<T>(&self, field: &'static str, value: &T)
    where
        T: ToString;
}

impl SpanExt for Span {
    fn rec_str<T>(&self, field: &'static str, value: &T)
    where
        T: ToString,
    {
        let value = value.to_string();
        self.record(field, value.as_str());
    }
}

// -----------------------------------------------------------------------------
// Tracing macros
// -----------------------------------------------------------------------------

/// Logs an error and returns it wrapped as an [`anyhow::Error`].
#[macro_export]
macro_rules! log_and_err {
    // keeps the source error as the cause
    (reason = $source:ident, $context:expr) => {{
        use anyhow::Context;
        tracing::error!(reason = ?$source, message = %$context);
        Err($source).context($context)
    }};
    // creates a new error
    ($context:expr) => {{
        tracing::error!(message = %$context);
        Err(anyhow::anyhow!($context))
    }};
}

// -----------------------------------------------------------------------------
// Tracing functions
// -----------------------------------------------------------------------------

/// Alphabet of correlation ids: lowercase letters and digits, so ids are easy to grep.
const CID_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', //
    'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Creates a short correlation id for an inbound request.
///
/// Ids only need to be unique among the requests in flight, because logs are the only place they are stored.
pub fn new_cid() -> String {
    nanoid::nanoid!(8, &CID_ALPHABET)
}

/// Logs that a background task is starting.
#[track_caller]
pub fn info_task_spawn(name: &str) {
    tracing::info!(parent: None, task = %name, "starting background task");
}

/// Logs that a task stops because the application is shutting down. Returns the logged message.
#[track_caller]
pub fn warn_task_cancellation(task: &str) -> String {
    let message = format!("{task} is stopping after a shutdown request");
    tracing::warn!(%message);
    message
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn cid_is_short_lowercase_alphanumeric() {
        let cid = new_cid();
        assert_eq!(cid.len(), 8);
        assert!(cid.chars().all(|c| CID_ALPHABET.contains(&c)));
    }

    #[test]
    fn recorded_fields_skip_empty_values() {
        let mut fields = RecordedFields::from_json(json!({"cid": "abc", "tx_hash": null}));
        assert_eq!(JsonValue::Object(fields.0.clone()), json!({"cid": "abc"}));

        fields.merge(json!({"tx_hash": "0x01", "cid": null}));
        assert_eq!(JsonValue::Object(fields.0), json!({"cid": "abc", "tx_hash": "0x01"}));
    }

    #[test]
    fn json_log_line_omits_missing_context() {
        let line = JsonLogLine {
            timestamp: Utc::now(),
            level: "INFO",
            target: "geth_lb",
            fields: json!({"message": "hello"}),
            context: None,
        };
        let value = to_json_value(&line);
        assert!(value.get("context").is_none());
        assert_eq!(value["fields"]["message"], "hello");
    }
}
