use metrics::Label;
use metrics::describe_counter;
use metrics::describe_histogram;

// -----------------------------------------------------------------------------
// Metric
// -----------------------------------------------------------------------------

/// Kind of a declared metric, as written in the `metrics!` macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MetricKind {
    Counter,
    HistogramDuration,
}

impl MetricKind {
    pub(super) fn from_declaration(kind: &str) -> Option<Self> {
        match kind {
            "counter" => Some(Self::Counter),
            "histogram_duration" => Some(Self::HistogramDuration),
            _ => None,
        }
    }
}

/// Metric declared with the `metrics!` macro.
pub(super) struct Metric {
    pub(super) kind: &'static str,
    pub(super) name: &'static str,
    pub(super) description: &'static str,
}

impl Metric {
    /// Publishes the metric description to the installed recorder.
    pub(super) fn describe(&self) {
        match MetricKind::from_declaration(self.kind) {
            Some(MetricKind::Counter) => describe_counter!(self.name, self.description),
            Some(MetricKind::HistogramDuration) => describe_histogram!(self.name, metrics::Unit::Seconds, self.description),
            None => tracing::warn!(name = %self.name, kind = %self.kind, "metric declared with unknown kind"),
        }
    }
}

// -----------------------------------------------------------------------------
// MetricLabelValue
// -----------------------------------------------------------------------------

/// Value of a metric label. Labels without value are not recorded.
pub struct MetricLabelValue(Option<String>);

macro_rules! impl_label_value_from_display {
    ($($type:ty),+) => {
        $(
            impl From<$type> for MetricLabelValue {
                fn from(value: $type) -> Self {
                    Self(Some(value.to_string()))
                }
            }
        )+
    };
}

impl_label_value_from_display!(&str, String, bool, u16);

impl<T> From<Option<T>> for MetricLabelValue
where
    T: Into<MetricLabelValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Self(None),
        }
    }
}

/// Converts label key-value pairs to `metrics::Label`, dropping labels without value.
pub(super) fn into_labels(labels: Vec<(&'static str, MetricLabelValue)>) -> Vec<Label> {
    labels
        .into_iter()
        .filter_map(|(key, MetricLabelValue(value))| value.map(|value| Label::new(key, value)))
        .collect()
}
