//! Fire-and-forget reporting of user interactions.

use cadence::{Counted, StatsdClient};

/// The event recorded when the user confirms a suggestion.
pub const SELECTION_EVENT: &str = "DROPDOWN_CHANGE_EVENT";

/// Property naming the component an event came from.
pub const COMPONENT_NAME: &str = "ComponentName";

/// Property holding the suggestion the user confirmed.
pub const SELECTED_SUGGESTION: &str = "SelectedSuggestion";

/// The value of [`COMPONENT_NAME`] for events from the URL autocomplete.
pub const AUTOCOMPLETE_COMPONENT: &str = "QUERY_URL_AUTOCOMPLETE_DROPDOWN";

/// Somewhere to send interaction events. Failures must never reach the
/// caller.
pub trait TelemetrySink: Send + Sync {
    /// Record `event` with the given properties.
    fn record(&self, event: &str, properties: &[(&str, &str)]);
}

/// A sink that drops every event.
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn record(&self, _event: &str, _properties: &[(&str, &str)]) {}
}

/// A sink that turns events into tagged Statsd counters.
pub struct StatsdTelemetry {
    /// The Statsd client used to record statistics.
    metrics_client: StatsdClient,
}

impl StatsdTelemetry {
    /// Report events through `metrics_client`.
    pub fn new(metrics_client: StatsdClient) -> Self {
        Self { metrics_client }
    }
}

impl TelemetrySink for StatsdTelemetry {
    fn record(&self, event: &str, properties: &[(&str, &str)]) {
        let key = format!("telemetry.{}", event.to_lowercase());
        let mut metric = self.metrics_client.count_with_tags(&key, 1_i64);
        for (name, value) in properties {
            metric = metric.with_tag(name, value);
        }
        if let Err(error) = metric.try_send() {
            tracing::debug!(%error, %event, "could not record telemetry");
        }
    }
}
