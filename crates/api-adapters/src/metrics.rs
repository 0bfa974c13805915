//! Action counters, labeled by action and outcome, exposed at `/metrics`.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ActionLabels {
    pub action: String,
    pub outcome: String,
}

pub struct ActionMetrics {
    registry: Registry,
    actions: Family<ActionLabels, Counter>,
}

impl ActionMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let actions = Family::<ActionLabels, Counter>::default();
        registry.register(
            "forum_actions",
            "Forum actions processed, by action and outcome",
            actions.clone(),
        );
        Self { registry, actions }
    }

    pub fn record(&self, action: &str, success: bool) {
        let outcome = if success { "ok" } else { "error" };
        self.actions
            .get_or_create(&ActionLabels {
                action: action.to_string(),
                outcome: outcome.to_string(),
            })
            .inc();
    }

    pub fn render(&self) -> String {
        let mut buffer = String::new();
        if encode(&mut buffer, &self.registry).is_err() {
            tracing::warn!("failed to encode metrics");
        }
        buffer
    }
}

impl Default for ActionMetrics {
    fn default() -> Self {
        Self::new()
    }
}
