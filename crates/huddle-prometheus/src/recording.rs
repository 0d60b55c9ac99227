// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without an installed recorder every call is a no-op.

use std::time::Duration;

use huddle_core::{BotId, DeliveryResult};
use metrics::{describe_counter, describe_gauge, describe_histogram};

pub const BOT_EVENTS_SENT: &str = "huddle_bot_events_sent_total";
pub const BOT_DELIVERY_LATENCY: &str = "huddle_bot_delivery_latency_seconds";
pub const WS_CONNECTIONS: &str = "huddle_ws_connections";
pub const WS_DROPPED_MESSAGES: &str = "huddle_ws_dropped_messages_total";
pub const WS_CLOSED_CONNECTIONS: &str = "huddle_ws_closed_connections_total";
pub const VIEWER_CHANGES: &str = "huddle_viewer_changes_total";

/// Register all Huddle metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        BOT_EVENTS_SENT,
        "Bot delivery attempts, labeled by bot id and result"
    );
    describe_histogram!(
        BOT_DELIVERY_LATENCY,
        "Bot delivery latency in seconds, including failed attempts"
    );
    describe_gauge!(WS_CONNECTIONS, "Currently registered duplex connections");
    describe_counter!(
        WS_DROPPED_MESSAGES,
        "Outbound messages displaced from full connection queues"
    );
    describe_counter!(
        WS_CLOSED_CONNECTIONS,
        "Closed duplex connections, labeled by close reason"
    );
    describe_counter!(VIEWER_CHANGES, "Viewer state changes, labeled by new state");
}

/// Record one bot delivery attempt.
pub fn record_bot_delivery(bot_id: &BotId, result: DeliveryResult, latency: Duration) {
    metrics::counter!(
        BOT_EVENTS_SENT,
        "bot_id" => bot_id.0.clone(),
        "result" => result.as_ref().to_string()
    )
    .increment(1);
    metrics::histogram!(BOT_DELIVERY_LATENCY, "bot_id" => bot_id.0.clone())
        .record(latency.as_secs_f64());
}

/// Count one newly registered connection.
pub fn record_ws_registered() {
    metrics::gauge!(WS_CONNECTIONS).increment(1.0);
}

/// Count one connection leaving the registry.
pub fn record_ws_unregistered() {
    metrics::gauge!(WS_CONNECTIONS).decrement(1.0);
}

/// Record outbound messages dropped from a full queue.
pub fn record_ws_dropped(count: u64) {
    metrics::counter!(WS_DROPPED_MESSAGES).increment(count);
}

/// Record a closed connection.
pub fn record_ws_closed(reason: &str) {
    metrics::counter!(WS_CLOSED_CONNECTIONS, "reason" => reason.to_string()).increment(1);
}

/// Record a viewer state change.
pub fn record_viewer_change(state: &str) {
    metrics::counter!(VIEWER_CHANGES, "state" => state.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn delivery_sample_is_labeled_by_bot_and_result() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_bot_delivery(
                &BotId::from("echo"),
                DeliveryResult::Ng,
                Duration::from_millis(20),
            );
        });

        let rendered = handle.render();
        let line = rendered
            .lines()
            .find(|l| l.starts_with(BOT_EVENTS_SENT))
            .expect("counter rendered");
        assert!(line.contains(r#"bot_id="echo""#), "{line}");
        assert!(line.contains(r#"result="NG""#), "{line}");
        assert!(line.ends_with(" 1"), "{line}");
    }

    #[test]
    fn connection_gauge_and_drop_counter_render() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            for _ in 0..3 {
                record_ws_registered();
            }
            record_ws_unregistered();
            record_ws_dropped(2);
            record_ws_dropped(1);
        });

        let rendered = handle.render();
        assert!(rendered.contains(&format!("{WS_CONNECTIONS} 2")), "{rendered}");
        assert!(rendered.contains(&format!("{WS_DROPPED_MESSAGES} 3")), "{rendered}");
    }

    #[test]
    fn calls_without_recorder_are_noops() {
        record_ws_closed("heartbeat_timeout");
        record_viewer_change("editing");
    }
}
