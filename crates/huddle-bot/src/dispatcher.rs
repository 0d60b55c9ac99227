// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound webhook delivery to bots.
//!
//! Every delivery is a single `POST` with a hard timeout. Redirects are not
//! followed, nothing is retried, and each attempt produces exactly one
//! [`BotEventLog`] plus one metrics sample whatever the outcome.

use std::sync::Arc;
use std::time::{Duration, Instant};

use huddle_core::{
    Bot, BotEvent, BotEventLog, BotEventLogStore, BotEventType, BotId, DeliveryResult,
    HuddleError,
};
use reqwest::StatusCode;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::registry::BotRegistry;

pub const HEADER_BOT_EVENT: &str = "X-HUDDLE-BOT-EVENT";
pub const HEADER_BOT_REQUEST_ID: &str = "X-HUDDLE-BOT-REQUEST-ID";
pub const HEADER_BOT_TOKEN: &str = "X-HUDDLE-BOT-TOKEN";
const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// Dispatcher settings (mirrors `BotDeliveryConfig` from huddle-config).
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Hard timeout for one attempt, connect through body.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            user_agent: "Huddle_Bot_Processor/1.0".to_string(),
        }
    }
}

/// Fans domain events out to subscribed bots over HTTP.
///
/// Cheap to clone; clones share the HTTP client, registry and log store.
#[derive(Clone)]
pub struct BotDispatcher {
    client: reqwest::Client,
    user_agent: Arc<str>,
    registry: Arc<BotRegistry>,
    log_store: Arc<dyn BotEventLogStore>,
}

impl BotDispatcher {
    pub fn new(
        config: DispatcherConfig,
        registry: Arc<BotRegistry>,
        log_store: Arc<dyn BotEventLogStore>,
    ) -> Result<Self, HuddleError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| HuddleError::Delivery {
                message: format!("failed to create bot HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            user_agent: Arc::from(config.user_agent),
            registry,
            log_store,
        })
    }

    pub fn registry(&self) -> &Arc<BotRegistry> {
        &self.registry
    }

    /// Deliver `payload` to every active bot subscribed to `event_type`.
    ///
    /// Each bot gets its own task and its own correlation id; one bot failing
    /// or hanging does not affect the others. Returns one outcome per bot.
    pub async fn dispatch(
        &self,
        event_type: BotEventType,
        payload: &serde_json::Value,
    ) -> Vec<(bool, BotEventLog)> {
        let bots = self.registry.find_subscribed(event_type);
        if bots.is_empty() {
            debug!(event = %event_type, "no bots subscribed");
            return Vec::new();
        }

        let body = payload.to_string();
        let mut tasks = JoinSet::new();
        for bot in bots {
            let this = self.clone();
            let event = BotEvent::new(event_type, body.clone());
            tasks.spawn(async move { this.send(&bot, &event).await });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(event = %event_type, "bot delivery task failed: {e}"),
            }
        }
        outcomes
    }

    /// Send a `PING` event to one bot regardless of its subscriptions.
    pub async fn ping(&self, bot_id: &BotId) -> Result<(bool, BotEventLog), HuddleError> {
        let bot = self.registry.get(bot_id)?;
        let payload = serde_json::json!({ "eventTime": chrono::Utc::now().to_rfc3339() });
        let event = BotEvent::new(BotEventType::Ping, payload.to_string());
        Ok(self.send(&bot, &event).await)
    }

    /// Perform one delivery attempt and record its outcome.
    ///
    /// Returns `true` only when the bot answered `204 No Content`.
    pub async fn send(&self, bot: &Bot, event: &BotEvent) -> (bool, BotEventLog) {
        let request = self
            .client
            .post(&bot.post_url)
            .header(reqwest::header::USER_AGENT, self.user_agent.as_ref())
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE_JSON)
            .header(HEADER_BOT_EVENT, event.event_type.as_ref())
            .header(HEADER_BOT_REQUEST_ID, event.request_id.to_string())
            .header(HEADER_BOT_TOKEN, bot.verification_token.as_str())
            .body(event.payload.clone());

        let date_time = chrono::Utc::now();
        let start = Instant::now();
        let response = request.send().await;
        let latency = start.elapsed();

        let (result, code, error) = match response {
            Ok(res) => {
                let status = res.status();
                let result = if status == StatusCode::NO_CONTENT {
                    DeliveryResult::Ok
                } else {
                    DeliveryResult::Ng
                };
                (result, i32::from(status.as_u16()), None)
            }
            Err(e) => (
                DeliveryResult::NetworkError,
                BotEventLog::NO_RESPONSE_CODE,
                Some(e.to_string()),
            ),
        };

        huddle_prometheus::record_bot_delivery(&bot.id, result, latency);

        let log = BotEventLog {
            request_id: event.request_id,
            bot_id: bot.id.clone(),
            event: event.event_type,
            body: event.payload.clone(),
            result,
            error,
            code,
            latency_ns: u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX),
            date_time,
        };

        match result {
            DeliveryResult::Ok => debug!(
                bot_id = %bot.id,
                event = %event.event_type,
                request_id = %event.request_id,
                latency_ms = latency.as_millis() as u64,
                "bot event delivered"
            ),
            DeliveryResult::Ng => warn!(
                bot_id = %bot.id,
                event = %event.event_type,
                request_id = %event.request_id,
                code,
                "bot rejected event"
            ),
            DeliveryResult::NetworkError => warn!(
                bot_id = %bot.id,
                event = %event.event_type,
                request_id = %event.request_id,
                error = log.error.as_deref().unwrap_or_default(),
                "bot unreachable"
            ),
        }

        if let Err(e) = self.log_store.append(log.clone()).await {
            warn!(bot_id = %bot.id, request_id = %event.request_id, "failed to store bot event log: {e}");
        }

        (result == DeliveryResult::Ok, log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_store::MemoryLogStore;

    #[test]
    fn default_config_matches_delivery_limits() {
        let config = DispatcherConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "Huddle_Bot_Processor/1.0");
    }

    #[tokio::test]
    async fn dispatch_without_subscribers_is_empty() {
        let dispatcher = BotDispatcher::new(
            DispatcherConfig::default(),
            Arc::new(BotRegistry::new()),
            Arc::new(MemoryLogStore::new(8)),
        )
        .unwrap();
        let outcomes = dispatcher
            .dispatch(BotEventType::MessageCreated, &serde_json::json!({}))
            .await;
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn ping_unknown_bot_is_not_found() {
        let dispatcher = BotDispatcher::new(
            DispatcherConfig::default(),
            Arc::new(BotRegistry::new()),
            Arc::new(MemoryLogStore::new(8)),
        )
        .unwrap();
        let err = dispatcher.ping(&BotId::from("ghost")).await.unwrap_err();
        assert!(matches!(err, HuddleError::NotFound { .. }));
    }
}
