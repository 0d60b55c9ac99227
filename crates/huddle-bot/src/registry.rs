// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registered bots and their event subscriptions.
//!
//! The dispatcher only reads from the registry. The mutators exist for the
//! administrative layer and for seeding bots from configuration at startup.

use dashmap::DashMap;
use huddle_core::{Bot, BotEventType, BotId, HuddleError};

/// Lookup table of registered bots keyed by id.
#[derive(Default)]
pub struct BotRegistry {
    bots: DashMap<BotId, Bot>,
}

impl BotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry pre-populated with `bots`. Later duplicates win.
    pub fn from_bots(bots: impl IntoIterator<Item = Bot>) -> Self {
        let registry = Self::new();
        for bot in bots {
            registry.upsert(bot);
        }
        registry
    }

    /// Active bots subscribed to `event_type`, ordered by id.
    pub fn find_subscribed(&self, event_type: BotEventType) -> Vec<Bot> {
        let mut bots: Vec<Bot> = self
            .bots
            .iter()
            .filter(|entry| entry.wants(event_type))
            .map(|entry| entry.value().clone())
            .collect();
        bots.sort_by(|a, b| a.id.cmp(&b.id));
        bots
    }

    pub fn get(&self, bot_id: &BotId) -> Result<Bot, HuddleError> {
        self.bots
            .get(bot_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| HuddleError::NotFound {
                kind: "bot",
                id: bot_id.to_string(),
            })
    }

    /// Insert or replace a bot.
    pub fn upsert(&self, bot: Bot) {
        tracing::debug!(bot_id = %bot.id, active = bot.active, "bot registered");
        self.bots.insert(bot.id.clone(), bot);
    }

    /// Deactivate a bot. It stays registered but receives no deliveries.
    pub fn revoke(&self, bot_id: &BotId) -> Result<(), HuddleError> {
        let mut bot = self.bots.get_mut(bot_id).ok_or_else(|| HuddleError::NotFound {
            kind: "bot",
            id: bot_id.to_string(),
        })?;
        bot.active = false;
        tracing::info!(bot_id = %bot_id, "bot revoked");
        Ok(())
    }

    /// Replace the verification token of a bot.
    pub fn rotate_token(&self, bot_id: &BotId, token: impl Into<String>) -> Result<(), HuddleError> {
        let mut bot = self.bots.get_mut(bot_id).ok_or_else(|| HuddleError::NotFound {
            kind: "bot",
            id: bot_id.to_string(),
        })?;
        bot.verification_token = token.into();
        tracing::info!(bot_id = %bot_id, "bot verification token rotated");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(id: &str, events: &[BotEventType], active: bool) -> Bot {
        Bot {
            id: BotId::from(id),
            post_url: format!("https://bots.example.com/{id}"),
            verification_token: format!("tok-{id}"),
            subscribed_events: events.iter().copied().collect(),
            active,
        }
    }

    #[test]
    fn find_subscribed_filters_by_event_and_active_flag() {
        let registry = BotRegistry::from_bots([
            bot("b", &[BotEventType::MessageCreated], true),
            bot("a", &[BotEventType::MessageCreated, BotEventType::Joined], true),
            bot("c", &[BotEventType::Joined], true),
            bot("d", &[BotEventType::MessageCreated], false),
        ]);

        let ids: Vec<String> = registry
            .find_subscribed(BotEventType::MessageCreated)
            .into_iter()
            .map(|b| b.id.0)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(registry.find_subscribed(BotEventType::TagAdded).is_empty());
    }

    #[test]
    fn get_unknown_bot_is_not_found() {
        let registry = BotRegistry::new();
        let err = registry.get(&BotId::from("ghost")).unwrap_err();
        assert!(matches!(err, HuddleError::NotFound { kind: "bot", .. }));
    }

    #[test]
    fn revoke_removes_bot_from_fan_out() {
        let registry = BotRegistry::from_bots([bot("a", &[BotEventType::Left], true)]);
        registry.revoke(&BotId::from("a")).unwrap();
        assert!(registry.find_subscribed(BotEventType::Left).is_empty());
        assert!(!registry.get(&BotId::from("a")).unwrap().active);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn rotate_token_replaces_secret() {
        let registry = BotRegistry::from_bots([bot("a", &[BotEventType::Left], true)]);
        registry.rotate_token(&BotId::from("a"), "fresh").unwrap();
        assert_eq!(registry.get(&BotId::from("a")).unwrap().verification_token, "fresh");
        assert!(registry.rotate_token(&BotId::from("zz"), "x").is_err());
    }
}
