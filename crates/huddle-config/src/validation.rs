// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Covers constraints serde cannot express: heartbeat timing relations,
//! non-zero limits, unique bot ids and usable callback URLs.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::HuddleConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &HuddleConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::Validation {
            message: format!("server.host `{host}` is not a valid IP address or hostname"),
        });
    }

    let ws = &config.websocket;
    if ws.queue_capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "websocket.queue_capacity must be at least 1".to_string(),
        });
    }
    if ws.max_frame_bytes == 0 {
        errors.push(ConfigError::Validation {
            message: "websocket.max_frame_bytes must be at least 1".to_string(),
        });
    }
    if ws.write_wait_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "websocket.write_wait_secs must be at least 1".to_string(),
        });
    }
    if ws.ping_period_secs == 0 || ws.ping_period_secs >= ws.pong_wait_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "websocket.ping_period_secs ({}) must be non-zero and shorter than websocket.pong_wait_secs ({})",
                ws.ping_period_secs, ws.pong_wait_secs
            ),
        });
    }

    if config.bot.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "bot.timeout_secs must be at least 1".to_string(),
        });
    }
    if config.bot.user_agent.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "bot.user_agent must not be empty".to_string(),
        });
    }

    let mut seen_ids = HashSet::new();
    for (i, bot) in config.bots.iter().enumerate() {
        if bot.id.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("bots[{i}].id must not be empty"),
            });
        } else if !seen_ids.insert(bot.id.as_str()) {
            errors.push(ConfigError::Validation {
                message: format!("duplicate bot id `{}` in [[bots]] array", bot.id),
            });
        }

        match url::Url::parse(&bot.post_url) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
            Ok(parsed) => errors.push(ConfigError::Validation {
                message: format!(
                    "bots[{i}].post_url scheme `{}` is not allowed, use http or https",
                    parsed.scheme()
                ),
            }),
            Err(e) => errors.push(ConfigError::Validation {
                message: format!("bots[{i}].post_url `{}` is invalid: {e}", bot.post_url),
            }),
        }

        if bot.verification_token.is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("bots[{i}].verification_token must not be empty"),
            });
        }
    }

    for (token, user) in &config.sessions {
        if token.is_empty() || user.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "sessions entries need a non-empty token and user id".to_string(),
            });
            break;
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BotEntryConfig;
    use huddle_core::BotEventType;

    fn bot(id: &str, url: &str) -> BotEntryConfig {
        BotEntryConfig {
            id: id.to_string(),
            post_url: url.to_string(),
            verification_token: "secret".to_string(),
            events: vec![BotEventType::MessageCreated],
            active: true,
        }
    }

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&HuddleConfig::default()).is_ok());
    }

    #[test]
    fn ping_period_must_be_shorter_than_pong_wait() {
        let mut config = HuddleConfig::default();
        config.websocket.ping_period_secs = 60;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "ping_period_secs"));
    }

    #[test]
    fn zero_queue_capacity_fails_validation() {
        let mut config = HuddleConfig::default();
        config.websocket.queue_capacity = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "queue_capacity"));
    }

    #[test]
    fn duplicate_bot_ids_fail_validation() {
        let mut config = HuddleConfig::default();
        config.bots = vec![
            bot("echo", "https://bots.example.com/echo"),
            bot("echo", "https://bots.example.com/echo2"),
        ];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "duplicate bot id"));
    }

    #[test]
    fn non_http_callback_fails_validation() {
        let mut config = HuddleConfig::default();
        config.bots = vec![bot("ftp", "ftp://bots.example.com/hook")];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "scheme `ftp`"));
    }

    #[test]
    fn malformed_callback_fails_validation() {
        let mut config = HuddleConfig::default();
        config.bots = vec![bot("broken", "not a url")];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "bots[0].post_url"));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = HuddleConfig::default();
        config.websocket.queue_capacity = 0;
        config.bot.timeout_secs = 0;
        config.server.host = String::new();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
