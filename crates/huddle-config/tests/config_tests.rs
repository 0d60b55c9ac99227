// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Huddle configuration system.

use huddle_config::diagnostic::ConfigError;
use huddle_config::model::HuddleConfig;
use huddle_config::{load_and_validate_str, load_config_from_str};
use huddle_core::{BotEventType, BotId};

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_huddle_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 8080
bearer_token = "internal-secret"
log_level = "debug"

[websocket]
queue_capacity = 128
max_frame_bytes = 1024
pong_wait_secs = 30
ping_period_secs = 27
write_wait_secs = 2

[bot]
timeout_secs = 3
user_agent = "Test_Agent/2.0"
log_capacity = 50

[[bots]]
id = "echo"
post_url = "https://bots.example.com/echo"
verification_token = "tok-echo"
events = ["MESSAGE_CREATED", "JOINED"]

[[bots]]
id = "sleepy"
post_url = "http://10.0.0.9/hook"
verification_token = "tok-sleepy"
active = false

[sessions]
"session-abc" = "alice"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.bearer_token.as_deref(), Some("internal-secret"));
    assert_eq!(config.websocket.queue_capacity, 128);
    assert_eq!(config.websocket.pong_wait().as_secs(), 30);
    assert_eq!(config.websocket.ping_period().as_secs(), 27);
    assert_eq!(config.bot.timeout().as_secs(), 3);
    assert_eq!(config.bot.user_agent, "Test_Agent/2.0");
    assert_eq!(config.bots.len(), 2);
    assert!(!config.bots[1].active);
    assert_eq!(config.sessions.get("session-abc").map(String::as_str), Some("alice"));

    let echo = config.bots[0].to_bot();
    assert_eq!(echo.id, BotId::from("echo"));
    assert!(echo.wants(BotEventType::MessageCreated));
    assert!(echo.wants(BotEventType::Joined));
    assert!(!echo.wants(BotEventType::Left));
}

/// Defaults match the documented connection limits.
#[test]
fn defaults_match_connection_limits() {
    let config = HuddleConfig::default();
    assert_eq!(config.websocket.queue_capacity, 256);
    assert_eq!(config.websocket.max_frame_bytes, 512);
    assert_eq!(config.websocket.pong_wait_secs, 60);
    assert_eq!(config.websocket.ping_period_secs, 54);
    assert_eq!(config.websocket.write_wait_secs, 5);
    assert_eq!(config.bot.timeout_secs, 5);
    assert_eq!(config.bot.user_agent, "Huddle_Bot_Processor/1.0");
    assert!(config.bots.is_empty());
}

/// An unknown event name is rejected while loading, not at dispatch time.
#[test]
fn unknown_bot_event_name_is_rejected() {
    let toml = r#"
[[bots]]
id = "echo"
post_url = "https://bots.example.com/echo"
verification_token = "tok"
events = ["MESSAGE_STAMPED"]
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// Unknown key in [websocket] produces an unknown-key diagnostic with a suggestion.
#[test]
fn unknown_key_produces_suggestion() {
    let toml = r#"
[websocket]
pong_wiat_secs = 10
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let found = errors.iter().any(|e| match e {
        ConfigError::UnknownKey { key, suggestion, .. } => {
            key == "pong_wiat_secs" && suggestion.as_deref() == Some("pong_wait_secs")
        }
        _ => false,
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

/// A typo inside the second `[[bots]]` entry is pointed at in the source.
#[test]
fn unknown_key_in_bot_entry_is_located() {
    let toml = r#"
[[bots]]
id = "echo"
post_url = "https://bots.example.com/echo"
verification_token = "a"

[[bots]]
id = "relay"
post_ulr = "https://bots.example.com/relay"
verification_token = "b"
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let error = errors
        .iter()
        .find(|e| matches!(e, ConfigError::UnknownKey { .. }))
        .unwrap_or_else(|| panic!("expected UnknownKey, got: {errors:?}"));
    let ConfigError::UnknownKey {
        key,
        table,
        suggestion,
        span,
        ..
    } = error
    else {
        unreachable!();
    };
    assert_eq!(key, "post_ulr");
    assert_eq!(table, "[[bots]]");
    assert_eq!(suggestion.as_deref(), Some("post_url"));
    let span = span.expect("span into the inline source");
    assert_eq!(&toml[span.offset()..span.offset() + span.len()], "post_ulr");
    assert_eq!(
        error.to_string(),
        "unknown configuration key `post_ulr` in [[bots]]"
    );
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_runs_after_parse() {
    let toml = r#"
[websocket]
pong_wait_secs = 10
ping_period_secs = 20
"#;
    let errors = load_and_validate_str(toml).expect_err("ping longer than pong wait");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("ping_period_secs"))));
}

/// Wrong value type is reported as InvalidType.
#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[server]
port = "eighty"
"#;
    let errors = load_and_validate_str(toml).expect_err("port must be a number");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::InvalidType { .. } | ConfigError::Other(_))));
}
