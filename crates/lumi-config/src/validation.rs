// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints that serde attributes cannot express. All failures
//! are collected rather than stopping at the first one.

use crate::diagnostic::ConfigError;
use crate::model::LumiConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &LumiConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let agent = &config.agent;
    if agent.name.trim().is_empty() {
        fail("agent.name must not be empty".to_string());
    }
    if agent.trigger.trim().is_empty() {
        fail("agent.trigger must not be empty".to_string());
    }
    if agent.exit_words.iter().any(|w| w.trim().is_empty()) {
        fail("agent.exit_words must not contain empty entries".to_string());
    }
    if agent.history_limit == 0 {
        fail("agent.history_limit must be at least 1".to_string());
    }
    if agent.idle_timeout_secs == 0 {
        fail("agent.idle_timeout_secs must be greater than 0".to_string());
    }
    if !LOG_LEVELS.contains(&agent.log_level.as_str()) {
        fail(format!(
            "agent.log_level `{}` is not one of: {}",
            agent.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let waha = &config.waha;
    if !(waha.base_url.starts_with("http://") || waha.base_url.starts_with("https://")) {
        fail(format!(
            "waha.base_url `{}` must start with http:// or https://",
            waha.base_url
        ));
    }
    if waha.session_name.trim().is_empty() {
        fail("waha.session_name must not be empty".to_string());
    }
    if waha.poll_interval_ms == 0 {
        fail("waha.poll_interval_ms must be greater than 0".to_string());
    }
    if waha.ready_timeout_secs == 0 || waha.request_timeout_secs == 0 {
        fail("waha timeouts must be greater than 0".to_string());
    } else if waha.poll_interval_ms >= waha.ready_timeout_secs.saturating_mul(1000) {
        fail(format!(
            "waha.poll_interval_ms ({}) must be shorter than waha.ready_timeout_secs ({}s)",
            waha.poll_interval_ms, waha.ready_timeout_secs
        ));
    }

    if config.anthropic.max_tokens == 0 {
        fail("anthropic.max_tokens must be greater than 0".to_string());
    }
    if config.anthropic.timeout_secs == 0 {
        fail("anthropic.timeout_secs must be greater than 0".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let host = config.gateway.host.trim();
    let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
    let is_valid_hostname = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
    if !is_valid_ip && !is_valid_hostname {
        fail(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        ));
    }
    if let Some(token) = &config.gateway.bearer_token
        && token.trim().is_empty()
    {
        fail("gateway.bearer_token must not be blank when set".to_string());
    }

    let limits = &config.rate_limit;
    if limits.api_limit == 0 || limits.session_limit == 0 {
        fail("rate_limit limits must be at least 1".to_string());
    }
    if limits.window_secs == 0 {
        fail("rate_limit.window_secs must be greater than 0".to_string());
    }

    let tasks = &config.tasks;
    if tasks.max_concurrent == 0 {
        fail("tasks.max_concurrent must be at least 1".to_string());
    }
    if tasks.max_pending < tasks.max_concurrent {
        fail(format!(
            "tasks.max_pending ({}) must be at least tasks.max_concurrent ({})",
            tasks.max_pending, tasks.max_concurrent
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
