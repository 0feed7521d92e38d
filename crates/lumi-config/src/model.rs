// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Lumi agent.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Lumi configuration.
///
/// Every section is optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LumiConfig {
    /// Conversation behavior.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Messaging gateway connection.
    #[serde(default)]
    pub waha: WahaConfig,

    /// Anthropic API settings for reply generation.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Per-client request limits.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Background task pool.
    #[serde(default)]
    pub tasks: TaskConfig,
}

/// Conversation behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent, used as the speaker prefix in history.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Keyword that activates the agent in a chat (matched case-insensitively).
    #[serde(default = "default_trigger")]
    pub trigger: String,

    /// Messages that end an active conversation.
    #[serde(default = "default_exit_words")]
    pub exit_words: Vec<String>,

    /// Number of history entries sent along with each prompt.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Seconds of silence after which an active conversation is closed.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Replaces the built-in persona prompt when set.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            trigger: default_trigger(),
            exit_words: default_exit_words(),
            history_limit: default_history_limit(),
            idle_timeout_secs: default_idle_timeout_secs(),
            system_prompt: None,
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "Lumi".to_string()
}

fn default_trigger() -> String {
    "@lumi".to_string()
}

fn default_exit_words() -> Vec<String> {
    ["bye", "exit", "stop", "end session"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_history_limit() -> usize {
    10
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Messaging gateway (WAHA) connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WahaConfig {
    /// Base URL of the gateway, without a trailing slash.
    #[serde(default = "default_waha_url")]
    pub base_url: String,

    /// Value sent in the `X-Api-Key` header.
    #[serde(default)]
    pub api_key: Option<String>,

    /// The single session this deployment drives.
    #[serde(default = "default_session_name")]
    pub session_name: String,

    /// Per-request timeout for gateway calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Interval between session status polls while starting.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on waiting for a session to become usable.
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
}

impl Default for WahaConfig {
    fn default() -> Self {
        Self {
            base_url: default_waha_url(),
            api_key: None,
            session_name: default_session_name(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            ready_timeout_secs: default_ready_timeout_secs(),
        }
    }
}

fn default_waha_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_session_name() -> String {
    "default".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_ready_timeout_secs() -> u64 {
    20
}

/// Anthropic API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// Anthropic API key. `None` falls back to `ANTHROPIC_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for replies.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Anthropic API version string.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Upper bound on a single completion, retries included.
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_completion_timeout_secs() -> u64 {
    30
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("lumi").join("lumi.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("lumi.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token for operator routes. `None` rejects every protected request.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Fixed-window request limits, keyed by client address.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Requests per window for the API as a whole.
    #[serde(default = "default_api_limit")]
    pub api_limit: u32,

    /// Requests per window for session linking (connect, code).
    #[serde(default = "default_session_limit")]
    pub session_limit: u32,

    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            api_limit: default_api_limit(),
            session_limit: default_session_limit(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_api_limit() -> u32 {
    60
}

fn default_session_limit() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    60
}

/// Background task pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Tasks allowed to run at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Tasks allowed in flight (running or waiting); further submissions are dropped.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,

    /// How long shutdown waits for in-flight tasks.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_pending: default_max_pending(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_max_concurrent() -> usize {
    16
}

fn default_max_pending() -> usize {
    256
}

fn default_drain_timeout_secs() -> u64 {
    10
}
