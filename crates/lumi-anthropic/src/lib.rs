// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Claude adapter for the Lumi agent.
//!
//! [`AnthropicCompletion`] implements [`CompletionAdapter`] with a single
//! non-streaming Messages API call per reply.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use lumi_config::model::AnthropicConfig;
use lumi_core::{CompletionAdapter, LumiError};
use tracing::{debug, info};

pub use client::AnthropicClient;
use types::{ApiMessage, MessageRequest};

/// Anthropic-backed text completion.
///
/// API key resolution order: config, then `ANTHROPIC_API_KEY`, then error.
pub struct AnthropicCompletion {
    client: AnthropicClient,
    max_tokens: u32,
}

impl AnthropicCompletion {
    /// Creates the adapter from the `[anthropic]` config section.
    pub fn new(config: &AnthropicConfig) -> Result<Self, LumiError> {
        let api_key = resolve_api_key(config.api_key.as_deref())?;
        let client = AnthropicClient::new(
            &api_key,
            &config.api_version,
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(model = %config.model, "Anthropic completion initialized");
        Ok(Self::with_client(client, config.max_tokens))
    }

    /// Creates the adapter around an existing client.
    pub fn with_client(client: AnthropicClient, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }
}

#[async_trait]
impl CompletionAdapter for AnthropicCompletion {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[String],
        prompt: &str,
    ) -> Result<String, LumiError> {
        let request = MessageRequest {
            model: self.client.default_model().to_string(),
            messages: vec![ApiMessage::user(build_user_turn(history, prompt))],
            system: (!system_prompt.is_empty()).then(|| system_prompt.to_string()),
            max_tokens: self.max_tokens,
        };

        let response = self.client.complete_message(&request).await?;
        debug!(
            id = %response.id,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = ?response.stop_reason,
            "completion received"
        );

        let text = response.text();
        if text.trim().is_empty() {
            return Err(LumiError::Completion {
                message: "model returned no text".into(),
                source: None,
            });
        }
        Ok(text)
    }
}

/// Folds the prefixed transcript and the new prompt into one user turn.
fn build_user_turn(history: &[String], prompt: &str) -> String {
    if history.is_empty() {
        return prompt.to_string();
    }
    format!(
        "Conversation so far:\n{}\n\nCurrent message: {prompt}",
        history.join("\n")
    )
}

fn resolve_api_key(configured: Option<&str>) -> Result<String, LumiError> {
    if let Some(key) = configured.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }
    std::env::var("ANTHROPIC_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            LumiError::Config(
                "Anthropic API key not configured: set anthropic.api_key or ANTHROPIC_API_KEY"
                    .into(),
            )
        })
}
