// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-chat conversation state machine.
//!
//! Each inbound message passes through loop prevention, the allow-list,
//! idle-timeout expiry and trigger/exit detection before an AI turn is
//! taken. Activation lives on the [`RegisteredChat`] row; the history
//! window lives in the chat's message log. Messages for the same chat are
//! processed one at a time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use lumi_config::model::LumiConfig;
use lumi_core::{
    ChatKind, ChatStore, CompletionAdapter, GatewayClient, InboundMessage, LumiError, Role,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Sent when a completion fails or times out.
pub const APOLOGY_TEXT: &str =
    "⚠️ *Error*: I'm having trouble thinking right now. Please try again.";

/// What processing a message amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Dropped before touching storage.
    Discarded(DiscardReason),
    /// Stored without a reply: the agent is inactive and the trigger was
    /// absent, or the message held nothing besides the trigger.
    Ignored,
    /// The agent was activated and nothing followed the trigger.
    Activated,
    /// The agent was deactivated on request.
    Deactivated,
    /// An AI reply was produced.
    Replied,
    /// The completion failed and the apology was sent instead.
    Apologized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    EmptyBody,
    /// Neither sender nor recipient was given.
    MissingChat,
    OwnEcho,
    BroadcastChat,
    NotAllowed,
}

/// Wording and limits of the conversation policy.
#[derive(Debug, Clone)]
pub struct ConversationSettings {
    pub agent_name: String,
    pub trigger: String,
    pub exit_words: Vec<String>,
    pub history_limit: usize,
    pub idle_timeout: Duration,
    pub completion_timeout: Duration,
    pub system_prompt: String,
}

impl ConversationSettings {
    pub fn from_config(config: &LumiConfig) -> Self {
        let agent = &config.agent;
        Self {
            agent_name: agent.name.clone(),
            trigger: agent.trigger.clone(),
            exit_words: agent.exit_words.iter().map(|w| w.to_lowercase()).collect(),
            history_limit: agent.history_limit,
            idle_timeout: Duration::from_secs(agent.idle_timeout_secs),
            completion_timeout: Duration::from_secs(config.anthropic.timeout_secs),
            system_prompt: agent
                .system_prompt
                .clone()
                .unwrap_or_else(|| default_persona(&agent.name)),
        }
    }

    pub fn greeting(&self) -> String {
        format!(
            "Hello! I'm {}. Our session has started.\n\nType *bye*, *exit*, or *stop* to end the session.",
            self.agent_name
        )
    }

    pub fn farewell(&self) -> String {
        format!("Session ended. 👋 Call me again with {}.", self.trigger)
    }

    pub fn timeout_notice(&self) -> String {
        format!(
            "Session timed out due to inactivity. Call me again with {}.",
            self.trigger
        )
    }
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self::from_config(&LumiConfig::default())
    }
}

/// Built-in system prompt.
pub fn default_persona(name: &str) -> String {
    format!(
        "You are {name}, a smart and helpful WhatsApp assistant.\n\
         - Format your responses using WhatsApp Markdown (e.g., *bold*, _italics_, ~strike~, `code`).\n\
         - Keep responses concise and easy to read on mobile screens.\n\
         - If the user asks for code, wrap it in code blocks.\n\
         - Be friendly but professional."
    )
}

pub struct ConversationEngine {
    store: Arc<dyn ChatStore>,
    gateway: Arc<dyn GatewayClient>,
    completion: Arc<dyn CompletionAdapter>,
    settings: ConversationSettings,
    chat_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<dyn ChatStore>,
        gateway: Arc<dyn GatewayClient>,
        completion: Arc<dyn CompletionAdapter>,
        settings: ConversationSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            completion,
            settings,
            chat_locks: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &ConversationSettings {
        &self.settings
    }

    pub async fn process_message(&self, msg: &InboundMessage) -> Result<Outcome, LumiError> {
        self.process_message_at(msg, Utc::now()).await
    }

    /// Processes `msg` as if it arrived at `now`.
    pub async fn process_message_at(
        &self,
        msg: &InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<Outcome, LumiError> {
        let text = msg.body.trim();
        if text.is_empty() {
            return Ok(Outcome::Discarded(DiscardReason::EmptyBody));
        }
        if msg.is_own_api_echo() {
            return Ok(Outcome::Discarded(DiscardReason::OwnEcho));
        }
        let chat_id = msg.chat_id();
        if chat_id.is_empty() {
            return Ok(Outcome::Discarded(DiscardReason::MissingChat));
        }
        if is_broadcast_chat(chat_id) {
            return Ok(Outcome::Discarded(DiscardReason::BroadcastChat));
        }

        let lock = Arc::clone(self.chat_locks.entry(chat_id.to_string()).or_default().value());
        let outcome = {
            let _guard = lock.lock().await;
            self.process_locked(chat_id, msg.is_self_chat(), text, now)
                .await
        };
        drop(lock);
        self.chat_locks
            .remove_if(chat_id, |_, lock| Arc::strong_count(lock) == 1);

        outcome
    }

    async fn process_locked(
        &self,
        chat_id: &str,
        is_self_chat: bool,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Outcome, LumiError> {
        if is_self_chat && !self.store.is_chat_allowed(chat_id).await? {
            info!(chat_id, "auto-registering self chat");
            self.store
                .register_chat(chat_id, "Me (Self)", ChatKind::SelfChat)
                .await?;
        }

        let Some(chat) = self.store.find_chat(chat_id).await? else {
            debug!(chat_id, "chat not registered, discarding message");
            return Ok(Outcome::Discarded(DiscardReason::NotAllowed));
        };

        self.store.append_message(chat_id, Role::User, text).await?;

        let mut is_active = chat.is_agent_active;
        if is_active && self.is_idle(chat.last_activity_at, now) {
            info!(chat_id, "conversation timed out");
            self.deactivate(chat_id, chat.last_activity_at).await?;
            self.send(chat_id, &self.settings.timeout_notice()).await;
            is_active = false;
        }

        let is_trigger = contains_keyword(text, &self.settings.trigger);

        if !is_active {
            if !is_trigger {
                return Ok(Outcome::Ignored);
            }

            if !self.store.set_activation(chat_id, true, Some(now)).await? {
                return Ok(unregistered(chat_id));
            }
            info!(chat_id, "conversation started");
            self.store.clear_messages(chat_id).await?;
            self.send(chat_id, &self.settings.greeting()).await;

            let remainder = strip_keyword(text, &self.settings.trigger);
            if remainder.is_empty() {
                return Ok(Outcome::Activated);
            }
            self.store
                .append_message(chat_id, Role::User, &remainder)
                .await?;
            return self.reply(chat_id, &remainder, now).await;
        }

        if self.is_exit(text) {
            info!(chat_id, "conversation ended by user");
            self.deactivate(chat_id, chat.last_activity_at).await?;
            self.send(chat_id, &self.settings.farewell()).await;
            return Ok(Outcome::Deactivated);
        }

        let prompt = strip_keyword(text, &self.settings.trigger);
        if prompt.is_empty() {
            debug!(chat_id, "trigger without a prompt in an active conversation");
            return Ok(Outcome::Ignored);
        }
        self.reply(chat_id, &prompt, now).await
    }

    /// One AI turn. The newest history entry is the message being answered
    /// and is passed as the prompt rather than as history.
    async fn reply(
        &self,
        chat_id: &str,
        prompt: &str,
        now: DateTime<Utc>,
    ) -> Result<Outcome, LumiError> {
        if !self.store.set_activation(chat_id, true, Some(now)).await? {
            return Ok(unregistered(chat_id));
        }

        let history: Vec<String> = self
            .store
            .recent_messages(chat_id, self.settings.history_limit + 1)
            .await?
            .into_iter()
            .skip(1)
            .rev()
            .map(|m| match m.role {
                Role::User => format!("User: {}", m.content),
                Role::Agent => format!("{}: {}", self.settings.agent_name, m.content),
            })
            .collect();

        let generated = tokio::time::timeout(
            self.settings.completion_timeout,
            self.completion
                .generate(&self.settings.system_prompt, &history, prompt),
        )
        .await
        .unwrap_or(Err(LumiError::Timeout {
            duration: self.settings.completion_timeout,
        }));

        match generated {
            Ok(answer) => {
                self.store
                    .append_message(chat_id, Role::Agent, &answer)
                    .await?;
                self.send(chat_id, &answer).await;
                Ok(Outcome::Replied)
            }
            Err(e) => {
                warn!(chat_id, error = %e, "completion failed");
                self.send(chat_id, APOLOGY_TEXT).await;
                Ok(Outcome::Apologized)
            }
        }
    }

    /// Clears the activation flag and the history window. A chat that was
    /// unregistered meanwhile stays unregistered.
    async fn deactivate(
        &self,
        chat_id: &str,
        last_activity_at: Option<DateTime<Utc>>,
    ) -> Result<(), LumiError> {
        self.store
            .set_activation(chat_id, false, last_activity_at)
            .await?;
        self.store.clear_messages(chat_id).await
    }

    fn is_idle(&self, last_activity_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(last) = last_activity_at else {
            return false;
        };
        let limit = TimeDelta::from_std(self.settings.idle_timeout).unwrap_or(TimeDelta::MAX);
        now - last > limit
    }

    fn is_exit(&self, text: &str) -> bool {
        let normalized = text
            .trim()
            .trim_end_matches(|c: char| c.is_ascii_punctuation())
            .trim()
            .to_lowercase();
        self.settings.exit_words.iter().any(|w| *w == normalized)
    }

    async fn send(&self, chat_id: &str, text: &str) {
        if let Err(e) = self.gateway.send_text(chat_id, text).await {
            warn!(chat_id, error = %e, "failed to send message");
        }
    }
}

/// The chat left the allow-list while its message was being handled.
fn unregistered(chat_id: &str) -> Outcome {
    info!(chat_id, "chat was unregistered mid-conversation");
    Outcome::Discarded(DiscardReason::NotAllowed)
}

/// Status updates and broadcast lists never get replies.
fn is_broadcast_chat(chat_id: &str) -> bool {
    chat_id.contains("status") || chat_id.contains("broadcast")
}

fn contains_keyword(text: &str, keyword: &str) -> bool {
    !keyword.is_empty()
        && text
            .to_ascii_lowercase()
            .contains(&keyword.to_ascii_lowercase())
}

/// Removes every case-insensitive occurrence of `keyword` and trims the rest.
fn strip_keyword(text: &str, keyword: &str) -> String {
    if keyword.is_empty() {
        return text.trim().to_string();
    }
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let haystack = text.to_ascii_lowercase();
    let needle = keyword.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    while let Some(pos) = haystack[cursor..].find(&needle) {
        out.push_str(&text[cursor..cursor + pos]);
        cursor += pos + needle.len();
    }
    out.push_str(&text[cursor..]);
    out.trim().to_string()
}
