// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence of the chat allow-list and per-chat history.

use async_trait::async_trait;

use chrono::{DateTime, Utc};

use crate::error::LumiError;
use crate::types::{ChatKind, ChatMessage, RegisteredChat, Role};

/// Store for registered chats and their message history.
///
/// Writes are independent: appending history and flipping a chat's
/// activation flag are separate calls and may partially succeed.
#[async_trait]
pub trait ChatStore: Send + Sync + 'static {
    /// Looks a chat up by its gateway chat id.
    async fn find_chat(&self, chat_id: &str) -> Result<Option<RegisteredChat>, LumiError>;

    /// Lists every registered chat, oldest registration first.
    async fn list_chats(&self) -> Result<Vec<RegisteredChat>, LumiError>;

    /// Updates the activation state of a registered chat.
    ///
    /// Never inserts: returns `false` when the chat is not registered, so a
    /// chat removed from the allow-list stays removed.
    async fn set_activation(
        &self,
        chat_id: &str,
        is_agent_active: bool,
        last_activity_at: Option<DateTime<Utc>>,
    ) -> Result<bool, LumiError>;

    /// Registers a chat unless one with the same id exists; returns the stored row.
    async fn register_chat(
        &self,
        chat_id: &str,
        display_name: &str,
        kind: ChatKind,
    ) -> Result<RegisteredChat, LumiError>;

    /// Removes a chat from the allow-list. Returns whether a row was deleted.
    async fn delete_chat(&self, chat_id: &str) -> Result<bool, LumiError>;

    /// Appends one entry to a chat's history.
    async fn append_message(&self, chat_id: &str, role: Role, content: &str)
    -> Result<(), LumiError>;

    /// Returns up to `limit` entries, newest first.
    async fn recent_messages(&self, chat_id: &str, limit: usize)
    -> Result<Vec<ChatMessage>, LumiError>;

    /// Deletes a chat's whole history.
    async fn clear_messages(&self, chat_id: &str) -> Result<(), LumiError>;

    /// Number of registered chats with this id (0 or 1).
    async fn count_allowed(&self, chat_id: &str) -> Result<u64, LumiError>;

    /// Whether the chat is on the allow-list.
    async fn is_chat_allowed(&self, chat_id: &str) -> Result<bool, LumiError> {
        Ok(self.count_allowed(chat_id).await? > 0)
    }
}
