// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory chat store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use lumi_core::{ChatKind, ChatMessage, ChatStore, LumiError, RegisteredChat, Role};

#[derive(Default)]
struct Inner {
    chats: Vec<RegisteredChat>,
    messages: Vec<ChatMessage>,
    next_id: i64,
}

/// A [`ChatStore`] keeping everything in a mutex-guarded `Vec`.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored history entry of a chat, oldest first.
    pub async fn messages(&self, chat_id: &str) -> Vec<ChatMessage> {
        self.inner
            .lock()
            .await
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }

    /// Total history entries across all chats.
    pub async fn message_count(&self) -> usize {
        self.inner.lock().await.messages.len()
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn find_chat(&self, chat_id: &str) -> Result<Option<RegisteredChat>, LumiError> {
        let inner = self.inner.lock().await;
        Ok(inner.chats.iter().find(|c| c.chat_id == chat_id).cloned())
    }

    async fn list_chats(&self) -> Result<Vec<RegisteredChat>, LumiError> {
        Ok(self.inner.lock().await.chats.clone())
    }

    async fn set_activation(
        &self,
        chat_id: &str,
        is_agent_active: bool,
        last_activity_at: Option<DateTime<Utc>>,
    ) -> Result<bool, LumiError> {
        let mut inner = self.inner.lock().await;
        let Some(chat) = inner.chats.iter_mut().find(|c| c.chat_id == chat_id) else {
            return Ok(false);
        };
        chat.is_agent_active = is_agent_active;
        chat.last_activity_at = last_activity_at;
        Ok(true)
    }

    async fn register_chat(
        &self,
        chat_id: &str,
        display_name: &str,
        kind: ChatKind,
    ) -> Result<RegisteredChat, LumiError> {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.chats.iter().find(|c| c.chat_id == chat_id) {
            return Ok(existing.clone());
        }
        let chat = RegisteredChat::new(chat_id, display_name, kind);
        inner.chats.push(chat.clone());
        Ok(chat)
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<bool, LumiError> {
        let mut inner = self.inner.lock().await;
        let before = inner.chats.len();
        inner.chats.retain(|c| c.chat_id != chat_id);
        Ok(inner.chats.len() != before)
    }

    async fn append_message(
        &self,
        chat_id: &str,
        role: Role,
        content: &str,
    ) -> Result<(), LumiError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.messages.push(ChatMessage {
            id,
            chat_id: chat_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn recent_messages(
        &self,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, LumiError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .messages
            .iter()
            .rev()
            .filter(|m| m.chat_id == chat_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn clear_messages(&self, chat_id: &str) -> Result<(), LumiError> {
        self.inner
            .lock()
            .await
            .messages
            .retain(|m| m.chat_id != chat_id);
        Ok(())
    }

    async fn count_allowed(&self, chat_id: &str) -> Result<u64, LumiError> {
        let inner = self.inner.lock().await;
        Ok(inner.chats.iter().filter(|c| c.chat_id == chat_id).count() as u64)
    }
}
