// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`ChatStore`] trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use lumi_config::model::StorageConfig;
use lumi_core::{ChatKind, ChatMessage, ChatStore, LumiError, RegisteredChat, Role};

use crate::database::Database;
use crate::queries;

/// SQLite-backed chat store.
///
/// Delegates every operation to the typed query modules.
pub struct SqliteStorage {
    db: Database,
}

impl SqliteStorage {
    /// Wraps an already opened database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens the database described by `config`.
    pub async fn open(config: &StorageConfig) -> Result<Self, LumiError> {
        let db = Database::open_with_options(&config.database_path, config.wal_mode).await?;
        Ok(Self::new(db))
    }

    /// Flushes the WAL. Called once during shutdown.
    pub async fn checkpoint(&self) -> Result<(), LumiError> {
        self.db.checkpoint().await
    }

    /// Checkpoints and closes the underlying connection.
    pub async fn close(self) -> Result<(), LumiError> {
        self.db.close().await
    }
}

#[async_trait]
impl ChatStore for SqliteStorage {
    async fn find_chat(&self, chat_id: &str) -> Result<Option<RegisteredChat>, LumiError> {
        queries::chats::find_chat(&self.db, chat_id).await
    }

    async fn list_chats(&self) -> Result<Vec<RegisteredChat>, LumiError> {
        queries::chats::list_chats(&self.db).await
    }

    async fn set_activation(
        &self,
        chat_id: &str,
        is_agent_active: bool,
        last_activity_at: Option<DateTime<Utc>>,
    ) -> Result<bool, LumiError> {
        debug!(chat_id, active = is_agent_active, "updating activation");
        queries::chats::set_activation(&self.db, chat_id, is_agent_active, last_activity_at).await
    }

    async fn register_chat(
        &self,
        chat_id: &str,
        display_name: &str,
        kind: ChatKind,
    ) -> Result<RegisteredChat, LumiError> {
        queries::chats::register_chat(&self.db, chat_id, display_name, kind).await
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<bool, LumiError> {
        queries::chats::delete_chat(&self.db, chat_id).await
    }

    async fn append_message(
        &self,
        chat_id: &str,
        role: Role,
        content: &str,
    ) -> Result<(), LumiError> {
        queries::messages::append_message(&self.db, chat_id, role, content).await
    }

    async fn recent_messages(
        &self,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, LumiError> {
        queries::messages::recent_messages(&self.db, chat_id, limit).await
    }

    async fn clear_messages(&self, chat_id: &str) -> Result<(), LumiError> {
        debug!(chat_id, "clearing history");
        queries::messages::clear_messages(&self.db, chat_id).await
    }

    async fn count_allowed(&self, chat_id: &str) -> Result<u64, LumiError> {
        queries::chats::count_allowed(&self.db, chat_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup() -> (SqliteStorage, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("lumi.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        (SqliteStorage::open(&config).await.unwrap(), dir)
    }

    #[tokio::test]
    async fn allow_list_through_trait_object() {
        let (storage, _dir) = setup().await;
        let store: &dyn ChatStore = &storage;

        assert!(!store.is_chat_allowed("1@c.us").await.unwrap());
        store
            .register_chat("1@c.us", "Ana", ChatKind::Chat)
            .await
            .unwrap();
        assert!(store.is_chat_allowed("1@c.us").await.unwrap());

        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn history_survives_reopen() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("lumi.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };

        let storage = SqliteStorage::open(&config).await.unwrap();
        storage
            .append_message("1@c.us", Role::User, "remember me")
            .await
            .unwrap();
        storage.close().await.unwrap();

        let storage = SqliteStorage::open(&config).await.unwrap();
        let history = storage.recent_messages("1@c.us", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "remember me");
        storage.close().await.unwrap();
    }
}
