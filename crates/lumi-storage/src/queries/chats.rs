// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registered chat (allow-list) operations.

use chrono::{DateTime, Utc};
use lumi_core::{ChatKind, LumiError, RegisteredChat};
use rusqlite::{OptionalExtension, params};

use crate::database::{
    Database, enum_column, map_tr_err, optional_time_column, time_column, to_sql_time,
};

const CHAT_COLUMNS: &str =
    "chat_id, display_name, kind, is_agent_active, last_activity_at, created_at";

fn chat_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RegisteredChat> {
    Ok(RegisteredChat {
        chat_id: row.get(0)?,
        display_name: row.get(1)?,
        kind: enum_column(row, 2)?,
        is_agent_active: row.get(3)?,
        last_activity_at: optional_time_column(row, 4)?,
        created_at: time_column(row, 5)?,
    })
}

/// Get a chat by its gateway id.
pub async fn find_chat(db: &Database, chat_id: &str) -> Result<Option<RegisteredChat>, LumiError> {
    let chat_id = chat_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {CHAT_COLUMNS} FROM registered_chats WHERE chat_id = ?1"),
                params![chat_id],
                chat_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// All registered chats, oldest registration first.
pub async fn list_chats(db: &Database) -> Result<Vec<RegisteredChat>, LumiError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHAT_COLUMNS} FROM registered_chats ORDER BY created_at, chat_id"
            ))?;
            let rows = stmt.query_map([], chat_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Update the activation flag and last activity of an existing chat.
///
/// Returns whether the chat exists; a missing chat is not inserted.
pub async fn set_activation(
    db: &Database,
    chat_id: &str,
    is_agent_active: bool,
    last_activity_at: Option<DateTime<Utc>>,
) -> Result<bool, LumiError> {
    let chat_id = chat_id.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE registered_chats
                 SET is_agent_active = ?2, last_activity_at = ?3
                 WHERE chat_id = ?1",
                params![
                    chat_id,
                    is_agent_active,
                    last_activity_at.as_ref().map(to_sql_time),
                ],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Register a chat unless it exists, returning the stored row either way.
pub async fn register_chat(
    db: &Database,
    chat_id: &str,
    display_name: &str,
    kind: ChatKind,
) -> Result<RegisteredChat, LumiError> {
    let fresh = RegisteredChat::new(chat_id, display_name, kind);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO registered_chats
                     (chat_id, display_name, kind, is_agent_active, last_activity_at, created_at)
                 VALUES (?1, ?2, ?3, 0, NULL, ?4)",
                params![
                    fresh.chat_id,
                    fresh.display_name,
                    fresh.kind.to_string(),
                    to_sql_time(&fresh.created_at),
                ],
            )?;
            conn.query_row(
                &format!("SELECT {CHAT_COLUMNS} FROM registered_chats WHERE chat_id = ?1"),
                params![fresh.chat_id],
                chat_from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a chat. Returns whether a row existed.
pub async fn delete_chat(db: &Database, chat_id: &str) -> Result<bool, LumiError> {
    let chat_id = chat_id.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "DELETE FROM registered_chats WHERE chat_id = ?1",
                params![chat_id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of registered chats with this id.
pub async fn count_allowed(db: &Database, chat_id: &str) -> Result<u64, LumiError> {
    let chat_id = chat_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM registered_chats WHERE chat_id = ?1",
                params![chat_id],
                |row| row.get::<_, i64>(0),
            )
        })
        .await
        .map(|n| n.max(0) as u64)
        .map_err(map_tr_err)
}
