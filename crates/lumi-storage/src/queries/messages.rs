// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat history operations. History is append-only and cleared in bulk.

use chrono::Utc;
use lumi_core::{ChatMessage, LumiError, Role};
use rusqlite::params;

use crate::database::{Database, enum_column, map_tr_err, time_column, to_sql_time};

/// Append one history entry.
pub async fn append_message(
    db: &Database,
    chat_id: &str,
    role: Role,
    content: &str,
) -> Result<(), LumiError> {
    let chat_id = chat_id.to_string();
    let content = content.to_string();
    let created_at = to_sql_time(&Utc::now());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO chat_messages (chat_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![chat_id, role.to_string(), content, created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Up to `limit` most recent entries of a chat, newest first.
pub async fn recent_messages(
    db: &Database,
    chat_id: &str,
    limit: usize,
) -> Result<Vec<ChatMessage>, LumiError> {
    let chat_id = chat_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, chat_id, role, content, created_at
                 FROM chat_messages WHERE chat_id = ?1
                 ORDER BY id DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![chat_id, limit], |row| {
                Ok(ChatMessage {
                    id: row.get(0)?,
                    chat_id: row.get(1)?,
                    role: enum_column(row, 2)?,
                    content: row.get(3)?,
                    created_at: time_column(row, 4)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every history entry of one chat.
pub async fn clear_messages(db: &Database, chat_id: &str) -> Result<(), LumiError> {
    let chat_id = chat_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM chat_messages WHERE chat_id = ?1",
                params![chat_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
