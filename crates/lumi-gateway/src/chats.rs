// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat registry routes under `/api/v1/chats`.
//!
//! Remote listings come straight from the gateway so an operator can pick
//! which chats to allow; the registry itself is the allow-list.

use std::str::FromStr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use lumi_core::{ChatKind, InboundMessage, RemoteChat};
use serde::{Deserialize, Serialize};

use crate::envelope::ApiResponse;
use crate::server::AppState;
use crate::whatsapp::invalid;

/// Remote chat as presented to operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteChatSummary {
    pub id: String,
    pub name: String,
    pub picture: Option<String>,
    pub last_message: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl From<RemoteChat> for RemoteChatSummary {
    fn from(chat: RemoteChat) -> Self {
        let kind = if chat.id.ends_with("@g.us") {
            "group"
        } else if chat.id.ends_with("@newsletter") {
            "channel"
        } else {
            "chat"
        };
        let (last_message, timestamp) = chat
            .last_message
            .as_ref()
            .map(|m| (preview(m), m.timestamp))
            .unwrap_or_default();

        Self {
            id: chat.id,
            name: chat.name,
            picture: chat.picture,
            last_message,
            timestamp,
            kind,
        }
    }
}

/// Text shown for a last message: body, else caption, else `[type]`.
fn preview(message: &InboundMessage) -> String {
    let raw_str = |key: &str| {
        message
            .raw
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    };

    if !message.body.is_empty() {
        return message.body.clone();
    }
    if let Some(caption) = raw_str("caption") {
        return caption.to_string();
    }
    match raw_str("type").or(Some(message.kind.as_str()).filter(|k| !k.is_empty())) {
        Some(kind) => format!("[{kind}]"),
        None => "[unknown]".to_string(),
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterChatRequest {
    #[serde(default)]
    pub chat_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// GET /remote/chats
pub async fn remote_chats(State(state): State<AppState>) -> ApiResponse {
    match state.gateway.chats().await {
        Ok(chats) => {
            let summaries: Vec<RemoteChatSummary> =
                chats.into_iter().map(RemoteChatSummary::from).collect();
            ApiResponse::with_data("Remote chats fetched", summaries)
        }
        Err(e) => ApiResponse::from_error("Failed to fetch chats", &e),
    }
}

/// GET /remote/groups
pub async fn remote_groups(State(state): State<AppState>) -> ApiResponse {
    match state.gateway.groups().await {
        Ok(groups) => ApiResponse::with_data("Remote groups fetched", groups),
        Err(e) => ApiResponse::from_error("Failed to fetch groups", &e),
    }
}

/// GET /registered
pub async fn registered(State(state): State<AppState>) -> ApiResponse {
    match state.store.list_chats().await {
        Ok(chats) => ApiResponse::with_data("All registered chats fetched", chats),
        Err(e) => ApiResponse::from_error("Failed to list chats", &e),
    }
}

/// POST /register
///
/// A missing `type` is inferred from the chat id.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterChatRequest>, JsonRejection>,
) -> ApiResponse {
    let Ok(Json(request)) = payload else {
        return invalid("Invalid payload");
    };
    let chat_id = request.chat_id.trim();
    if chat_id.is_empty() {
        return invalid("chat_id is required");
    }

    let kind = match request.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        Some(kind) => match ChatKind::from_str(kind) {
            Ok(kind) => kind,
            Err(_) => {
                return invalid(&format!(
                    "unknown chat type '{kind}', expected chat, group or self"
                ));
            }
        },
        None if chat_id.ends_with("@g.us") => ChatKind::Group,
        None => ChatKind::Chat,
    };
    let name = if request.name.trim().is_empty() {
        chat_id
    } else {
        request.name.trim()
    };

    match state.store.register_chat(chat_id, name, kind).await {
        Ok(chat) => ApiResponse::with_data("Chat registered", chat),
        Err(e) => ApiResponse::from_error("Failed to register chat", &e),
    }
}

/// DELETE /register/{chat_id}
pub async fn unregister(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> ApiResponse {
    match state.store.delete_chat(&chat_id).await {
        Ok(true) => ApiResponse::ok("Chat unregistered"),
        Ok(false) => ApiResponse::failure(StatusCode::NOT_FOUND, "Chat not found"),
        Err(e) => ApiResponse::from_error("Failed to unregister chat", &e),
    }
}
