// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the gateway client, the agent, and the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

/// Lifecycle status of the gateway session, as reported by the gateway.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Stopped,
    Starting,
    /// Waiting for the operator to scan a QR code or enter a link code.
    #[serde(rename = "SCAN_QR_CODE")]
    #[strum(serialize = "SCAN_QR_CODE")]
    ScanRequired,
    Working,
    Failed,
    /// Any status this build does not know about.
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    /// A status from which credentials can be produced or messages flow.
    pub fn is_usable(self) -> bool {
        matches!(self, SessionStatus::ScanRequired | SessionStatus::Working)
    }
}

/// Full session resource as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub name: String,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub me: Option<Profile>,
}

/// The messaging account linked to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub push_name: String,
}

impl Profile {
    /// Display name used when the linked account registers its own chat.
    pub fn self_chat_name(&self) -> String {
        if self.push_name.is_empty() {
            "Me (Self)".to_string()
        } else {
            format!("{} (Self)", self.push_name)
        }
    }
}

/// Kind of a registered chat.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatKind {
    Chat,
    Group,
    #[serde(rename = "self")]
    #[strum(serialize = "self")]
    SelfChat,
}

/// Author of a stored history entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// A chat permitted to talk to the agent, plus its activation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredChat {
    pub chat_id: String,
    pub display_name: String,
    pub kind: ChatKind,
    pub is_agent_active: bool,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RegisteredChat {
    /// A freshly registered, inactive chat.
    pub fn new(chat_id: impl Into<String>, display_name: impl Into<String>, kind: ChatKind) -> Self {
        Self {
            chat_id: chat_id.into(),
            display_name: display_name.into(),
            kind,
            is_agent_active: false,
            last_activity_at: None,
            created_at: Utc::now(),
        }
    }
}

/// One entry of a chat's history window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub chat_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A message delivered by the gateway's `message` webhook event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    #[serde(default, deserialize_with = "deserialize_message_id")]
    pub id: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub has_media: bool,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default, rename = "_data", skip_serializing_if = "serde_json::Map::is_empty")]
    pub raw: serde_json::Map<String, serde_json::Value>,
}

impl InboundMessage {
    /// The chat this message belongs to: the sender for inbound traffic,
    /// the recipient for echoes of messages the linked account sent.
    pub fn chat_id(&self) -> &str {
        if self.from_me { &self.to } else { &self.from }
    }

    /// Messages the linked account sends to itself.
    pub fn is_self_chat(&self) -> bool {
        !self.from.is_empty() && self.from == self.to
    }

    /// Echo of a message this service sent through the gateway API.
    pub fn is_own_api_echo(&self) -> bool {
        self.from_me && self.source == "api"
    }
}

/// Message ids arrive either as a plain string or as an object carrying
/// `_serialized`; anything else decodes to an empty id.
fn deserialize_message_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Object(map) => map
            .get("_serialized")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    })
}

/// File attached to an outbound image message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub mimetype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Image to send to a chat.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub file: FileAttachment,
    pub caption: Option<String>,
}

/// Pairing code returned by the gateway for phone-number linking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCode {
    #[serde(default)]
    pub code: String,
}

/// A chat known to the linked account (not necessarily allow-listed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteChat {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub last_message: Option<InboundMessage>,
}

/// A group the linked account belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGroup {
    pub id: String,
    #[serde(default)]
    pub subject: String,
}
