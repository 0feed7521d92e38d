// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the WAHA HTTP API and its webhook events.

use lumi_core::{FileAttachment, InboundMessage, SessionStatus};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/sessions`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionCreateRequest<'a> {
    pub name: &'a str,
    pub start: bool,
}

/// Body of `POST /api/sendText`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTextRequest<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
    pub session: &'a str,
}

/// Body of `POST /api/sendImage`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageImageRequest<'a> {
    pub chat_id: &'a str,
    pub session: &'a str,
    pub file: &'a FileAttachment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<&'a str>,
}

/// Body of `POST /api/{session}/auth/request-code`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCodeRequest<'a> {
    pub phone_number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<&'a str>,
}

/// Body of a 422 answer: the session exists but is in the wrong state.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionStateError {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub expected: Vec<String>,
}

/// Every webhook delivery: `{event, session, payload}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Payload of a `session.status` event.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionStatusPayload {
    pub status: SessionStatus,
}

/// A decoded webhook event.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    SessionStatus(SessionStatusPayload),
    Message(Box<InboundMessage>),
    /// An event this service does not act on.
    Other(String),
}

pub const EVENT_SESSION_STATUS: &str = "session.status";
pub const EVENT_MESSAGE: &str = "message";

impl WebhookEnvelope {
    /// Decodes the payload according to `event`.
    pub fn into_event(self) -> Result<WebhookEvent, serde_json::Error> {
        match self.event.as_str() {
            EVENT_SESSION_STATUS => Ok(WebhookEvent::SessionStatus(serde_json::from_value(
                self.payload,
            )?)),
            EVENT_MESSAGE => Ok(WebhookEvent::Message(Box::new(serde_json::from_value(
                self.payload,
            )?))),
            _ => Ok(WebhookEvent::Other(self.event)),
        }
    }
}
