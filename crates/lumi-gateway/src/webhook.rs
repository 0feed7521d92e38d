// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Receiver for gateway push events.
//!
//! Session status changes are applied before the response is sent.
//! Messages are handed to the task pool so AI latency never delays the
//! acknowledgment.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use lumi_waha::{WebhookEnvelope, WebhookEvent};
use tracing::{debug, warn};

use crate::envelope::ApiResponse;
use crate::server::AppState;
use crate::whatsapp::invalid;

/// POST /api/v1/webhook
pub async fn webhook(State(state): State<AppState>, body: Bytes) -> ApiResponse {
    let event = match serde_json::from_slice::<WebhookEnvelope>(&body)
        .and_then(WebhookEnvelope::into_event)
    {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "rejecting malformed webhook payload");
            return invalid("Invalid payload");
        }
    };

    match event {
        WebhookEvent::SessionStatus(payload) => {
            state.orchestrator.on_session_status(payload.status);
        }
        WebhookEvent::Message(message) => {
            if message.chat_id().is_empty() {
                warn!(message_id = %message.id, "rejecting message without sender or recipient");
                return invalid("message payload requires from and to");
            }
            let engine = Arc::clone(&state.engine);
            state.tasks.submit("conversation", async move {
                let outcome = engine.process_message(&message).await?;
                debug!(chat_id = %message.chat_id(), ?outcome, "message processed");
                Ok(())
            });
        }
        WebhookEvent::Other(name) => debug!(event = %name, "ignoring webhook event"),
    }

    ApiResponse::ok("Event received")
}
