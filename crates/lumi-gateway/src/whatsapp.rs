// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session control and outbound sends under `/api/v1/whatsapp`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use lumi_core::{FileAttachment, ImagePayload, LumiError};
use serde::Deserialize;
use serde_json::json;

use crate::envelope::ApiResponse;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeQuery {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    #[serde(default)]
    pub chat_id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SendImageRequest {
    #[serde(default)]
    pub chat_id: String,
    pub file: FileAttachment,
    #[serde(default)]
    pub caption: Option<String>,
}

/// GET /connect
///
/// Starts the session, then answers with the linked profile or a QR code
/// image to scan.
pub async fn connect(State(state): State<AppState>) -> Response {
    if let Err(e) = state.orchestrator.start_session(&state.shutdown).await {
        return ApiResponse::from_error("Failed to start session", &e).into_response();
    }

    if let Some(profile) = state.orchestrator.linked_profile().await {
        return ApiResponse::with_data(
            "Already logged in",
            json!({ "status": "connected", "profile": profile }),
        )
        .into_response();
    }

    match state.orchestrator.qr_code().await {
        Ok(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Err(e) => ApiResponse::failure(
            StatusCode::BAD_GATEWAY,
            format!("Failed to retrieve QR code from Waha: {e}"),
        )
        .into_response(),
    }
}

/// GET /code?phoneNumber=&method=
pub async fn request_code(
    State(state): State<AppState>,
    Query(query): Query<CodeQuery>,
) -> ApiResponse {
    let Some(phone_number) = query
        .phone_number
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    else {
        return invalid("phoneNumber query parameter is required");
    };

    if let Err(e) = state.orchestrator.start_session(&state.shutdown).await {
        return ApiResponse::from_error("Failed to start session", &e);
    }

    match state
        .orchestrator
        .request_link_code(phone_number, query.method.as_deref())
        .await
    {
        Ok(code) => ApiResponse::with_data("Code requested successfully", code),
        Err(e) => ApiResponse::from_error("Failed to request code", &e),
    }
}

/// POST /start
pub async fn start(State(state): State<AppState>) -> ApiResponse {
    if let Err(e) = state.orchestrator.start_session(&state.shutdown).await {
        return ApiResponse::from_error("Failed to start session", &e);
    }
    let profile = state.orchestrator.linked_profile().await;
    ApiResponse::with_data(
        "Session started",
        json!({ "status": state.orchestrator.status(), "profile": profile }),
    )
}

/// POST /restart
pub async fn restart(State(state): State<AppState>) -> ApiResponse {
    match state.orchestrator.restart_session(&state.shutdown).await {
        Ok(()) => ApiResponse::with_data(
            "Session restarted",
            json!({ "status": state.orchestrator.status() }),
        ),
        Err(e) => ApiResponse::from_error("Failed to restart session", &e),
    }
}

/// POST /stop
pub async fn stop(State(state): State<AppState>) -> ApiResponse {
    match state.orchestrator.stop_session().await {
        Ok(()) => ApiResponse::ok("Session stopped"),
        Err(e) => ApiResponse::from_error("Failed to stop session", &e),
    }
}

/// GET /me
pub async fn me(State(state): State<AppState>) -> ApiResponse {
    match state.orchestrator.profile().await {
        Ok(profile) => ApiResponse::with_data("Profile fetched", profile),
        Err(e) => ApiResponse::failure(
            StatusCode::BAD_GATEWAY,
            format!("Failed to fetch profile. Ensure session is connected: {e}"),
        ),
    }
}

/// GET /status
pub async fn status(State(state): State<AppState>) -> ApiResponse {
    ApiResponse::with_data(
        "Session status",
        json!({
            "session": state.orchestrator.session_name(),
            "status": state.orchestrator.status(),
        }),
    )
}

/// POST /send/text
pub async fn send_text(
    State(state): State<AppState>,
    payload: Result<Json<SendTextRequest>, JsonRejection>,
) -> ApiResponse {
    let Ok(Json(request)) = payload else {
        return invalid("Invalid payload");
    };
    if request.chat_id.trim().is_empty() || request.text.trim().is_empty() {
        return invalid("chat_id and text are required");
    }
    if let Some(denied) = ensure_registered(&state, &request.chat_id).await {
        return denied;
    }

    match state.gateway.send_text(&request.chat_id, &request.text).await {
        Ok(ack) => ApiResponse::with_data("Message sent", ack),
        Err(e) => ApiResponse::from_error("Failed to send message", &e),
    }
}

/// POST /send/image
pub async fn send_image(
    State(state): State<AppState>,
    payload: Result<Json<SendImageRequest>, JsonRejection>,
) -> ApiResponse {
    let Ok(Json(request)) = payload else {
        return invalid("Invalid payload");
    };
    let file = &request.file;
    if request.chat_id.trim().is_empty()
        || file.mimetype.trim().is_empty()
        || (file.data.is_none() && file.url.is_none())
    {
        return invalid("chat_id, file.mimetype and file.data or file.url are required");
    }
    if let Some(denied) = ensure_registered(&state, &request.chat_id).await {
        return denied;
    }

    let image = ImagePayload {
        file: request.file,
        caption: request.caption,
    };
    match state.gateway.send_image(&request.chat_id, &image).await {
        Ok(ack) => ApiResponse::with_data("Image sent", ack),
        Err(e) => ApiResponse::from_error("Failed to send image", &e),
    }
}

async fn ensure_registered(state: &AppState, chat_id: &str) -> Option<ApiResponse> {
    match state.store.is_chat_allowed(chat_id).await {
        Ok(true) => None,
        Ok(false) => Some(ApiResponse::rejected(LumiError::ChatNotAllowed {
            chat_id: chat_id.to_string(),
        })),
        Err(e) => Some(ApiResponse::from_error("Failed to check chat registration", &e)),
    }
}

pub(crate) fn invalid(message: &str) -> ApiResponse {
    ApiResponse::rejected(LumiError::Validation(message.to_string()))
}
