// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON response envelope `{status_code, message, data?}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lumi_core::LumiError;
use serde::Serialize;

/// Answer to a send aimed at a chat outside the allow-list.
pub const CHAT_NOT_REGISTERED: &str =
    "Chat ID is not registered. Please register the chat/group first.";

#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Success {
        code: StatusCode,
        message: String,
        data: Option<serde_json::Value>,
    },
    Failure {
        code: StatusCode,
        message: String,
    },
}

#[derive(Serialize)]
struct EnvelopeBody<'a> {
    status_code: u16,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a serde_json::Value>,
}

impl ApiResponse {
    /// 200 without a payload.
    pub fn ok(message: impl Into<String>) -> Self {
        ApiResponse::Success {
            code: StatusCode::OK,
            message: message.into(),
            data: None,
        }
    }

    /// 200 carrying `data`.
    pub fn with_data<T: Serialize>(message: impl Into<String>, data: T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => ApiResponse::Success {
                code: StatusCode::OK,
                message: message.into(),
                data: Some(value),
            },
            Err(e) => ApiResponse::failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to encode response: {e}"),
            ),
        }
    }

    pub fn failure(code: StatusCode, message: impl Into<String>) -> Self {
        ApiResponse::Failure {
            code,
            message: message.into(),
        }
    }

    /// Failure whose status follows the error kind, prefixed with `context`.
    pub fn from_error(context: &str, err: &LumiError) -> Self {
        ApiResponse::failure(status_for(err), format!("{context}: {err}"))
    }

    /// Failure for a request the client got wrong. The message is meant for
    /// the caller as is, without an error-kind prefix.
    pub fn rejected(err: LumiError) -> Self {
        let message = match &err {
            LumiError::Validation(message) => message.clone(),
            LumiError::ChatNotAllowed { .. } => CHAT_NOT_REGISTERED.to_string(),
            other => other.to_string(),
        };
        ApiResponse::failure(status_for(&err), message)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiResponse::Success { code, .. } | ApiResponse::Failure { code, .. } => *code,
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let (code, message, data) = match &self {
            ApiResponse::Success {
                code,
                message,
                data,
            } => (*code, message.as_str(), data.as_ref()),
            ApiResponse::Failure { code, message } => (*code, message.as_str(), None),
        };
        let body = EnvelopeBody {
            status_code: code.as_u16(),
            message,
            data,
        };
        (code, Json(body)).into_response()
    }
}

/// HTTP status for an error surfacing at the API boundary.
pub fn status_for(err: &LumiError) -> StatusCode {
    match err {
        LumiError::Validation(_) => StatusCode::BAD_REQUEST,
        LumiError::ChatNotAllowed { .. } => StatusCode::FORBIDDEN,
        LumiError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
        LumiError::SessionUnavailable { .. } | LumiError::Gateway { .. } => StatusCode::BAD_GATEWAY,
        LumiError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        LumiError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        LumiError::SessionFailed { .. }
        | LumiError::SessionStopped { .. }
        | LumiError::Storage { .. }
        | LumiError::Completion { .. }
        | LumiError::Config(_)
        | LumiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn success_omits_missing_data() {
        let response = ApiResponse::ok("Session stopped").into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status_code"], 200);
        assert_eq!(body["message"], "Session stopped");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn failure_carries_code_in_body() {
        let response = ApiResponse::failure(StatusCode::FORBIDDEN, "nope").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["status_code"], 403);
        assert_eq!(body["message"], "nope");
    }

    #[tokio::test]
    async fn rejections_keep_the_client_message() {
        let invalid = ApiResponse::rejected(LumiError::Validation("chat_id is required".into()));
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        let body = body_json(invalid.into_response()).await;
        assert_eq!(body["message"], "chat_id is required");

        let denied = ApiResponse::rejected(LumiError::ChatNotAllowed {
            chat_id: "1@c.us".into(),
        });
        assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);
        let body = body_json(denied.into_response()).await;
        assert_eq!(body["message"], CHAT_NOT_REGISTERED);
    }

    #[test]
    fn errors_map_to_statuses() {
        let cases = [
            (LumiError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (LumiError::ChatNotAllowed { chat_id: "1".into() }, StatusCode::FORBIDDEN),
            (LumiError::SessionNotFound { name: "d".into() }, StatusCode::NOT_FOUND),
            (LumiError::SessionUnavailable { status: "STOPPED".into() }, StatusCode::BAD_GATEWAY),
            (LumiError::Gateway { status: Some(500), message: String::new() }, StatusCode::BAD_GATEWAY),
            (LumiError::SessionFailed { name: "d".into() }, StatusCode::INTERNAL_SERVER_ERROR),
            (LumiError::Timeout { duration: Duration::from_secs(20) }, StatusCode::GATEWAY_TIMEOUT),
            (LumiError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(status_for(&err), expected, "{err}");
        }
    }

    #[test]
    fn from_error_prefixes_context() {
        let err = LumiError::SessionFailed { name: "default".into() };
        let response = ApiResponse::from_error("Failed to start session", &err);
        assert_eq!(
            response,
            ApiResponse::Failure {
                code: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Failed to start session: session default failed to start".into(),
            }
        );
    }
}
