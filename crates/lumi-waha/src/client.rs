// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the WAHA gateway.
//!
//! [`WahaClient`] owns the authenticated transport and maps gateway answers
//! onto [`LumiError`]. It keeps no session state.

use std::time::Duration;

use async_trait::async_trait;
use lumi_config::model::WahaConfig;
use lumi_core::{
    GatewayClient, ImagePayload, LinkCode, LumiError, Profile, RemoteChat, RemoteGroup,
    SessionInfo, SessionStatus,
};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{
    MessageImageRequest, MessageTextRequest, RequestCodeRequest, SessionCreateRequest,
    SessionStateError,
};

/// Client for one WAHA deployment, bound to a single session name for
/// the session-less endpoints (send, chats, groups).
#[derive(Debug, Clone)]
pub struct WahaClient {
    client: reqwest::Client,
    base_url: String,
    session: String,
    timeout: Duration,
}

impl WahaClient {
    /// Builds a client with `X-Api-Key` and JSON content-type on every request.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        session: &str,
        timeout: Duration,
    ) -> Result<Self, LumiError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            headers.insert(
                "X-Api-Key",
                HeaderValue::from_str(key).map_err(|e| {
                    LumiError::Config(format!("invalid WAHA API key header value: {e}"))
                })?,
            );
        }
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| LumiError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session: session.to_string(),
            timeout,
        })
    }

    /// Builds a client from the `[waha]` config section.
    pub fn from_config(config: &WahaConfig) -> Result<Self, LumiError> {
        Self::new(
            &config.base_url,
            config.api_key.as_deref(),
            &config.session_name,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Session name used by session-less endpoints.
    pub fn session_name(&self) -> &str {
        &self.session
    }

    fn url(&self, path: &str) -> Result<reqwest::Url, LumiError> {
        reqwest::Url::parse(&format!("{}{path}", self.base_url))
            .map_err(|e| LumiError::Config(format!("invalid WAHA URL for {path}: {e}")))
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, LumiError> {
        let mut request = self.client.request(method.clone(), self.url(path)?);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        debug!(%method, path, status = %response.status(), "waha response");
        Ok(response)
    }

    fn transport_error(&self, e: reqwest::Error) -> LumiError {
        if e.is_timeout() {
            LumiError::Timeout {
                duration: self.timeout,
            }
        } else {
            LumiError::Gateway {
                status: None,
                message: e.to_string(),
            }
        }
    }

    /// Non-2xx answers become `Gateway` errors carrying status and body verbatim.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, LumiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(LumiError::Gateway {
            status: Some(status.as_u16()),
            message: body,
        })
    }

    async fn decode<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T, LumiError> {
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| LumiError::Gateway {
            status: None,
            message: format!("failed to decode WAHA response: {e}"),
        })
    }

    /// Acknowledgment bodies may be empty; those decode to `null`.
    async fn acknowledgment(&self, response: reqwest::Response) -> Result<serde_json::Value, LumiError> {
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }))
    }

    async fn post_session_action(&self, name: &str, action: &str) -> Result<(), LumiError> {
        let response = self
            .execute(Method::POST, &format!("/api/sessions/{name}/{action}"), None)
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, LumiError> {
        serde_json::to_value(value)
            .map_err(|e| LumiError::Internal(format!("failed to encode WAHA request: {e}")))
    }
}

#[async_trait]
impl GatewayClient for WahaClient {
    async fn ping(&self) -> Result<(), LumiError> {
        let response = self.execute(Method::GET, "/ping", None).await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn session_status(&self, name: &str) -> Result<SessionStatus, LumiError> {
        Ok(self.session_info(name).await?.status)
    }

    async fn session_info(&self, name: &str) -> Result<SessionInfo, LumiError> {
        let response = self
            .execute(Method::GET, &format!("/api/sessions/{name}"), None)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(LumiError::SessionNotFound {
                name: name.to_string(),
            });
        }
        let response = Self::ensure_success(response).await?;
        self.decode(response).await
    }

    async fn create_session(&self, name: &str) -> Result<(), LumiError> {
        let body = Self::to_json(&SessionCreateRequest { name, start: true })?;
        let response = self
            .execute(Method::POST, "/api/sessions", Some(body))
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn start_session(&self, name: &str) -> Result<(), LumiError> {
        self.post_session_action(name, "start").await
    }

    async fn restart_session(&self, name: &str) -> Result<(), LumiError> {
        self.post_session_action(name, "restart").await
    }

    async fn stop_session(&self, name: &str) -> Result<(), LumiError> {
        self.post_session_action(name, "stop").await
    }

    async fn qr_code(&self, name: &str) -> Result<Vec<u8>, LumiError> {
        let response = self
            .execute(Method::GET, &format!("/api/{name}/auth/qr?format=image"), None)
            .await?;
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        Ok(bytes.to_vec())
    }

    async fn request_link_code(
        &self,
        name: &str,
        phone_number: &str,
        method: Option<&str>,
    ) -> Result<LinkCode, LumiError> {
        let body = Self::to_json(&RequestCodeRequest {
            phone_number,
            method,
        })?;
        let response = self
            .execute(
                Method::POST,
                &format!("/api/{name}/auth/request-code"),
                Some(body),
            )
            .await?;
        let response = Self::ensure_success(response).await?;
        self.decode(response).await
    }

    async fn profile(&self, name: &str) -> Result<Profile, LumiError> {
        let response = self
            .execute(Method::GET, &format!("/api/{name}/profile"), None)
            .await?;
        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<SessionStateError>(&body) {
                Ok(state) => {
                    debug!(
                        session = %state.session,
                        status = %state.status,
                        expected = ?state.expected,
                        error = %state.error,
                        "profile unavailable"
                    );
                    LumiError::SessionUnavailable {
                        status: state.status,
                    }
                }
                Err(_) => LumiError::Gateway {
                    status: Some(422),
                    message: body,
                },
            });
        }
        let response = Self::ensure_success(response).await?;
        self.decode(response).await
    }

    async fn send_text(&self, chat_id: &str, text: &str) -> Result<serde_json::Value, LumiError> {
        let body = Self::to_json(&MessageTextRequest {
            chat_id,
            text,
            session: &self.session,
        })?;
        let response = self
            .execute(Method::POST, "/api/sendText", Some(body))
            .await?;
        let response = Self::ensure_success(response).await?;
        self.acknowledgment(response).await
    }

    async fn send_image(
        &self,
        chat_id: &str,
        payload: &ImagePayload,
    ) -> Result<serde_json::Value, LumiError> {
        let body = Self::to_json(&MessageImageRequest {
            chat_id,
            session: &self.session,
            file: &payload.file,
            caption: payload.caption.as_deref(),
        })?;
        let response = self
            .execute(Method::POST, "/api/sendImage", Some(body))
            .await?;
        let response = Self::ensure_success(response).await?;
        self.acknowledgment(response).await
    }

    async fn chats(&self) -> Result<Vec<RemoteChat>, LumiError> {
        let response = self
            .execute(Method::GET, &format!("/api/{}/chats", self.session), None)
            .await?;
        let response = Self::ensure_success(response).await?;
        self.decode(response).await
    }

    async fn groups(&self) -> Result<Vec<RemoteGroup>, LumiError> {
        let response = self
            .execute(Method::GET, &format!("/api/{}/groups", self.session), None)
            .await?;
        let response = Self::ensure_success(response).await?;
        self.decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumi_core::FileAttachment;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> WahaClient {
        WahaClient::new(base_url, Some("test-key"), "default", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn sends_api_key_and_json_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("X-Api-Key", "test-key"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "pong"})))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server.uri()).ping().await.unwrap();
    }

    #[tokio::test]
    async fn missing_session_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sessions/default"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .session_status("default")
            .await
            .unwrap_err();
        assert!(matches!(err, LumiError::SessionNotFound { ref name } if name == "default"));
    }

    #[tokio::test]
    async fn session_info_decodes_status_and_me() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sessions/default"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "default",
                "status": "WORKING",
                "me": {"id": "123@c.us", "pushName": "Ana"},
                "config": {}
            })))
            .mount(&server)
            .await;

        let info = test_client(&server.uri())
            .session_info("default")
            .await
            .unwrap();
        assert_eq!(info.status, SessionStatus::Working);
        assert_eq!(info.me.unwrap().push_name, "Ana");
    }

    #[tokio::test]
    async fn create_requests_auto_start() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sessions"))
            .and(body_json(json!({"name": "default", "start": true})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server.uri())
            .create_session("default")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_2xx_surfaces_status_and_body_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sessions/default/start"))
            .respond_with(ResponseTemplate::new(409).set_body_string("already started"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .start_session("default")
            .await
            .unwrap_err();
        match err {
            LumiError::Gateway { status, message } => {
                assert_eq!(status, Some(409));
                assert_eq!(message, "already started");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn qr_code_returns_raw_image_bytes() {
        let server = MockServer::start().await;
        let png = vec![0x89, b'P', b'N', b'G'];
        Mock::given(method("GET"))
            .and(path("/api/default/auth/qr"))
            .and(query_param("format", "image"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(png.clone())
                    .insert_header("content-type", "image/png"),
            )
            .mount(&server)
            .await;

        let bytes = test_client(&server.uri()).qr_code("default").await.unwrap();
        assert_eq!(bytes, png);
    }

    #[tokio::test]
    async fn profile_422_embeds_session_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/default/profile"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "error": "Session status is not as expected",
                "session": "default",
                "status": "SCAN_QR_CODE",
                "expected": ["WORKING"]
            })))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .profile("default")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "failed, current session status: SCAN_QR_CODE");
    }

    #[tokio::test]
    async fn link_code_posts_phone_and_method() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/default/auth/request-code"))
            .and(body_json(json!({"phoneNumber": "15551234567", "method": "sms"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": "ABCD-EFGH"})))
            .mount(&server)
            .await;

        let code = test_client(&server.uri())
            .request_link_code("default", "15551234567", Some("sms"))
            .await
            .unwrap();
        assert_eq!(code.code, "ABCD-EFGH");
    }

    #[tokio::test]
    async fn send_text_includes_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sendText"))
            .and(body_json(json!({"chatId": "1@c.us", "text": "hi", "session": "default"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "msg-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let ack = test_client(&server.uri())
            .send_text("1@c.us", "hi")
            .await
            .unwrap();
        assert_eq!(ack["id"], "msg-1");
    }

    #[tokio::test]
    async fn send_image_omits_absent_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sendImage"))
            .and(body_json(json!({
                "chatId": "1@c.us",
                "session": "default",
                "file": {"mimetype": "image/png", "url": "https://example.com/a.png"}
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let payload = ImagePayload {
            file: FileAttachment {
                mimetype: "image/png".into(),
                url: Some("https://example.com/a.png".into()),
                ..Default::default()
            },
            caption: None,
        };
        let ack = test_client(&server.uri())
            .send_image("1@c.us", &payload)
            .await
            .unwrap();
        assert!(ack.is_null());
    }

    #[tokio::test]
    async fn unreachable_gateway_is_transient() {
        let client = test_client("http://127.0.0.1:9");
        let err = client.ping().await.unwrap_err();
        assert!(err.is_transient(), "got: {err:?}");
    }
}
