// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted gateway client.
//!
//! Session status answers are popped from a queue; once the queue runs dry
//! the last answer repeats. Every call is recorded by name so tests can
//! assert on what was (or was not) asked of the gateway.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use lumi_core::{
    GatewayClient, ImagePayload, LinkCode, LumiError, Profile, RemoteChat, RemoteGroup,
    SessionInfo, SessionStatus,
};

/// One scripted answer to a session status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedStatus {
    Status(SessionStatus),
    /// The session resource does not exist.
    NotFound,
    /// The gateway could not be reached.
    Unreachable,
    /// The gateway answered with this non-2xx status.
    Rejected(u16),
    /// The request never completes.
    Hang,
}

impl From<SessionStatus> for ScriptedStatus {
    fn from(status: SessionStatus) -> Self {
        ScriptedStatus::Status(status)
    }
}

#[derive(Default)]
struct Inner {
    statuses: VecDeque<ScriptedStatus>,
    last: Option<ScriptedStatus>,
    calls: Vec<String>,
    sent_texts: Vec<(String, String)>,
    sent_images: Vec<(String, ImagePayload)>,
}

/// A [`GatewayClient`] driven by a script instead of HTTP.
pub struct MockGateway {
    inner: Mutex<Inner>,
    profile: Option<Profile>,
    chats: Vec<RemoteChat>,
    groups: Vec<RemoteGroup>,
    fail_sends: bool,
    ping_ok: bool,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    /// A gateway whose session is missing until scripted otherwise.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            profile: None,
            chats: Vec::new(),
            groups: Vec::new(),
            fail_sends: false,
            ping_ok: true,
        }
    }

    /// Queues status answers, consumed one per status query.
    pub fn with_statuses<I, S>(self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ScriptedStatus>,
    {
        let statuses = statuses.into_iter().map(Into::into).collect();
        Self {
            inner: Mutex::new(Inner {
                statuses,
                ..Inner::default()
            }),
            ..self
        }
    }

    /// Linked identity returned by `profile` while the session is WORKING.
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_chats(mut self, chats: Vec<RemoteChat>) -> Self {
        self.chats = chats;
        self
    }

    pub fn with_groups(mut self, groups: Vec<RemoteGroup>) -> Self {
        self.groups = groups;
        self
    }

    /// Makes every send fail with a 500.
    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    /// Makes `ping` fail.
    pub fn unreachable(mut self) -> Self {
        self.ping_ok = false;
        self
    }

    /// Appends more status answers.
    pub async fn push_status(&self, status: impl Into<ScriptedStatus>) {
        self.inner.lock().await.statuses.push_back(status.into());
    }

    /// Names of every call made so far, in order.
    pub async fn calls(&self) -> Vec<String> {
        self.inner.lock().await.calls.clone()
    }

    /// How many times a call with this name was made.
    pub async fn call_count(&self, name: &str) -> usize {
        self.inner
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| *c == name)
            .count()
    }

    /// `(chat_id, text)` of every text send attempt.
    pub async fn sent_texts(&self) -> Vec<(String, String)> {
        self.inner.lock().await.sent_texts.clone()
    }

    /// `(chat_id, payload)` of every image send attempt.
    pub async fn sent_images(&self) -> Vec<(String, ImagePayload)> {
        self.inner.lock().await.sent_images.clone()
    }

    async fn record(&self, call: &str) {
        self.inner.lock().await.calls.push(call.to_string());
    }

    async fn next_status(&self) -> ScriptedStatus {
        let mut inner = self.inner.lock().await;
        let next = inner
            .statuses
            .pop_front()
            .or(inner.last)
            .unwrap_or(ScriptedStatus::NotFound);
        inner.last = Some(next);
        next
    }

    /// Status as of the last query, without consuming the script.
    async fn current_status(&self) -> ScriptedStatus {
        let inner = self.inner.lock().await;
        inner
            .last
            .or_else(|| inner.statuses.front().copied())
            .unwrap_or(ScriptedStatus::NotFound)
    }

    fn send_error() -> LumiError {
        LumiError::Gateway {
            status: Some(500),
            message: "send failed".into(),
        }
    }
}

#[async_trait]
impl GatewayClient for MockGateway {
    async fn ping(&self) -> Result<(), LumiError> {
        self.record("ping").await;
        if self.ping_ok {
            Ok(())
        } else {
            Err(LumiError::Gateway {
                status: None,
                message: "connection refused".into(),
            })
        }
    }

    async fn session_status(&self, name: &str) -> Result<SessionStatus, LumiError> {
        self.record("session_status").await;
        match self.next_status().await {
            ScriptedStatus::Status(status) => Ok(status),
            ScriptedStatus::NotFound => Err(LumiError::SessionNotFound {
                name: name.to_string(),
            }),
            ScriptedStatus::Unreachable => Err(LumiError::Gateway {
                status: None,
                message: "connection refused".into(),
            }),
            ScriptedStatus::Rejected(code) => Err(LumiError::Gateway {
                status: Some(code),
                message: format!(r#"{{"statusCode":{code},"message":"rejected"}}"#),
            }),
            ScriptedStatus::Hang => std::future::pending().await,
        }
    }

    async fn session_info(&self, name: &str) -> Result<SessionInfo, LumiError> {
        let status = self.session_status(name).await?;
        Ok(SessionInfo {
            name: name.to_string(),
            status,
            me: (status == SessionStatus::Working)
                .then(|| self.profile.clone())
                .flatten(),
        })
    }

    async fn create_session(&self, _name: &str) -> Result<(), LumiError> {
        self.record("create_session").await;
        Ok(())
    }

    async fn start_session(&self, _name: &str) -> Result<(), LumiError> {
        self.record("start_session").await;
        Ok(())
    }

    async fn restart_session(&self, _name: &str) -> Result<(), LumiError> {
        self.record("restart_session").await;
        Ok(())
    }

    async fn stop_session(&self, _name: &str) -> Result<(), LumiError> {
        self.record("stop_session").await;
        Ok(())
    }

    async fn qr_code(&self, _name: &str) -> Result<Vec<u8>, LumiError> {
        self.record("qr_code").await;
        match self.current_status().await {
            ScriptedStatus::Status(SessionStatus::ScanRequired) => {
                Ok(vec![0x89, b'P', b'N', b'G'])
            }
            _ => Err(LumiError::Gateway {
                status: Some(422),
                message: r#"{"error":"session is not waiting for a QR scan"}"#.into(),
            }),
        }
    }

    async fn request_link_code(
        &self,
        _name: &str,
        phone_number: &str,
        _method: Option<&str>,
    ) -> Result<LinkCode, LumiError> {
        self.record("request_link_code").await;
        Ok(LinkCode {
            code: format!("CODE-{}", phone_number.len()),
        })
    }

    async fn profile(&self, _name: &str) -> Result<Profile, LumiError> {
        self.record("profile").await;
        match (self.current_status().await, &self.profile) {
            (ScriptedStatus::Status(SessionStatus::Working), Some(profile)) => Ok(profile.clone()),
            (ScriptedStatus::Status(status), _) => Err(LumiError::SessionUnavailable {
                status: status.to_string(),
            }),
            _ => Err(LumiError::SessionUnavailable {
                status: SessionStatus::Stopped.to_string(),
            }),
        }
    }

    async fn send_text(&self, chat_id: &str, text: &str) -> Result<serde_json::Value, LumiError> {
        {
            let mut inner = self.inner.lock().await;
            inner.calls.push("send_text".to_string());
            inner
                .sent_texts
                .push((chat_id.to_string(), text.to_string()));
        }
        if self.fail_sends {
            return Err(Self::send_error());
        }
        Ok(serde_json::json!({"id": "mock-message"}))
    }

    async fn send_image(
        &self,
        chat_id: &str,
        payload: &ImagePayload,
    ) -> Result<serde_json::Value, LumiError> {
        {
            let mut inner = self.inner.lock().await;
            inner.calls.push("send_image".to_string());
            inner
                .sent_images
                .push((chat_id.to_string(), payload.clone()));
        }
        if self.fail_sends {
            return Err(Self::send_error());
        }
        Ok(serde_json::json!({"id": "mock-image"}))
    }

    async fn chats(&self) -> Result<Vec<RemoteChat>, LumiError> {
        self.record("chats").await;
        Ok(self.chats.clone())
    }

    async fn groups(&self) -> Result<Vec<RemoteGroup>, LumiError> {
        self.record("groups").await;
        Ok(self.groups.clone())
    }
}
