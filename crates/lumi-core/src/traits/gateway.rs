// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed view of the messaging gateway's HTTP API.

use async_trait::async_trait;

use crate::error::LumiError;
use crate::types::{
    ImagePayload, LinkCode, Profile, RemoteChat, RemoteGroup, SessionInfo, SessionStatus,
};

/// Client for the external messaging gateway.
///
/// Implementations hold no state beyond their transport. Non-2xx answers
/// surface as [`LumiError::Gateway`] with the status code and body intact,
/// except for the two cases callers branch on: a missing session
/// ([`LumiError::SessionNotFound`]) and a profile request against a session
/// that is not linked ([`LumiError::SessionUnavailable`]).
#[async_trait]
pub trait GatewayClient: Send + Sync + 'static {
    /// Liveness check of the gateway itself.
    async fn ping(&self) -> Result<(), LumiError>;

    /// Current status of the named session.
    async fn session_status(&self, name: &str) -> Result<SessionStatus, LumiError>;

    /// Full session resource.
    async fn session_info(&self, name: &str) -> Result<SessionInfo, LumiError>;

    /// Creates the session and asks the gateway to start it.
    async fn create_session(&self, name: &str) -> Result<(), LumiError>;

    /// Starts an existing, stopped session.
    async fn start_session(&self, name: &str) -> Result<(), LumiError>;

    /// Restarts the session.
    async fn restart_session(&self, name: &str) -> Result<(), LumiError>;

    /// Stops the session without deleting it.
    async fn stop_session(&self, name: &str) -> Result<(), LumiError>;

    /// QR code image (PNG bytes) for linking a device.
    async fn qr_code(&self, name: &str) -> Result<Vec<u8>, LumiError>;

    /// Requests a pairing code for linking by phone number.
    async fn request_link_code(
        &self,
        name: &str,
        phone_number: &str,
        method: Option<&str>,
    ) -> Result<LinkCode, LumiError>;

    /// Identity of the linked account.
    async fn profile(&self, name: &str) -> Result<Profile, LumiError>;

    /// Sends a text message; returns the gateway's acknowledgment.
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<serde_json::Value, LumiError>;

    /// Sends an image message; returns the gateway's acknowledgment.
    async fn send_image(
        &self,
        chat_id: &str,
        payload: &ImagePayload,
    ) -> Result<serde_json::Value, LumiError>;

    /// Chats known to the linked account.
    async fn chats(&self) -> Result<Vec<RemoteChat>, LumiError>;

    /// Groups the linked account belongs to.
    async fn groups(&self) -> Result<Vec<RemoteGroup>, LumiError>;
}
