// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Lumi agent.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across all Lumi crates.
#[derive(Debug, Error)]
pub enum LumiError {
    /// Configuration errors (invalid values, missing credentials).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The gateway answered with a non-2xx status, or could not be reached.
    ///
    /// `status` is `None` for transport failures (connect, timeout, decode).
    /// `message` carries the gateway's response body verbatim when present.
    #[error("gateway error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Gateway {
        status: Option<u16>,
        message: String,
    },

    /// The named gateway session does not exist.
    #[error("session not found: {name}")]
    SessionNotFound { name: String },

    /// The session exists but cannot serve the request in its current state.
    #[error("failed, current session status: {status}")]
    SessionUnavailable { status: String },

    /// The gateway reported FAILED while waiting for the session.
    #[error("session {name} failed to start")]
    SessionFailed { name: String },

    /// The gateway reported STOPPED while waiting for the session.
    #[error("session {name} stopped unexpectedly")]
    SessionStopped { name: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// AI completion failed (API error, empty answer, timeout).
    #[error("completion error: {message}")]
    Completion {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Request payload is missing a field or malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The chat is not on the allow-list.
    #[error("chat {chat_id} is not registered")]
    ChatNotAllowed { chat_id: String },

    /// The operation was abandoned because the process is shutting down.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LumiError {
    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        LumiError::Storage {
            source: Box::new(err),
        }
    }

    /// Session errors that must not be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LumiError::SessionFailed { .. } | LumiError::SessionStopped { .. }
        )
    }

    /// Network-level or server-side gateway failures worth another poll.
    pub fn is_transient(&self) -> bool {
        match self {
            LumiError::Gateway { status: None, .. } => true,
            LumiError::Gateway {
                status: Some(code), ..
            } => *code >= 500,
            LumiError::Timeout { .. } => true,
            _ => false,
        }
    }
}
