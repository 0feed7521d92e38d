// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface of the Lumi agent.
//!
//! Provides the gateway webhook receiver, session control for operators,
//! the chat allow-list API and per-client rate limiting, all answering
//! with the `{status_code, message, data?}` envelope.

pub mod auth;
pub mod chats;
pub mod envelope;
pub mod health;
pub mod rate_limit;
pub mod server;
pub mod webhook;
pub mod whatsapp;

pub use envelope::{ApiResponse, CHAT_NOT_REGISTERED, status_for};
pub use rate_limit::{RateDecision, RateLimiter, client_key};
pub use server::{AppState, build_router, start_server};
