// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WAHA gateway client for the Lumi agent.
//!
//! Implements [`lumi_core::GatewayClient`] over the WAHA HTTP API and
//! defines the webhook event types the gateway pushes back.

pub mod client;
pub mod types;

pub use client::WahaClient;
pub use types::{SessionStatusPayload, WebhookEnvelope, WebhookEvent};
