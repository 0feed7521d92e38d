// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Lumi WhatsApp agent.
//!
//! Holds the error type, the domain types exchanged between crates, and the
//! collaborator traits (storage, gateway client, AI completion) that the
//! agent is written against.

pub mod connectivity;
pub mod error;
pub mod traits;
pub mod types;

pub use connectivity::{ConnectivityState, SharedConnectivity, UNKNOWN_STATUS};
pub use error::LumiError;
pub use traits::{ChatStore, CompletionAdapter, GatewayClient};
pub use types::{
    ChatKind, ChatMessage, FileAttachment, ImagePayload, InboundMessage, LinkCode, Profile,
    RegisteredChat, RemoteChat, RemoteGroup, Role, SessionInfo, SessionStatus,
};
