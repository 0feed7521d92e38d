// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for the Lumi collaborator traits.
//!
//! - [`MemoryStore`]: in-memory [`lumi_core::ChatStore`]
//! - [`MockGateway`]: scripted [`lumi_core::GatewayClient`] that records calls
//! - [`MockCompletion`]: queued [`lumi_core::CompletionAdapter`] responses

pub mod memory_store;
pub mod mock_completion;
pub mod mock_gateway;

pub use memory_store::MemoryStore;
pub use mock_completion::{CompletionCall, MockCompletion};
pub use mock_gateway::{MockGateway, ScriptedStatus};
