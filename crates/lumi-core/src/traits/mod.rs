// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the seams of the agent.
//!
//! Every trait uses `#[async_trait]` so implementations can be shared as
//! `Arc<dyn Trait>` between HTTP handlers and background tasks.

pub mod completion;
pub mod gateway;
pub mod storage;

pub use completion::CompletionAdapter;
pub use gateway::GatewayClient;
pub use storage::ChatStore;
